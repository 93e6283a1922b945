//! Vitals Monitor
//!
//! Telemetry loop for a bedside sensing device. Every cycle it samples a
//! load cell (mass), a pulse sensor and an analog temperature sensor,
//! publishes each reading to an MQTT broker, and emails an alert when a
//! pulse or temperature reading falls outside its configured bounds. Lost
//! network or broker links are re-established before they are needed.
//!
//! # Overview
//!
//! - [`sensors`] - driver traits, calibration and Linux sysfs drivers
//! - [`connectivity`] - network link and broker session with bounded retry
//! - [`publisher`] - payload formatting and topic routing
//! - [`alerts`] - threshold rules and alert text
//! - [`notify`] - SMTP alert delivery
//! - [`monitor`] - the cycle that ties them together
//!
//! # Quick Start
//!
//! ```rust
//! use vitals_monitor::alerts::{AlertEvaluator, Classification};
//! use vitals_monitor::publisher::format_payload;
//! use vitals_monitor::reading::Reading;
//!
//! let pulse = Reading::pulse(550);
//! assert_eq!(format_payload(&pulse), "Pulse Signal: 550");
//!
//! let evaluator = AlertEvaluator::default();
//! assert_eq!(evaluator.classify(&pulse), Classification::Abnormal);
//! ```

pub mod alerts;
pub mod config;
pub mod connectivity;
pub mod error;
pub mod monitor;
pub mod notify;
pub mod observability;
pub mod publisher;
pub mod reading;
pub mod sensors;
pub mod testing;
pub mod transport;

pub use config::*;
pub use error::{MonitorError, MonitorResult};
pub use monitor::{CycleReport, DeviceMonitor, MonitorLoop};
pub use reading::{Reading, SensorKind};
