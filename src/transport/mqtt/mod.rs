//! MQTT broker session
//!
//! This module separates pure functions from I/O operations for better
//! testability.
//!
//! # Architecture
//!
//! - [`connection`] - Pure connection state management and configuration
//! - [`message_handler`] - Pure event routing
//! - [`client`] - Impure I/O operations and coordination
//!
//! # Usage
//!
//! ```rust,no_run
//! use vitals_monitor::config::MqttSection;
//! use vitals_monitor::transport::{BrokerSession, MqttSession};
//!
//! # tokio_test::block_on(async {
//! let config = MqttSection {
//!     broker_url: "mqtt://localhost:1883".to_string(),
//!     username_env: None,
//!     password_env: None,
//!     keep_alive_secs: 60,
//!     retry_interval_ms: 1000,
//!     max_attempts: None,
//!     connect_timeout_ms: 5000,
//! };
//!
//! let mut session = MqttSession::new("crib-1", config)?;
//! session.connect().await?;
//! session.publish("device/pulse", "Pulse Signal: 612".to_string()).await?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! # });
//! ```

pub mod client;
pub mod connection;
pub mod message_handler;

// Re-export public types for convenience
pub use client::MqttSession;
pub use connection::{ConnectionEvent, ConnectionState, MqttError};
pub use message_handler::{EventRoute, MessageHandler};
