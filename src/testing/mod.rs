//! Testing utilities and mock implementations
//!
//! Mock drivers, links, broker session, and mailer so the monitor can be
//! exercised without hardware, a network, an MQTT broker, or an SMTP relay.

pub mod mocks;

pub use mocks::*;
