//! Crate-level error type
//!
//! Each layer has its own error enum; [`MonitorError`] gathers them for
//! startup paths and the binary. Once the loop is running nothing is fatal,
//! so cycle-level failures are logged where they happen instead of
//! propagating here.

use thiserror::Error;

/// Main error type for monitor startup and shutdown
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("Sensor error: {0}")]
    Sensor(#[from] crate::sensors::SensorError),

    #[error("Connectivity error: {0}")]
    Connectivity(#[from] crate::connectivity::ConnectivityError),

    #[error("MQTT error: {0}")]
    Mqtt(#[from] crate::transport::MqttError),

    #[error("Email error: {0}")]
    Email(#[from] crate::notify::EmailError),

    #[error("Startup error: {message}")]
    Startup { message: String },
}

impl MonitorError {
    /// Create startup error
    pub fn startup<S: Into<String>>(message: S) -> Self {
        Self::Startup {
            message: message.into(),
        }
    }

    /// Configuration problems exit with a distinct status
    pub fn exit_code(&self) -> i32 {
        match self {
            MonitorError::Config(_) => 78,
            _ => 1,
        }
    }
}

/// Result type for monitor operations
pub type MonitorResult<T> = Result<T, MonitorError>;
