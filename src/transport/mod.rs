//! Transport layer for publishing readings
//!
//! This module provides the broker session abstraction and its MQTT
//! implementation.

use async_trait::async_trait;

pub mod mqtt;

pub use mqtt::{ConnectionState, MqttError, MqttSession};

/// Broker session used by the publisher
///
/// Abstracts the MQTT client so connectivity handling and the monitor loop
/// can be exercised without a broker.
#[async_trait]
pub trait BrokerSession: Send + Sync {
    /// Make one attempt to establish the session
    async fn connect(&mut self) -> Result<(), MqttError>;

    /// Close the session
    async fn disconnect(&mut self) -> Result<(), MqttError>;

    /// Whether the session is currently usable (last known state, not a probe)
    fn is_connected(&self) -> bool;

    /// Service the session so keep-alives flow; returns whether it is still up
    async fn poll(&mut self) -> bool;

    /// Fire-and-forget publish of a text body
    async fn publish(&self, topic: &str, payload: String) -> Result<(), MqttError>;
}
