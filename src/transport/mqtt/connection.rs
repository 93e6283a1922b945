//! Pure connection state management for the MQTT session
//!
//! This module contains pure functions for connection state transitions and
//! broker option construction. All I/O lives in [`super::client`].

use crate::config::MqttSection;
use rumqttc::v5::MqttOptions;
use rumqttc::Transport as RumqttcTransport;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};
use url::Url;

/// Connection state of the broker session
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionState {
    /// Waiting for ConnAck
    Connecting,
    /// Session established and ready for publishing
    Connected,
    /// Disconnected with reason
    Disconnected(String),
}

/// Events that move the session between states
#[derive(Debug, Clone)]
pub enum ConnectionEvent {
    /// ConnAck received from broker
    ConnAckReceived,
    /// Broker initiated disconnect
    DisconnectedByBroker,
    /// Network or protocol error
    NetworkError(String),
    /// Local shutdown
    ClosedLocally,
}

/// MQTT transport errors
#[derive(Debug, Error)]
pub enum MqttError {
    #[error("Connection failed")]
    ConnectionFailed(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("Publishing failed")]
    PublishFailed(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("Invalid broker URL: {0}")]
    InvalidBrokerUrl(String),
    #[error("Not connected - current state: {state:?}")]
    NotConnected { state: ConnectionState },
    #[error("Connection failed: {0}")]
    Handshake(String),
}

/// Determine next state after connection event (pure function)
pub fn determine_next_state(event: ConnectionEvent) -> ConnectionState {
    match event {
        ConnectionEvent::ConnAckReceived => {
            info!("MQTT session established");
            ConnectionState::Connected
        }
        ConnectionEvent::DisconnectedByBroker => {
            info!("MQTT broker closed the session");
            ConnectionState::Disconnected("Broker disconnected".to_string())
        }
        ConnectionEvent::NetworkError(error) => {
            error!("MQTT event loop error: {}", error);
            ConnectionState::Disconnected(error)
        }
        ConnectionEvent::ClosedLocally => {
            ConnectionState::Disconnected("Client disconnected".to_string())
        }
    }
}

/// Check if connection state allows publishing (pure function)
pub fn can_publish(state: &ConnectionState) -> bool {
    matches!(state, ConnectionState::Connected)
}

/// Build the client id for one connection attempt.
/// A fresh id per attempt keeps a stale half-open session from kicking the new one.
pub fn build_client_id(device_id: &str, attempt_millis: i64) -> String {
    format!("vitals-{device_id}-{attempt_millis}")
}

/// Pure function to configure MQTT options from config
pub fn configure_mqtt_options(
    device_id: &str,
    config: &MqttSection,
) -> Result<MqttOptions, MqttError> {
    // Parse broker URL to extract host and port
    let url = Url::parse(&config.broker_url)
        .map_err(|_| MqttError::InvalidBrokerUrl(config.broker_url.clone()))?;

    let secure = match url.scheme() {
        "mqtt" | "tcp" => false,
        "mqtts" | "ssl" => true,
        _ => return Err(MqttError::InvalidBrokerUrl(config.broker_url.clone())),
    };

    let host = url
        .host_str()
        .ok_or_else(|| MqttError::InvalidBrokerUrl(config.broker_url.clone()))?;
    let port = url.port().unwrap_or(if secure { 8883 } else { 1883 });

    let client_id = build_client_id(device_id, chrono::Utc::now().timestamp_millis());
    let mut mqtt_options = MqttOptions::new(client_id, host, port);

    if secure {
        mqtt_options.set_transport(RumqttcTransport::tls_with_default_config());
    }

    if let Some(username_env) = &config.username_env {
        if let Ok(username) = std::env::var(username_env) {
            let password = config
                .password_env
                .as_ref()
                .and_then(|env_name| std::env::var(env_name).ok())
                .unwrap_or_default();
            mqtt_options.set_credentials(&username, &password);
        }
    }

    mqtt_options.set_keep_alive(Duration::from_secs(config.keep_alive_secs.max(5)));
    mqtt_options.set_clean_start(true);

    Ok(mqtt_options)
}
