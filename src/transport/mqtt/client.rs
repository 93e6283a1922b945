//! Impure I/O operations for the MQTT session
//!
//! This module owns the rumqttc client and the spawned task that drives its
//! event loop. The driver reports state through a `watch` channel and stops
//! on the first error; reconnecting is the connectivity manager's decision,
//! not the driver's.

use super::connection::{
    can_publish, configure_mqtt_options, determine_next_state, ConnectionEvent, ConnectionState,
    MqttError,
};
use super::message_handler::{EventRoute, MessageHandler};
use crate::config::MqttSection;
use crate::transport::BrokerSession;
use async_trait::async_trait;
use rumqttc::v5::{mqttbytes::QoS, AsyncClient, EventLoop};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// MQTT broker session for the monitor
pub struct MqttSession {
    device_id: String,
    config: MqttSection,
    client: Option<AsyncClient>,
    state_rx: Option<watch::Receiver<ConnectionState>>,
    event_loop_handle: Option<JoinHandle<()>>,
}

impl MqttSession {
    /// Create an unconnected session; the broker URL is validated here
    pub fn new(device_id: &str, config: MqttSection) -> Result<Self, MqttError> {
        configure_mqtt_options(device_id, &config)?;

        Ok(MqttSession {
            device_id: device_id.to_string(),
            config,
            client: None,
            state_rx: None,
            event_loop_handle: None,
        })
    }

    /// Get current connection state
    /// Returns None if no connection attempt has been made yet
    pub fn connection_state(&self) -> Option<ConnectionState> {
        self.state_rx.as_ref().map(|rx| rx.borrow().clone())
    }

    /// Wait for connection confirmation (ConnAck) with timeout
    async fn wait_for_connection_confirmation(
        mut state_rx: watch::Receiver<ConnectionState>,
        timeout: Duration,
    ) -> Result<(), MqttError> {
        let timeout_result = tokio::time::timeout(timeout, async {
            loop {
                if state_rx.changed().await.is_err() {
                    return Err(MqttError::Handshake("State channel closed".to_string()));
                }
                match *state_rx.borrow() {
                    ConnectionState::Connected => return Ok(()),
                    ConnectionState::Disconnected(ref reason) => {
                        return Err(MqttError::Handshake(reason.clone()));
                    }
                    ConnectionState::Connecting => continue,
                }
            }
        })
        .await;

        match timeout_result {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(MqttError::Handshake(
                "ConnAck timeout - no connection confirmation received".to_string(),
            )),
        }
    }

    /// Poll the event loop until it fails or the broker closes the session
    async fn drive_event_loop(
        mut event_loop: EventLoop,
        state_tx: watch::Sender<ConnectionState>,
        device_id: String,
    ) {
        loop {
            match event_loop.poll().await {
                Ok(event) => match MessageHandler::route_mqtt_event(&event) {
                    EventRoute::ConnectionAcknowledged => {
                        let _ = state_tx.send(determine_next_state(
                            ConnectionEvent::ConnAckReceived,
                        ));
                    }
                    EventRoute::Disconnected => {
                        let _ = state_tx.send(determine_next_state(
                            ConnectionEvent::DisconnectedByBroker,
                        ));
                        break;
                    }
                    EventRoute::LocalDisconnect => {
                        let _ = state_tx.send(determine_next_state(
                            ConnectionEvent::ClosedLocally,
                        ));
                        break;
                    }
                    EventRoute::InfrastructureEvent(event_str) => {
                        debug!(target: "mqtt_transport", "MQTT event: {}", event_str);
                    }
                    EventRoute::OutgoingEvent => {}
                },
                Err(e) => {
                    let _ = state_tx.send(determine_next_state(ConnectionEvent::NetworkError(
                        e.to_string(),
                    )));
                    break;
                }
            }
        }
        debug!(target: "mqtt_transport", "MQTT event loop stopped for device: {}", device_id);
    }

    /// Drop the client and stop the driver task
    fn teardown(&mut self) {
        if let Some(handle) = self.event_loop_handle.take() {
            handle.abort();
        }
        self.client = None;
    }

    fn driver_running(&self) -> bool {
        self.event_loop_handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

#[async_trait]
impl BrokerSession for MqttSession {
    /// One connection attempt: fresh client, fresh driver, wait for ConnAck
    async fn connect(&mut self) -> Result<(), MqttError> {
        self.teardown();

        let mqtt_options = configure_mqtt_options(&self.device_id, &self.config)?;
        let (client, event_loop) = AsyncClient::new(mqtt_options, 10);

        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);
        self.state_rx = Some(state_rx.clone());
        self.event_loop_handle = Some(tokio::spawn(Self::drive_event_loop(
            event_loop,
            state_tx,
            self.device_id.clone(),
        )));

        let timeout = Duration::from_millis(self.config.connect_timeout_ms);
        if let Err(e) = Self::wait_for_connection_confirmation(state_rx, timeout).await {
            self.teardown();
            return Err(e);
        }

        self.client = Some(client);
        info!(broker = %self.config.broker_url, "Connected to MQTT broker");
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), MqttError> {
        let Some(client) = self.client.take() else {
            return Ok(());
        };

        client
            .disconnect()
            .await
            .map_err(|e| MqttError::ConnectionFailed(Box::new(e)))?;

        if let Some(handle) = self.event_loop_handle.take() {
            if tokio::time::timeout(Duration::from_secs(2), handle)
                .await
                .is_err()
            {
                warn!("MQTT event loop didn't stop after disconnect");
            }
        }

        info!("MQTT session closed");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.client.is_some()
            && self.driver_running()
            && self.connection_state().is_some_and(|s| can_publish(&s))
    }

    async fn poll(&mut self) -> bool {
        // Let the driver task flush queued packets and process keep-alives
        tokio::task::yield_now().await;

        let connected = self.is_connected();
        if !connected && self.client.is_some() {
            warn!(state = ?self.connection_state(), "MQTT session lost");
            self.teardown();
        }
        connected
    }

    async fn publish(&self, topic: &str, payload: String) -> Result<(), MqttError> {
        let state = self
            .connection_state()
            .unwrap_or_else(|| ConnectionState::Disconnected("Never connected".to_string()));
        let client = match &self.client {
            Some(client) if can_publish(&state) => client,
            _ => return Err(MqttError::NotConnected { state }),
        };

        // At-most-once: no acknowledgement is tracked
        client
            .publish(topic, QoS::AtMostOnce, false, payload)
            .await
            .map_err(|e| MqttError::PublishFailed(Box::new(e)))
    }
}

impl Drop for MqttSession {
    fn drop(&mut self) {
        // Async disconnect isn't possible here; just stop the driver task
        if let Some(handle) = self.event_loop_handle.take() {
            handle.abort();
        }
    }
}
