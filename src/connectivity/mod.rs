//! Network link and broker session management
//!
//! [`ConnectivityManager`] owns both links and is the only place their state
//! changes. Every network-dependent step calls one of the `ensure_*`
//! operations first, because either link may have dropped since the last
//! cycle and loss is only noticed when checked.
//!
//! Retries follow a [`RetryPolicy`] and sleep through an injected
//! [`Sleeper`], so an unreachable network can be given up on (or waited on
//! forever with `max_attempts = None`) and tests never wait in real time.

pub mod network;
pub mod retry;

use crate::transport::{BrokerSession, MqttError};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

pub use network::WifiLink;
pub use retry::RetryPolicy;

/// Which link a retry loop was working on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkTarget {
    Network,
    Broker,
}

impl fmt::Display for LinkTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkTarget::Network => write!(f, "network"),
            LinkTarget::Broker => write!(f, "broker"),
        }
    }
}

/// Connectivity errors
#[derive(Debug, Error)]
pub enum ConnectivityError {
    #[error("Network link {interface} is down")]
    LinkDown { interface: String },
    #[error("Gave up connecting to {target} after {attempts} attempts")]
    RetriesExhausted { target: LinkTarget, attempts: u32 },
    #[error("Broker session error: {0}")]
    Broker(#[from] MqttError),
}

/// Last observed state of both links
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectionStatus {
    pub network_connected: bool,
    pub broker_connected: bool,
}

/// The device's network uplink
#[async_trait]
pub trait NetworkLink: Send + Sync {
    /// Current link state
    async fn is_connected(&self) -> bool;

    /// One connection attempt; Ok once the link reports connected
    async fn try_connect(&mut self) -> Result<(), ConnectivityError>;
}

/// Sleep abstraction for retry delays and the cycle idle
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real-time sleeper backed by tokio's timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Owns the network link and broker session
pub struct ConnectivityManager<N, B> {
    network: N,
    broker: B,
    network_retry: RetryPolicy,
    broker_retry: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
    status: ConnectionStatus,
}

impl<N, B> ConnectivityManager<N, B>
where
    N: NetworkLink,
    B: BrokerSession,
{
    /// Defaults: network checked every 500 ms, broker every 1000 ms, no attempt limit
    pub fn new(network: N, broker: B, sleeper: Arc<dyn Sleeper>) -> Self {
        Self {
            network,
            broker,
            network_retry: RetryPolicy::fixed(500, None),
            broker_retry: RetryPolicy::fixed(1000, None),
            sleeper,
            status: ConnectionStatus::default(),
        }
    }

    pub fn with_network_retry(mut self, policy: RetryPolicy) -> Self {
        self.network_retry = policy;
        self
    }

    pub fn with_broker_retry(mut self, policy: RetryPolicy) -> Self {
        self.broker_retry = policy;
        self
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn broker(&self) -> &B {
        &self.broker
    }

    pub fn sleeper(&self) -> Arc<dyn Sleeper> {
        Arc::clone(&self.sleeper)
    }

    /// Retry until the link reports connected. Returns the number of attempts made.
    pub async fn connect_network(&mut self) -> Result<u32, ConnectivityError> {
        info!("Connecting to network...");
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            match self.network.try_connect().await {
                Ok(()) => {
                    self.status.network_connected = true;
                    info!(attempts, "Connected to network");
                    return Ok(attempts);
                }
                Err(e) => {
                    self.status.network_connected = false;
                    debug!(attempt = attempts, "Network not ready: {}", e);
                    if !self.network_retry.allows(attempts) {
                        warn!(attempts, "Giving up on network for now");
                        return Err(ConnectivityError::RetriesExhausted {
                            target: LinkTarget::Network,
                            attempts,
                        });
                    }
                    self.sleeper.sleep(self.network_retry.delay()).await;
                }
            }
        }
    }

    /// Retry until the broker session is established. Returns the number of attempts made.
    pub async fn connect_broker(&mut self) -> Result<u32, ConnectivityError> {
        info!("Connecting to MQTT broker...");
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            match self.broker.connect().await {
                Ok(()) => {
                    self.status.broker_connected = true;
                    info!(attempts, "Connected to MQTT broker");
                    return Ok(attempts);
                }
                Err(e) => {
                    self.status.broker_connected = false;
                    debug!(attempt = attempts, "Broker connection failed: {}", e);
                    if !self.broker_retry.allows(attempts) {
                        warn!(attempts, "Giving up on broker for now");
                        return Err(ConnectivityError::RetriesExhausted {
                            target: LinkTarget::Broker,
                            attempts,
                        });
                    }
                    self.sleeper.sleep(self.broker_retry.delay()).await;
                }
            }
        }
    }

    /// Reconnect the network only if it is down. Returns the attempts made (0 if already up).
    pub async fn ensure_network(&mut self) -> Result<u32, ConnectivityError> {
        if self.network.is_connected().await {
            self.status.network_connected = true;
            return Ok(0);
        }
        warn!("Network link down, reconnecting");
        self.status.network_connected = false;
        self.connect_network().await
    }

    /// Make sure the broker session is usable, restoring the network first if needed
    pub async fn ensure_broker(&mut self) -> Result<u32, ConnectivityError> {
        if self.broker.is_connected() {
            self.status.broker_connected = true;
            return Ok(0);
        }
        self.status.broker_connected = false;
        self.ensure_network().await?;
        self.connect_broker().await
    }

    /// Keep-alive pass over the broker session
    pub async fn poll(&mut self) -> bool {
        let up = self.broker.poll().await;
        self.status.broker_connected = up;
        up
    }

    /// Close the broker session
    pub async fn shutdown(&mut self) {
        if let Err(e) = self.broker.disconnect().await {
            warn!("Error closing MQTT session: {}", e);
        }
        self.status.broker_connected = false;
    }
}
