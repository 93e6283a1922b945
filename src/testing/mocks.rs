//! Mock implementations for testing
//!
//! Every mock is `Clone` and clones share state, so a test can hand one copy
//! to the code under test and inspect the other afterwards.

use crate::connectivity::{ConnectivityError, NetworkLink, Sleeper};
use crate::notify::{DeliveryOutcome, EmailTransport};
use crate::sensors::{AnalogInput, LoadCell, SensorError, StatusLed};
use crate::transport::{BrokerSession, ConnectionState, MqttError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // A panicking test thread must not hide the recorded state from the others
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Replays a fixed sequence of raw samples, wrapping around at the end
#[derive(Debug, Clone)]
struct SampleSequence<T> {
    samples: Vec<T>,
    next: usize,
}

impl<T: Copy> SampleSequence<T> {
    fn new(samples: Vec<T>) -> Self {
        Self { samples, next: 0 }
    }

    fn next_sample(&mut self) -> Option<T> {
        let sample = *self.samples.get(self.next % self.samples.len().max(1))?;
        self.next += 1;
        Some(sample)
    }
}

/// Mock load-cell amplifier
#[derive(Debug, Clone)]
pub struct MockLoadCell {
    samples: Arc<Mutex<SampleSequence<i32>>>,
    reads: Arc<Mutex<usize>>,
}

impl MockLoadCell {
    pub fn new(samples: Vec<i32>) -> Self {
        Self {
            samples: Arc::new(Mutex::new(SampleSequence::new(samples))),
            reads: Arc::new(Mutex::new(0)),
        }
    }

    /// A load cell that is never available
    pub fn failing() -> Self {
        Self::new(Vec::new())
    }

    pub fn reads(&self) -> usize {
        *lock(&self.reads)
    }
}

impl LoadCell for MockLoadCell {
    fn read_raw(&mut self) -> Result<i32, SensorError> {
        *lock(&self.reads) += 1;
        lock(&self.samples)
            .next_sample()
            .ok_or_else(|| SensorError::NotAvailable {
                path: "mock-load-cell".to_string(),
            })
    }
}

/// Mock ADC channel
#[derive(Debug, Clone)]
pub struct MockAnalogInput {
    samples: Arc<Mutex<SampleSequence<u16>>>,
}

impl MockAnalogInput {
    pub fn new(samples: Vec<u16>) -> Self {
        Self {
            samples: Arc::new(Mutex::new(SampleSequence::new(samples))),
        }
    }

    /// An ADC channel that is never available
    pub fn failing() -> Self {
        Self::new(Vec::new())
    }
}

impl AnalogInput for MockAnalogInput {
    fn read_raw(&mut self) -> Result<u16, SensorError> {
        lock(&self.samples)
            .next_sample()
            .ok_or_else(|| SensorError::NotAvailable {
                path: "mock-adc".to_string(),
            })
    }
}

/// Mock LED recording every state it was set to
#[derive(Debug, Clone, Default)]
pub struct MockLed {
    states: Arc<Mutex<Vec<bool>>>,
}

impl MockLed {
    pub fn states(&self) -> Vec<bool> {
        lock(&self.states).clone()
    }
}

impl StatusLed for MockLed {
    fn set(&mut self, on: bool) -> Result<(), SensorError> {
        lock(&self.states).push(on);
        Ok(())
    }
}

#[derive(Debug, Default)]
struct LinkState {
    connected: bool,
    failures_left: u32,
    attempts: u32,
}

/// Mock network uplink
#[derive(Debug, Clone, Default)]
pub struct MockNetworkLink {
    state: Arc<Mutex<LinkState>>,
}

impl MockNetworkLink {
    /// Link that is already up
    pub fn connected() -> Self {
        let link = Self::default();
        lock(&link.state).connected = true;
        link
    }

    /// Link that is down and refuses the first `failures` connection attempts
    pub fn failing_times(failures: u32) -> Self {
        let link = Self::default();
        lock(&link.state).failures_left = failures;
        link
    }

    /// Simulate the link dropping; the next attempts fail `failures` times
    pub fn drop_link(&self, failures: u32) {
        let mut state = lock(&self.state);
        state.connected = false;
        state.failures_left = failures;
    }

    /// Connection attempts made so far
    pub fn attempts(&self) -> u32 {
        lock(&self.state).attempts
    }
}

#[async_trait]
impl NetworkLink for MockNetworkLink {
    async fn is_connected(&self) -> bool {
        lock(&self.state).connected
    }

    async fn try_connect(&mut self) -> Result<(), ConnectivityError> {
        let mut state = lock(&self.state);
        state.attempts += 1;
        if state.failures_left > 0 {
            state.failures_left -= 1;
            return Err(ConnectivityError::LinkDown {
                interface: "mock0".to_string(),
            });
        }
        state.connected = true;
        Ok(())
    }
}

#[derive(Debug, Default)]
struct BrokerState {
    connected: bool,
    failures_left: u32,
    connect_attempts: u32,
    published: Vec<(String, String)>,
}

/// Mock broker session recording published messages
#[derive(Debug, Clone, Default)]
pub struct MockBroker {
    state: Arc<Mutex<BrokerState>>,
}

impl MockBroker {
    /// Broker that refuses the first `failures` connection attempts
    pub fn failing_times(failures: u32) -> Self {
        let broker = Self::default();
        lock(&broker.state).failures_left = failures;
        broker
    }

    /// Simulate the broker closing the session
    pub fn drop_connection(&self) {
        lock(&self.state).connected = false;
    }

    pub fn connect_attempts(&self) -> u32 {
        lock(&self.state).connect_attempts
    }

    /// (topic, payload) pairs in publish order
    pub fn published(&self) -> Vec<(String, String)> {
        lock(&self.state).published.clone()
    }
}

#[async_trait]
impl BrokerSession for MockBroker {
    async fn connect(&mut self) -> Result<(), MqttError> {
        let mut state = lock(&self.state);
        state.connect_attempts += 1;
        if state.failures_left > 0 {
            state.failures_left -= 1;
            return Err(MqttError::Handshake("Mock connection refused".to_string()));
        }
        state.connected = true;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), MqttError> {
        lock(&self.state).connected = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        lock(&self.state).connected
    }

    async fn poll(&mut self) -> bool {
        lock(&self.state).connected
    }

    async fn publish(&self, topic: &str, payload: String) -> Result<(), MqttError> {
        let mut state = lock(&self.state);
        if !state.connected {
            return Err(MqttError::NotConnected {
                state: ConnectionState::Disconnected("Mock session closed".to_string()),
            });
        }
        state.published.push((topic.to_string(), payload));
        Ok(())
    }
}

/// Records requested delays and returns immediately
#[derive(Debug, Clone, Default)]
pub struct RecordingSleeper {
    sleeps: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    pub fn sleeps(&self) -> Vec<Duration> {
        lock(&self.sleeps).clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        lock(&self.sleeps).push(duration);
    }
}

/// An email handed to [`MockMailer`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentEmail {
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

/// Mock mail transport; replies with queued outcomes, then `Delivered`
#[derive(Debug, Clone, Default)]
pub struct MockMailer {
    sent: Arc<Mutex<Vec<SentEmail>>>,
    outcomes: Arc<Mutex<VecDeque<DeliveryOutcome>>>,
}

impl MockMailer {
    pub fn with_outcomes(outcomes: Vec<DeliveryOutcome>) -> Self {
        Self {
            sent: Arc::default(),
            outcomes: Arc::new(Mutex::new(outcomes.into())),
        }
    }

    pub fn sent(&self) -> Vec<SentEmail> {
        lock(&self.sent).clone()
    }
}

#[async_trait]
impl EmailTransport for MockMailer {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> DeliveryOutcome {
        lock(&self.sent).push(SentEmail {
            recipient: recipient.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        lock(&self.outcomes)
            .pop_front()
            .unwrap_or(DeliveryOutcome::Delivered)
    }
}
