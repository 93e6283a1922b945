//! The acquisition cycle
//!
//! [`MonitorLoop`] owns every collaborator and runs one cycle at a time:
//!
//! 1. Poll the broker session, then make sure it is up (once per cycle)
//! 2. Mass: read, publish
//! 3. Pulse: read, publish, drive the heartbeat LED, evaluate, notify
//! 4. Temperature: read, publish, evaluate, notify
//!
//! then idles for the cycle interval. A failed sensor skips only its own
//! reading; an unavailable broker skips publishing but alerts still go out.

use crate::alerts::{AlertEvaluator, AlertEvent};
use crate::config::MonitorConfig;
use crate::connectivity::{
    ConnectionStatus, ConnectivityManager, NetworkLink, RetryPolicy, TokioSleeper, WifiLink,
};
use crate::error::MonitorResult;
use crate::notify::{DeliveryOutcome, EmailTransport, Notifier, SmtpMailer};
use crate::observability::{alert_span, cycle_span};
use crate::publisher::{Publisher, TopicMap};
use crate::reading::{Reading, SensorKind};
use crate::sensors::{HeartbeatIndicator, SensorSource, SysfsLed};
use crate::transport::{BrokerSession, MqttSession};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn, Instrument};

/// An alert raised during a cycle and what became of it
#[derive(Debug, Clone, PartialEq)]
pub struct AlertDelivery {
    pub event: AlertEvent,
    pub outcome: DeliveryOutcome,
}

/// Summary of one cycle
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub cycle: u64,
    /// Whether the broker session was usable for this cycle's publishes
    pub broker_available: bool,
    pub readings: Vec<Reading>,
    pub published: usize,
    pub sensor_failures: Vec<SensorKind>,
    pub alerts: Vec<AlertDelivery>,
}

impl CycleReport {
    fn new(cycle: u64) -> Self {
        Self {
            cycle,
            broker_available: false,
            readings: Vec::new(),
            published: 0,
            sensor_failures: Vec::new(),
            alerts: Vec::new(),
        }
    }

    pub fn reading(&self, kind: SensorKind) -> Option<&Reading> {
        self.readings.iter().find(|r| r.kind() == kind)
    }
}

/// The device's main loop
pub struct MonitorLoop<N, B, E> {
    sensors: SensorSource,
    connectivity: ConnectivityManager<N, B>,
    publisher: Publisher,
    evaluator: AlertEvaluator,
    notifier: Notifier<E>,
    indicator: Option<HeartbeatIndicator>,
    cycle_interval: Duration,
    cycles: u64,
}

impl<N, B, E> MonitorLoop<N, B, E>
where
    N: NetworkLink,
    B: BrokerSession,
    E: EmailTransport,
{
    pub fn new(
        sensors: SensorSource,
        connectivity: ConnectivityManager<N, B>,
        publisher: Publisher,
        evaluator: AlertEvaluator,
        notifier: Notifier<E>,
    ) -> Self {
        Self {
            sensors,
            connectivity,
            publisher,
            evaluator,
            notifier,
            indicator: None,
            cycle_interval: Duration::from_millis(5000),
            cycles: 0,
        }
    }

    pub fn with_indicator(mut self, indicator: HeartbeatIndicator) -> Self {
        self.indicator = Some(indicator);
        self
    }

    pub fn with_cycle_interval(mut self, interval: Duration) -> Self {
        self.cycle_interval = interval;
        self
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Bring up the network, then the broker. Exhausted retries are logged
    /// and left for the first cycle to try again.
    pub async fn start(&mut self) -> ConnectionStatus {
        if let Err(e) = self.connectivity.connect_network().await {
            warn!("Starting without network: {}", e);
        } else if let Err(e) = self.connectivity.connect_broker().await {
            warn!("Starting without MQTT broker: {}", e);
        }
        self.connectivity.status()
    }

    /// Run one full acquisition cycle
    pub async fn run_cycle(&mut self) -> CycleReport {
        self.cycles += 1;
        let span = cycle_span!(cycle = self.cycles);
        self.cycle_inner().instrument(span).await
    }

    async fn cycle_inner(&mut self) -> CycleReport {
        let mut report = CycleReport::new(self.cycles);

        self.connectivity.poll().await;
        report.broker_available = match self.connectivity.ensure_broker().await {
            Ok(_) => true,
            Err(e) => {
                warn!("Publishing skipped this cycle: {}", e);
                false
            }
        };

        if let Some(mass) = self.acquire(SensorKind::Mass, &mut report) {
            self.publish(&mass, &mut report).await;
        }

        if let Some(pulse) = self.acquire(SensorKind::Pulse, &mut report) {
            self.publish(&pulse, &mut report).await;
            if let Some(indicator) = self.indicator.as_mut() {
                indicator.update(&pulse);
            }
            self.evaluate_and_notify(&pulse, &mut report).await;
        }

        if let Some(temperature) = self.acquire(SensorKind::Temperature, &mut report) {
            self.publish(&temperature, &mut report).await;
            self.evaluate_and_notify(&temperature, &mut report).await;
        }

        debug!(
            published = report.published,
            alerts = report.alerts.len(),
            failures = report.sensor_failures.len(),
            "Cycle complete"
        );
        report
    }

    fn acquire(&mut self, kind: SensorKind, report: &mut CycleReport) -> Option<Reading> {
        let result = match kind {
            SensorKind::Mass => self.sensors.read_mass(),
            SensorKind::Pulse => self.sensors.read_pulse(),
            SensorKind::Temperature => self.sensors.read_temperature(),
        };
        match result {
            Ok(reading) => {
                debug!(sensor = %kind, value = reading.value(), "Sampled");
                report.readings.push(reading.clone());
                Some(reading)
            }
            Err(e) => {
                warn!(sensor = %kind, "Reading skipped: {}", e);
                report.sensor_failures.push(kind);
                None
            }
        }
    }

    async fn publish(&self, reading: &Reading, report: &mut CycleReport) {
        if !report.broker_available {
            return;
        }
        match self
            .publisher
            .publish(self.connectivity.broker(), reading)
            .await
        {
            Ok(()) => report.published += 1,
            Err(e) => warn!(sensor = %reading.kind(), "Publish failed: {}", e),
        }
    }

    async fn evaluate_and_notify(&mut self, reading: &Reading, report: &mut CycleReport) {
        let Some(event) = self.evaluator.evaluate(reading) else {
            return;
        };
        info!(sensor = %reading.kind(), value = reading.value(), "Abnormal reading");

        let span = alert_span!(subject = %event.subject);
        let outcome = self
            .notifier
            .notify(&mut self.connectivity, &event)
            .instrument(span)
            .await;
        report.alerts.push(AlertDelivery { event, outcome });
    }

    /// Cycle until `shutdown` resolves. The signal is checked while idling
    /// between cycles, so a cycle in progress always completes.
    pub async fn run<F>(&mut self, shutdown: F) -> u64
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let sleeper = self.connectivity.sleeper();
        info!(interval_ms = self.cycle_interval.as_millis() as u64, "Monitor loop started");

        loop {
            self.run_cycle().await;

            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!(cycles = self.cycles, "Shutdown requested");
                    break;
                }
                _ = sleeper.sleep(self.cycle_interval) => {}
            }
        }
        self.cycles
    }

    /// Close the broker session
    pub async fn shutdown(&mut self) {
        self.connectivity.shutdown().await;
    }
}

/// The monitor wired to real hardware and services
pub type DeviceMonitor = MonitorLoop<WifiLink, MqttSession, SmtpMailer>;

impl DeviceMonitor {
    /// Build every collaborator from configuration. Nothing connects yet.
    pub fn from_config(config: &MonitorConfig) -> MonitorResult<Self> {
        let mut network = WifiLink::new(&config.network.interface);
        if let Some(ssid) = &config.network.ssid {
            network = network.with_credentials(ssid, config.get_network_password());
        }

        let broker = MqttSession::new(&config.device.id, config.mqtt.clone())?;

        let connectivity = ConnectivityManager::new(network, broker, Arc::new(TokioSleeper))
            .with_network_retry(RetryPolicy::fixed(
                config.network.retry_interval_ms,
                config.network.max_attempts,
            ))
            .with_broker_retry(RetryPolicy::fixed(
                config.mqtt.retry_interval_ms,
                config.mqtt.max_attempts,
            ));

        let mailer = SmtpMailer::from_config(&config.email, config.get_smtp_credentials()?)?;

        let mut monitor = MonitorLoop::new(
            SensorSource::from_config(&config.sensors),
            connectivity,
            Publisher::new(TopicMap::from(&config.topics)),
            AlertEvaluator::from_config(&config.thresholds),
            Notifier::new(mailer, &config.email.recipient),
        )
        .with_cycle_interval(Duration::from_millis(config.schedule.cycle_interval_ms));

        if let Some(led) = &config.sensors.pulse_indicator_led {
            monitor = monitor.with_indicator(HeartbeatIndicator::new(
                Box::new(SysfsLed::new(led)),
                config.sensors.heartbeat_threshold,
            ));
        }

        Ok(monitor)
    }
}
