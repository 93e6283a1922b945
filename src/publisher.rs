//! Reading publication
//!
//! Each sensor kind maps to one fixed topic. Payloads are short human
//! readable strings (`Weight: 293.51 g`), not JSON; downstream dashboards
//! parse them as-is.

use crate::config::TopicsSection;
use crate::reading::{Reading, SensorKind};
use crate::transport::{BrokerSession, MqttError};
use tracing::debug;

/// Topic per sensor kind
#[derive(Debug, Clone, PartialEq)]
pub struct TopicMap {
    weight: String,
    pulse: String,
    temperature: String,
}

impl TopicMap {
    pub fn new(
        weight: impl Into<String>,
        pulse: impl Into<String>,
        temperature: impl Into<String>,
    ) -> Self {
        Self {
            weight: weight.into(),
            pulse: pulse.into(),
            temperature: temperature.into(),
        }
    }

    pub fn topic_for(&self, kind: SensorKind) -> &str {
        match kind {
            SensorKind::Mass => &self.weight,
            SensorKind::Pulse => &self.pulse,
            SensorKind::Temperature => &self.temperature,
        }
    }
}

impl From<&TopicsSection> for TopicMap {
    fn from(topics: &TopicsSection) -> Self {
        Self::new(&topics.weight, &topics.pulse, &topics.temperature)
    }
}

impl Default for TopicMap {
    fn default() -> Self {
        Self::from(&TopicsSection::default())
    }
}

/// Render a reading as its wire payload
pub fn format_payload(reading: &Reading) -> String {
    match reading.kind() {
        SensorKind::Mass => format!("Weight: {:.2} {}", reading.value(), SensorKind::Mass.unit()),
        SensorKind::Pulse => format!("Pulse Signal: {}", reading.value() as i64),
        SensorKind::Temperature => format!(
            "Temperature: {:.2} {}",
            reading.value(),
            SensorKind::Temperature.unit()
        ),
    }
}

/// Formats readings and hands them to a broker session
#[derive(Debug, Clone, Default)]
pub struct Publisher {
    topics: TopicMap,
}

impl Publisher {
    pub fn new(topics: TopicMap) -> Self {
        Self { topics }
    }

    /// Publish one reading at-most-once. Fails only if the session refuses it.
    pub async fn publish<B: BrokerSession + ?Sized>(
        &self,
        session: &B,
        reading: &Reading,
    ) -> Result<(), MqttError> {
        let topic = self.topics.topic_for(reading.kind());
        let payload = format_payload(reading);
        debug!(topic, payload = %payload, "Publishing reading");
        session.publish(topic, payload).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockBroker;

    #[test]
    fn test_payload_formats() {
        assert_eq!(format_payload(&Reading::mass(293.509)), "Weight: 293.51 g");
        assert_eq!(format_payload(&Reading::mass(-4.0)), "Weight: 0.00 g");
        assert_eq!(format_payload(&Reading::pulse(550)), "Pulse Signal: 550");
        assert_eq!(format_payload(&Reading::pulse(0)), "Pulse Signal: 0");
        assert_eq!(
            format_payload(&Reading::temperature(23.4375)),
            "Temperature: 23.44 C"
        );
        assert_eq!(
            format_payload(&Reading::temperature(-5.5)),
            "Temperature: -5.50 C"
        );
    }

    #[test]
    fn test_default_topics() {
        let topics = TopicMap::default();
        assert_eq!(topics.topic_for(SensorKind::Mass), "device/weight");
        assert_eq!(topics.topic_for(SensorKind::Pulse), "device/pulse");
        assert_eq!(
            topics.topic_for(SensorKind::Temperature),
            "device/temperature"
        );
    }

    #[tokio::test]
    async fn test_publish_routes_by_kind() {
        let mut broker = MockBroker::default();
        broker.connect().await.unwrap();
        let publisher = Publisher::new(TopicMap::new("w", "p", "t"));

        publisher.publish(&broker, &Reading::pulse(72)).await.unwrap();
        publisher
            .publish(&broker, &Reading::temperature(36.6))
            .await
            .unwrap();

        assert_eq!(
            broker.published(),
            vec![
                ("p".to_string(), "Pulse Signal: 72".to_string()),
                ("t".to_string(), "Temperature: 36.60 C".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_publish_without_session_fails() {
        let broker = MockBroker::default();
        let result = Publisher::default()
            .publish(&broker, &Reading::mass(1.0))
            .await;
        assert!(matches!(result, Err(MqttError::NotConnected { .. })));
        assert!(broker.published().is_empty());
    }
}
