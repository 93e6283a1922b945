//! Threshold evaluation
//!
//! Each alerting sensor kind has one [`ThresholdRule`]. Mass readings are
//! published but never evaluated.
//!
//! Earlier firmware expressed both rules as `value > lower || value < upper`,
//! which holds for every value when `lower < upper`, so every pulse and
//! temperature sample raised an alert. [`BoundaryMode::OutsideRange`] (the
//! default) alerts only outside `[lower, upper]`;
//! [`BoundaryMode::LegacyDisjunction`] keeps the firmware's behaviour for
//! deployments that depend on its alert volume.

use crate::config::ThresholdsSection;
use crate::reading::{Reading, SensorKind};
use serde::{Deserialize, Serialize};

/// How a rule's bounds are applied
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryMode {
    /// Abnormal iff value < lower or value > upper
    #[default]
    OutsideRange,
    /// Abnormal iff value > lower or value < upper
    LegacyDisjunction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Normal,
    Abnormal,
}

/// Fixed bounds for one sensor kind
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdRule {
    pub kind: SensorKind,
    pub lower: f64,
    pub upper: f64,
    pub mode: BoundaryMode,
}

impl ThresholdRule {
    pub fn new(kind: SensorKind, lower: f64, upper: f64, mode: BoundaryMode) -> Self {
        Self {
            kind,
            lower,
            upper,
            mode,
        }
    }

    pub fn classify(&self, value: f64) -> Classification {
        let abnormal = match self.mode {
            BoundaryMode::OutsideRange => value < self.lower || value > self.upper,
            BoundaryMode::LegacyDisjunction => value > self.lower || value < self.upper,
        };
        if abnormal {
            Classification::Abnormal
        } else {
            Classification::Normal
        }
    }
}

/// An alert ready for the notifier
#[derive(Debug, Clone, PartialEq)]
pub struct AlertEvent {
    pub subject: String,
    pub body: String,
    pub triggering_reading: Reading,
}

impl AlertEvent {
    /// Alert text for an abnormal reading; None for kinds that never alert
    pub fn for_reading(reading: &Reading) -> Option<Self> {
        let (subject, body) = match reading.kind() {
            SensorKind::Pulse => (
                "Heart Rate Alert".to_string(),
                format!(
                    "Abnormal heart rate detected.\nPulse Signal: {}",
                    reading.value() as i64
                ),
            ),
            SensorKind::Temperature => (
                "Temperature Alert".to_string(),
                format!(
                    "Abnormal temperature detected.\nTemperature: {:.2}°C",
                    reading.value()
                ),
            ),
            SensorKind::Mass => return None,
        };
        Some(Self {
            subject,
            body,
            triggering_reading: reading.clone(),
        })
    }
}

/// Rule lookup and classification for every reading kind
#[derive(Debug, Clone)]
pub struct AlertEvaluator {
    pulse: ThresholdRule,
    temperature: ThresholdRule,
}

impl AlertEvaluator {
    pub fn new(pulse: ThresholdRule, temperature: ThresholdRule) -> Self {
        Self { pulse, temperature }
    }

    pub fn from_config(config: &ThresholdsSection) -> Self {
        Self::new(
            ThresholdRule::new(
                SensorKind::Pulse,
                config.pulse_lower,
                config.pulse_upper,
                config.mode,
            ),
            ThresholdRule::new(
                SensorKind::Temperature,
                config.temperature_lower,
                config.temperature_upper,
                config.mode,
            ),
        )
    }

    pub fn rule_for(&self, kind: SensorKind) -> Option<&ThresholdRule> {
        match kind {
            SensorKind::Pulse => Some(&self.pulse),
            SensorKind::Temperature => Some(&self.temperature),
            SensorKind::Mass => None,
        }
    }

    /// Normal for kinds without a rule
    pub fn classify(&self, reading: &Reading) -> Classification {
        self.rule_for(reading.kind())
            .map_or(Classification::Normal, |rule| rule.classify(reading.value()))
    }

    /// Build an alert if the reading is abnormal
    pub fn evaluate(&self, reading: &Reading) -> Option<AlertEvent> {
        match self.classify(reading) {
            Classification::Abnormal => AlertEvent::for_reading(reading),
            Classification::Normal => None,
        }
    }
}

impl Default for AlertEvaluator {
    fn default() -> Self {
        Self::from_config(&ThresholdsSection::default())
    }
}
