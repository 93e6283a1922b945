//! Sensor readings
//!
//! A [`Reading`] is produced once per cycle per sensor kind, published,
//! evaluated and then dropped. Nothing is persisted.

use chrono::{DateTime, Utc};
use std::fmt;

/// The three sensors sampled each cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorKind {
    /// Load cell, grams
    Mass,
    /// Raw pulse sensor amplitude (not beats per minute)
    Pulse,
    /// Ambient temperature, degrees Celsius
    Temperature,
}

impl SensorKind {
    /// Unit suffix used when rendering a value of this kind
    pub fn unit(&self) -> &'static str {
        match self {
            SensorKind::Mass => "g",
            SensorKind::Pulse => "",
            SensorKind::Temperature => "C",
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorKind::Mass => write!(f, "mass"),
            SensorKind::Pulse => write!(f, "pulse"),
            SensorKind::Temperature => write!(f, "temperature"),
        }
    }
}

/// A single immutable sample
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    kind: SensorKind,
    value: f64,
    taken_at: DateTime<Utc>,
}

impl Reading {
    /// Mass reading; negative values are clamped to zero
    pub fn mass(grams: f64) -> Self {
        // NaN and -0.0 also become 0.0
        let grams = if grams > 0.0 { grams } else { 0.0 };
        Self::new(SensorKind::Mass, grams)
    }

    pub fn pulse(signal: u16) -> Self {
        Self::new(SensorKind::Pulse, f64::from(signal))
    }

    pub fn temperature(celsius: f64) -> Self {
        Self::new(SensorKind::Temperature, celsius)
    }

    fn new(kind: SensorKind, value: f64) -> Self {
        Self {
            kind,
            value,
            taken_at: Utc::now(),
        }
    }

    pub fn kind(&self) -> SensorKind {
        self.kind
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn taken_at(&self) -> DateTime<Utc> {
        self.taken_at
    }
}
