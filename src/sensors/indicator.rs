//! Heartbeat LED
//!
//! The LED is lit while the pulse signal is above the heartbeat threshold,
//! giving a visible beat on the device itself.

use super::SensorError;
use crate::reading::{Reading, SensorKind};
use std::path::PathBuf;
use tracing::warn;

/// A single on/off output
pub trait StatusLed: Send {
    fn set(&mut self, on: bool) -> Result<(), SensorError>;
}

/// LED class device, e.g. `/sys/class/leds/led0/brightness`
#[derive(Debug, Clone)]
pub struct SysfsLed {
    brightness: PathBuf,
}

impl SysfsLed {
    pub fn new(brightness: impl Into<PathBuf>) -> Self {
        Self {
            brightness: brightness.into(),
        }
    }
}

impl StatusLed for SysfsLed {
    fn set(&mut self, on: bool) -> Result<(), SensorError> {
        std::fs::write(&self.brightness, if on { "1" } else { "0" }).map_err(|e| {
            SensorError::Write {
                path: self.brightness.display().to_string(),
                source: e,
            }
        })
    }
}

/// Mirrors pulse readings onto a [`StatusLed`]
pub struct HeartbeatIndicator {
    led: Box<dyn StatusLed>,
    threshold: f64,
}

impl HeartbeatIndicator {
    pub fn new(led: Box<dyn StatusLed>, threshold: f64) -> Self {
        Self { led, threshold }
    }

    /// Update the LED from a pulse reading and return whether it is lit.
    /// Other reading kinds leave the LED untouched.
    pub fn update(&mut self, reading: &Reading) -> Option<bool> {
        if reading.kind() != SensorKind::Pulse {
            return None;
        }
        let lit = reading.value() > self.threshold;
        if let Err(e) = self.led.set(lit) {
            warn!("Failed to drive heartbeat LED: {}", e);
        }
        Some(lit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockLed;

    #[test]
    fn test_lit_only_above_threshold() {
        let led = MockLed::default();
        let mut indicator = HeartbeatIndicator::new(Box::new(led.clone()), 550.0);

        assert_eq!(indicator.update(&Reading::pulse(551)), Some(true));
        assert_eq!(indicator.update(&Reading::pulse(550)), Some(false));
        assert_eq!(indicator.update(&Reading::pulse(12)), Some(false));
        assert_eq!(led.states(), vec![true, false, false]);
    }

    #[test]
    fn test_ignores_other_kinds() {
        let led = MockLed::default();
        let mut indicator = HeartbeatIndicator::new(Box::new(led.clone()), 550.0);

        assert_eq!(indicator.update(&Reading::temperature(600.0)), None);
        assert!(led.states().is_empty());
    }

    #[test]
    fn test_sysfs_led_writes_brightness() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut led = SysfsLed::new(file.path());

        led.set(true).unwrap();
        assert_eq!(std::fs::read_to_string(file.path()).unwrap(), "1");
        led.set(false).unwrap();
        assert_eq!(std::fs::read_to_string(file.path()).unwrap(), "0");
    }
}
