//! Sensor acquisition
//!
//! [`SensorSource`] turns raw driver output into [`Reading`]s. The drivers
//! themselves sit behind two small traits so the conversion logic can be
//! exercised without hardware:
//!
//! - [`LoadCell`] - raw signed counts from the load-cell amplifier
//! - [`AnalogInput`] - raw ADC codes from the pulse and temperature sensors
//!
//! Linux IIO sysfs implementations live in [`iio`].

pub mod iio;
pub mod indicator;

use crate::config::SensorsSection;
use crate::reading::Reading;
use thiserror::Error;

pub use iio::IioChannel;
pub use indicator::{HeartbeatIndicator, StatusLed, SysfsLed};

/// Driver-level failures
#[derive(Debug, Error)]
pub enum SensorError {
    #[error("Sensor not available at {path}")]
    NotAvailable { path: String },
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Unexpected value in {path}: {detail}")]
    Parse { path: String, detail: String },
}

/// Raw load-cell sampling
pub trait LoadCell: Send {
    /// One raw conversion from the amplifier
    fn read_raw(&mut self) -> Result<i32, SensorError>;
}

/// Raw ADC sampling
pub trait AnalogInput: Send {
    /// One raw ADC code
    fn read_raw(&mut self) -> Result<u16, SensorError>;
}

/// Load-cell calibration: grams = (average - offset) / scale
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationParameters {
    offset: i64,
    scale: f64,
}

impl CalibrationParameters {
    /// Build from the values printed by the calibration tool.
    ///
    /// The tare offset is a 32-bit amplifier register. Tools print it
    /// unsigned, so a value in `i32::MAX + 1 ..= u32::MAX` is the
    /// two's-complement form of a negative offset (4294798238 is -169058).
    pub fn from_register(offset: i64, scale: f64) -> Self {
        let offset = if offset > i64::from(i32::MAX) && offset <= i64::from(u32::MAX) {
            i64::from(offset as u32 as i32)
        } else {
            offset
        };
        Self { offset, scale }
    }

    pub fn offset(&self) -> i64 {
        self.offset
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Convert an averaged raw value into grams (may be negative)
    pub fn apply(&self, raw_average: f64) -> f64 {
        (raw_average - self.offset as f64) / self.scale
    }
}

/// Linear ADC-to-temperature conversion
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemperatureScale {
    pub reference_voltage: f64,
    pub adc_resolution: u32,
    pub degrees_per_volt: f64,
}

impl Default for TemperatureScale {
    fn default() -> Self {
        Self {
            reference_voltage: 5.0,
            adc_resolution: 1024,
            degrees_per_volt: 100.0,
        }
    }
}

impl TemperatureScale {
    pub fn to_celsius(&self, raw: u16) -> f64 {
        let voltage = f64::from(raw) * (self.reference_voltage / f64::from(self.adc_resolution));
        voltage * self.degrees_per_volt
    }
}

/// The three sensors behind uniform "current reading" operations
pub struct SensorSource {
    load_cell: Box<dyn LoadCell>,
    pulse: Box<dyn AnalogInput>,
    temperature: Box<dyn AnalogInput>,
    calibration: CalibrationParameters,
    mass_samples: u32,
    temperature_scale: TemperatureScale,
}

impl SensorSource {
    pub fn new(
        load_cell: Box<dyn LoadCell>,
        pulse: Box<dyn AnalogInput>,
        temperature: Box<dyn AnalogInput>,
        calibration: CalibrationParameters,
    ) -> Self {
        Self {
            load_cell,
            pulse,
            temperature,
            calibration,
            mass_samples: 20,
            temperature_scale: TemperatureScale::default(),
        }
    }

    /// Wire the sysfs channels named in the configuration
    pub fn from_config(config: &SensorsSection) -> Self {
        Self::new(
            Box::new(IioChannel::new(&config.load_cell_channel)),
            Box::new(IioChannel::new(&config.pulse_channel)),
            Box::new(IioChannel::new(&config.temperature_channel)),
            CalibrationParameters::from_register(
                config.calibration_offset,
                config.calibration_scale,
            ),
        )
        .with_mass_samples(config.mass_samples)
        .with_temperature_scale(TemperatureScale {
            reference_voltage: config.reference_voltage,
            adc_resolution: config.adc_resolution,
            degrees_per_volt: config.degrees_per_volt,
        })
    }

    pub fn with_mass_samples(mut self, samples: u32) -> Self {
        self.mass_samples = samples.max(1);
        self
    }

    pub fn with_temperature_scale(mut self, scale: TemperatureScale) -> Self {
        self.temperature_scale = scale;
        self
    }

    /// Average `mass_samples` raw conversions, calibrate and clamp at zero
    pub fn read_mass(&mut self) -> Result<Reading, SensorError> {
        let mut sum = 0i64;
        for _ in 0..self.mass_samples {
            sum += i64::from(self.load_cell.read_raw()?);
        }
        let average = sum as f64 / f64::from(self.mass_samples);
        Ok(Reading::mass(self.calibration.apply(average)))
    }

    /// Instantaneous signal amplitude
    pub fn read_pulse(&mut self) -> Result<Reading, SensorError> {
        Ok(Reading::pulse(self.pulse.read_raw()?))
    }

    pub fn read_temperature(&mut self) -> Result<Reading, SensorError> {
        let raw = self.temperature.read_raw()?;
        Ok(Reading::temperature(self.temperature_scale.to_celsius(raw)))
    }
}
