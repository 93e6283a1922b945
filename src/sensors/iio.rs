//! Linux IIO sysfs channels
//!
//! ADC and load-cell amplifier drivers (e.g. `hx711`, `mcp3008`) expose each
//! channel as a file such as `/sys/bus/iio/devices/iio:device0/in_voltage0_raw`
//! containing one integer per read. Conversion is performed by the kernel
//! driver on every read.

use super::{AnalogInput, LoadCell, SensorError};
use std::path::{Path, PathBuf};

/// One raw IIO channel file
#[derive(Debug, Clone)]
pub struct IioChannel {
    path: PathBuf,
}

impl IioChannel {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_integer(&self) -> Result<i64, SensorError> {
        let content = read_sysfs_file(&self.path)?;
        content.parse::<i64>().map_err(|_| SensorError::Parse {
            path: self.path.display().to_string(),
            detail: format!("expected integer, got '{content}'"),
        })
    }
}

impl LoadCell for IioChannel {
    fn read_raw(&mut self) -> Result<i32, SensorError> {
        let value = self.read_integer()?;
        i32::try_from(value).map_err(|_| SensorError::Parse {
            path: self.path.display().to_string(),
            detail: format!("{value} does not fit a 32-bit conversion"),
        })
    }
}

impl AnalogInput for IioChannel {
    fn read_raw(&mut self) -> Result<u16, SensorError> {
        let value = self.read_integer()?;
        u16::try_from(value).map_err(|_| SensorError::Parse {
            path: self.path.display().to_string(),
            detail: format!("{value} is not a valid ADC code"),
        })
    }
}

/// Reads a sysfs file and returns its trimmed content.
pub(crate) fn read_sysfs_file(path: &Path) -> Result<String, SensorError> {
    if !path.exists() {
        return Err(SensorError::NotAvailable {
            path: path.display().to_string(),
        });
    }
    std::fs::read_to_string(path)
        .map(|s| s.trim().to_string())
        .map_err(|e| SensorError::Read {
            path: path.display().to_string(),
            source: e,
        })
}
