// SPDX-License-Identifier: GPL-3.0-only

//! Host temperature sensor
//!
//! Linux exposes SoC temperatures as millidegrees Celsius in
//! `/sys/class/thermal/thermal_zone*/temp`.

use crate::errors::SensorError;
use std::path::{Path, PathBuf};

/// Source of a temperature reading in degrees Celsius
pub trait TemperatureSensor: Send + Sync {
    fn read_celsius(&self) -> Result<f64, SensorError>;
}

/// Sysfs thermal zone reader
#[derive(Debug, Clone)]
pub struct ThermalZoneSensor {
    path: PathBuf,
}

impl ThermalZoneSensor {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TemperatureSensor for ThermalZoneSensor {
    fn read_celsius(&self) -> Result<f64, SensorError> {
        let raw = std::fs::read_to_string(&self.path)
            .map_err(|e| SensorError::Unavailable(format!("{}: {}", self.path.display(), e)))?;
        parse_millidegrees(&raw)
    }
}

fn parse_millidegrees(raw: &str) -> Result<f64, SensorError> {
    let millidegrees: i64 = raw
        .trim()
        .parse()
        .map_err(|_| SensorError::Malformed(raw.trim().to_string()))?;
    Ok(millidegrees as f64 / 1000.0)
}
