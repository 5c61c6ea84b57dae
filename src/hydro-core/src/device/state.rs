// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::response::DeviceError;

/// Upper bound of the sensor scale.
pub const READING_MAX: u8 = 100;

/// Who decides the pump state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    /// The operator or the peer drives the pump.
    Manual,
    /// The threshold policy drives the pump.
    Automatic,
}

impl Mode {
    pub fn as_payload(self) -> &'static str {
        match self {
            Self::Manual => "Manual",
            Self::Automatic => "Automatic",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Manual => Self::Automatic,
            Self::Automatic => Self::Manual,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_payload())
    }
}

impl FromStr for Mode {
    type Err = DeviceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "manual" => Ok(Self::Manual),
            "automatic" => Ok(Self::Automatic),
            other => Err(DeviceError::malformed(format!(
                "unknown mode '{other}' (expected Manual or Automatic)"
            ))),
        }
    }
}

/// Pump on/off state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Actuation {
    Active,
    Inactive,
}

impl Actuation {
    pub fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }

    pub fn as_payload(self) -> &'static str {
        match self {
            Self::Active => "on",
            Self::Inactive => "off",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Active => Self::Inactive,
            Self::Inactive => Self::Active,
        }
    }
}

impl From<bool> for Actuation {
    fn from(active: bool) -> Self {
        if active {
            Self::Active
        } else {
            Self::Inactive
        }
    }
}

impl fmt::Display for Actuation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_payload())
    }
}

impl FromStr for Actuation {
    type Err = DeviceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "on" => Ok(Self::Active),
            "off" => Ok(Self::Inactive),
            other => Err(DeviceError::malformed(format!(
                "unknown pump command '{other}' (expected on or off)"
            ))),
        }
    }
}

/// Moisture reading on a 0..=100 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Reading(u8);

impl Reading {
    /// Build a reading, clamping to the sensor scale.
    pub fn clamped(value: i32) -> Self {
        Self(value.clamp(0, READING_MAX as i32) as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn as_payload(self) -> String {
        self.0.to_string()
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Automatic-mode switching band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thresholds {
    low: u8,
    high: u8,
}

impl Thresholds {
    pub fn new(low: u8, high: u8) -> Result<Self, DeviceError> {
        if low > READING_MAX || high > READING_MAX {
            return Err(DeviceError::InvalidThreshold(format!(
                "thresholds must be within 0..={READING_MAX} (got {low}, {high})"
            )));
        }
        if low >= high {
            return Err(DeviceError::InvalidThreshold(format!(
                "low threshold {low} must be below high threshold {high}"
            )));
        }
        Ok(Self { low, high })
    }

    pub fn low(&self) -> u8 {
        self.low
    }

    pub fn high(&self) -> u8 {
        self.high
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self { low: 30, high: 70 }
    }
}

/// Sampling cadence in whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UpdatePeriod(u64);

impl UpdatePeriod {
    pub fn from_secs(secs: u64) -> Result<Self, DeviceError> {
        if secs == 0 {
            return Err(DeviceError::InvalidPeriod(
                "update period must be at least 1 second".into(),
            ));
        }
        Ok(Self(secs))
    }

    pub fn secs(self) -> u64 {
        self.0
    }

    pub fn duration(self) -> Duration {
        Duration::from_secs(self.0)
    }
}

impl Default for UpdatePeriod {
    fn default() -> Self {
        Self(3)
    }
}

/// Mutable device state, owned by the device task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceState {
    pub mode: Mode,
    pub reading: Reading,
    pub actuation: Actuation,
    pub thresholds: Thresholds,
    pub update_period: UpdatePeriod,
}

impl Default for DeviceState {
    fn default() -> Self {
        Self {
            mode: Mode::Manual,
            reading: Reading::clamped(50),
            actuation: Actuation::Inactive,
            thresholds: Thresholds::default(),
            update_period: UpdatePeriod::default(),
        }
    }
}

impl DeviceState {
    pub fn snapshot(&self) -> DeviceSnapshot {
        DeviceSnapshot {
            mode: self.mode,
            reading: self.reading,
            actuation: self.actuation,
            low_threshold: self.thresholds.low(),
            high_threshold: self.thresholds.high(),
            update_period_secs: self.update_period.secs(),
            thresholds_editable: self.mode == Mode::Automatic,
            pump_toggle_enabled: self.mode == Mode::Manual,
        }
    }
}

/// Read-only view of the device handed to operators and observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSnapshot {
    pub mode: Mode,
    pub reading: Reading,
    pub actuation: Actuation,
    pub low_threshold: u8,
    pub high_threshold: u8,
    pub update_period_secs: u64,
    pub thresholds_editable: bool,
    pub pump_toggle_enabled: bool,
}
