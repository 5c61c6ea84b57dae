// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Configuration file support for hydro-device.
//!
//! Config is loaded from the `[hydro-device]` section of `hydro-rs.toml`.
//! Default search order:
//! 1. Path specified via `--config` CLI argument
//! 2. `./hydro-rs.toml`
//! 3. `~/.config/hydro-rs/hydro-rs.toml`
//! 4. `/etc/hydro-rs/hydro-rs.toml`

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use hydro_app::{section_toml, validate_log_level, ConfigFile};
use hydro_bus::{parse_broker_url, ExponentialBackoff, TcpBusOptions};
use hydro_core::device::{DeviceState, SensorRanges};
use hydro_core::topics::DEFAULT_PREFIX;
use hydro_core::{Actuation, Mode, Reading, Thresholds, Topics, UpdatePeriod};

/// Top-level device configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub general: GeneralConfig,
    pub broker: BrokerConfig,
    pub topics: TopicsConfig,
    pub device: DeviceSection,
    pub sensor: SensorConfig,
    /// Operator control listener
    pub control: ControlConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: Option<String>,
}

/// Broker connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// Broker address (`host:port`, optionally prefixed with `tcp://`)
    pub url: String,
    /// Timeout for each connection attempt in milliseconds
    pub connect_timeout_ms: u64,
    /// Upper bound of the reconnect delay in milliseconds
    pub reconnect_max_delay_ms: u64,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            url: "tcp://127.0.0.1:7883".to_string(),
            connect_timeout_ms: 5_000,
            reconnect_max_delay_ms: 10_000,
        }
    }
}

impl BrokerConfig {
    pub fn bus_options(&self) -> TcpBusOptions {
        TcpBusOptions {
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            backoff: ExponentialBackoff::new(
                Duration::from_secs(1),
                Duration::from_millis(self.reconnect_max_delay_ms),
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TopicsConfig {
    /// Prefix shared by the sensor, response, mode and pump topics
    pub prefix: String,
}

impl Default for TopicsConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
        }
    }
}

/// Initial device state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceSection {
    pub initial_mode: Mode,
    /// Starting moisture reading (0-100)
    pub initial_reading: u8,
    pub update_period_secs: u64,
    pub low_threshold: u8,
    pub high_threshold: u8,
    /// Fixed sensor seed for reproducible runs (None = random)
    pub seed: Option<u64>,
}

impl Default for DeviceSection {
    fn default() -> Self {
        let thresholds = Thresholds::default();
        Self {
            initial_mode: Mode::Manual,
            initial_reading: 50,
            update_period_secs: UpdatePeriod::default().secs(),
            low_threshold: thresholds.low(),
            high_threshold: thresholds.high(),
            seed: None,
        }
    }
}

/// Per-tick moisture change bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    pub rise_min: u8,
    pub rise_max: u8,
    pub fall_min: u8,
    pub fall_max: u8,
}

impl Default for SensorConfig {
    fn default() -> Self {
        let ranges = SensorRanges::default();
        Self {
            rise_min: *ranges.rise.start(),
            rise_max: *ranges.rise.end(),
            fall_min: *ranges.fall.start(),
            fall_max: *ranges.fall.end(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Whether the listener is enabled
    pub enabled: bool,
    /// IP address to listen on
    pub listen: IpAddr,
    /// TCP port to listen on
    pub port: u16,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            listen: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 7884,
        }
    }
}

impl DeviceConfig {
    pub fn validate(&self) -> Result<(), String> {
        validate_log_level(self.general.log_level.as_deref())?;

        parse_broker_url(&self.broker.url).map_err(|e| format!("[broker].url: {}", e))?;
        if self.broker.connect_timeout_ms == 0 {
            return Err("[broker].connect_timeout_ms must be > 0".to_string());
        }
        if self.broker.reconnect_max_delay_ms < 1_000 {
            return Err("[broker].reconnect_max_delay_ms must be >= 1000".to_string());
        }
        if self.topics.prefix.trim_matches('/').is_empty() {
            return Err("[topics].prefix must not be empty".to_string());
        }

        self.initial_state()?;
        self.sensor_ranges()?;

        if self.control.enabled && self.control.port == 0 {
            return Err("[control].port must be > 0 when the listener is enabled".to_string());
        }
        Ok(())
    }

    pub fn topics(&self) -> Topics {
        Topics::with_prefix(&self.topics.prefix)
    }

    pub fn initial_state(&self) -> Result<DeviceState, String> {
        let device = &self.device;
        if device.initial_reading > 100 {
            return Err("[device].initial_reading must be in range 0..=100".to_string());
        }
        let thresholds = Thresholds::new(device.low_threshold, device.high_threshold)
            .map_err(|e| format!("[device] thresholds: {}", e))?;
        let update_period = UpdatePeriod::from_secs(device.update_period_secs)
            .map_err(|e| format!("[device].update_period_secs: {}", e))?;
        Ok(DeviceState {
            mode: device.initial_mode,
            reading: Reading::clamped(i32::from(device.initial_reading)),
            actuation: Actuation::Inactive,
            thresholds,
            update_period,
        })
    }

    pub fn sensor_ranges(&self) -> Result<SensorRanges, String> {
        let s = &self.sensor;
        SensorRanges::new(s.rise_min..=s.rise_max, s.fall_min..=s.fall_max)
            .map_err(|e| format!("[sensor]: {}", e))
    }

    pub fn example_toml() -> String {
        let example = DeviceConfig {
            general: GeneralConfig {
                log_level: Some("info".to_string()),
            },
            device: DeviceSection {
                seed: Some(42),
                ..DeviceSection::default()
            },
            ..DeviceConfig::default()
        };
        section_toml(Self::section_key(), &example)
    }
}

impl ConfigFile for DeviceConfig {
    fn section_key() -> &'static str {
        "hydro-device"
    }
}
