// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Configuration file support for hydro-peer.
//!
//! Config is loaded from the `[hydro-peer]` section of `hydro-rs.toml`,
//! using the same search order as the other hydro binaries.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use hydro_app::{section_toml, validate_log_level, ConfigFile};
use hydro_bus::{parse_broker_url, ExponentialBackoff, TcpBusOptions};
use hydro_core::peer::PeerTaskConfig;
use hydro_core::topics::DEFAULT_PREFIX;
use hydro_core::{Mode, PeerPolicy, Topics};

/// One week.
const MAX_SWITCH_INTERVAL_SECS: u64 = 7 * 86_400;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PeerConfig {
    pub general: GeneralConfig,
    pub broker: BrokerConfig,
    pub topics: TopicsConfig,
    pub peer: PeerSection,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    pub url: String,
    pub connect_timeout_ms: u64,
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

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TopicsConfig {
    pub prefix: String,
}

impl Default for TopicsConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PeerSection {
    /// Mode the peer believes the device starts in
    pub initial_mode: Mode,
    /// Seconds between belief switches
    pub mode_switch_interval_secs: u64,
    /// Request the pump on below this reading
    pub pump_on_below: f64,
    /// Request the pump off above this reading
    pub pump_off_above: f64,
    /// Adopt mode assertions seen on the mode topic
    pub follow_remote_mode: bool,
}

impl Default for PeerSection {
    fn default() -> Self {
        let policy = PeerPolicy::default();
        Self {
            initial_mode: Mode::Manual,
            mode_switch_interval_secs: 20,
            pump_on_below: policy.pump_on_below,
            pump_off_above: policy.pump_off_above,
            follow_remote_mode: true,
        }
    }
}

impl PeerConfig {
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
        if !(1..=MAX_SWITCH_INTERVAL_SECS).contains(&self.peer.mode_switch_interval_secs) {
            return Err(format!(
                "[peer].mode_switch_interval_secs must be in 1..={}",
                MAX_SWITCH_INTERVAL_SECS
            ));
        }
        self.policy()?;
        Ok(())
    }

    pub fn policy(&self) -> Result<PeerPolicy, String> {
        PeerPolicy::new(self.peer.pump_on_below, self.peer.pump_off_above)
            .map_err(|e| format!("[peer]: {}", e))
    }

    pub fn bus_options(&self) -> TcpBusOptions {
        TcpBusOptions {
            connect_timeout: Duration::from_millis(self.broker.connect_timeout_ms),
            backoff: ExponentialBackoff::new(
                Duration::from_secs(1),
                Duration::from_millis(self.broker.reconnect_max_delay_ms),
            ),
        }
    }

    pub fn task_config(&self) -> Result<PeerTaskConfig, String> {
        Ok(PeerTaskConfig {
            topics: Topics::with_prefix(&self.topics.prefix),
            initial_mode: self.peer.initial_mode,
            switch_interval: Duration::from_secs(self.peer.mode_switch_interval_secs),
            policy: self.policy()?,
            follow_remote_mode: self.peer.follow_remote_mode,
            ..PeerTaskConfig::default()
        })
    }

    pub fn example_toml() -> String {
        let example = PeerConfig {
            general: GeneralConfig {
                log_level: Some("info".to_string()),
            },
            ..PeerConfig::default()
        };
        section_toml(Self::section_key(), &example)
    }
}

impl ConfigFile for PeerConfig {
    fn section_key() -> &'static str {
        "hydro-peer"
    }
}
