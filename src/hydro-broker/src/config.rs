// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Configuration file support for hydro-broker.
//!
//! Config is loaded from the `[hydro-broker]` section of `hydro-rs.toml`.
//! Default search order:
//! 1. Path specified via `--config` CLI argument
//! 2. `./hydro-rs.toml`
//! 3. `~/.config/hydro-rs/hydro-rs.toml`
//! 4. `/etc/hydro-rs/hydro-rs.toml`

use std::net::{IpAddr, Ipv4Addr};

use serde::{Deserialize, Serialize};

use hydro_app::{section_toml, validate_log_level, ConfigFile};
use hydro_bus::DEFAULT_BROKER_PORT;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    pub general: GeneralConfig,
    pub listen: ListenConfig,
    pub limits: LimitsConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenConfig {
    /// IP address to listen on
    pub listen: IpAddr,
    /// TCP port to listen on
    pub port: u16,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            listen: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: DEFAULT_BROKER_PORT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Messages buffered per client before new ones are dropped
    pub client_queue: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self { client_queue: 256 }
    }
}

impl BrokerConfig {
    pub fn validate(&self) -> Result<(), String> {
        validate_log_level(self.general.log_level.as_deref())?;
        if self.listen.port == 0 {
            return Err("[listen].port must be > 0".to_string());
        }
        if self.limits.client_queue == 0 {
            return Err("[limits].client_queue must be > 0".to_string());
        }
        Ok(())
    }

    pub fn example_toml() -> String {
        let example = BrokerConfig {
            general: GeneralConfig {
                log_level: Some("info".to_string()),
            },
            ..BrokerConfig::default()
        };
        section_toml(Self::section_key(), &example)
    }
}

impl ConfigFile for BrokerConfig {
    fn section_key() -> &'static str {
        "hydro-broker"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BrokerConfig::default();
        assert_eq!(config.listen.listen, IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert_eq!(config.listen.port, 7883);
        assert_eq!(config.limits.client_queue, 256);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_toml() {
        let toml_str = r#"
[general]
log_level = "debug"

[listen]
listen = "0.0.0.0"
port = 1883

[limits]
client_queue = 32
"#;
        let config: BrokerConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.general.log_level.as_deref(), Some("debug"));
        assert_eq!(config.listen.listen, IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        assert_eq!(config.listen.port, 1883);
        assert_eq!(config.limits.client_queue, 32);
    }

    #[test]
    fn test_validate_rejects_zero_queue() {
        let mut config = BrokerConfig::default();
        config.limits.client_queue = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_example_toml_parses() {
        let example = BrokerConfig::example_toml();
        let table: toml::Table = toml::from_str(&example).unwrap();
        let section = table.get("hydro-broker").unwrap().clone();
        let config: BrokerConfig = section.try_into().unwrap();
        assert!(config.validate().is_ok());
    }
}
