// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Topic names shared by the device and the peer.

pub const DEFAULT_PREFIX: &str = "iot/device";

/// Resolved topic names for one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    /// Device -> peer: current reading.
    pub sensor: String,
    /// Peer -> device: manual-mode pump override.
    pub response: String,
    /// Both directions: mode assertion.
    pub mode: String,
    /// Device -> anyone: pump state broadcast.
    pub pump: String,
}

impl Topics {
    pub fn with_prefix(prefix: &str) -> Self {
        let prefix = prefix.trim_end_matches('/');
        Self {
            sensor: format!("{prefix}/sensor"),
            response: format!("{prefix}/response"),
            mode: format!("{prefix}/mode"),
            pump: format!("{prefix}/pump"),
        }
    }
}

impl Default for Topics {
    fn default() -> Self {
        Self::with_prefix(DEFAULT_PREFIX)
    }
}
