// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Transport DTOs for the JSON line protocols.

use serde::{Deserialize, Serialize};

use hydro_core::DeviceSnapshot;

/// Broker protocol frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Frame {
    /// Client -> broker.
    Subscribe { filter: String },
    /// Client -> broker.
    Unsubscribe { filter: String },
    /// Client -> broker.
    Publish { topic: String, payload: String },
    /// Broker -> client, for each matching subscription.
    Deliver { topic: String, payload: String },
}

/// Operator command received on the device control listener.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum ControlCommand {
    GetState,
    SetMode { mode: String },
    TogglePump,
    SetUpdatePeriod { secs: u64 },
    SetThresholds { low: u8, high: u8 },
}

/// Response sent to operators over TCP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlResponse {
    pub success: bool,
    pub state: Option<DeviceSnapshot>,
    pub error: Option<String>,
}

impl ControlResponse {
    pub fn ok(state: DeviceSnapshot) -> Self {
        Self {
            success: true,
            state: Some(state),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            state: None,
            error: Some(message.into()),
        }
    }
}
