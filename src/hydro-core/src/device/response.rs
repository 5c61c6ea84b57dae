// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

use serde::Serialize;
use thiserror::Error;

/// Error type returned by device operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
pub enum DeviceError {
    /// Inbound payload could not be decoded.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
    #[error("invalid threshold: {0}")]
    InvalidThreshold(String),
    #[error("invalid update period: {0}")]
    InvalidPeriod(String),
    /// Operation is not allowed in the current mode.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// The device task is gone.
    #[error("device task unavailable")]
    Unavailable,
}

impl DeviceError {
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedPayload(message.into())
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }
}

pub type DeviceResult<T> = Result<T, DeviceError>;
