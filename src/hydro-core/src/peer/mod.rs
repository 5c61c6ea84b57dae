// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Peer coordinator.
//!
//! The peer keeps its own belief of the device mode. While it believes the
//! device is in Manual mode it answers sensor readings with pump overrides.
//! Its belief is reconciled with the device only through mode messages.

pub mod task;

use crate::device::response::{DeviceError, DeviceResult};
use crate::device::state::{Actuation, Mode};

pub use task::{run_peer_task, PeerTaskConfig};

/// Reading limits the peer reacts to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeerPolicy {
    /// Request the pump on below this reading.
    pub pump_on_below: f64,
    /// Request the pump off above this reading.
    pub pump_off_above: f64,
}

impl PeerPolicy {
    pub fn new(pump_on_below: f64, pump_off_above: f64) -> DeviceResult<Self> {
        if !pump_on_below.is_finite() || !pump_off_above.is_finite() {
            return Err(DeviceError::InvalidThreshold(
                "peer limits must be finite".into(),
            ));
        }
        if pump_on_below > pump_off_above {
            return Err(DeviceError::InvalidThreshold(format!(
                "pump_on_below {pump_on_below} must not exceed pump_off_above {pump_off_above}"
            )));
        }
        Ok(Self {
            pump_on_below,
            pump_off_above,
        })
    }

    pub fn decide(&self, reading: f64) -> Option<Actuation> {
        if reading > self.pump_off_above {
            Some(Actuation::Inactive)
        } else if reading < self.pump_on_below {
            Some(Actuation::Active)
        } else {
            None
        }
    }
}

impl Default for PeerPolicy {
    fn default() -> Self {
        Self {
            pump_on_below: 60.0,
            pump_off_above: 90.0,
        }
    }
}

/// Peer-side state machine. Performs no I/O.
#[derive(Debug, Clone)]
pub struct PeerCoordinator {
    belief: Mode,
    policy: PeerPolicy,
    follow_remote_mode: bool,
}

impl PeerCoordinator {
    pub fn new(initial: Mode, policy: PeerPolicy, follow_remote_mode: bool) -> Self {
        Self {
            belief: initial,
            policy,
            follow_remote_mode,
        }
    }

    pub fn belief(&self) -> Mode {
        self.belief
    }

    /// Handle a sensor payload. Returns the override to publish, if any.
    pub fn on_reading(&self, payload: &str) -> DeviceResult<Option<Actuation>> {
        let reading = parse_reading(payload)?;
        if self.belief != Mode::Manual {
            return Ok(None);
        }
        Ok(self.policy.decide(reading))
    }

    /// Handle a mode payload. Returns true when the belief changed.
    pub fn on_mode(&mut self, payload: &str) -> DeviceResult<bool> {
        let mode: Mode = payload.parse()?;
        if !self.follow_remote_mode || mode == self.belief {
            return Ok(false);
        }
        self.belief = mode;
        Ok(true)
    }

    /// Flip the belief on the scheduler's behalf and return the new value.
    pub fn toggle(&mut self) -> Mode {
        self.belief = self.belief.toggled();
        self.belief
    }
}

fn parse_reading(payload: &str) -> DeviceResult<f64> {
    let trimmed = payload.trim();
    let value: f64 = trimmed
        .parse()
        .map_err(|_| DeviceError::malformed(format!("reading '{}' is not a number", trimmed)))?;
    if !value.is_finite() {
        return Err(DeviceError::malformed(format!(
            "reading '{}' is not finite",
            payload.trim()
        )));
    }
    Ok(value)
}
