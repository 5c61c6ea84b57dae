// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

use tracing::{debug, info, warn};

use hydro_core::device::DeviceListener;
use hydro_core::{Actuation, DeviceError, Mode, Reading, Thresholds, UpdatePeriod};

/// Writes device transitions to the log.
pub struct LogListener;

impl DeviceListener for LogListener {
    fn on_reading(&self, reading: Reading) {
        debug!("Moisture reading {}", reading);
    }

    fn on_mode_change(&self, old: Mode, new: Mode) {
        info!("Mode {} -> {}", old, new);
    }

    fn on_actuation_change(&self, old: Actuation, new: Actuation) {
        info!("Pump {} -> {}", old, new);
    }

    fn on_thresholds_change(&self, thresholds: &Thresholds) {
        info!(
            "Thresholds set to low={} high={}",
            thresholds.low(),
            thresholds.high()
        );
    }

    fn on_update_period_change(&self, period: UpdatePeriod) {
        info!("Update period set to {}s", period.secs());
    }

    fn on_rejected(&self, input: &str, error: &DeviceError) {
        warn!("Rejected {}: {}", input, error);
    }
}
