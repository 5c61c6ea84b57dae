// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

use crate::device::state::Mode;

/// Operator command handled by the device task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceCommand {
    GetSnapshot,
    SetMode(Mode),
    TogglePump,
    SetUpdatePeriod(u64),
    SetThresholds { low: u8, high: u8 },
}
