// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Mapping between control DTOs and device commands.

use hydro_core::{DeviceCommand, DeviceResult, Mode};

use crate::types::ControlCommand;

/// Convert a ControlCommand to a DeviceCommand, parsing the mode string.
pub fn control_command_to_device(cmd: ControlCommand) -> DeviceResult<DeviceCommand> {
    Ok(match cmd {
        ControlCommand::GetState => DeviceCommand::GetSnapshot,
        ControlCommand::SetMode { mode } => DeviceCommand::SetMode(mode.parse::<Mode>()?),
        ControlCommand::TogglePump => DeviceCommand::TogglePump,
        ControlCommand::SetUpdatePeriod { secs } => DeviceCommand::SetUpdatePeriod(secs),
        ControlCommand::SetThresholds { low, high } => DeviceCommand::SetThresholds { low, high },
    })
}
