// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

use tokio::sync::oneshot;

use crate::{DeviceCommand, DeviceResult, DeviceSnapshot};

/// Request sent to the device task.
#[derive(Debug)]
pub struct DeviceRequest {
    pub cmd: DeviceCommand,
    pub respond_to: oneshot::Sender<DeviceResult<DeviceSnapshot>>,
}
