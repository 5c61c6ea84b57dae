// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

pub mod command;
pub mod events;
pub mod machine;
pub mod policy;
pub mod request;
pub mod response;
pub mod sensor;
pub mod state;
pub mod task;

pub use events::{DeviceEventEmitter, DeviceListener, ListenerId};
pub use machine::{DeviceEvent, DeviceMachine, Effect};
pub use policy::decide;
pub use sensor::{SensorModel, SensorRanges};
pub use state::DeviceState;
pub use task::{run_device_task, DeviceTaskConfig};
