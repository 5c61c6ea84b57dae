// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

pub mod bus;
pub mod device;
pub mod peer;
pub mod topics;

pub type DynResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

pub use bus::{BusError, BusResult, Message, MessageBus, MessageHandler};
pub use device::command::DeviceCommand;
pub use device::request::DeviceRequest;
pub use device::response::{DeviceError, DeviceResult};
pub use device::state::{Actuation, DeviceSnapshot, Mode, Reading, Thresholds, UpdatePeriod};
pub use peer::{PeerCoordinator, PeerPolicy};
pub use topics::Topics;
