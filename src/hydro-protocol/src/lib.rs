// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Wire formats for hydro-rs.
//!
//! Two JSON-lines protocols live here: the broker protocol spoken between
//! bus clients and the broker, and the operator control protocol served by
//! the device.

pub mod codec;
pub mod mapping;
pub mod types;

pub use codec::{encode_line, parse_control, parse_frame, MAX_LINE_BYTES};
pub use mapping::control_command_to_device;
pub use types::{ControlCommand, ControlResponse, Frame};
