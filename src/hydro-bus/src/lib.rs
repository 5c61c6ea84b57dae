// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Messaging transports for hydro-rs.
//!
//! [`LocalHub`] connects sessions inside one process. [`TcpBus`] talks to a
//! broker started with [`run_broker`]. Both route through the same
//! [`Router`], so delivery order and filter semantics are identical.

pub mod backoff;
pub mod broker;
pub mod endpoint;
mod handlers;
pub mod io;
pub mod local;
pub mod router;
pub mod tcp;

pub use backoff::ExponentialBackoff;
pub use broker::{run_broker, BrokerOptions};
pub use endpoint::{parse_broker_url, BrokerEndpoint, DEFAULT_BROKER_PORT};
pub use local::{LocalBus, LocalHub};
pub use router::{Router, SessionId};
pub use tcp::{TcpBus, TcpBusOptions};
