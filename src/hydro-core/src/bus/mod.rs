// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Publish/subscribe messaging abstraction.
//!
//! The device and peer tasks only talk to the outside world through
//! [`MessageBus`]. Concrete transports (in-process hub, TCP broker client)
//! live in the `hydro-bus` crate.

pub mod filter;
#[cfg(test)]
pub(crate) mod testing;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use filter::{topic_matches, validate_filter, validate_topic};

/// A single message delivered on a topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub topic: String,
    pub payload: String,
}

impl Message {
    pub fn new(topic: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <- {:?}", self.topic, self.payload)
    }
}

/// Errors raised by a messaging transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusError {
    /// The transport could not be reached when connecting.
    #[error("connection failed: {0}")]
    Connection(String),
    /// The link is down (not yet connected, reconnecting or disconnected).
    #[error("not connected")]
    NotConnected,
    /// The transport was shut down.
    #[error("transport closed")]
    Closed,
    /// A topic or filter is not acceptable for the requested operation.
    #[error("invalid topic '{topic}': {reason}")]
    InvalidTopic { topic: String, reason: String },
    #[error("I/O error: {0}")]
    Io(String),
    #[error("codec error: {0}")]
    Codec(String),
}

impl BusError {
    pub fn invalid_topic(topic: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidTopic {
            topic: topic.into(),
            reason: reason.into(),
        }
    }
}

impl From<std::io::Error> for BusError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value.to_string())
    }
}

pub type BusResult<T> = Result<T, BusError>;

/// Boxed future returned by [`MessageBus`] operations.
pub type BusFuture<'a, T> = Pin<Box<dyn Future<Output = BusResult<T>> + Send + 'a>>;

/// Callback invoked for each matching message.
///
/// Handlers run on the transport's delivery task, never on the task that
/// subscribed. They must not block; forward into a channel instead.
pub type MessageHandler = Arc<dyn Fn(Message) + Send + Sync>;

/// A connected publish/subscribe session.
///
/// Messages on a single topic are delivered to each handler in the order
/// the broker accepted them. Publishing while the link is down fails with
/// [`BusError::NotConnected`]; nothing is queued.
pub trait MessageBus: Send + Sync {
    /// Publish `payload` on `topic`. Topics must not contain wildcards.
    fn publish<'a>(&'a self, topic: &'a str, payload: &'a str) -> BusFuture<'a, ()>;

    /// Register `handler` for every message whose topic matches `filter`.
    fn subscribe<'a>(&'a self, filter: &'a str, handler: MessageHandler) -> BusFuture<'a, ()>;

    /// Drop all handlers registered for `filter`.
    fn unsubscribe<'a>(&'a self, filter: &'a str) -> BusFuture<'a, ()>;

    /// Close the session. Later publishes fail with `NotConnected`.
    fn disconnect<'a>(&'a self) -> BusFuture<'a, ()>;

    /// Whether the link is currently up.
    fn is_connected(&self) -> bool;
}

/// Build a [`MessageHandler`] from a closure.
pub fn handler<F>(f: F) -> MessageHandler
where
    F: Fn(Message) + Send + Sync + 'static,
{
    Arc::new(f)
}
