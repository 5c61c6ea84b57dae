// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Topic router shared by the in-process hub and the TCP broker.
//!
//! Every publish is fanned out while holding a single lock, so all sessions
//! observe messages in the same global order. Each session owns a bounded
//! FIFO queue; a session that cannot keep up loses messages instead of
//! stalling the publisher.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};
use uuid::Uuid;

use hydro_core::bus::{topic_matches, validate_filter, validate_topic};
use hydro_core::{BusError, BusResult, Message};

/// Default per-session queue depth.
pub const DEFAULT_SESSION_QUEUE: usize = 256;

pub type SessionId = Uuid;

struct Session {
    label: String,
    filters: Vec<String>,
    tx: mpsc::Sender<Message>,
}

impl Session {
    fn wants(&self, topic: &str) -> bool {
        self.filters.iter().any(|f| topic_matches(f, topic))
    }
}

#[derive(Default)]
pub struct Router {
    sessions: Mutex<HashMap<SessionId, Session>>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<SessionId, Session>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Open a session. Messages matching its filters arrive on the receiver.
    pub fn register(
        &self,
        label: impl Into<String>,
        capacity: usize,
    ) -> (SessionId, mpsc::Receiver<Message>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let id = Uuid::new_v4();
        let label = label.into();
        debug!("Session {} registered ({})", id, label);
        self.sessions().insert(
            id,
            Session {
                label,
                filters: Vec::new(),
                tx,
            },
        );
        (id, rx)
    }

    /// Close a session. Its receiver sees the end of the stream once drained.
    pub fn unregister(&self, id: SessionId) {
        if let Some(session) = self.sessions().remove(&id) {
            debug!("Session {} unregistered ({})", id, session.label);
        }
    }

    pub fn subscribe(&self, id: SessionId, filter: &str) -> BusResult<()> {
        validate_filter(filter)?;
        let mut sessions = self.sessions();
        let session = sessions.get_mut(&id).ok_or(BusError::Closed)?;
        if !session.filters.iter().any(|f| f == filter) {
            session.filters.push(filter.to_string());
        }
        Ok(())
    }

    pub fn unsubscribe(&self, id: SessionId, filter: &str) -> BusResult<()> {
        let mut sessions = self.sessions();
        let session = sessions.get_mut(&id).ok_or(BusError::Closed)?;
        session.filters.retain(|f| f != filter);
        Ok(())
    }

    /// Fan `payload` out to every session with a matching filter, the
    /// publisher included. Returns the number of sessions reached.
    pub fn publish(&self, topic: &str, payload: &str) -> BusResult<usize> {
        validate_topic(topic)?;
        let mut sessions = self.sessions();
        let mut delivered = 0;
        let mut closed = Vec::new();

        for (id, session) in sessions.iter() {
            if !session.wants(topic) {
                continue;
            }
            match session.tx.try_send(Message::new(topic, payload)) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    warn!(
                        "Session {} ({}) queue full; dropping message on {}",
                        id, session.label, topic
                    );
                }
                Err(TrySendError::Closed(_)) => closed.push(*id),
            }
        }

        for id in closed {
            sessions.remove(&id);
            debug!("Session {} removed (receiver gone)", id);
        }
        Ok(delivered)
    }

    pub fn session_count(&self) -> usize {
        self.sessions().len()
    }
}
