// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! In-memory bus that records publications, for unit tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use super::{topic_matches, BusError, BusFuture, Message, MessageBus, MessageHandler};

#[derive(Default)]
pub struct RecordingBus {
    published: Mutex<Vec<Message>>,
    handlers: Mutex<Vec<(String, MessageHandler)>>,
    disconnected: AtomicBool,
    failing: AtomicBool,
}

impl RecordingBus {
    /// Deliver a message to every matching handler on the caller's task.
    pub fn inject(&self, topic: &str, payload: &str) {
        let handlers = self.handlers.lock().unwrap().clone();
        for (filter, h) in handlers {
            if topic_matches(&filter, topic) {
                h(Message::new(topic, payload));
            }
        }
    }

    /// While set, publishes fail with `NotConnected` and are not recorded.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn published_on(&self, topic: &str) -> Vec<String> {
        self.published
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.topic == topic)
            .map(|m| m.payload.clone())
            .collect()
    }

    pub fn subscriptions(&self) -> Vec<String> {
        self.handlers
            .lock()
            .unwrap()
            .iter()
            .map(|(f, _)| f.clone())
            .collect()
    }
}

impl MessageBus for RecordingBus {
    fn publish<'a>(&'a self, topic: &'a str, payload: &'a str) -> BusFuture<'a, ()> {
        if self.failing.load(Ordering::SeqCst) {
            return Box::pin(async { Err(BusError::NotConnected) });
        }
        self.published
            .lock()
            .unwrap()
            .push(Message::new(topic, payload));
        Box::pin(async { Ok(()) })
    }

    fn subscribe<'a>(&'a self, filter: &'a str, handler: MessageHandler) -> BusFuture<'a, ()> {
        self.handlers
            .lock()
            .unwrap()
            .push((filter.to_string(), handler));
        Box::pin(async { Ok(()) })
    }

    fn unsubscribe<'a>(&'a self, filter: &'a str) -> BusFuture<'a, ()> {
        self.handlers.lock().unwrap().retain(|(f, _)| f != filter);
        Box::pin(async { Ok(()) })
    }

    fn disconnect<'a>(&'a self) -> BusFuture<'a, ()> {
        self.disconnected.store(true, Ordering::SeqCst);
        Box::pin(async { Ok(()) })
    }

    fn is_connected(&self) -> bool {
        !self.disconnected.load(Ordering::SeqCst)
    }
}
