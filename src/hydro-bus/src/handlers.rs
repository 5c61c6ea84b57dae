// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Client-side handler table shared by the transports.

use std::sync::{Arc, Mutex, PoisonError};

use hydro_core::bus::{topic_matches, MessageHandler};
use hydro_core::Message;

#[derive(Default)]
pub(crate) struct Handlers {
    entries: Mutex<Vec<(String, MessageHandler)>>,
}

impl Handlers {
    pub(crate) fn add(&self, filter: &str, handler: MessageHandler) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((filter.to_string(), handler));
    }

    pub(crate) fn remove(&self, filter: &str) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|(f, _)| f != filter);
    }

    pub(crate) fn filters(&self) -> Vec<String> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let mut filters: Vec<String> = Vec::new();
        for (filter, _) in entries.iter() {
            if !filters.contains(filter) {
                filters.push(filter.clone());
            }
        }
        filters
    }

    /// Invoke every handler whose filter matches. Handlers run without the
    /// lock held so they may subscribe or unsubscribe.
    pub(crate) fn dispatch(&self, msg: Message) {
        let matching: Vec<MessageHandler> = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(f, _)| topic_matches(f, &msg.topic))
            .map(|(_, h)| Arc::clone(h))
            .collect();
        for handler in matching {
            handler(msg.clone());
        }
    }
}
