// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Device event notification system.
//!
//! Observers (operator surfaces, loggers) register a [`DeviceListener`] and
//! receive typed notifications after each committed transition.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::response::DeviceError;
use super::state::{Actuation, DeviceState, Mode, Reading, Thresholds, UpdatePeriod};

/// Unique identifier for a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// Trait for components that want to observe the device.
///
/// All methods default to no-ops.
pub trait DeviceListener: Send + Sync {
    /// Called after every sensor tick.
    fn on_reading(&self, _reading: Reading) {}

    fn on_mode_change(&self, _old: Mode, _new: Mode) {}

    fn on_actuation_change(&self, _old: Actuation, _new: Actuation) {}

    fn on_thresholds_change(&self, _thresholds: &Thresholds) {}

    fn on_update_period_change(&self, _period: UpdatePeriod) {}

    /// Called when an input was refused and the state left untouched.
    fn on_rejected(&self, _input: &str, _error: &DeviceError) {}
}

/// Manages registered listeners and dispatches events.
pub struct DeviceEventEmitter {
    listeners: Vec<(ListenerId, Arc<dyn DeviceListener>)>,
}

impl Default for DeviceEventEmitter {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceEventEmitter {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    /// Register a listener. The returned ID can be used to unregister it.
    pub fn register(&mut self, listener: Arc<dyn DeviceListener>) -> ListenerId {
        let id = ListenerId::new();
        self.listeners.push((id, listener));
        id
    }

    pub fn unregister(&mut self, id: ListenerId) {
        self.listeners.retain(|(lid, _)| *lid != id);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn notify_reading(&self, reading: Reading) {
        for (_, listener) in &self.listeners {
            listener.on_reading(reading);
        }
    }

    pub fn notify_mode_change(&self, old: Mode, new: Mode) {
        for (_, listener) in &self.listeners {
            listener.on_mode_change(old, new);
        }
    }

    pub fn notify_actuation_change(&self, old: Actuation, new: Actuation) {
        for (_, listener) in &self.listeners {
            listener.on_actuation_change(old, new);
        }
    }

    pub fn notify_thresholds_change(&self, thresholds: &Thresholds) {
        for (_, listener) in &self.listeners {
            listener.on_thresholds_change(thresholds);
        }
    }

    pub fn notify_update_period_change(&self, period: UpdatePeriod) {
        for (_, listener) in &self.listeners {
            listener.on_update_period_change(period);
        }
    }

    pub fn notify_rejected(&self, input: &str, error: &DeviceError) {
        for (_, listener) in &self.listeners {
            listener.on_rejected(input, error);
        }
    }

    /// Compare two states and emit one notification per changed field.
    /// Readings are reported whenever `ticked` is set, even if unchanged.
    pub fn emit_state_changes(&self, old: &DeviceState, new: &DeviceState, ticked: bool) {
        if ticked {
            self.notify_reading(new.reading);
        }
        if old.mode != new.mode {
            self.notify_mode_change(old.mode, new.mode);
        }
        if old.actuation != new.actuation {
            self.notify_actuation_change(old.actuation, new.actuation);
        }
        if old.thresholds != new.thresholds {
            self.notify_thresholds_change(&new.thresholds);
        }
        if old.update_period != new.update_period {
            self.notify_update_period_change(new.update_period);
        }
    }
}
