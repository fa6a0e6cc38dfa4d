//! CallbackRegistry - per-sensor callback slots
//!
//! Holds at most one callback per [`StreamKey`]. A single mutex guards the
//! slots, so a mutation that has returned is observed by the next lookup for
//! the same key. Callbacks are invoked after the lock is released: a delivery
//! that already cloned a callback may finish with it even if the slot has been
//! replaced or cleared in the meantime.

use std::collections::HashMap;

use contracts::{Callback, StreamKey};
use parking_lot::Mutex;

/// Outcome of a [`CallbackRegistry::set`] call
pub enum SetOutcome<P> {
    /// Slot was empty
    Inserted,
    /// An earlier callback was replaced (and will not be invoked again)
    Replaced(Callback<P>),
}

impl<P> SetOutcome<P> {
    pub fn was_replaced(&self) -> bool {
        matches!(self, Self::Replaced(_))
    }
}

struct Slots<P> {
    callbacks: HashMap<StreamKey, Callback<P>>,
    closed: bool,
}

/// Thread-safe callback registry owned by exactly one sensor.
pub struct CallbackRegistry<P> {
    slots: Mutex<Slots<P>>,
}

impl<P> CallbackRegistry<P> {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(Slots {
                callbacks: HashMap::new(),
                closed: false,
            }),
        }
    }

    /// Store `callback` for `key`, replacing any previous one.
    ///
    /// Returns `None` once the registry has been closed.
    pub fn set(&self, key: StreamKey, callback: Callback<P>) -> Option<SetOutcome<P>> {
        let mut slots = self.slots.lock();
        if slots.closed {
            return None;
        }
        Some(match slots.callbacks.insert(key, callback) {
            Some(previous) => SetOutcome::Replaced(previous),
            None => SetOutcome::Inserted,
        })
    }

    /// Put back a callback removed by a failed registration.
    ///
    /// `None` clears the slot. Ignored when the registry is closed.
    pub fn restore(&self, key: StreamKey, previous: Option<Callback<P>>) {
        let mut slots = self.slots.lock();
        if slots.closed {
            return;
        }
        match previous {
            Some(callback) => {
                slots.callbacks.insert(key, callback);
            }
            None => {
                slots.callbacks.remove(&key);
            }
        }
    }

    /// Remove the callback for `key`, returning it if one was set.
    pub fn clear(&self, key: StreamKey) -> Option<Callback<P>> {
        self.slots.lock().callbacks.remove(&key)
    }

    pub fn is_set(&self, key: StreamKey) -> bool {
        self.slots.lock().callbacks.contains_key(&key)
    }

    /// Current callback for `key`
    pub fn get(&self, key: StreamKey) -> Option<Callback<P>> {
        self.slots.lock().callbacks.get(&key).cloned()
    }

    /// Invoke the callback registered for `key` with `payload`.
    ///
    /// Returns `false` and drops the payload when no callback is set.
    pub fn deliver(&self, key: StreamKey, payload: P) -> bool {
        match self.get(key) {
            Some(callback) => {
                callback(payload);
                true
            }
            None => false,
        }
    }

    /// Keys that currently have a callback
    pub fn active_keys(&self) -> Vec<StreamKey> {
        let mut keys: Vec<_> = self.slots.lock().callbacks.keys().copied().collect();
        keys.sort();
        keys
    }

    /// Clear every slot and refuse further registrations.
    ///
    /// Returns the keys that were active.
    pub fn close(&self) -> Vec<StreamKey> {
        let mut slots = self.slots.lock();
        slots.closed = true;
        let mut keys: Vec<_> = slots.callbacks.drain().map(|(key, _)| key).collect();
        keys.sort();
        keys
    }

    pub fn is_closed(&self) -> bool {
        self.slots.lock().closed
    }
}

impl<P> Default for CallbackRegistry<P> {
    fn default() -> Self {
        Self::new()
    }
}
