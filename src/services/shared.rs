//! Shared state for the settings service.
//!
//! `SharedSettings` wraps one [`SettingsStore`] and an event [`TextLog`] so
//! that every request handler, and the application itself, sees the same
//! values.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use esp_core_kit::hal::MockEeprom;
//! use esp_core_kit::services::SharedSettings;
//! use esp_core_kit::settings::{Field, SettingsStore};
//! use esp_core_kit::StoreConfig;
//!
//! let mut store = SettingsStore::new(MockEeprom::default(), StoreConfig::default());
//! let interval = store.register(Field::integer("Interval", 6, 25, 10)).unwrap();
//! store.begin().unwrap();
//!
//! let state = Arc::new(SharedSettings::new(store));
//! state.log_event("boot");
//!
//! let value = state.with_store(|store| store.integer(interval));
//! assert_eq!(value, Some(10));
//! assert_eq!(state.events_newest_first().len(), 1);
//! ```

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use embedded_storage::Storage;

use crate::settings::SettingsStore;
use crate::TextLog;

/// Number of events kept by [`SharedSettings`].
pub const EVENT_LOG_ENTRIES: usize = 32;

/// Maximum bytes per event line.
pub const EVENT_LOG_ENTRY_SIZE: usize = 96;

/// Event log type used by the service.
pub type EventLog = TextLog<EVENT_LOG_ENTRIES, EVENT_LOG_ENTRY_SIZE>;

/// Settings store and event log shared by all handlers.
///
/// Both locks are held only for the duration of a closure or a single call,
/// never across an `.await`. A poisoned lock is recovered, since neither the
/// store nor the log can be left half-updated by a panicking reader.
pub struct SharedSettings<S: Storage> {
    store: Mutex<SettingsStore<S>>,
    events: Mutex<EventLog>,
    start_time: Instant,
}

impl<S: Storage> SharedSettings<S> {
    /// Wraps a store that has already been through `begin()`.
    pub fn new(store: SettingsStore<S>) -> Self {
        Self {
            store: Mutex::new(store),
            events: Mutex::new(EventLog::new()),
            start_time: Instant::now(),
        }
    }

    /// Seconds since this state was created; prefixes every event.
    #[inline]
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Access the store with the lock held.
    pub fn with_store<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&mut SettingsStore<S>) -> R,
    {
        let mut guard = lock(&self.store);
        f(&mut guard)
    }

    /// Appends an event line, prefixed with the uptime.
    pub fn log_event(&self, message: impl fmt::Display) {
        let uptime = self.uptime_secs();
        lock(&self.events).add_fmt(format_args!("[{uptime:>6}s] {message}"));
    }

    /// Access the event log with the lock held.
    pub fn with_events<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&mut EventLog) -> R,
    {
        let mut guard = lock(&self.events);
        f(&mut guard)
    }

    /// Copies the event lines, newest first.
    pub fn events_newest_first(&self) -> Vec<String> {
        lock(&self.events).iter().rev().map(str::to_owned).collect()
    }

    /// Unwraps the store, e.g. to hand the storage driver back at shutdown.
    pub fn into_store(self) -> SettingsStore<S> {
        self.store.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::hal::MockEeprom;
    use crate::settings::Field;
    use std::sync::Arc;

    fn shared() -> SharedSettings<MockEeprom> {
        let mut store = SettingsStore::new(MockEeprom::default(), StoreConfig::default());
        store.register(Field::integer("Interval", 6, 25, 10)).unwrap();
        store.begin().unwrap();
        SharedSettings::new(store)
    }

    #[test]
    fn events_are_prefixed_and_newest_first() {
        let state = shared();
        state.log_event("first");
        state.log_event(format_args!("second {}", 2));

        let events = state.events_newest_first();
        assert_eq!(events.len(), 2);
        assert!(events[0].ends_with("] second 2"), "{}", events[0]);
        assert!(events[1].starts_with("[     0s] first"), "{}", events[1]);
    }

    #[test]
    fn event_log_is_bounded() {
        let state = shared();
        for i in 0..EVENT_LOG_ENTRIES + 5 {
            state.log_event(i);
        }
        let events = state.events_newest_first();
        assert_eq!(events.len(), EVENT_LOG_ENTRIES);
        assert!(events[0].ends_with(&format!(" {}", EVENT_LOG_ENTRIES + 4)));
    }

    #[test]
    fn store_is_shared_between_threads() {
        let state = Arc::new(shared());
        let id = state.with_store(|s| s.find("Interval")).unwrap();

        let writer = Arc::clone(&state);
        std::thread::spawn(move || {
            writer.with_store(|s| s.set_integer(id, 20)).unwrap();
        })
        .join()
        .unwrap();

        assert_eq!(state.with_store(|s| s.integer(id)), Some(20));
    }

    #[test]
    fn into_store_returns_values() {
        let state = shared();
        state.with_store(|s| s.write_to_storage()).unwrap();
        let store = state.into_store();
        assert_eq!(store.storage().writes, 1);
    }
}
