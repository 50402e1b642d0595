//! # esp-core-kit
//!
//! Building blocks shared by small ESP8266/ESP32 device firmwares: bounded
//! ring logs and an EEPROM-backed settings store that renders and parses its
//! own HTML form.
//!
//! ## Features
//!
//! - **Ring logs**: fixed-capacity FIFO of owned entries that overwrites the
//!   oldest entry when full, with a fixed-width text flavour for event lines
//! - **Typed settings**: text, password, integer, time span, float and
//!   boolean fields with defaults, clamping and form rendering
//! - **Persistence**: one `[magic][fields…]` record on any
//!   `embedded-storage` driver; a missing or foreign record falls back to
//!   defaults
//! - **Stable form ids**: controls are named `f1..fN` by registration order,
//!   so duplicate or edited labels never collide
//!
//! ## Architecture
//!
//! The crate is `no_std` (with `alloc`) unless the `std` feature is on:
//!
//! - `ring_log` - generic bounded FIFO
//! - `text_log` - ring log of bounded strings
//! - `settings` - fields, HTML helpers and the persistent store
//! - `config` - store and web configuration builders
//! - `hal` - in-memory EEPROM for tests and desktop demos
//! - `services` - axum settings/log server (`web` feature)
//!
//! ## Example
//!
//! ```rust
//! use esp_core_kit::{
//!     hal::MockEeprom,
//!     settings::{Field, SettingsStore},
//!     StoreConfig, TextLog,
//! };
//!
//! let mut events: TextLog<16, 64> = TextLog::new();
//!
//! let mut store = SettingsStore::new(MockEeprom::default(), StoreConfig::default());
//! let runtime = store
//!     .register(Field::time_span("Pump runtime", 60, 3600, 600))
//!     .unwrap();
//! store.begin().unwrap();
//! store.save_if_dirty().unwrap();
//!
//! let seconds = store.integer(runtime).unwrap();
//! events.add_fmt(format_args!("pump runtime {seconds}s"));
//! assert_eq!(events.latest(), Some("pump runtime 600s"));
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]

extern crate alloc;

/// Store and service configuration.
pub mod config;
/// In-memory storage backends for tests and demos.
pub mod hal;
/// Fixed-capacity FIFO that overwrites its oldest entry.
pub mod ring_log;
/// Typed settings fields and their persistent store.
pub mod settings;
/// Ring log of bounded text entries.
pub mod text_log;

/// Web service for editing settings (feature-gated).
#[cfg(feature = "web")]
pub mod services;

// Re-exports for convenience
pub use config::{StoreConfig, WebConfig};
pub use ring_log::RingLog;
pub use settings::{
    Field, FieldError, FieldId, FieldKind, FieldValue, FormError, LoadOutcome, SettingsError,
    SettingsStore, StoreState,
};
pub use text_log::TextLog;
