//! Storage backends.
//!
//! Firmware passes its own EEPROM or flash driver to
//! [`SettingsStore`](crate::settings::SettingsStore) through the
//! `embedded-storage` traits. This module holds the desktop stand-in.
//!
//! - `mock`: [`MockEeprom`], an in-memory EEPROM for tests and demos

pub mod mock;

pub use mock::*;
