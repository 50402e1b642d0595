//! Desktop web service for the settings store (`web` feature).
//!
//! The service wraps a [`SettingsStore`](crate::settings::SettingsStore) in
//! [`SharedSettings`], an `Arc`-shared mutex pair of store and event log, so
//! that the HTTP handlers and the application read and write the same
//! values:
//!
//! ```ignore
//! use std::sync::Arc;
//! use esp_core_kit::services::{run_server, SharedSettings, WebServerConfig};
//!
//! let state = Arc::new(SharedSettings::new(store));
//!
//! // The application keeps a handle for its own reads
//! let interval = state.with_store(|s| s.integer(interval_id));
//!
//! run_server(Arc::clone(&state), WebServerConfig::default()).await?;
//! ```

pub mod api;
pub mod shared;
pub mod web;

pub use api::*;
pub use shared::*;
pub use web::*;
