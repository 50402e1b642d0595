//! Typed configuration fields persisted to EEPROM and edited through an
//! HTML form.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐ register ┌─────────────────┐ read/write ┌─────────────┐
//! │ Field::…()   │─────────►│  SettingsStore  │───────────►│ impl Storage│
//! └──────────────┘          └────────┬────────┘            └─────────────┘
//!                                    │ render_form / parse_form
//!                                    ▼
//!                           <input id="f1" …> … <input id="fN" …>
//! ```
//!
//! - [`field`]: the six field kinds, their validation, codec and form row
//! - [`store`]: registration, load/save and form handling
//! - [`html`]: escaping helpers shared by the form writers

pub mod field;
pub mod html;
pub mod store;

pub use field::{Field, FieldError, FieldKind, FieldValue, TextValue, MAX_TEXT_LEN, MAX_TEXT_SIZE};
pub use store::{
    FieldId, FormError, LoadOutcome, SettingsError, SettingsResult, SettingsStore, StoreState,
    MAGIC_SIZE,
};

#[cfg(feature = "serde")]
pub use store::{FieldSnapshot, SettingsSnapshot};
