//! Persistent settings store backed by an EEPROM-style storage driver.
//!
//! The store owns an ordered list of [`Field`]s. Registration order defines
//! both the on-disk layout and the form control ids (`f1`, `f2`, …), so
//! labels can change freely without breaking stored records or in-flight
//! form submissions.
//!
//! # Record Layout
//!
//! ```text
//! offset ─► [magic: u32][field 1 bytes][field 2 bytes] … [field N bytes]
//! ```
//!
//! Integers and floats use the host byte order. The record must fit in
//! [`StoreConfig::capacity`] and in the storage device; registering a field
//! that would overflow either is rejected.
//!
//! # Lifecycle
//!
//! ```text
//! Uninitialized ──begin()──► Loaded     (magic matched, fields validated)
//!               └──────────► Defaulted  (no magic, fields initialized, dirty)
//! ```
//!
//! # Example
//!
//! ```rust
//! use esp_core_kit::hal::MockEeprom;
//! use esp_core_kit::settings::{Field, LoadOutcome, SettingsStore};
//! use esp_core_kit::StoreConfig;
//!
//! let mut store = SettingsStore::new(MockEeprom::new(512), StoreConfig::default());
//! let host = store.register(Field::text("Host", 32, "aquarea.local")).unwrap();
//! let interval = store.register(Field::integer("Interval", 6, 25, 10)).unwrap();
//!
//! // Blank EEPROM: defaults are applied and must be saved explicitly
//! assert_eq!(store.begin().unwrap(), LoadOutcome::Defaulted);
//! assert!(store.is_dirty());
//! store.write_to_storage().unwrap();
//!
//! // Submitted form values are keyed by position, not label
//! let rejected = store.parse_form(|id| match id {
//!     "f2" => Some("30"),
//!     _ => None,
//! });
//! assert!(rejected.is_empty());
//! assert_eq!(store.integer(interval), Some(25));
//! assert_eq!(store.text(host), Some("aquarea.local"));
//! ```

use alloc::vec;
use alloc::vec::Vec;
use core::fmt::{self, Write};

use embedded_storage::Storage;
use heapless::String;
use log::{debug, info, warn};

use super::field::{Field, FieldError, FieldKind, FieldValue, TextValue, MAX_TEXT_SIZE};
use crate::config::{StoreConfig, MAX_FIELDS};

/// Bytes taken by the magic sentinel.
pub const MAGIC_SIZE: usize = 4;

// ============================================================================
// Identifiers and outcomes
// ============================================================================

/// Position of a registered field.
///
/// Displays as the form control id, `f1` for the first field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FieldId(usize);

impl FieldId {
    /// Zero-based registration index.
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }

    /// Form control id, e.g. `"f1"`.
    ///
    /// A store holds at most [`MAX_FIELDS`] fields, so every id it hands
    /// out fits.
    pub fn form_id(self) -> String<8> {
        let mut id = String::new();
        if write!(id, "{self}").is_err() {
            id.clear();
        }
        id
    }

    /// Parses a form control id such as `"f3"`.
    pub fn from_form_id(id: &str) -> Option<Self> {
        let n: usize = id.strip_prefix('f')?.parse().ok()?;
        if n > MAX_FIELDS {
            return None;
        }
        n.checked_sub(1).map(Self)
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "f{}", self.0 + 1)
    }
}

/// Result of [`SettingsStore::begin`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadOutcome {
    /// A valid record was read and validated.
    Loaded,
    /// No valid record; every field holds its default and needs saving.
    Defaulted,
}

/// Lifecycle state of a [`SettingsStore`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum StoreState {
    /// `begin` has not been called.
    #[default]
    Uninitialized,
    /// Values came from storage.
    Loaded,
    /// Values are defaults.
    Defaulted,
}

/// A field rejected during form parsing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FormError {
    /// Field that rejected its input.
    pub id: FieldId,
    /// Label of that field.
    pub label: &'static str,
    /// Reason.
    pub error: FieldError,
}

impl fmt::Display for FormError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.label, self.id, self.error)
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Settings store failure, generic over the storage driver error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SettingsError<E> {
    /// The record would not fit in the configured or physical capacity.
    SchemaOverflow {
        /// Record size including the new field.
        required: usize,
        /// Usable bytes.
        capacity: usize,
    },
    /// A text or password field declares more bytes than a value can hold.
    TextTooLarge {
        /// Label of the refused field.
        label: &'static str,
        /// Declared persisted size.
        size: usize,
        /// Largest accepted size.
        max: usize,
    },
    /// The configured field limit was reached.
    TooManyFields {
        /// Configured limit.
        max: usize,
    },
    /// No field with this id is registered.
    UnknownField(FieldId),
    /// The field exists but holds another kind of value.
    KindMismatch {
        /// Field addressed.
        id: FieldId,
        /// Kind name of that field.
        expected: &'static str,
    },
    /// The storage driver failed.
    Storage(E),
}

impl<E: fmt::Debug> fmt::Display for SettingsError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SchemaOverflow { required, capacity } => write!(
                f,
                "settings record needs {required} bytes but only {capacity} are available"
            ),
            Self::TextTooLarge { label, size, max } => write!(
                f,
                "settings field '{label}' declares {size} bytes, at most {max} are supported"
            ),
            Self::TooManyFields { max } => write!(f, "more than {max} settings fields"),
            Self::UnknownField(id) => write!(f, "unknown settings field {id}"),
            Self::KindMismatch { id, expected } => {
                write!(f, "settings field {id} holds a {expected} value")
            }
            Self::Storage(e) => write!(f, "settings storage error: {e:?}"),
        }
    }
}

#[cfg(feature = "std")]
impl<E: fmt::Debug> std::error::Error for SettingsError<E> {}

/// Result alias for store operations on driver `S`.
pub type SettingsResult<T, S> = Result<T, SettingsError<<S as embedded_storage::ReadStorage>::Error>>;

// ============================================================================
// Store
// ============================================================================

/// Ordered collection of fields persisted as one record.
///
/// The store holds no locks; wrap it in a mutex to share it between tasks.
pub struct SettingsStore<S: Storage> {
    storage: S,
    config: StoreConfig,
    fields: Vec<Field>,
    size: usize,
    state: StoreState,
    dirty: bool,
}

impl<S: Storage> SettingsStore<S> {
    /// Creates an empty store. Only the magic sentinel is counted so far.
    pub fn new(storage: S, config: StoreConfig) -> Self {
        Self {
            storage,
            config,
            fields: Vec::new(),
            size: MAGIC_SIZE,
            state: StoreState::Uninitialized,
            dirty: false,
        }
    }

    /// Appends a field and grows the record.
    ///
    /// # Errors
    ///
    /// [`SettingsError::SchemaOverflow`] if the record would no longer fit,
    /// [`SettingsError::TextTooLarge`] for text sizes above
    /// [`MAX_TEXT_SIZE`], [`SettingsError::TooManyFields`] past
    /// `config.max_fields`. All are schema mistakes and should stop the
    /// firmware at boot.
    pub fn register(&mut self, field: Field) -> SettingsResult<FieldId, S> {
        let max = self.max_fields();
        if self.fields.len() >= max {
            return Err(SettingsError::TooManyFields { max });
        }

        if let FieldKind::Text { size, .. } | FieldKind::Password { size, .. } = *field.kind() {
            if size > MAX_TEXT_SIZE {
                return Err(SettingsError::TextTooLarge {
                    label: field.label(),
                    size,
                    max: MAX_TEXT_SIZE,
                });
            }
        }

        let required = self.size + field.persisted_size();
        let capacity = self.usable_capacity();
        if required > capacity {
            return Err(SettingsError::SchemaOverflow { required, capacity });
        }

        let id = FieldId(self.fields.len());
        debug!(
            "settings: registered {} '{}' as {} ({} bytes)",
            field.kind_name(),
            field.label(),
            id,
            field.persisted_size()
        );
        self.fields.push(field);
        self.size = required;
        Ok(id)
    }

    /// Loads the record, falling back to defaults.
    ///
    /// A matching magic loads and validates every field. Anything else
    /// initializes every field and leaves the store dirty until saved.
    pub fn begin(&mut self) -> SettingsResult<LoadOutcome, S> {
        if self.read_from_storage()? {
            self.fields.iter_mut().for_each(Field::validate);
            self.state = StoreState::Loaded;
            self.dirty = false;
            info!(
                "settings: loaded {} fields ({} bytes)",
                self.fields.len(),
                self.size
            );
            Ok(LoadOutcome::Loaded)
        } else {
            self.reset_to_defaults();
            self.state = StoreState::Defaulted;
            info!("settings: no stored record, using defaults");
            Ok(LoadOutcome::Defaulted)
        }
    }

    /// Reads the record into the fields.
    ///
    /// Returns `Ok(false)` without touching any field when the magic does
    /// not match. Fields are not validated here; [`begin`](Self::begin) does
    /// that.
    pub fn read_from_storage(&mut self) -> SettingsResult<bool, S> {
        let mut magic = [0u8; MAGIC_SIZE];
        self.storage
            .read(self.config.offset, &mut magic)
            .map_err(SettingsError::Storage)?;

        if u32::from_ne_bytes(magic) != self.config.magic {
            warn!(
                "settings: magic mismatch (found {:#010x}, expected {:#010x})",
                u32::from_ne_bytes(magic),
                self.config.magic
            );
            return Ok(false);
        }

        let mut record = vec![0u8; self.size];
        self.storage
            .read(self.config.offset, &mut record)
            .map_err(SettingsError::Storage)?;

        let mut pos = MAGIC_SIZE;
        for field in self.fields.iter_mut() {
            let len = field.persisted_size();
            field.read_bytes(&record[pos..pos + len]);
            pos += len;
        }
        Ok(true)
    }

    /// Writes `[magic][fields…]` at the configured offset.
    pub fn write_to_storage(&mut self) -> SettingsResult<(), S> {
        let record = self.encode();
        self.storage
            .write(self.config.offset, &record)
            .map_err(SettingsError::Storage)?;
        self.dirty = false;
        info!("settings: saved {} bytes", record.len());
        Ok(())
    }

    /// Writes only if something changed since the last load or save.
    ///
    /// Returns whether a write happened.
    pub fn save_if_dirty(&mut self) -> SettingsResult<bool, S> {
        if !self.dirty {
            return Ok(false);
        }
        self.write_to_storage()?;
        Ok(true)
    }

    /// Initializes every field to its default and marks the store dirty.
    pub fn reset_to_defaults(&mut self) {
        self.fields.iter_mut().for_each(Field::initialize);
        self.dirty = true;
    }

    /// Writes the form rows for every field, ids `f1..fN` in order.
    pub fn render_form<W: Write + ?Sized>(&self, w: &mut W) -> fmt::Result {
        w.write_str("<table class=\"settings\">\n")?;
        for (index, field) in self.fields.iter().enumerate() {
            field.render(w, FieldId(index).form_id().as_str())?;
        }
        w.write_str("</table>\n")
    }

    /// Applies submitted form values, then validates every field.
    ///
    /// `lookup` maps a control id (`"f1"`) to its submitted text. Fields that
    /// reject their input keep their previous value and are returned; the
    /// others are updated. The store is marked dirty but not written.
    pub fn parse_form<'v, F>(&mut self, lookup: F) -> Vec<FormError>
    where
        F: FnMut(&str) -> Option<&'v str>,
    {
        self.apply(lookup, false)
    }

    /// [`parse_form`](Self::parse_form) followed by
    /// [`write_to_storage`](Self::write_to_storage).
    ///
    /// Accepted values are saved even if other fields were rejected.
    pub fn submit_form<'v, F>(&mut self, lookup: F) -> SettingsResult<Vec<FormError>, S>
    where
        F: FnMut(&str) -> Option<&'v str>,
    {
        let rejected = self.parse_form(lookup);
        self.write_to_storage()?;
        Ok(rejected)
    }

    /// Applies only the values `lookup` provides, keeping every other field.
    ///
    /// Unlike [`parse_form`](Self::parse_form), an absent boolean keeps its
    /// state and an empty password keeps the stored one, so a client can
    /// send back what a settings snapshot gave it.
    pub fn parse_update<'v, F>(&mut self, lookup: F) -> Vec<FormError>
    where
        F: FnMut(&str) -> Option<&'v str>,
    {
        self.apply(lookup, true)
    }

    /// [`parse_update`](Self::parse_update) followed by
    /// [`write_to_storage`](Self::write_to_storage).
    pub fn submit_update<'v, F>(&mut self, lookup: F) -> SettingsResult<Vec<FormError>, S>
    where
        F: FnMut(&str) -> Option<&'v str>,
    {
        let rejected = self.parse_update(lookup);
        self.write_to_storage()?;
        Ok(rejected)
    }

    fn apply<'v, F>(&mut self, mut lookup: F, partial: bool) -> Vec<FormError>
    where
        F: FnMut(&str) -> Option<&'v str>,
    {
        let mut rejected = Vec::new();
        for (index, field) in self.fields.iter_mut().enumerate() {
            let id = FieldId(index);
            let raw = lookup(id.form_id().as_str());
            if partial {
                let keep = match raw {
                    None => true,
                    Some("") => matches!(field.kind(), FieldKind::Password { .. }),
                    Some(_) => false,
                };
                if keep {
                    continue;
                }
            }
            match field.parse(raw) {
                Ok(()) => debug!("settings: {} '{}' accepted", id, field.label()),
                Err(error) => {
                    warn!("settings: {} '{}' rejected: {}", id, field.label(), error);
                    rejected.push(FormError {
                        id,
                        label: field.label(),
                        error,
                    });
                }
            }
        }
        self.fields.iter_mut().for_each(Field::validate);
        self.dirty = true;
        rejected
    }

    // ------------------------------------------------------------------------
    // Field access
    // ------------------------------------------------------------------------

    /// Registered fields in order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Field by id.
    pub fn field(&self, id: FieldId) -> Option<&Field> {
        self.fields.get(id.0)
    }

    /// First field with the given label.
    pub fn find(&self, label: &str) -> Option<FieldId> {
        self.fields
            .iter()
            .position(|f| f.label() == label)
            .map(FieldId)
    }

    /// Current value of a field.
    pub fn value(&self, id: FieldId) -> Option<FieldValue> {
        self.field(id).map(Field::value)
    }

    /// Integer or time span value in seconds.
    pub fn integer(&self, id: FieldId) -> Option<i32> {
        match self.value(id)? {
            FieldValue::Integer(v) => Some(v),
            _ => None,
        }
    }

    /// Float value.
    pub fn float(&self, id: FieldId) -> Option<f32> {
        match self.value(id)? {
            FieldValue::Float(v) => Some(v),
            _ => None,
        }
    }

    /// Boolean value.
    pub fn boolean(&self, id: FieldId) -> Option<bool> {
        match self.value(id)? {
            FieldValue::Boolean(v) => Some(v),
            _ => None,
        }
    }

    /// Text or password value.
    pub fn text(&self, id: FieldId) -> Option<&str> {
        match self.field(id)?.kind() {
            FieldKind::Text { value, .. } | FieldKind::Password { value, .. } => {
                Some(value.as_str())
            }
            _ => None,
        }
    }

    /// Assigns a value (validated) and marks the store dirty.
    pub fn set(&mut self, id: FieldId, value: FieldValue) -> SettingsResult<(), S> {
        let field = self
            .fields
            .get_mut(id.0)
            .ok_or(SettingsError::UnknownField(id))?;
        let expected = field.kind_name();
        field
            .set(value)
            .map_err(|_| SettingsError::KindMismatch { id, expected })?;
        self.dirty = true;
        Ok(())
    }

    /// Sets an integer or time span field.
    pub fn set_integer(&mut self, id: FieldId, value: i32) -> SettingsResult<(), S> {
        self.set(id, FieldValue::Integer(value))
    }

    /// Sets a float field.
    pub fn set_float(&mut self, id: FieldId, value: f32) -> SettingsResult<(), S> {
        self.set(id, FieldValue::Float(value))
    }

    /// Sets a boolean field.
    pub fn set_boolean(&mut self, id: FieldId, value: bool) -> SettingsResult<(), S> {
        self.set(id, FieldValue::Boolean(value))
    }

    /// Sets a text or password field, truncating to its capacity.
    pub fn set_text(&mut self, id: FieldId, value: &str) -> SettingsResult<(), S> {
        let text: TextValue = crate::config::bounded(value);
        self.set(id, FieldValue::Text(text))
    }

    // ------------------------------------------------------------------------
    // State
    // ------------------------------------------------------------------------

    /// Record size in bytes, magic included.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Lifecycle state.
    pub fn state(&self) -> StoreState {
        self.state
    }

    /// `true` when in-memory values differ from what was last loaded or saved.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Active configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Storage driver.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Gives the storage driver back.
    pub fn into_storage(self) -> S {
        self.storage
    }

    fn max_fields(&self) -> usize {
        self.config.max_fields.min(MAX_FIELDS)
    }

    fn usable_capacity(&self) -> usize {
        let device = self
            .storage
            .capacity()
            .saturating_sub(self.config.offset as usize);
        self.config.capacity.min(device)
    }

    fn encode(&self) -> Vec<u8> {
        let mut record = vec![0u8; self.size];
        record[..MAGIC_SIZE].copy_from_slice(&self.config.magic.to_ne_bytes());
        let mut pos = MAGIC_SIZE;
        for field in &self.fields {
            let len = field.persisted_size();
            field.write_bytes(&mut record[pos..pos + len]);
            pos += len;
        }
        record
    }
}

impl<S: Storage> fmt::Debug for SettingsStore<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SettingsStore")
            .field("config", &self.config)
            .field("fields", &self.fields)
            .field("size", &self.size)
            .field("state", &self.state)
            .field("dirty", &self.dirty)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Serialization
// ============================================================================

/// One field as exposed over JSON.
#[cfg(feature = "serde")]
#[derive(Clone, Debug, serde::Serialize)]
pub struct FieldSnapshot<'a> {
    /// Form control id.
    pub id: String<8>,
    /// Display label.
    pub label: &'a str,
    /// Kind name.
    pub kind: &'static str,
    /// Current value, always empty for passwords.
    pub value: FieldValue,
}

/// Serializable view of every field, in registration order.
///
/// Password values are never included, so a snapshot is safe to hand to
/// any client that can reach the API.
#[cfg(feature = "serde")]
#[derive(Clone, Copy, Debug)]
pub struct SettingsSnapshot<'a> {
    fields: &'a [Field],
}

#[cfg(feature = "serde")]
impl<'a> SettingsSnapshot<'a> {
    /// Iterates the per-field snapshots.
    pub fn iter(&self) -> impl Iterator<Item = FieldSnapshot<'a>> + 'a {
        self.fields
            .iter()
            .enumerate()
            .map(|(index, field)| FieldSnapshot {
                id: FieldId(index).form_id(),
                label: field.label(),
                kind: field.kind_name(),
                value: match field.kind() {
                    FieldKind::Password { .. } => FieldValue::Text(TextValue::new()),
                    _ => field.value(),
                },
            })
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for SettingsSnapshot<'_> {
    fn serialize<Ser: serde::Serializer>(&self, serializer: Ser) -> Result<Ser::Ok, Ser::Error> {
        serializer.collect_seq(self.iter())
    }
}

#[cfg(feature = "serde")]
impl<S: Storage> SettingsStore<S> {
    /// Serializable view of the current values.
    pub fn snapshot(&self) -> SettingsSnapshot<'_> {
        SettingsSnapshot {
            fields: &self.fields,
        }
    }
}

#[cfg(feature = "serde-json-core")]
impl<S: Storage> SettingsStore<S> {
    /// Serializes [`snapshot`](Self::snapshot) as JSON into `buf`.
    ///
    /// Returns the number of bytes written.
    pub fn snapshot_json(&self, buf: &mut [u8]) -> serde_json_core::ser::Result<usize> {
        serde_json_core::to_slice(&self.snapshot(), buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_MAGIC;
    use crate::hal::{MockEeprom, MockEepromError};
    use alloc::string::{String as StdString, ToString};

    fn store_with_three_fields() -> (SettingsStore<MockEeprom>, [FieldId; 3]) {
        let mut store = SettingsStore::new(MockEeprom::new(512), StoreConfig::default());
        let a = store.register(Field::text("Host", 16, "heatpump")).unwrap();
        let b = store.register(Field::integer("Interval", 6, 25, 10)).unwrap();
        let c = store.register(Field::boolean("Enabled", true)).unwrap();
        (store, [a, b, c])
    }

    // =========================================================================
    // Registration
    // =========================================================================

    #[test]
    fn register_accumulates_size_and_ids() {
        let (store, ids) = store_with_three_fields();
        assert_eq!(ids.map(FieldId::index), [0, 1, 2]);
        assert_eq!(store.size(), 4 + 16 + 4 + 1);
        assert_eq!(store.state(), StoreState::Uninitialized);
    }

    #[test]
    fn register_rejects_schema_overflow() {
        let config = StoreConfig::default().with_capacity(32);
        let mut store = SettingsStore::new(MockEeprom::new(512), config);
        store.register(Field::text("A", 20, "")).unwrap();
        let err = store.register(Field::text("B", 20, "")).unwrap_err();
        assert_eq!(
            err,
            SettingsError::SchemaOverflow {
                required: 44,
                capacity: 32
            }
        );
        assert_eq!(store.fields().len(), 1);
        assert_eq!(store.size(), 24);
    }

    #[test]
    fn register_respects_device_capacity_and_offset() {
        let config = StoreConfig::default().with_offset(60);
        let mut store = SettingsStore::new(MockEeprom::new(64), config);
        assert_eq!(
            store.register(Field::integer("X", 0, 1, 0)),
            Err(SettingsError::SchemaOverflow {
                required: 8,
                capacity: 4
            })
        );
    }

    #[test]
    fn register_rejects_oversized_text() {
        let mut store = SettingsStore::new(MockEeprom::new(1024), StoreConfig::default());
        assert_eq!(
            store.register(Field::text("Notes", 200, "")),
            Err(SettingsError::TextTooLarge {
                label: "Notes",
                size: 200,
                max: 129
            })
        );
        assert!(matches!(
            store.register(Field::password("Key", 130)),
            Err(SettingsError::TextTooLarge { size: 130, .. })
        ));
        assert!(store.fields().is_empty());
        assert_eq!(store.size(), MAGIC_SIZE);

        store.register(Field::text("Notes", 129, "")).unwrap();
        assert_eq!(store.size(), MAGIC_SIZE + 129);
    }

    #[test]
    fn register_rejects_too_many_fields() {
        let config = StoreConfig::default().with_max_fields(2);
        let mut store = SettingsStore::new(MockEeprom::new(512), config);
        store.register(Field::boolean("A", false)).unwrap();
        store.register(Field::boolean("B", false)).unwrap();
        assert_eq!(
            store.register(Field::boolean("C", false)),
            Err(SettingsError::TooManyFields { max: 2 })
        );
    }

    // =========================================================================
    // Load / save
    // =========================================================================

    #[test]
    fn begin_on_blank_storage_defaults() {
        let (mut store, [host, interval, enabled]) = store_with_three_fields();
        assert_eq!(store.begin().unwrap(), LoadOutcome::Defaulted);
        assert_eq!(store.state(), StoreState::Defaulted);
        assert!(store.is_dirty());
        assert_eq!(store.text(host), Some("heatpump"));
        assert_eq!(store.integer(interval), Some(10));
        assert_eq!(store.boolean(enabled), Some(true));
    }

    #[test]
    fn write_then_read_restores_values() {
        let (mut store, [host, interval, enabled]) = store_with_three_fields();
        store.begin().unwrap();
        store.set_text(host, "otgw").unwrap();
        store.set_integer(interval, 17).unwrap();
        store.set_boolean(enabled, false).unwrap();
        store.write_to_storage().unwrap();
        assert!(!store.is_dirty());

        store.reset_to_defaults();
        assert!(store.read_from_storage().unwrap());
        assert_eq!(store.text(host), Some("otgw"));
        assert_eq!(store.integer(interval), Some(17));
        assert_eq!(store.boolean(enabled), Some(false));
    }

    #[test]
    fn record_layout_is_magic_then_fields() {
        let (mut store, _) = store_with_three_fields();
        store.begin().unwrap();
        store.write_to_storage().unwrap();

        let bytes = store.storage().bytes();
        assert_eq!(&bytes[..4], &DEFAULT_MAGIC.to_ne_bytes());
        assert_eq!(&bytes[4..12], b"heatpump");
        assert!(bytes[12..20].iter().all(|&b| b == 0));
        assert_eq!(&bytes[20..24], &10i32.to_ne_bytes());
        assert_eq!(bytes[24], 1);
        // Untouched beyond the record
        assert_eq!(bytes[25], 0xFF);
    }

    #[test]
    fn read_with_wrong_magic_leaves_fields_untouched() {
        let mut eeprom = MockEeprom::new(512);
        eeprom.fill(0x00);
        let mut store = SettingsStore::new(eeprom, StoreConfig::default());
        let id = store.register(Field::integer("Interval", 6, 25, 10)).unwrap();
        store.set_integer(id, 20).unwrap();
        assert!(!store.read_from_storage().unwrap());
        assert_eq!(store.integer(id), Some(20));
    }

    #[test]
    fn begin_validates_loaded_values() {
        let mut eeprom = MockEeprom::new(64);
        let mut record = [0u8; 8];
        record[..4].copy_from_slice(&DEFAULT_MAGIC.to_ne_bytes());
        record[4..].copy_from_slice(&1000i32.to_ne_bytes());
        eeprom.load(0, &record);

        let mut store = SettingsStore::new(eeprom, StoreConfig::default());
        let id = store.register(Field::integer("Interval", 6, 25, 10)).unwrap();
        assert_eq!(store.begin().unwrap(), LoadOutcome::Loaded);
        assert_eq!(store.integer(id), Some(25));
        assert!(!store.is_dirty());
    }

    #[test]
    fn changed_magic_forces_defaults() {
        let (mut store, [_, interval, _]) = store_with_three_fields();
        store.begin().unwrap();
        store.set_integer(interval, 20).unwrap();
        store.write_to_storage().unwrap();

        let eeprom = store.into_storage();
        let mut store = SettingsStore::new(eeprom, StoreConfig::default().with_magic(0xDEAD_BEEF));
        let id = store.register(Field::integer("Interval", 6, 25, 10)).unwrap();
        assert_eq!(store.begin().unwrap(), LoadOutcome::Defaulted);
        assert_eq!(store.integer(id), Some(10));
    }

    #[test]
    fn record_honours_offset() {
        let config = StoreConfig::default().with_offset(100);
        let mut store = SettingsStore::new(MockEeprom::new(512), config);
        store.register(Field::integer("X", 0, 10, 3)).unwrap();
        store.begin().unwrap();
        store.write_to_storage().unwrap();
        let bytes = store.storage().bytes();
        assert_eq!(bytes[0], 0xFF);
        assert_eq!(&bytes[100..104], &DEFAULT_MAGIC.to_ne_bytes());
    }

    #[test]
    fn save_if_dirty_skips_clean_store() {
        let (mut store, [_, interval, _]) = store_with_three_fields();
        store.begin().unwrap();
        assert!(store.save_if_dirty().unwrap());
        assert!(!store.save_if_dirty().unwrap());
        assert_eq!(store.storage().writes, 1);

        store.set_integer(interval, 11).unwrap();
        assert!(store.save_if_dirty().unwrap());
        assert_eq!(store.storage().writes, 2);
    }

    #[test]
    fn storage_errors_propagate() {
        let (mut store, _) = store_with_three_fields();
        store.begin().unwrap();
        let mut eeprom = store.into_storage();
        eeprom.fail_next = Some(MockEepromError::Injected);
        let mut store = SettingsStore::new(eeprom, StoreConfig::default());
        assert_eq!(
            store.write_to_storage(),
            Err(SettingsError::Storage(MockEepromError::Injected))
        );
    }

    // =========================================================================
    // Form
    // =========================================================================

    #[test]
    fn render_form_uses_sequential_ids() {
        let mut store = SettingsStore::new(MockEeprom::new(512), StoreConfig::default());
        store.register(Field::integer("Same", 0, 9, 1)).unwrap();
        store.register(Field::integer("Same", 0, 9, 2)).unwrap();
        store.register(Field::integer("Same", 0, 9, 3)).unwrap();

        let mut html = StdString::new();
        store.render_form(&mut html).unwrap();
        for id in ["f1", "f2", "f3"] {
            assert!(html.contains(&alloc::format!("name=\"{id}\"")), "{id}");
        }
        assert!(!html.contains("name=\"Same\""));
    }

    #[test]
    fn parse_form_with_duplicate_labels() {
        let mut store = SettingsStore::new(MockEeprom::new(512), StoreConfig::default());
        let ids = [
            store.register(Field::integer("Same", 0, 9, 1)).unwrap(),
            store.register(Field::integer("Same", 0, 9, 2)).unwrap(),
            store.register(Field::integer("Same", 0, 9, 3)).unwrap(),
        ];

        let rejected = store.parse_form(|id| match id {
            "f1" => Some("7"),
            "f2" => Some("8"),
            "f3" => Some("9"),
            _ => None,
        });
        assert!(rejected.is_empty());
        assert_eq!(ids.map(|id| store.integer(id)), [Some(7), Some(8), Some(9)]);
        assert!(store.is_dirty());
    }

    #[test]
    fn parse_form_reports_rejected_fields() {
        let (mut store, [host, interval, enabled]) = store_with_three_fields();
        store.begin().unwrap();

        let rejected = store.parse_form(|id| match id {
            "f1" => Some("boiler"),
            "f2" => Some("twelve"),
            _ => None,
        });
        assert_eq!(
            rejected,
            [FormError {
                id: interval,
                label: "Interval",
                error: FieldError::InvalidNumber
            }]
        );
        assert_eq!(store.text(host), Some("boiler"));
        assert_eq!(store.integer(interval), Some(10));
        // Absent checkbox reads as unchecked
        assert_eq!(store.boolean(enabled), Some(false));
        assert_eq!(rejected[0].to_string(), "Interval (f2): not a valid number");
    }

    #[test]
    fn submit_form_saves_accepted_values() {
        let (mut store, [_, interval, _]) = store_with_three_fields();
        store.begin().unwrap();
        let rejected = store
            .submit_form(|id| (id == "f2").then_some("99"))
            .unwrap();
        assert!(rejected.is_empty());
        assert!(!store.is_dirty());

        let eeprom = store.into_storage();
        let mut reloaded = SettingsStore::new(eeprom, StoreConfig::default());
        reloaded.register(Field::text("Host", 16, "heatpump")).unwrap();
        reloaded.register(Field::integer("Interval", 6, 25, 10)).unwrap();
        reloaded.register(Field::boolean("Enabled", true)).unwrap();
        assert_eq!(reloaded.begin().unwrap(), LoadOutcome::Loaded);
        assert_eq!(reloaded.integer(interval), Some(25));
    }

    #[test]
    fn parse_update_keeps_absent_fields() {
        let (mut store, [host, interval, enabled]) = store_with_three_fields();
        store.begin().unwrap();

        let rejected = store.parse_update(|id| (id == "f2").then_some("15"));
        assert!(rejected.is_empty());
        assert_eq!(store.integer(interval), Some(15));
        assert_eq!(store.text(host), Some("heatpump"));
        // Unlike a form post, an absent boolean is not unchecked
        assert_eq!(store.boolean(enabled), Some(true));
        assert!(store.is_dirty());

        let rejected = store.parse_update(|id| (id == "f3").then_some("off"));
        assert!(rejected.is_empty());
        assert_eq!(store.boolean(enabled), Some(false));
    }

    #[test]
    fn parse_update_keeps_password_on_empty_value() {
        let mut store = SettingsStore::new(MockEeprom::new(512), StoreConfig::default());
        let user = store.register(Field::text("User", 16, "admin")).unwrap();
        let key = store.register(Field::password("Key", 16)).unwrap();
        store.begin().unwrap();
        store.set_text(key, "s3cret").unwrap();

        let rejected = store.parse_update(|id| match id {
            "f1" => Some(""),
            "f2" => Some(""),
            _ => None,
        });
        assert!(rejected.is_empty());
        assert_eq!(store.text(user), Some(""));
        assert_eq!(store.text(key), Some("s3cret"));

        store.parse_update(|id| (id == "f2").then_some("n3w"));
        assert_eq!(store.text(key), Some("n3w"));
    }

    #[test]
    fn submit_update_reports_rejected_and_saves() {
        let (mut store, [_, interval, _]) = store_with_three_fields();
        store.begin().unwrap();
        let rejected = store
            .submit_update(|id| (id == "f2").then_some("soon"))
            .unwrap();
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].id, interval);
        assert!(!store.is_dirty());
        assert_eq!(store.storage().writes, 1);
    }

    // =========================================================================
    // Access
    // =========================================================================

    #[test]
    fn typed_access_checks_kind() {
        let (mut store, [host, interval, _]) = store_with_three_fields();
        assert_eq!(store.integer(host), None);
        assert_eq!(store.text(interval), None);
        assert_eq!(
            store.set_boolean(interval, true),
            Err(SettingsError::KindMismatch {
                id: interval,
                expected: "integer"
            })
        );
        assert_eq!(
            store.set_integer(FieldId(9), 1),
            Err(SettingsError::UnknownField(FieldId(9)))
        );
    }

    #[test]
    fn find_by_label() {
        let (store, [_, interval, _]) = store_with_three_fields();
        assert_eq!(store.find("Interval"), Some(interval));
        assert_eq!(store.find("Missing"), None);
    }

    #[test]
    fn field_id_form_round_trip() {
        let id = FieldId(11);
        assert_eq!(id.to_string(), "f12");
        assert_eq!(id.form_id().as_str(), "f12");
        assert_eq!(FieldId::from_form_id("f12"), Some(id));
        assert_eq!(FieldId::from_form_id("f0"), None);
        assert_eq!(FieldId::from_form_id("x1"), None);
    }

    #[test]
    fn field_id_range_fits_form_id() {
        let last = FieldId(MAX_FIELDS - 1);
        assert_eq!(last.form_id().as_str(), "f9999999");
        assert_eq!(FieldId::from_form_id("f9999999"), Some(last));
        assert_eq!(FieldId::from_form_id("f10000000"), None);
    }

    #[test]
    fn register_caps_max_fields_set_directly() {
        let mut config = StoreConfig::default();
        config.max_fields = usize::MAX;
        let store = SettingsStore::new(MockEeprom::new(512), config);
        assert_eq!(store.max_fields(), MAX_FIELDS);
    }

    #[test]
    fn error_display() {
        let err: SettingsError<MockEepromError> = SettingsError::SchemaOverflow {
            required: 600,
            capacity: 512,
        };
        assert_eq!(
            err.to_string(),
            "settings record needs 600 bytes but only 512 are available"
        );

        let err: SettingsError<MockEepromError> = SettingsError::TextTooLarge {
            label: "Notes",
            size: 200,
            max: 129,
        };
        assert_eq!(
            err.to_string(),
            "settings field 'Notes' declares 200 bytes, at most 129 are supported"
        );
    }

    // =========================================================================
    // Serialization
    // =========================================================================

    #[cfg(feature = "serde-json-core")]
    #[test]
    fn snapshot_json_lists_fields_in_order() {
        let (mut store, _) = store_with_three_fields();
        store.begin().unwrap();

        let mut buf = [0u8; 256];
        let len = store.snapshot_json(&mut buf).unwrap();
        let json = core::str::from_utf8(&buf[..len]).unwrap();
        assert_eq!(
            json,
            "[{\"id\":\"f1\",\"label\":\"Host\",\"kind\":\"text\",\"value\":\"heatpump\"},\
             {\"id\":\"f2\",\"label\":\"Interval\",\"kind\":\"integer\",\"value\":10},\
             {\"id\":\"f3\",\"label\":\"Enabled\",\"kind\":\"boolean\",\"value\":true}]"
        );
    }

    #[cfg(feature = "serde")]
    #[test]
    fn snapshot_hides_password_values() {
        let mut store = SettingsStore::new(MockEeprom::new(512), StoreConfig::default());
        store.register(Field::text("SSID", 32, "attic")).unwrap();
        let key = store.register(Field::password("WiFi key", 32)).unwrap();
        store.begin().unwrap();
        store.set_text(key, "hunter2-secret").unwrap();

        let fields: Vec<FieldSnapshot<'_>> = store.snapshot().iter().collect();
        assert_eq!(fields[0].value, FieldValue::Text(crate::config::bounded("attic")));
        assert_eq!(fields[1].kind, "password");
        assert_eq!(fields[1].value, FieldValue::Text(TextValue::new()));
        // The stored value itself is untouched
        assert_eq!(store.text(key), Some("hunter2-secret"));
    }

    #[cfg(feature = "serde-json-core")]
    #[test]
    fn snapshot_json_reports_short_buffer() {
        let (store, _) = store_with_three_fields();
        let mut buf = [0u8; 16];
        assert!(store.snapshot_json(&mut buf).is_err());
    }
}
