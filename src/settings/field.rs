//! Typed, self-describing configuration fields.
//!
//! A [`Field`] pairs a display label with a [`FieldKind`]: the current value
//! plus the schema needed to default it, clamp it, persist it, and render or
//! parse it as a form control.
//!
//! | Kind | Value | Persisted bytes | Form control |
//! |------|-------|-----------------|--------------|
//! | Text | bounded text | `size` | `type="text"` |
//! | Password | bounded text | `size` | `type="password"` |
//! | Integer | `i32` | 4 | `type="number"` |
//! | TimeSpan | `i32` seconds | 4 | `HH:MM:SS` text |
//! | Float | `f32` | 4 | `type="number"` with step |
//! | Boolean | `bool` | `width` (1..=4) | checkbox |
//!
//! Text sizes count the terminating NUL of the persisted record, so a text
//! field of size 32 holds at most 31 bytes.
//!
//! # Example
//!
//! ```rust
//! use esp_core_kit::settings::{Field, FieldValue};
//!
//! let mut interval = Field::integer("Interval", 6, 25, 10);
//! assert_eq!(interval.value(), FieldValue::Integer(10));
//!
//! interval.parse(Some("100")).unwrap();
//! interval.validate();
//! assert_eq!(interval.value(), FieldValue::Integer(25));
//!
//! let mut runtime = Field::time_span("Pump runtime", 0, 86_400, 90);
//! assert_eq!(runtime.to_string(), "00:01:30");
//! runtime.parse(Some("01:02:03")).unwrap();
//! assert_eq!(runtime.value(), FieldValue::Integer(3723));
//! ```

use core::fmt::{self, Write};

use heapless::String;

use super::html;
use crate::config::{bounded, truncate_str};

/// Largest persisted text size (terminator included).
pub const MAX_TEXT_SIZE: usize = 129;

/// Largest text length in bytes.
pub const MAX_TEXT_LEN: usize = MAX_TEXT_SIZE - 1;

/// Bounded text held by text and password fields.
pub type TextValue = String<MAX_TEXT_LEN>;

/// Largest supported float precision.
pub const MAX_DECIMALS: u8 = 6;

// ============================================================================
// Values and errors
// ============================================================================

/// Kind-erased field value.
///
/// Time spans surface as [`Integer`](Self::Integer) seconds and passwords
/// as [`Text`](Self::Text).
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum FieldValue {
    /// Text or password
    Text(TextValue),
    /// Integer or time span in seconds
    Integer(i32),
    /// Float
    Float(f32),
    /// Boolean
    Boolean(bool),
}

/// Rejected field input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldError {
    /// Text could not be parsed as a finite number.
    InvalidNumber,
    /// Text is not `H:MM:SS`, `M:SS` or plain seconds.
    InvalidTimeSpan,
    /// Checkbox value is not one of the recognised spellings.
    InvalidBoolean,
    /// A value of the wrong kind was assigned.
    KindMismatch {
        /// Kind name of the field.
        expected: &'static str,
    },
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidNumber => f.write_str("not a valid number"),
            Self::InvalidTimeSpan => f.write_str("not a valid time span (HH:MM:SS)"),
            Self::InvalidBoolean => f.write_str("not a valid on/off value"),
            Self::KindMismatch { expected } => write!(f, "expected a {expected} value"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for FieldError {}

// ============================================================================
// Field
// ============================================================================

/// Schema and current value of a field, one variant per kind.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldKind {
    /// Free text, persisted NUL-padded in `size` bytes.
    Text {
        /// Persisted size including the terminator.
        size: usize,
        /// Value used by `initialize`.
        default: &'static str,
        /// Current value.
        value: TextValue,
    },
    /// Like `Text`, rendered as a masked input.
    Password {
        /// Persisted size including the terminator.
        size: usize,
        /// Value used by `initialize`.
        default: &'static str,
        /// Current value.
        value: TextValue,
    },
    /// Signed integer clamped to `[min, max]`.
    Integer {
        /// Lower bound.
        min: i32,
        /// Upper bound.
        max: i32,
        /// Value used by `initialize`.
        default: i32,
        /// Current value.
        value: i32,
    },
    /// Duration in seconds, shown as `HH:MM:SS`.
    TimeSpan {
        /// Lower bound in seconds.
        min: i32,
        /// Upper bound in seconds.
        max: i32,
        /// Value used by `initialize`.
        default: i32,
        /// Current value in seconds.
        value: i32,
    },
    /// Float clamped to `[min, max]`, shown with `decimals` digits.
    Float {
        /// Lower bound.
        min: f32,
        /// Upper bound.
        max: f32,
        /// Value used by `initialize`.
        default: f32,
        /// Fraction digits shown in the form.
        decimals: u8,
        /// Current value.
        value: f32,
    },
    /// On/off flag persisted in `width` bytes.
    Boolean {
        /// Value used by `initialize`.
        default: bool,
        /// Persisted size in bytes (1..=4).
        width: usize,
        /// Current value.
        value: bool,
    },
}

/// A labelled configuration field.
///
/// Constructors order `min`/`max`, clamp the default into range and start
/// the field at its default, so a new field always passes
/// [`validate`](Self::validate) unchanged.
#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    label: &'static str,
    kind: FieldKind,
}

impl Field {
    /// Text field persisted in `size` bytes (terminator included).
    ///
    /// `size` is kept as declared so the record layout never shifts behind
    /// the caller's back. Sizes above [`MAX_TEXT_SIZE`] are refused by
    /// [`SettingsStore::register`](super::SettingsStore::register); a zero
    /// size is raised to one.
    pub fn text(label: &'static str, size: usize, default: &'static str) -> Self {
        let size = size.max(1);
        Self::new(
            label,
            FieldKind::Text {
                size,
                default: truncate_str(default, size - 1),
                value: TextValue::new(),
            },
        )
    }

    /// Password field persisted in `size` bytes, empty by default.
    ///
    /// Sizes follow the same rules as [`text`](Self::text).
    pub fn password(label: &'static str, size: usize) -> Self {
        Self::new(
            label,
            FieldKind::Password {
                size: size.max(1),
                default: "",
                value: TextValue::new(),
            },
        )
    }

    /// Integer field.
    pub fn integer(label: &'static str, min: i32, max: i32, default: i32) -> Self {
        let (min, max) = ordered(min, max);
        Self::new(
            label,
            FieldKind::Integer {
                min,
                max,
                default: default.clamp(min, max),
                value: 0,
            },
        )
    }

    /// Time span field, bounds and default in seconds.
    pub fn time_span(label: &'static str, min: i32, max: i32, default: i32) -> Self {
        let (min, max) = ordered(min, max);
        Self::new(
            label,
            FieldKind::TimeSpan {
                min,
                max,
                default: default.clamp(min, max),
                value: 0,
            },
        )
    }

    /// Float field displayed with `decimals` fraction digits.
    pub fn float(label: &'static str, min: f32, max: f32, default: f32, decimals: u8) -> Self {
        let min = if min.is_finite() { min } else { f32::MIN };
        let max = if max.is_finite() { max } else { f32::MAX };
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        let default = if default.is_finite() { default } else { min };
        Self::new(
            label,
            FieldKind::Float {
                min,
                max,
                default: default.max(min).min(max),
                decimals: decimals.min(MAX_DECIMALS),
                value: 0.0,
            },
        )
    }

    /// Boolean field persisted in one byte.
    pub fn boolean(label: &'static str, default: bool) -> Self {
        Self::new(
            label,
            FieldKind::Boolean {
                default,
                width: 1,
                value: false,
            },
        )
    }

    /// Sets the persisted width of a boolean field (1..=4 bytes).
    ///
    /// Sketches that stored `bool` inside a packed C struct used 4 bytes for
    /// alignment. Has no effect on other kinds.
    pub fn with_width(mut self, width: usize) -> Self {
        if let FieldKind::Boolean { width: w, .. } = &mut self.kind {
            *w = width.clamp(1, 4);
        }
        self
    }

    fn new(label: &'static str, kind: FieldKind) -> Self {
        let mut field = Self { label, kind };
        field.initialize();
        field
    }

    /// Display label.
    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Schema and value.
    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    /// Short lowercase kind name, e.g. `"time_span"`.
    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            FieldKind::Text { .. } => "text",
            FieldKind::Password { .. } => "password",
            FieldKind::Integer { .. } => "integer",
            FieldKind::TimeSpan { .. } => "time_span",
            FieldKind::Float { .. } => "float",
            FieldKind::Boolean { .. } => "boolean",
        }
    }

    /// Number of bytes this field occupies in the persisted record.
    pub fn persisted_size(&self) -> usize {
        match self.kind {
            FieldKind::Text { size, .. } | FieldKind::Password { size, .. } => size,
            FieldKind::Integer { .. } | FieldKind::TimeSpan { .. } | FieldKind::Float { .. } => 4,
            FieldKind::Boolean { width, .. } => width,
        }
    }

    /// Current value.
    pub fn value(&self) -> FieldValue {
        match &self.kind {
            FieldKind::Text { value, .. } | FieldKind::Password { value, .. } => {
                FieldValue::Text(value.clone())
            }
            FieldKind::Integer { value, .. } | FieldKind::TimeSpan { value, .. } => {
                FieldValue::Integer(*value)
            }
            FieldKind::Float { value, .. } => FieldValue::Float(*value),
            FieldKind::Boolean { value, .. } => FieldValue::Boolean(*value),
        }
    }

    /// Assigns a value of matching kind, then validates it.
    pub fn set(&mut self, new_value: FieldValue) -> Result<(), FieldError> {
        let expected = self.kind_name();
        match (&mut self.kind, new_value) {
            (
                FieldKind::Text { value, .. } | FieldKind::Password { value, .. },
                FieldValue::Text(text),
            ) => *value = text,
            (
                FieldKind::Integer { value, .. } | FieldKind::TimeSpan { value, .. },
                FieldValue::Integer(v),
            ) => *value = v,
            (FieldKind::Float { value, .. }, FieldValue::Float(v)) => *value = v,
            (FieldKind::Boolean { value, .. }, FieldValue::Boolean(v)) => *value = v,
            _ => return Err(FieldError::KindMismatch { expected }),
        }
        self.validate();
        Ok(())
    }

    /// Resets the value to the declared default.
    pub fn initialize(&mut self) {
        match &mut self.kind {
            FieldKind::Text { default, value, .. } | FieldKind::Password { default, value, .. } => {
                *value = bounded(default);
            }
            FieldKind::Integer { default, value, .. }
            | FieldKind::TimeSpan { default, value, .. } => *value = *default,
            FieldKind::Float { default, value, .. } => *value = *default,
            FieldKind::Boolean { default, value, .. } => *value = *default,
        }
    }

    /// Brings the value back into its legal range.
    ///
    /// Numbers are clamped to `[min, max]`, non-finite floats fall back to
    /// the default, and text is cut at the first NUL and at `size - 1`
    /// bytes. Idempotent.
    pub fn validate(&mut self) {
        match &mut self.kind {
            FieldKind::Text { size, value, .. } | FieldKind::Password { size, value, .. } => {
                let text = value.as_str();
                let text = text.split('\0').next().unwrap_or("");
                let clipped: TextValue = bounded(truncate_str(text, *size - 1));
                *value = clipped;
            }
            FieldKind::Integer { min, max, value, .. }
            | FieldKind::TimeSpan { min, max, value, .. } => {
                *value = (*value).max(*min).min(*max);
            }
            FieldKind::Float {
                min,
                max,
                default,
                value,
                ..
            } => {
                if !value.is_finite() {
                    *value = *default;
                }
                *value = (*value).max(*min).min(*max);
            }
            FieldKind::Boolean { .. } => {}
        }
    }

    /// Updates the value from submitted form text.
    ///
    /// `None` means the control was absent from the submission: booleans
    /// read that as unchecked, every other kind keeps its value. On error
    /// the value is left untouched. The result is not clamped; call
    /// [`validate`](Self::validate) afterwards.
    pub fn parse(&mut self, raw: Option<&str>) -> Result<(), FieldError> {
        if let FieldKind::Boolean { value, .. } = &mut self.kind {
            *value = parse_boolean(raw.unwrap_or(""))?;
            return Ok(());
        }

        let Some(raw) = raw else {
            return Ok(());
        };

        match &mut self.kind {
            FieldKind::Text { size, value, .. } | FieldKind::Password { size, value, .. } => {
                *value = bounded(truncate_str(raw, *size - 1));
            }
            FieldKind::Integer { value, .. } => {
                let parsed: i64 = raw.trim().parse().map_err(|_| FieldError::InvalidNumber)?;
                *value = saturate(parsed);
            }
            FieldKind::TimeSpan { value, .. } => {
                let seconds = parse_time_span(raw).ok_or(FieldError::InvalidTimeSpan)?;
                *value = saturate(seconds);
            }
            FieldKind::Float { value, .. } => {
                let parsed: f32 = raw.trim().parse().map_err(|_| FieldError::InvalidNumber)?;
                if !parsed.is_finite() {
                    return Err(FieldError::InvalidNumber);
                }
                *value = parsed;
            }
            FieldKind::Boolean { .. } => {}
        }
        Ok(())
    }

    /// Writes one form row for this field with control id `id`.
    ///
    /// The label is only display text; the control is identified by `id`.
    pub fn render<W: Write + ?Sized>(&self, w: &mut W, id: &str) -> fmt::Result {
        html::row_start(w, id, self.label)?;
        match &self.kind {
            FieldKind::Text { size, .. } => {
                html::input_start(w, "text", id)?;
                html::value_attr(w, self)?;
                write!(w, " maxlength=\"{}\"", size - 1)?;
            }
            FieldKind::Password { size, .. } => {
                html::input_start(w, "password", id)?;
                html::value_attr(w, self)?;
                write!(w, " maxlength=\"{}\"", size - 1)?;
            }
            FieldKind::Integer { min, max, .. } => {
                html::input_start(w, "number", id)?;
                html::value_attr(w, self)?;
                write!(w, " min=\"{min}\" max=\"{max}\" step=\"1\"")?;
            }
            FieldKind::TimeSpan { .. } => {
                html::input_start(w, "text", id)?;
                html::value_attr(w, self)?;
                w.write_str(" placeholder=\"HH:MM:SS\"")?;
            }
            FieldKind::Float {
                min, max, decimals, ..
            } => {
                let digits = usize::from(*decimals);
                html::input_start(w, "number", id)?;
                html::value_attr(w, self)?;
                write!(w, " min=\"{min:.digits$}\" max=\"{max:.digits$}\" step=\"")?;
                write_step(w, *decimals)?;
                w.write_str("\"")?;
            }
            FieldKind::Boolean { value, .. } => {
                html::input_start(w, "checkbox", id)?;
                w.write_str(" value=\"on\"")?;
                if *value {
                    w.write_str(" checked")?;
                }
            }
        }
        html::input_end(w)?;
        html::row_end(w)
    }

    /// Encodes the value into exactly [`persisted_size`](Self::persisted_size)
    /// bytes, host byte order.
    ///
    /// Text is NUL-padded; bytes beyond `out.len()` are not written.
    pub fn write_bytes(&self, out: &mut [u8]) {
        out.fill(0);
        match &self.kind {
            FieldKind::Text { size, value, .. } | FieldKind::Password { size, value, .. } => {
                put(out, truncate_str(value, size - 1).as_bytes());
            }
            FieldKind::Integer { value, .. } | FieldKind::TimeSpan { value, .. } => {
                put(out, &value.to_ne_bytes());
            }
            FieldKind::Float { value, .. } => put(out, &value.to_ne_bytes()),
            FieldKind::Boolean { value, width, .. } => {
                let raw = u32::from(*value).to_ne_bytes();
                let bytes = if cfg!(target_endian = "little") {
                    &raw[..*width]
                } else {
                    &raw[4 - *width..]
                };
                put(out, bytes);
            }
        }
    }

    /// Decodes a value written by [`write_bytes`](Self::write_bytes).
    ///
    /// Short input leaves numeric values unchanged; invalid UTF-8 text is
    /// cut at the first bad byte.
    pub fn read_bytes(&mut self, input: &[u8]) {
        match &mut self.kind {
            FieldKind::Text { size, value, .. } | FieldKind::Password { size, value, .. } => {
                let raw = &input[..input.len().min(*size - 1)];
                let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
                let raw = &raw[..end];
                let text = match core::str::from_utf8(raw) {
                    Ok(text) => text,
                    Err(e) => core::str::from_utf8(&raw[..e.valid_up_to()]).unwrap_or(""),
                };
                *value = bounded(text);
            }
            FieldKind::Integer { value, .. } | FieldKind::TimeSpan { value, .. } => {
                if let Some(raw) = word(input) {
                    *value = i32::from_ne_bytes(raw);
                }
            }
            FieldKind::Float { value, .. } => {
                if let Some(raw) = word(input) {
                    *value = f32::from_ne_bytes(raw);
                }
            }
            FieldKind::Boolean { value, width, .. } => {
                *value = input.iter().take(*width).any(|&b| b != 0);
            }
        }
    }
}

/// Human-readable value: text as-is, time spans as `HH:MM:SS`, floats with
/// the field's decimals, booleans as `on`/`off`.
impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            FieldKind::Text { value, .. } | FieldKind::Password { value, .. } => {
                f.write_str(value)
            }
            FieldKind::Integer { value, .. } => write!(f, "{value}"),
            FieldKind::TimeSpan { value, .. } => write_time_span(f, *value),
            FieldKind::Float {
                value, decimals, ..
            } => write!(f, "{:.*}", usize::from(*decimals), value),
            FieldKind::Boolean { value, .. } => f.write_str(if *value { "on" } else { "off" }),
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn ordered(a: i32, b: i32) -> (i32, i32) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

fn saturate(v: i64) -> i32 {
    i32::try_from(v).unwrap_or(if v < 0 { i32::MIN } else { i32::MAX })
}

fn put(out: &mut [u8], bytes: &[u8]) {
    let n = bytes.len().min(out.len());
    out[..n].copy_from_slice(&bytes[..n]);
}

fn word(input: &[u8]) -> Option<[u8; 4]> {
    input.get(..4)?.try_into().ok()
}

fn write_step<W: Write + ?Sized>(w: &mut W, decimals: u8) -> fmt::Result {
    if decimals == 0 {
        return w.write_str("1");
    }
    w.write_str("0.")?;
    for _ in 1..decimals {
        w.write_char('0')?;
    }
    w.write_char('1')
}

fn write_time_span<W: Write + ?Sized>(w: &mut W, seconds: i32) -> fmt::Result {
    let sign = if seconds < 0 { "-" } else { "" };
    let total = seconds.unsigned_abs();
    write!(
        w,
        "{sign}{:02}:{:02}:{:02}",
        total / 3600,
        total / 60 % 60,
        total % 60
    )
}

/// Parses `H:MM:SS`, `M:SS` or plain seconds, with an optional leading `-`.
fn parse_time_span(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    let (negative, digits) = match raw.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, raw),
    };

    let mut total: i64 = 0;
    for (i, part) in digits.split(':').enumerate() {
        let part = part.trim();
        if i >= 3 || part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let value: i64 = part.parse().ok()?;
        total = total.checked_mul(60)?.checked_add(value)?;
    }

    Some(if negative { -total } else { total })
}

fn parse_boolean(raw: &str) -> Result<bool, FieldError> {
    const TRUE: [&str; 4] = ["on", "true", "1", "yes"];
    const FALSE: [&str; 5] = ["", "off", "false", "0", "no"];

    let raw = raw.trim();
    if TRUE.iter().any(|t| t.eq_ignore_ascii_case(raw)) {
        Ok(true)
    } else if FALSE.iter().any(|f| f.eq_ignore_ascii_case(raw)) {
        Ok(false)
    } else {
        Err(FieldError::InvalidBoolean)
    }
}
