//! Store and service configuration shared by desktop builds and firmware.
//!
//! Uses `heapless::String` for `no_std` compatibility while remaining
//! ergonomic to use on desktop with `std`.
//!
//! # Example
//!
//! ```rust
//! use esp_core_kit::config::{StoreConfig, WebConfig};
//!
//! // Use defaults (512 byte EEPROM page, offset 0)
//! let config = StoreConfig::default();
//! assert_eq!(config.capacity, 512);
//!
//! // Or customize
//! let config = StoreConfig::default()
//!     .with_magic(0xBEEF_0001)
//!     .with_offset(16)
//!     .with_capacity(256);
//! let web = WebConfig::default().with_port(3000);
//! ```

use heapless::String as HString;

/// Magic sentinel written in front of every persisted settings record.
pub const DEFAULT_MAGIC: u32 = 0xC0DE_5E77;

/// EEPROM size reserved for settings on the ESP8266/ESP32 sketches.
pub const DEFAULT_CAPACITY: usize = 512;

/// Upper bound on the number of registered fields.
pub const DEFAULT_MAX_FIELDS: usize = 32;

/// Largest field count whose form ids (`f1`..`f9999999`) fit in a
/// [`FieldId::form_id`](crate::settings::FieldId::form_id) buffer.
pub const MAX_FIELDS: usize = 9_999_999;

// ============================================================================
// Helpers for bounded strings
// ============================================================================

/// Returns the longest prefix of `s` that fits in `max` bytes without
/// splitting a UTF-8 character.
pub fn truncate_str(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let valid_end = s
        .char_indices()
        .take_while(|(i, c)| i + c.len_utf8() <= max)
        .last()
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(0);
    &s[..valid_end]
}

/// Create a bounded string from a &str, truncating if too long
pub fn bounded<const N: usize>(s: &str) -> HString<N> {
    let mut hs = HString::new();
    // Always fits after truncation
    let _ = hs.push_str(truncate_str(s, N));
    hs
}

// ============================================================================
// Store Config
// ============================================================================

/// Persistent settings store configuration
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StoreConfig {
    /// Sentinel that marks an initialized record
    pub magic: u32,
    /// Byte offset of the record inside the storage device
    pub offset: u32,
    /// Maximum record size in bytes (magic included)
    pub capacity: usize,
    /// Maximum number of registered fields, at most [`MAX_FIELDS`]
    pub max_fields: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            magic: DEFAULT_MAGIC,
            offset: 0,
            capacity: DEFAULT_CAPACITY,
            max_fields: DEFAULT_MAX_FIELDS,
        }
    }
}

impl StoreConfig {
    /// Set the magic sentinel.
    ///
    /// Changing the magic invalidates every record written with the old one,
    /// which is the usual way to force defaults after a schema change.
    pub fn with_magic(mut self, magic: u32) -> Self {
        self.magic = magic;
        self
    }

    /// Set the record offset
    pub fn with_offset(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }

    /// Set the record capacity
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Set the maximum field count, capped at [`MAX_FIELDS`]
    pub fn with_max_fields(mut self, max_fields: usize) -> Self {
        self.max_fields = max_fields.min(MAX_FIELDS);
        self
    }
}

// ============================================================================
// Web Config
// ============================================================================

/// Web server configuration
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WebConfig {
    /// Port to listen on
    pub port: u16,
    /// Whether the JSON API allows every origin
    pub cors_permissive: bool,
    /// Page title shown on the settings form
    pub title: HString<32>,
    /// Whether web server is enabled
    pub enabled: bool,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            cors_permissive: true,
            title: bounded("Settings"),
            enabled: true,
        }
    }
}

impl WebConfig {
    /// Set the port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set CORS mode
    pub fn with_cors(mut self, permissive: bool) -> Self {
        self.cors_permissive = permissive;
        self
    }

    /// Set the page title
    pub fn with_title(mut self, title: &str) -> Self {
        self.title = bounded(title);
        self
    }

    /// Enable or disable web server
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_store_config() {
        let config = StoreConfig::default();
        assert_eq!(config.magic, DEFAULT_MAGIC);
        assert_eq!(config.offset, 0);
        assert_eq!(config.capacity, 512);
        assert_eq!(config.max_fields, 32);
    }

    #[test]
    fn store_config_builder() {
        let config = StoreConfig::default()
            .with_magic(0x1234_5678)
            .with_offset(64)
            .with_capacity(128)
            .with_max_fields(4);

        assert_eq!(config.magic, 0x1234_5678);
        assert_eq!(config.offset, 64);
        assert_eq!(config.capacity, 128);
        assert_eq!(config.max_fields, 4);
    }

    #[test]
    fn max_fields_capped_to_form_id_range() {
        let config = StoreConfig::default().with_max_fields(usize::MAX);
        assert_eq!(config.max_fields, MAX_FIELDS);
    }

    #[test]
    fn web_config_default() {
        let web = WebConfig::default();
        assert_eq!(web.port, 8080);
        assert!(web.cors_permissive);
        assert_eq!(web.title.as_str(), "Settings");
        assert!(web.enabled);
    }

    #[test]
    fn web_config_builder() {
        let web = WebConfig::default()
            .with_port(3000)
            .with_cors(false)
            .with_title("Heat pump")
            .with_enabled(false);

        assert_eq!(web.port, 3000);
        assert!(!web.cors_permissive);
        assert_eq!(web.title.as_str(), "Heat pump");
        assert!(!web.enabled);
    }

    // =========================================================================
    // String Helper Tests
    // =========================================================================

    #[test]
    fn truncate_str_short_input_unchanged() {
        assert_eq!(truncate_str("abc", 8), "abc");
        assert_eq!(truncate_str("abc", 3), "abc");
    }

    #[test]
    fn truncate_str_cuts_to_max() {
        assert_eq!(truncate_str("abcdef", 4), "abcd");
        assert_eq!(truncate_str("abcdef", 0), "");
    }

    #[test]
    fn truncate_str_utf8_boundary() {
        // "é" is 2 bytes; cutting at 2 must not split it
        assert_eq!(truncate_str("aé", 2), "a");
        assert_eq!(truncate_str("aé", 3), "aé");
        // Each emoji is 4 bytes
        assert_eq!(truncate_str("🚂🚃", 7), "🚂");
    }

    #[test]
    fn bounded_truncation() {
        let long_input = "a".repeat(100);
        let s: HString<16> = bounded(&long_input);
        assert_eq!(s.len(), 16);
    }
}
