//! In-memory storage for testing without hardware.
//!
//! [`MockEeprom`] implements the `embedded-storage` traits over a byte
//! vector, so a [`SettingsStore`](crate::settings::SettingsStore) can be
//! exercised on the desktop exactly as it runs against a device driver.
//!
//! # Example
//!
//! ```rust
//! use embedded_storage::{ReadStorage, Storage};
//! use esp_core_kit::hal::MockEeprom;
//!
//! let mut eeprom = MockEeprom::new(64);
//! eeprom.write(8, &[1, 2, 3]).unwrap();
//!
//! let mut buf = [0u8; 4];
//! eeprom.read(8, &mut buf).unwrap();
//! assert_eq!(buf, [1, 2, 3, 0xFF]);
//! assert_eq!(eeprom.writes, 1);
//! ```

use alloc::vec;
use alloc::vec::Vec;
use core::fmt;

use embedded_storage::{ReadStorage, Storage};

/// Size used by [`MockEeprom::default`], matching a typical `EEPROM.begin(512)`.
pub const DEFAULT_EEPROM_SIZE: usize = 512;

/// Errors reported by [`MockEeprom`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MockEepromError {
    /// Access past the end of the device.
    OutOfBounds {
        /// Requested offset.
        offset: u32,
        /// Requested length.
        len: usize,
    },
    /// Failure queued through [`MockEeprom::fail_next`].
    Injected,
}

impl fmt::Display for MockEepromError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfBounds { offset, len } => {
                write!(f, "access of {len} bytes at offset {offset} is out of bounds")
            }
            Self::Injected => write!(f, "injected storage failure"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for MockEepromError {}

/// Mock EEPROM backed by a byte vector.
///
/// Starts erased (`0xFF`). Use the public fields to inspect traffic or to
/// make the next access fail.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MockEeprom {
    data: Vec<u8>,
    /// Number of successful `read` calls.
    pub reads: usize,
    /// Number of successful `write` calls.
    pub writes: usize,
    /// Error returned by the next `read` or `write`, then cleared.
    pub fail_next: Option<MockEepromError>,
}

impl MockEeprom {
    /// Creates an erased device of `size` bytes.
    pub fn new(size: usize) -> Self {
        Self {
            data: vec![0xFF; size],
            reads: 0,
            writes: 0,
            fail_next: None,
        }
    }

    /// Raw contents.
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Overwrites every byte without counting a write.
    pub fn fill(&mut self, byte: u8) {
        self.data.fill(byte);
    }

    /// Restores the erased state.
    pub fn erase(&mut self) {
        self.fill(0xFF);
    }

    /// Preloads `bytes` at `offset` without counting a write.
    ///
    /// # Panics
    ///
    /// Panics if the range does not fit; this is a test fixture.
    pub fn load(&mut self, offset: usize, bytes: &[u8]) {
        self.data[offset..offset + bytes.len()].copy_from_slice(bytes);
    }

    fn range(&mut self, offset: u32, len: usize) -> Result<core::ops::Range<usize>, MockEepromError> {
        if let Some(err) = self.fail_next.take() {
            return Err(err);
        }
        let start = offset as usize;
        match start.checked_add(len) {
            Some(end) if end <= self.data.len() => Ok(start..end),
            _ => Err(MockEepromError::OutOfBounds { offset, len }),
        }
    }
}

impl Default for MockEeprom {
    fn default() -> Self {
        Self::new(DEFAULT_EEPROM_SIZE)
    }
}

impl ReadStorage for MockEeprom {
    type Error = MockEepromError;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        let range = self.range(offset, bytes.len())?;
        bytes.copy_from_slice(&self.data[range]);
        self.reads += 1;
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.data.len()
    }
}

impl Storage for MockEeprom {
    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        let range = self.range(offset, bytes.len())?;
        self.data[range].copy_from_slice(bytes);
        self.writes += 1;
        Ok(())
    }
}
