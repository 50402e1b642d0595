//! Fixed-width text ring log for event and audit lines.
//!
//! [`TextLog`] is a [`RingLog`] of `heapless::String<E>` entries. All `N`
//! slots live in one inline array, so appending an event line never touches
//! the heap. Text longer than `E` bytes is cut at the last full UTF-8
//! character that fits.
//!
//! # Example
//!
//! ```rust
//! use esp_core_kit::TextLog;
//!
//! let mut events: TextLog<4, 16> = TextLog::new();
//! events.add("boot");
//! events.add_fmt(format_args!("{:02}:{:02} pump on", 7, 30));
//! events.add("a message that is far too long");
//!
//! assert_eq!(events.count(), 3);
//! assert_eq!(events.entry_from_end(2), Some("07:30 pump on"));
//! assert_eq!(events.latest(), Some("a message that i"));
//! ```

use core::fmt::{self, Write};

use heapless::String;

use crate::config::{bounded, truncate_str};
use crate::ring_log::{self, RingLog};

/// Ring log of `N` text entries, each holding at most `E` bytes.
#[derive(Clone, Debug, Default)]
pub struct TextLog<const N: usize, const E: usize> {
    inner: RingLog<String<E>, N>,
}

impl<const N: usize, const E: usize> TextLog<N, E> {
    /// Creates an empty log.
    pub const fn new() -> Self {
        Self {
            inner: RingLog::new(),
        }
    }

    /// Maximum number of entries (`N`).
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Maximum bytes per entry (`E`).
    pub const fn entry_size(&self) -> usize {
        E
    }

    /// Number of stored entries.
    pub fn count(&self) -> usize {
        self.inner.count()
    }

    /// Returns `true` if no entries are stored.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Copies `text` into the log, evicting the oldest entry when full.
    ///
    /// Returns the stored (possibly truncated) text.
    pub fn add(&mut self, text: &str) -> &str {
        self.inner.add(bounded(text)).as_str()
    }

    /// Formats a new entry in place, truncating whatever does not fit.
    pub fn add_fmt(&mut self, args: fmt::Arguments<'_>) -> &str {
        let mut entry = Truncating(String::new());
        // Truncating never reports an error
        let _ = entry.write_fmt(args);
        self.inner.add(entry.0).as_str()
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.inner.clear();
    }

    /// Oldest entry; resets the cursor to it.
    pub fn first_entry(&mut self) -> Option<&str> {
        self.inner.first_entry().map(String::as_str)
    }

    /// Advances the cursor; `None` once the newest entry has been passed.
    pub fn next_entry(&mut self) -> Option<&str> {
        self.inner.next_entry().map(String::as_str)
    }

    /// Entry `n` back from the end, `n = 1` being the newest.
    pub fn entry_from_end(&self, n: usize) -> Option<&str> {
        self.inner.entry_from_end(n).map(String::as_str)
    }

    /// Most recent entry.
    pub fn latest(&self) -> Option<&str> {
        self.inner.latest().map(String::as_str)
    }

    /// Iterates oldest to newest; `.rev()` for newest-first.
    pub fn iter(&self) -> Iter<'_, N, E> {
        Iter(self.inner.iter())
    }
}

/// Iterator over [`TextLog`] entries as `&str`.
#[derive(Clone, Debug)]
pub struct Iter<'a, const N: usize, const E: usize>(ring_log::Iter<'a, String<E>, N>);

impl<'a, const N: usize, const E: usize> Iterator for Iter<'a, N, E> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(String::as_str)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

impl<const N: usize, const E: usize> DoubleEndedIterator for Iter<'_, N, E> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.0.next_back().map(String::as_str)
    }
}

impl<const N: usize, const E: usize> ExactSizeIterator for Iter<'_, N, E> {}

impl<'a, const N: usize, const E: usize> IntoIterator for &'a TextLog<N, E> {
    type Item = &'a str;
    type IntoIter = Iter<'a, N, E>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// `fmt::Write` adapter that drops output past capacity instead of failing.
struct Truncating<const E: usize>(String<E>);

impl<const E: usize> Write for Truncating<E> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let room = E - self.0.len();
        let _ = self.0.push_str(truncate_str(s, room));
        Ok(())
    }
}
