//! Fixed-capacity ring log with oldest-entry eviction.
//!
//! [`RingLog`] is the measurement history used by every device sketch: a
//! timer appends one snapshot per cycle, and a status page walks the log
//! either oldest-first or newest-first.
//!
//! # Storage
//!
//! Entries live inline in a `heapless::Vec<T, N>` that is filled once and
//! then reused as a circular array. Nothing is allocated after construction,
//! so a log can run indefinitely on a small heap. Logs of boxed entries
//! (`RingLog<Box<Sample>, 24>`) work the same way; eviction simply drops the
//! box.
//!
//! # Access Styles
//!
//! | Style | Methods |
//! |-------|---------|
//! | Cursor (one pass) | [`first_entry`](RingLog::first_entry), [`next_entry`](RingLog::next_entry) |
//! | Iterator | [`iter`](RingLog::iter), `iter().rev()` for newest-first |
//! | Newest-relative | [`entry_from_end`](RingLog::entry_from_end), [`latest`](RingLog::latest) |
//!
//! # Example
//!
//! ```rust
//! use esp_core_kit::RingLog;
//!
//! let mut log: RingLog<char, 3> = RingLog::new();
//! for c in ['A', 'B', 'C', 'D'] {
//!     log.add(c);
//! }
//!
//! // 'A' was evicted
//! assert_eq!(log.count(), 3);
//! assert!(log.iter().copied().eq(['B', 'C', 'D']));
//!
//! // Newest-first for status pages
//! assert!(log.iter().rev().copied().eq(['D', 'C', 'B']));
//! assert_eq!(log.entry_from_end(1), Some(&'D'));
//! ```

use core::iter::FusedIterator;

use heapless::Vec;

/// Bounded circular log holding at most `N` entries.
///
/// When the log is full, [`add`](Self::add) drops the oldest entry to make
/// room. The log owns its entries; callers only get shared references
/// (plus the `&mut` returned by `add` for the entry just stored).
///
/// # Invariants
///
/// - `0 <= count() <= N`
/// - The write position is `(start + count) % N`
/// - `start` only moves once the log is full
///
/// `N` must be non-zero; this is checked at compile time.
#[derive(Clone, Debug)]
pub struct RingLog<T, const N: usize> {
    slots: Vec<T, N>,
    /// Physical index of the oldest entry.
    start: usize,
    /// Logical index of the cursor, `None` when exhausted or not started.
    cursor: Option<usize>,
}

impl<T, const N: usize> Default for RingLog<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const N: usize> RingLog<T, N> {
    const NON_ZERO_CAPACITY: () = assert!(N > 0, "RingLog capacity must be non-zero");

    /// Creates an empty log.
    pub const fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::NON_ZERO_CAPACITY;
        Self {
            slots: Vec::new(),
            start: 0,
            cursor: None,
        }
    }

    /// Maximum number of entries (`N`).
    #[inline]
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Number of occupied slots, `0..=N`.
    #[inline]
    pub fn count(&self) -> usize {
        self.slots.len()
    }

    /// Alias for [`count`](Self::count).
    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` if the log holds no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Returns `true` if the next [`add`](Self::add) will evict an entry.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.slots.len() == N
    }

    /// Appends an entry, evicting the oldest one if the log is full.
    ///
    /// Returns the stored entry so callers can fill in fields after
    /// insertion. Adding invalidates the iteration cursor; call
    /// [`first_entry`](Self::first_entry) to start a new pass.
    pub fn add(&mut self, entry: T) -> &mut T {
        self.cursor = None;

        let slot = if self.slots.len() < N {
            // Still filling: start is 0 and the write position is len
            let slot = self.slots.len();
            let _ = self.slots.push(entry);
            slot
        } else {
            // Full: overwrite (and drop) the oldest entry
            let slot = self.start;
            self.slots[slot] = entry;
            self.start = (self.start + 1) % N;
            slot
        };

        &mut self.slots[slot]
    }

    /// Drops every entry and resets all indices.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.start = 0;
        self.cursor = None;
    }

    /// Returns the entry at logical position `index` (0 = oldest).
    pub fn get(&self, index: usize) -> Option<&T> {
        if index >= self.slots.len() {
            return None;
        }
        self.slots.get(self.physical(index))
    }

    /// Oldest entry, without touching the cursor.
    pub fn oldest(&self) -> Option<&T> {
        self.get(0)
    }

    /// Most recently added entry.
    pub fn latest(&self) -> Option<&T> {
        self.entry_from_end(1)
    }

    /// Returns the entry `n` positions back from the end.
    ///
    /// `n = 1` is the most recently added entry and `n = count()` the
    /// oldest. `n = 0` and `n > count()` return `None`.
    ///
    /// ```rust
    /// use esp_core_kit::RingLog;
    ///
    /// let mut log: RingLog<u32, 4> = RingLog::new();
    /// log.add(10);
    /// log.add(20);
    ///
    /// assert_eq!(log.entry_from_end(1), Some(&20));
    /// assert_eq!(log.entry_from_end(2), Some(&10));
    /// assert_eq!(log.entry_from_end(0), None);
    /// assert_eq!(log.entry_from_end(3), None);
    /// ```
    pub fn entry_from_end(&self, n: usize) -> Option<&T> {
        if n == 0 || n > self.slots.len() {
            return None;
        }
        self.get(self.slots.len() - n)
    }

    /// Returns the oldest entry and moves the cursor to it.
    ///
    /// Returns `None` (and leaves the cursor exhausted) if the log is empty.
    pub fn first_entry(&mut self) -> Option<&T> {
        if self.slots.is_empty() {
            self.cursor = None;
            return None;
        }
        self.cursor = Some(0);
        self.get(0)
    }

    /// Advances the cursor and returns the entry under it.
    ///
    /// Returns `None` once the cursor reaches the write position. The pass
    /// is not restartable: further calls keep returning `None` until
    /// [`first_entry`](Self::first_entry) is called again.
    ///
    /// ```rust
    /// use esp_core_kit::RingLog;
    ///
    /// let mut log: RingLog<u8, 2> = RingLog::new();
    /// log.add(1);
    /// log.add(2);
    ///
    /// assert_eq!(log.first_entry(), Some(&1));
    /// assert_eq!(log.next_entry(), Some(&2));
    /// assert_eq!(log.next_entry(), None);
    /// assert_eq!(log.next_entry(), None);
    /// ```
    pub fn next_entry(&mut self) -> Option<&T> {
        let next = self.cursor? + 1;
        if next >= self.slots.len() {
            self.cursor = None;
            return None;
        }
        self.cursor = Some(next);
        self.get(next)
    }

    /// Iterates from oldest to newest. Use `.rev()` for newest-first.
    pub fn iter(&self) -> Iter<'_, T, N> {
        Iter {
            log: self,
            front: 0,
            back: self.slots.len(),
        }
    }

    #[inline]
    fn physical(&self, index: usize) -> usize {
        (self.start + index) % N
    }
}

/// Double-ended iterator over a [`RingLog`], oldest entry first.
#[derive(Clone, Debug)]
pub struct Iter<'a, T, const N: usize> {
    log: &'a RingLog<T, N>,
    front: usize,
    back: usize,
}

impl<'a, T, const N: usize> Iterator for Iter<'a, T, N> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.front >= self.back {
            return None;
        }
        let item = self.log.get(self.front);
        self.front += 1;
        item
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.back - self.front;
        (remaining, Some(remaining))
    }
}

impl<T, const N: usize> DoubleEndedIterator for Iter<'_, T, N> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front >= self.back {
            return None;
        }
        self.back -= 1;
        self.log.get(self.back)
    }
}

impl<T, const N: usize> ExactSizeIterator for Iter<'_, T, N> {}

impl<T, const N: usize> FusedIterator for Iter<'_, T, N> {}

impl<'a, T, const N: usize> IntoIterator for &'a RingLog<T, N> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T, N>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use alloc::rc::Rc;
    use alloc::vec::Vec as StdVec;
    use core::cell::Cell;

    fn collect<T: Copy, const N: usize>(log: &RingLog<T, N>) -> StdVec<T> {
        log.iter().copied().collect()
    }

    // =========================================================================
    // Capacity and eviction
    // =========================================================================

    #[test]
    fn new_log_is_empty() {
        let log: RingLog<u32, 4> = RingLog::new();
        assert_eq!(log.count(), 0);
        assert!(log.is_empty());
        assert!(!log.is_full());
        assert_eq!(log.capacity(), 4);
    }

    #[test]
    fn add_below_capacity_keeps_order() {
        let mut log: RingLog<u32, 4> = RingLog::new();
        log.add(1);
        log.add(2);
        log.add(3);
        assert_eq!(log.count(), 3);
        assert_eq!(collect(&log), [1, 2, 3]);
    }

    #[test]
    fn capacity_three_evicts_first_of_four() {
        let mut log: RingLog<char, 3> = RingLog::new();
        for c in ['A', 'B', 'C', 'D'] {
            log.add(c);
        }
        assert_eq!(collect(&log), ['B', 'C', 'D']);
    }

    #[test]
    fn count_never_exceeds_capacity() {
        let mut log: RingLog<usize, 5> = RingLog::new();
        for k in 1..=23 {
            log.add(k);
            assert!(log.count() <= 5);
            // Oldest surviving is the (k - N + 1)-th added
            let expected_first = if k > 5 { k - 5 + 1 } else { 1 };
            assert_eq!(log.oldest(), Some(&expected_first));
        }
    }

    #[test]
    fn add_returns_stored_entry() {
        let mut log: RingLog<(u8, u8), 2> = RingLog::new();
        let entry = log.add((1, 0));
        entry.1 = 42;
        assert_eq!(log.latest(), Some(&(1, 42)));
    }

    #[test]
    fn eviction_drops_entry() {
        let drops = Rc::new(Cell::new(0));

        struct Tracked(Rc<Cell<u32>>);
        impl Drop for Tracked {
            fn drop(&mut self) {
                self.0.set(self.0.get() + 1);
            }
        }

        let mut log: RingLog<Tracked, 2> = RingLog::new();
        log.add(Tracked(drops.clone()));
        log.add(Tracked(drops.clone()));
        assert_eq!(drops.get(), 0);

        log.add(Tracked(drops.clone()));
        assert_eq!(drops.get(), 1);

        log.clear();
        assert_eq!(drops.get(), 3);
    }

    // =========================================================================
    // Clear
    // =========================================================================

    #[test]
    fn clear_resets_everything() {
        let mut log: RingLog<u32, 3> = RingLog::new();
        for i in 0..7 {
            log.add(i);
        }
        log.clear();
        assert_eq!(log.count(), 0);
        assert_eq!(log.first_entry(), None);
        assert_eq!(log.next_entry(), None);

        // Reusable after clear
        log.add(9);
        assert_eq!(collect(&log), [9]);
    }

    // =========================================================================
    // Cursor
    // =========================================================================

    #[test]
    fn cursor_walks_wrapped_log_once() {
        let mut log: RingLog<u32, 3> = RingLog::new();
        for i in 1..=5 {
            log.add(i);
        }

        let mut seen = StdVec::new();
        let mut entry = log.first_entry().copied();
        while let Some(value) = entry {
            seen.push(value);
            entry = log.next_entry().copied();
        }
        assert_eq!(seen, [3, 4, 5]);

        // Not restartable without first_entry
        assert_eq!(log.next_entry(), None);
        assert_eq!(log.first_entry(), Some(&3));
    }

    #[test]
    fn cursor_on_empty_log() {
        let mut log: RingLog<u32, 3> = RingLog::new();
        assert_eq!(log.first_entry(), None);
        assert_eq!(log.next_entry(), None);
    }

    #[test]
    fn next_entry_without_first_is_none() {
        let mut log: RingLog<u32, 3> = RingLog::new();
        log.add(1);
        log.add(2);
        assert_eq!(log.next_entry(), None);
    }

    #[test]
    fn add_invalidates_cursor() {
        let mut log: RingLog<u32, 3> = RingLog::new();
        log.add(1);
        log.add(2);
        assert_eq!(log.first_entry(), Some(&1));
        log.add(3);
        assert_eq!(log.next_entry(), None);
    }

    // =========================================================================
    // Newest-relative access
    // =========================================================================

    #[test]
    fn entry_from_end_after_wrap() {
        let mut log: RingLog<u32, 3> = RingLog::new();
        for i in 1..=7 {
            log.add(i);
        }
        assert_eq!(log.entry_from_end(1), Some(&7));
        assert_eq!(log.entry_from_end(2), Some(&6));
        assert_eq!(log.entry_from_end(3), Some(&5));
        assert_eq!(log.entry_from_end(4), None);
        assert_eq!(log.entry_from_end(0), None);
    }

    #[test]
    fn entry_from_end_on_empty_log() {
        let log: RingLog<u32, 3> = RingLog::new();
        assert_eq!(log.entry_from_end(1), None);
        assert_eq!(log.latest(), None);
    }

    // =========================================================================
    // Iterator
    // =========================================================================

    #[test]
    fn iterator_is_double_ended_and_exact() {
        let mut log: RingLog<u32, 4> = RingLog::new();
        for i in 1..=6 {
            log.add(i);
        }
        let mut iter = log.iter();
        assert_eq!(iter.len(), 4);
        assert_eq!(iter.next(), Some(&3));
        assert_eq!(iter.next_back(), Some(&6));
        assert_eq!(iter.len(), 2);
        assert_eq!(iter.next(), Some(&4));
        assert_eq!(iter.next_back(), Some(&5));
        assert_eq!(iter.next(), None);
        assert_eq!(iter.next_back(), None);
    }

    #[test]
    fn into_iterator_for_reference() {
        let mut log: RingLog<u32, 2> = RingLog::new();
        log.add(1);
        log.add(2);
        let mut sum = 0;
        for v in &log {
            sum += v;
        }
        assert_eq!(sum, 3);
    }

    #[test]
    fn boxed_entries() {
        let mut log: RingLog<alloc::boxed::Box<[u8; 16]>, 2> = RingLog::new();
        log.add(alloc::boxed::Box::new([1; 16]));
        log.add(alloc::boxed::Box::new([2; 16]));
        log.add(alloc::boxed::Box::new([3; 16]));
        assert_eq!(log.oldest().map(|b| b[0]), Some(2));
        assert_eq!(log.latest().map(|b| b[0]), Some(3));
    }
}
