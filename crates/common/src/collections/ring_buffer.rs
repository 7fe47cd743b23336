//! A fixed-capacity FIFO buffer that evicts its oldest entry when full.
//!
//! Used for bounded histories such as the recovery manager's recent-failure
//! log: pushing onto a full [`RingBuffer`] discards logical index `0` and
//! appends the new value, so the buffer always holds the most recent
//! `capacity` items in insertion order.
//!
//! # Complexity
//! - `push`, `pop`, `get`, `latest`, `len`, `is_full` are **O(1)**.
//! - `to_vec` is **O(n)**.

use std::collections::VecDeque;

/// A fixed-capacity circular buffer storing elements in first-in-first-out
/// order.
///
/// # Examples
///
/// ```rust
/// use recur_common::collections::RingBuffer;
///
/// let mut failures = RingBuffer::new(2);
/// assert_eq!(failures.push("timeout"), None);
/// assert_eq!(failures.push("refused"), None);
/// assert_eq!(failures.push("reset"), Some("timeout"));
///
/// assert_eq!(failures.to_vec(), vec!["refused", "reset"]);
/// assert_eq!(failures.latest(), Some(&"reset"));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RingBuffer<T> {
    buf: VecDeque<T>,
    capacity: usize,
}

impl<T> RingBuffer<T> {
    /// Creates a new buffer with the provided capacity.
    ///
    /// A capacity of zero is clamped to `1`.
    #[inline]
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { buf: VecDeque::with_capacity(capacity), capacity }
    }

    /// Appends an item, returning the evicted oldest item when the buffer was
    /// already full.
    #[inline]
    pub fn push(&mut self, item: T) -> Option<T> {
        let evicted = if self.is_full() { self.buf.pop_front() } else { None };
        self.buf.push_back(item);
        evicted
    }

    /// Removes and returns the oldest item in the buffer.
    #[inline]
    pub fn pop(&mut self) -> Option<T> {
        self.buf.pop_front()
    }

    /// Returns the value at `idx`, counting from the oldest element.
    #[inline]
    #[must_use]
    pub fn get(&self, idx: usize) -> Option<&T> {
        self.buf.get(idx)
    }

    /// Returns the most recently pushed element.
    #[inline]
    #[must_use]
    pub fn latest(&self) -> Option<&T> {
        self.buf.back()
    }

    /// Returns the number of items currently stored.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns `true` when the buffer has no items.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Returns `true` when the buffer reached its capacity.
    #[inline]
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.len() >= self.capacity
    }

    /// Returns the maximum number of items the buffer can hold.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Removes all elements, leaving the capacity unchanged.
    #[inline]
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Returns an iterator visiting elements from oldest to newest.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.buf.iter()
    }
}

impl<T: Clone> RingBuffer<T> {
    /// Copies the contents, oldest first.
    #[must_use]
    pub fn to_vec(&self) -> Vec<T> {
        self.buf.iter().cloned().collect()
    }
}

impl<T> Default for RingBuffer<T> {
    fn default() -> Self {
        Self::new(1)
    }
}

impl<'a, T> IntoIterator for &'a RingBuffer<T> {
    type Item = &'a T;
    type IntoIter = std::collections::vec_deque::Iter<'a, T>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.buf.iter()
    }
}
