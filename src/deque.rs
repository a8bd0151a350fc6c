//! The writer's pending-operation log.
//!
//! [`RingDeque`] is a double-ended queue over a circular buffer that doubles
//! in place when full, giving amortized O(1) pushes and pops at both ends.
//! The lock uses it to remember which operations have been applied to only
//! one of the two copies and must be replayed on the other after a
//! [`publish`](crate::WriteHandle::publish).
//!
//! Cells are `Option<T>`, and a cell is set back to `None` as soon as its
//! element is popped or relocated, so removed operations do not keep their
//! contents alive past their removal.

use std::iter;

/// Error returned when popping from an empty [`RingDeque`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PopError {
    /// The deque holds no elements.
    #[error("cannot pop from an empty deque")]
    Empty,
}

/// A double-ended queue backed by a growable ring buffer.
///
/// The buffer starts at a fixed capacity (16 for [`RingDeque::new`]) and
/// doubles whenever a push finds it full. It never shrinks.
///
/// ```
/// use leftright::RingDeque;
///
/// let mut q = RingDeque::new();
/// q.push_back('a');
/// q.push_front('b');
/// assert_eq!(q.pop_back(), Ok('a'));
/// assert_eq!(q.pop_back(), Ok('b'));
/// assert!(q.pop_back().is_err());
/// ```
#[derive(Debug)]
pub struct RingDeque<T> {
    /// Cell storage. `None` marks a cell with no live element.
    buf: Vec<Option<T>>,
    /// Index of the first live element, when `count > 0`.
    head: usize,
    /// Index of the last live element, when `count > 0`.
    tail: usize,
    /// Number of live elements.
    count: usize,
}

impl<T> Default for RingDeque<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> RingDeque<T> {
    /// Create an empty deque with the default initial capacity of 16.
    pub fn new() -> Self {
        Self::with_capacity(16)
    }

    /// Create an empty deque with space for `capacity` elements before the
    /// first grow.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: iter::repeat_with(|| None).take(capacity).collect(),
            head: 0,
            tail: 0,
            count: 0,
        }
    }

    /// The number of elements currently in the deque.
    pub fn len(&self) -> usize {
        self.count
    }

    /// Returns true if the deque holds no elements.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// The number of elements the buffer can hold before the next grow.
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Double the buffer if it is full, keeping the live window reachable.
    fn ensure_capacity(&mut self) {
        if self.count < self.buf.len() {
            return;
        }

        if self.buf.is_empty() {
            self.buf.push(None);
            return;
        }

        let cap = self.buf.len();
        if self.head == 0 {
            // Live elements already sit contiguously at the bottom; just
            // extend with empty cells.
            self.buf.resize_with(cap * 2, || None);
            return;
        }

        // The full window wraps: 6 7 T H 2 3 4 5. Double the buffer and move
        // the wrapped prefix [0..=tail] up into the new half so the window
        // becomes contiguous: . . . H 2 3 4 5 6 7 T . . . . .
        // The vacated cells are left empty so popped elements are not
        // retained.
        self.buf.resize_with(cap * 2, || None);
        for i in 0..=self.tail {
            // the upper cell is freshly None, so this both relocates the
            // element and clears the stale cell
            self.buf.swap(i, cap + i);
        }
        self.tail += cap;
    }

    /// Insert a new element at the back.
    pub fn push_back(&mut self, item: T) {
        self.ensure_capacity();
        if self.count == 0 {
            self.head = 0;
            self.tail = 0;
        } else {
            self.tail = (self.tail + 1) % self.buf.len();
        }
        self.buf[self.tail] = Some(item);
        self.count += 1;
    }

    /// Insert a new element at the front.
    pub fn push_front(&mut self, item: T) {
        self.ensure_capacity();
        if self.count == 0 {
            self.head = 0;
            self.tail = 0;
        } else {
            self.head = (self.head + self.buf.len() - 1) % self.buf.len();
        }
        self.buf[self.head] = Some(item);
        self.count += 1;
    }

    /// Remove and return the element at the back.
    pub fn pop_back(&mut self) -> Result<T, PopError> {
        if self.count == 0 {
            return Err(PopError::Empty);
        }
        let item = self.buf[self.tail]
            .take()
            .expect("tail cell of a non-empty deque is live");
        self.tail = (self.tail + self.buf.len() - 1) % self.buf.len();
        self.count -= 1;
        Ok(item)
    }

    /// Remove and return the element at the front.
    pub fn pop_front(&mut self) -> Result<T, PopError> {
        if self.count == 0 {
            return Err(PopError::Empty);
        }
        let item = self.buf[self.head]
            .take()
            .expect("head cell of a non-empty deque is live");
        self.head = (self.head + 1) % self.buf.len();
        self.count -= 1;
        Ok(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // All cells outside the live window must be None, or popped elements
    // would be kept alive by the buffer.
    fn assert_dead_cells_cleared(q: &RingDeque<i32>) {
        let cap = q.buf.len();
        if cap == 0 {
            return;
        }
        let live: Vec<usize> = (0..q.count).map(|i| (q.head + i) % cap).collect();
        for i in 0..cap {
            if live.contains(&i) {
                assert!(q.buf[i].is_some(), "live cell {} is empty", i);
            } else {
                assert!(q.buf[i].is_none(), "dead cell {} was not cleared", i);
            }
        }
    }

    #[test]
    fn grow_from_zero_capacity() {
        let mut q = RingDeque::with_capacity(0);
        assert_eq!(q.capacity(), 0);

        q.push_back(1);
        assert_eq!(q.capacity(), 1);
        q.push_back(2);
        assert_eq!(q.capacity(), 2);
        q.push_back(3);
        assert_eq!(q.capacity(), 4);
        q.push_back(4);
        assert_eq!(q.capacity(), 4);

        assert_eq!(q.pop_front(), Ok(1));
        assert_eq!(q.capacity(), 4);

        q.push_back(5);
        assert_eq!(q.capacity(), 4);
        q.push_back(6);
        assert_eq!(q.capacity(), 8);

        assert_eq!(q.len(), 5);
        for want in [2, 3, 4, 5, 6] {
            assert_eq!(q.pop_front(), Ok(want));
        }
        assert_eq!(q.len(), 0);
    }

    #[test]
    fn wrapped_grow_keeps_order_and_clears_stale_cells() {
        let mut q = RingDeque::with_capacity(4);
        for i in 0..4 {
            q.push_back(i);
        }
        // Wrap the window: head moves to 1, then the next push lands at 0.
        assert_eq!(q.pop_front(), Ok(0));
        q.push_back(4);
        assert_eq!(q.head, 1);
        assert_eq!(q.tail, 0);

        // This push finds the buffer full with a wrapped window and must
        // relocate the prefix into the upper half.
        q.push_back(5);
        assert_eq!(q.capacity(), 8);
        assert_dead_cells_cleared(&q);

        for want in [1, 2, 3, 4, 5] {
            assert_eq!(q.pop_front(), Ok(want));
        }
        assert!(q.is_empty());
    }

    #[test]
    fn pop_clears_cell() {
        let mut q = RingDeque::with_capacity(2);
        q.push_back(1);
        q.push_back(2);
        q.pop_front().unwrap();
        q.pop_back().unwrap();
        assert_dead_cells_cleared(&q);
    }

    #[test]
    fn interleaved_push_pop_drains_to_empty() {
        let mut q = RingDeque::with_capacity(3);
        for round in 0..20 {
            q.push_back(round);
            q.push_front(round + 100);
            assert_eq!(q.pop_back(), Ok(round));
            assert_eq!(q.pop_front(), Ok(round + 100));
            assert_dead_cells_cleared(&q);
        }
        assert_eq!(q.len(), 0);
    }
}
