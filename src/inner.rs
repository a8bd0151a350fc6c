use crate::sync::{AtomicUsize, Ordering};

use std::cell::UnsafeCell;
use std::fmt;

/// The state shared between the write handle and all read handles.
///
/// Both copies of the data structure live here, together with the
/// publication bookkeeping: one reader counter per side, the side a new
/// reader registers on, and the side a new reader reads from. The two side
/// variables are sampled independently by readers, so they may momentarily
/// disagree; the writer's two-phase drain in
/// [`publish`](crate::WriteHandle::publish) is what makes that safe.
pub(crate) struct Inner<T> {
    /// The two copies. Exactly one is visible to readers at a time; the
    /// writer only ever touches the other.
    pub(crate) replicas: [UnsafeCell<T>; 2],
    /// How many readers are currently registered on each side.
    pub(crate) readers: [AtomicUsize; 2],
    /// Which side a newly arriving reader registers on (0 or 1).
    pub(crate) side_to_lock: AtomicUsize,
    /// Which copy a newly arriving reader reads from (0 or 1).
    pub(crate) side_to_read: AtomicUsize,
}

// Readers on any thread hold &T into a replica, and the write handle moves
// &mut T access across threads, so we need the same bounds as RwLock<T>.
// The swap protocol guarantees that a replica is never reachable by readers
// while the writer mutates it.
unsafe impl<T: Send> Send for Inner<T> {}
unsafe impl<T: Send + Sync> Sync for Inner<T> {}

impl<T> Inner<T> {
    pub(crate) fn new(left: T, right: T) -> Self {
        Self {
            replicas: [UnsafeCell::new(left), UnsafeCell::new(right)],
            readers: [AtomicUsize::new(0), AtomicUsize::new(0)],
            // Reads start on the left copy.
            side_to_lock: AtomicUsize::new(0),
            side_to_read: AtomicUsize::new(0),
        }
    }

    /// The index of the copy the writer may currently mutate.
    pub(crate) fn side_to_write(&self) -> usize {
        1 - self.side_to_read.load(Ordering::SeqCst)
    }
}

impl<T> fmt::Debug for Inner<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Inner")
            .field("readers", &self.readers)
            .field("side_to_lock", &self.side_to_lock)
            .field("side_to_read", &self.side_to_read)
            .finish_non_exhaustive()
    }
}
