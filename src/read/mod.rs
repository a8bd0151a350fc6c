use crate::inner::Inner;
use crate::sync::{Arc, Ordering};

use std::fmt;

mod guard;
pub use guard::ReadGuard;

/// A handle that may be used to read from the published copy.
///
/// A `ReadHandle` can be cloned freely and shared across threads; all
/// coordination lives in shared atomic counters. Writes are only visible
/// through it once the writer calls
/// [`WriteHandle::publish`](crate::WriteHandle::publish).
pub struct ReadHandle<T> {
    pub(crate) inner: Arc<Inner<T>>,
}

impl<T> fmt::Debug for ReadHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadHandle")
            .field("inner", &self.inner)
            .finish()
    }
}

impl<T> Clone for ReadHandle<T> {
    fn clone(&self) -> Self {
        ReadHandle {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> ReadHandle<T> {
    pub(crate) fn new(inner: Arc<Inner<T>>) -> Self {
        Self { inner }
    }

    /// Take out a guarded live reference to the published copy.
    ///
    /// While the guard lives, the writer can mutate the other copy but
    /// cannot complete a [`publish`](crate::WriteHandle::publish); the data
    /// behind the guard never changes under the reader.
    ///
    /// This is wait-free: one atomic load to pick the side to register on,
    /// one atomic increment to register, and one atomic load to pick the
    /// copy to read. The two side variables are read independently and may
    /// disagree when a publish is in flight; the writer's two-phase drain
    /// accounts for a reader registered on one side while reading the
    /// other.
    pub fn enter(&self) -> ReadGuard<'_, T> {
        let inner = &*self.inner;
        let ticket = inner.side_to_lock.load(Ordering::SeqCst);
        inner.readers[ticket].fetch_add(1, Ordering::SeqCst);

        let side = inner.side_to_read.load(Ordering::SeqCst);
        // safety: we are registered, so the writer will not hand out &mut
        // to this replica until every registered reader (us included) has
        // dropped its guard.
        let t = unsafe { &*inner.replicas[side].get() };

        ReadGuard {
            t,
            ticket,
            readers: &inner.readers,
        }
    }
}
