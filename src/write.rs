use crate::deque::RingDeque;
use crate::inner::Inner;
use crate::read::ReadHandle;
use crate::sync::{yield_now, Arc, Ordering};
use crate::Update;

use std::fmt;

/// A handle that may be used to modify the data structure.
///
/// There is exactly one `WriteHandle` per left-right pair, and its methods
/// take `&mut self`, so writer access is serialized by ownership. Changes
/// made with [`write`](WriteHandle::write) are applied to the copy readers
/// cannot see, and become visible only when [`publish`](WriteHandle::publish)
/// is called.
///
/// Dropping the write handle does not publish pending operations; readers
/// simply keep seeing the last published state.
pub struct WriteHandle<T, O>
where
    T: Update<O>,
{
    inner: Arc<Inner<T>>,
    /// Operations applied to the write copy but not yet to the read copy.
    /// Single-writer, single-consumer; never reachable from readers.
    oplog: RingDeque<O>,
    r_handle: ReadHandle<T>,
}

impl<T, O> fmt::Debug for WriteHandle<T, O>
where
    T: Update<O>,
    O: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriteHandle")
            .field("inner", &self.inner)
            .field("oplog", &self.oplog)
            .finish()
    }
}

impl<T, O> WriteHandle<T, O>
where
    T: Update<O>,
{
    pub(crate) fn new(inner: Arc<Inner<T>>, r_handle: ReadHandle<T>) -> Self {
        Self {
            inner,
            oplog: RingDeque::new(),
            r_handle,
        }
    }

    /// Apply `op` to the copy readers cannot see, and remember it for
    /// replay on the other copy at the next [`publish`](WriteHandle::publish).
    ///
    /// Returns whatever [`Update::update`] produced. The result reflects
    /// the write copy, which already contains every operation written since
    /// the pair was constructed; readers will not observe the effect until
    /// the next publish.
    pub fn write(&mut self, op: O) -> T::Output {
        // safety: we are the only writer, and the drains of the previous
        // publish guarantee no reader still holds a reference into the
        // write copy.
        let replica = unsafe { &mut *self.inner.replicas[self.inner.side_to_write()].get() };
        let result = replica.update(&op);
        self.oplog.push_back(op);
        result
    }

    /// Swap the two copies so readers see all operations written so far,
    /// then bring the stale copy up to date by replaying the log onto it.
    ///
    /// Returns the results of the replay, in the order the corresponding
    /// [`write`](WriteHandle::write) calls were made.
    ///
    /// This method must wait for readers to leave both sides before the
    /// old read copy can be mutated, so it can take as long as the
    /// longest-lived concurrent read guard. It never blocks readers: a
    /// reader arriving mid-publish simply reads the freshly published copy.
    pub fn publish(&mut self) -> Vec<T::Output> {
        self.swap();
        self.replay()
    }

    /// Flip the read side, then drain readers until the old read copy is
    /// unobservable.
    ///
    /// A reader samples the side to register on and the side to read from
    /// in two separate atomic operations, so it can end up registered on
    /// one side while reading the other. A single wait on the old lock side
    /// would miss such a reader. Instead:
    ///
    /// 1. flip `side_to_read`, so new readers see the write copy;
    /// 2. wait for the side we are *about* to register readers on to empty
    ///    (this catches readers that crossed sides during the previous
    ///    publish and are still reading what is now the old read copy);
    /// 3. flip `side_to_lock`;
    /// 4. wait for the previous lock side to empty, which covers every
    ///    reader that could still be reading the old read copy.
    ///
    /// After step 4 no reader is registered on the old lock side and none
    /// can be reading the old read copy, so it is safe to hand out
    /// `&mut` to it.
    fn swap(&mut self) {
        let inner = &*self.inner;

        // Both copies currently hold the same published prefix plus the
        // write copy's unreplayed suffix, so redirecting reads is safe at
        // any moment.
        let new_side_to_read = 1 - inner.side_to_read.load(Ordering::SeqCst);
        inner.side_to_read.store(new_side_to_read, Ordering::SeqCst);

        let next_lock = 1 - inner.side_to_lock.load(Ordering::SeqCst);
        while inner.readers[next_lock].load(Ordering::SeqCst) != 0 {
            yield_now();
        }

        inner.side_to_lock.store(next_lock, Ordering::SeqCst);
        let prev_lock = 1 - next_lock;
        while inner.readers[prev_lock].load(Ordering::SeqCst) != 0 {
            yield_now();
        }
    }

    /// Replay the pending log, in order, onto the copy that just stopped
    /// being read.
    fn replay(&mut self) -> Vec<T::Output> {
        // safety: swap() just drained every reader that could see this
        // copy, and new readers are directed to the other one.
        let replica = unsafe { &mut *self.inner.replicas[self.inner.side_to_write()].get() };
        let mut results = Vec::with_capacity(self.oplog.len());
        while let Ok(op) = self.oplog.pop_front() {
            results.push(replica.update(&op));
        }
        results
    }
}

// allow using write handle for reads
use std::ops::Deref;
impl<T, O> Deref for WriteHandle<T, O>
where
    T: Update<O>,
{
    type Target = ReadHandle<T>;
    fn deref(&self) -> &Self::Target {
        &self.r_handle
    }
}

#[cfg(test)]
mod tests {
    use crate::sync::Ordering;
    use crate::CounterAddOp;

    use std::thread;
    use std::time::Duration;

    #[test]
    fn publish_flips_sides_and_empties_log() {
        let (mut w, _r) = crate::new::<i32, CounterAddOp>();
        assert_eq!(w.inner.side_to_read.load(Ordering::SeqCst), 0);

        w.write(CounterAddOp(1));
        assert_eq!(w.oplog.len(), 1);

        w.publish();
        assert_eq!(w.inner.side_to_read.load(Ordering::SeqCst), 1);
        assert_eq!(w.inner.side_to_lock.load(Ordering::SeqCst), 1);
        assert_eq!(w.oplog.len(), 0);

        w.publish();
        assert_eq!(w.inner.side_to_read.load(Ordering::SeqCst), 0);
        assert_eq!(w.inner.side_to_lock.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn empty_publish_returns_no_results() {
        let (mut w, r) = crate::new::<i32, CounterAddOp>();
        assert!(w.publish().is_empty());
        assert_eq!(*r.enter(), 0);
    }

    // A reader can register on one side while reading the other when its
    // two atomic samples straddle a publish. Simulate the registered half
    // of such a reader by bumping the counter directly, and check that the
    // writer refuses to finish publishing until it is gone.
    #[test]
    fn crossed_reader_blocks_publish() {
        let (mut w, r) = crate::new::<i32, CounterAddOp>();
        r.inner.readers[1].fetch_add(1, Ordering::SeqCst);

        let writer = thread::spawn(move || {
            w.write(CounterAddOp(1));
            w.publish();
        });

        thread::sleep(Duration::from_millis(20));
        assert!(!writer.is_finished());

        r.inner.readers[1].fetch_sub(1, Ordering::SeqCst);
        writer.join().unwrap();
        assert_eq!(*r.enter(), 1);
    }
}
