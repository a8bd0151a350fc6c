//! A concurrency primitive for high concurrency reads over a single-writer data structure.
//!
//! The primitive keeps two copies of the backing data structure, one that is accessed by readers,
//! and one that is accessed by the (single) writer. This enables all reads to proceed in parallel
//! with minimal coordination, and shifts the coordination overhead to the writer. Reads are
//! wait-free: a reader takes a guard with three atomic operations and no loops, no matter what
//! the writer or other readers are doing.
//!
//! Writes go to the invisible copy and are remembered in an operational log (a [`RingDeque`]).
//! When the writer wishes to expose its changes (see [`WriteHandle::publish`]), it flips which
//! copy readers see, waits for readers still on the old copy to leave, and then replays the log
//! onto the stale copy so the two are equal again. Each logged operation is thus applied exactly
//! twice, once per copy, which is why operations must be deterministic (see [`Update`]).
//!
//! # Trade-offs
//!
//! Few concurrency wins come for free, and this one is no exception:
//!
//!  - **Increased memory use**: the backing data is stored twice, and the operational log grows
//!    with every write until the next publish.
//!  - **Deterministic operations**: operations are applied once to each copy; anything
//!    non-deterministic in [`Update::update`] makes the copies drift apart permanently.
//!  - **Single writer**: there is one [`WriteHandle`], and its methods take `&mut self`. To have
//!    multiple writers you need to serialize them externally, e.g. with a
//!    [`Mutex`](std::sync::Mutex).
//!  - **Batched visibility**: readers see nothing until the writer publishes, and a publish can
//!    take as long as the longest concurrent read.
//!
//! # How does it work?
//!
//! Four pieces of shared atomic state coordinate the two sides: a reader counter per side, the
//! side an arriving reader registers its counter increment on (`side_to_lock`), and the copy an
//! arriving reader actually reads (`side_to_read`). A reader samples those two sides in two
//! separate atomic operations, which keeps [`ReadHandle::enter`] wait-free but means a reader
//! can be registered on one side while reading the other while a publish is in flight.
//!
//! [`WriteHandle::publish`] tolerates that split: it flips `side_to_read`, waits for the side it
//! is about to direct registrations to to drain, flips `side_to_lock`, and then waits for the
//! previous registration side to drain. After both waits, no reader can still be looking at the
//! old read copy, so the writer replays the log onto it and it becomes the new write copy.
//!
//! # How do I use it?
//!
//! Implement [`Update`] for your data structure, with the operation type as the generic
//! parameter, then construct a pair of handles:
//!
//! ```rust
//! use leftright::Update;
//! use std::collections::BTreeMap;
//!
//! // The operation the store accepts. For most real-world use-cases, this
//! // will be an enum with a variant per kind of mutation.
//! struct Set(String, String);
//!
//! #[derive(Default)]
//! struct Store(BTreeMap<String, String>);
//!
//! impl Update<Set> for Store {
//!     // update() reports the key it touched.
//!     type Output = String;
//!
//!     fn update(&mut self, op: &Set) -> String {
//!         self.0.insert(op.0.clone(), op.1.clone());
//!         op.0.clone()
//!     }
//! }
//!
//! let (mut w, r) = leftright::new::<Store, Set>();
//!
//! // Writes are applied immediately, but only to the copy readers cannot see.
//! w.write(Set("x".to_string(), "1".to_string()));
//! assert_eq!(r.enter().0.get("x"), None);
//!
//! // Publishing swaps the copies and replays the log onto the stale one,
//! // returning the replay results in write order.
//! let replayed = w.publish();
//! assert_eq!(replayed, ["x"]);
//! assert_eq!(r.enter().0.get("x").map(String::as_str), Some("1"));
//!
//! // The write handle can read too, and sees the same published copy.
//! assert_eq!(w.enter().0.get("x").map(String::as_str), Some("1"));
//! ```
//!
//! The values you dereference out of a [`ReadGuard`] are tied to the lifetime of that guard,
//! much like with `Mutex` or `RefCell` guards. For methods that return references deeper into
//! your data structure, see [`ReadGuard::map`] and [`ReadGuard::try_map`].
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    rustdoc::broken_intra_doc_links
)]

mod sync;

use crate::sync::Arc;

mod deque;
pub use crate::deque::{PopError, RingDeque};

mod inner;
use crate::inner::Inner;

mod write;
pub use crate::write::WriteHandle;

mod read;
pub use crate::read::{ReadGuard, ReadHandle};

/// Types that can deterministically apply operations of type `O`.
///
/// Each operation given to [`WriteHandle::write`] is applied once to each of the two copies of
/// the data structure, so `update` must be deterministic: applying the same sequence of
/// operations to two initially equal values must leave them equal. In particular, `update` must
/// not consult wall-clock time, random state, or anything else outside the value and the
/// operation. Be mindful of hidden state in types that are often assumed deterministic, like the
/// `RandomState` of a `HashMap`, which can change iteration order between the two copies.
///
/// `update` may freely mutate `self`; it should not mutate anything else observable. The
/// operation is borrowed because it outlives the first application: it sits in the operational
/// log until the next [`WriteHandle::publish`] replays it onto the other copy.
///
/// A panic inside `update` leaves the two copies permanently inconsistent; the lock makes no
/// attempt to catch it.
pub trait Update<O> {
    /// The value produced by applying an operation.
    type Output;

    /// Apply `operation` to this value, producing an [`Output`](Update::Output).
    fn update(&mut self, operation: &O) -> Self::Output;
}

/// Construct a new write and read handle pair from two equal instances of the data structure.
///
/// The two instances must be equal in the sense of [`Update`]'s determinism contract: applying
/// the same operations to both must keep them indistinguishable. The pair takes exclusive
/// ownership of both; this is not checked, and handing in unequal instances makes reads
/// nondeterministic (readers alternate between the copies across publishes).
pub fn new_from_equal<T, O>(left: T, right: T) -> (WriteHandle<T, O>, ReadHandle<T>)
where
    T: Update<O>,
{
    let inner = Arc::new(Inner::new(left, right));
    let r = ReadHandle::new(Arc::clone(&inner));
    let w = WriteHandle::new(inner, r.clone());
    (w, r)
}

/// Construct a new write and read handle pair from the data structure's default value.
///
/// You must ensure that `T`'s `Default` implementation is deterministic: the two instances it
/// produces here must behave exactly the same under [`Update`]. An example of where this goes
/// wrong is `HashMap`, whose `Default` picks a random hasher seed and with it a per-instance
/// iteration order. If your type's `Default` does not guarantee this, construct the two
/// instances yourself and use [`new_from_equal`].
pub fn new<T, O>() -> (WriteHandle<T, O>, ReadHandle<T>)
where
    T: Update<O> + Default,
{
    new_from_equal(T::default(), T::default())
}

#[cfg(test)]
pub(crate) struct CounterAddOp(pub(crate) i32);

#[cfg(test)]
impl Update<CounterAddOp> for i32 {
    type Output = i32;

    fn update(&mut self, operation: &CounterAddOp) -> i32 {
        *self += operation.0;
        *self
    }
}
