use crate::sync::{AtomicUsize, Ordering};

use std::mem;

/// A guard wrapping a live reference into the read copy.
///
/// As long as this guard lives, the `T` being read cannot change, and a
/// writer that calls [`WriteHandle::publish`](crate::WriteHandle::publish)
/// will block until the guard is dropped. Dropping the guard deregisters
/// the reader from the side it registered on.
#[derive(Debug)]
pub struct ReadGuard<'rh, T: ?Sized> {
    // NOTE: _technically_ this is more like &'self.
    // the reference is valid until the guard is dropped.
    pub(super) t: &'rh T,
    /// The side this reader registered on. Not necessarily the side `t`
    /// lives on: the two are sampled independently.
    pub(super) ticket: usize,
    pub(super) readers: &'rh [AtomicUsize; 2],
}

impl<'rh, T: ?Sized> ReadGuard<'rh, T> {
    /// Makes a new `ReadGuard` for a component of the borrowed data.
    pub fn map<F, U: ?Sized>(orig: Self, f: F) -> ReadGuard<'rh, U>
    where
        F: for<'a> FnOnce(&'a T) -> &'a U,
    {
        let rg = ReadGuard {
            t: f(orig.t),
            ticket: orig.ticket,
            readers: orig.readers,
        };
        mem::forget(orig);
        rg
    }

    /// Makes a new `ReadGuard` for a component of the borrowed data, where
    /// the projection may fail.
    ///
    /// On failure the original guard is released.
    pub fn try_map<F, U: ?Sized>(orig: Self, f: F) -> Option<ReadGuard<'rh, U>>
    where
        F: for<'a> FnOnce(&'a T) -> Option<&'a U>,
    {
        let rg = ReadGuard {
            t: f(orig.t)?,
            ticket: orig.ticket,
            readers: orig.readers,
        };
        mem::forget(orig);
        Some(rg)
    }
}

impl<'rh, T: ?Sized> AsRef<T> for ReadGuard<'rh, T> {
    fn as_ref(&self) -> &T {
        self.t
    }
}

impl<'rh, T: ?Sized> std::ops::Deref for ReadGuard<'rh, T> {
    type Target = T;
    fn deref(&self) -> &Self::Target {
        self.t
    }
}

impl<'rh, T: ?Sized> Drop for ReadGuard<'rh, T> {
    fn drop(&mut self) {
        self.readers[self.ticket].fetch_sub(1, Ordering::SeqCst);
    }
}
