//! Once-computed request values.
//!
//! # Design Decisions
//! - Backed by a sync `OnceCell` so a request can be borrowed across `.await`
//! - The producer is supplied at the read site; the owner keeps whatever the
//!   producer borrows (headers, peer address)
//! - No invalidation: a value is computed at most once per owner

use once_cell::sync::OnceCell;

/// A value computed on first access and memoized afterwards.
#[derive(Debug)]
pub struct Cached<T> {
    cell: OnceCell<T>,
}

impl<T> Cached<T> {
    /// Create an empty cache.
    pub const fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    /// Return the memoized value, running `producer` only on the first call.
    pub fn get<F>(&self, producer: F) -> &T
    where
        F: FnOnce() -> T,
    {
        self.cell.get_or_init(producer)
    }

    #[cfg(test)]
    pub(crate) fn is_computed(&self) -> bool {
        self.cell.get().is_some()
    }
}

impl<T> Default for Cached<T> {
    fn default() -> Self {
        Self::new()
    }
}
