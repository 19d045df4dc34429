// Copyright 2025 the Midstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=midstory_pool --heading-base-level=0

//! Midstory Pool: handle recycling for virtualized UIs.
//!
//! A virtualized list materializes only the handful of items that intersect
//! the viewport. Instead of creating and destroying a display handle per item
//! as the viewport moves, an [`ItemPool`] keeps released handles on a free
//! list and rebinds them to new indices.
//!
//! The host describes its handle type through the [`HandleLifecycle`] trait:
//! how to create a fresh handle, how to attach one to the display hierarchy
//! when it is bound to an index, and how to reset it when it returns to the
//! free list. The pool guarantees hook pairing: every free→bound transition
//! runs `attach`, every bound→free transition runs `reset`, and a handle is
//! bound to at most one index at a time.
//!
//! Acquiring an index that is already bound is an idempotent no-op returning
//! the existing handle, so update passes that revisit the same state converge
//! without spurious hook invocations.
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

use alloc::vec::Vec;

use hashbrown::HashMap;
use smallvec::SmallVec;

/// How a host creates, attaches, and resets its display handles.
///
/// This is the named seam for what would otherwise be three loose callbacks:
/// the pool calls `create` when the free list is empty, `attach` when a
/// handle is bound to an index, and `reset` when a handle is released back to
/// the free list. `attach`/`reset` typically reparent the handle into or out
/// of the visible display hierarchy.
pub trait HandleLifecycle {
    /// The handle type managed by the pool.
    type Handle;

    /// Creates a brand-new handle. Called only when the free list is empty.
    fn create(&mut self) -> Self::Handle;

    /// Called when `handle` transitions free→bound for `index`.
    fn attach(&mut self, handle: &mut Self::Handle, index: usize);

    /// Called when `handle` transitions bound→free.
    fn reset(&mut self, handle: &mut Self::Handle);
}

/// A recycling pool of item handles.
///
/// The pool is unbounded: it grows on demand via [`HandleLifecycle::create`]
/// and never discards handles on its own. Callers keep it leak-free by
/// releasing indices as they scroll out ([`ItemPool::release`]), when the
/// data set shrinks ([`ItemPool::release_beyond`]), or wholesale
/// ([`ItemPool::release_all`]).
pub struct ItemPool<L: HandleLifecycle> {
    lifecycle: L,
    free: Vec<L::Handle>,
    bound: HashMap<usize, L::Handle>,
}

impl<L: HandleLifecycle> ItemPool<L> {
    /// Creates an empty pool driven by `lifecycle`.
    #[must_use]
    pub fn new(lifecycle: L) -> Self {
        Self {
            lifecycle,
            free: Vec::new(),
            bound: HashMap::new(),
        }
    }

    /// Returns a shared reference to the lifecycle hooks.
    #[must_use]
    pub const fn lifecycle(&self) -> &L {
        &self.lifecycle
    }

    /// Returns a mutable reference to the lifecycle hooks.
    pub const fn lifecycle_mut(&mut self) -> &mut L {
        &mut self.lifecycle
    }

    /// Binds a handle to `index` and returns it.
    ///
    /// Reuses a free handle if one exists, creating one otherwise; the
    /// `attach` hook runs on the free→bound transition. If `index` is
    /// already bound this is a no-op returning the existing handle.
    pub fn acquire(&mut self, index: usize) -> &mut L::Handle {
        match self.bound.entry(index) {
            hashbrown::hash_map::Entry::Occupied(entry) => entry.into_mut(),
            hashbrown::hash_map::Entry::Vacant(entry) => {
                let mut handle = self
                    .free
                    .pop()
                    .unwrap_or_else(|| self.lifecycle.create());
                self.lifecycle.attach(&mut handle, index);
                entry.insert(handle)
            }
        }
    }

    /// Releases the handle bound to `index` back to the free list.
    ///
    /// The `reset` hook runs on the bound→free transition. Returns `false`
    /// if `index` was not bound (releasing twice is a guarded no-op).
    pub fn release(&mut self, index: usize) -> bool {
        let Some(mut handle) = self.bound.remove(&index) else {
            return false;
        };
        self.lifecycle.reset(&mut handle);
        self.free.push(handle);
        true
    }

    /// Releases every bound handle.
    pub fn release_all(&mut self) {
        for (_, mut handle) in self.bound.drain() {
            self.lifecycle.reset(&mut handle);
            self.free.push(handle);
        }
    }

    /// Releases every handle bound to an index at or beyond `count` and
    /// returns how many were released.
    ///
    /// Used when the data set shrinks: indices past the new count no longer
    /// exist and must not stay materialized.
    pub fn release_beyond(&mut self, count: usize) -> usize {
        let stale: SmallVec<[usize; 8]> = self
            .bound
            .keys()
            .copied()
            .filter(|&index| index >= count)
            .collect();
        let released = stale.len();
        for index in stale {
            self.release(index);
        }
        released
    }

    /// Returns the handle bound to `index`, if any.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&L::Handle> {
        self.bound.get(&index)
    }

    /// Returns the handle bound to `index` mutably, if any.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut L::Handle> {
        self.bound.get_mut(&index)
    }

    /// Returns `true` if `index` currently has a bound handle.
    #[must_use]
    pub fn is_bound(&self, index: usize) -> bool {
        self.bound.contains_key(&index)
    }

    /// Iterates over the currently bound indices, in no particular order.
    pub fn bound_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.bound.keys().copied()
    }

    /// Number of bound handles.
    #[must_use]
    pub fn bound_len(&self) -> usize {
        self.bound.len()
    }

    /// Number of free handles waiting for reuse.
    #[must_use]
    pub fn free_len(&self) -> usize {
        self.free.len()
    }
}

impl<L: HandleLifecycle + core::fmt::Debug> core::fmt::Debug for ItemPool<L> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ItemPool")
            .field("lifecycle", &self.lifecycle)
            .field("free", &self.free.len())
            .field("bound", &self.bound.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{HandleLifecycle, ItemPool};
    use alloc::vec::Vec;

    /// A test handle recording which index it is attached to.
    #[derive(Debug, Default)]
    struct Slot {
        index: Option<usize>,
    }

    /// Counts hook invocations so tests can assert pairing.
    #[derive(Debug, Default)]
    struct Counting {
        created: usize,
        attached: Vec<usize>,
        resets: usize,
    }

    impl HandleLifecycle for Counting {
        type Handle = Slot;

        fn create(&mut self) -> Slot {
            self.created += 1;
            Slot::default()
        }

        fn attach(&mut self, handle: &mut Slot, index: usize) {
            self.attached.push(index);
            handle.index = Some(index);
        }

        fn reset(&mut self, handle: &mut Slot) {
            self.resets += 1;
            handle.index = None;
        }
    }

    #[test]
    fn acquire_creates_then_recycles() {
        let mut pool = ItemPool::new(Counting::default());

        pool.acquire(0);
        pool.acquire(1);
        assert_eq!(pool.lifecycle().created, 2);
        assert_eq!(pool.bound_len(), 2);

        pool.release(0);
        assert_eq!(pool.free_len(), 1);

        // Binding a new index reuses the freed handle.
        pool.acquire(2);
        assert_eq!(pool.lifecycle().created, 2);
        assert_eq!(pool.free_len(), 0);
        assert_eq!(pool.get(2).and_then(|slot| slot.index), Some(2));
    }

    #[test]
    fn acquire_is_idempotent_per_index() {
        let mut pool = ItemPool::new(Counting::default());
        pool.acquire(5);
        pool.acquire(5);
        pool.acquire(5);
        assert_eq!(pool.lifecycle().created, 1);
        assert_eq!(pool.lifecycle().attached, alloc::vec![5]);
        assert_eq!(pool.bound_len(), 1);
    }

    #[test]
    fn release_pairs_reset_with_attach() {
        let mut pool = ItemPool::new(Counting::default());
        pool.acquire(0);
        pool.acquire(1);
        assert!(pool.release(0));
        assert!(!pool.release(0));
        pool.release_all();
        assert_eq!(pool.lifecycle().resets, 2);
        assert_eq!(pool.lifecycle().attached.len(), 2);
        assert_eq!(pool.bound_len(), 0);
        assert_eq!(pool.free_len(), 2);
    }

    #[test]
    fn release_beyond_drops_out_of_range_bindings() {
        let mut pool = ItemPool::new(Counting::default());
        for index in 0..6 {
            pool.acquire(index);
        }
        assert_eq!(pool.release_beyond(3), 3);
        assert_eq!(pool.bound_len(), 3);
        assert!(pool.is_bound(2));
        assert!(!pool.is_bound(3));
        assert_eq!(pool.free_len(), 3);
    }

    #[test]
    fn reset_detaches_the_handle() {
        let mut pool = ItemPool::new(Counting::default());
        pool.acquire(7);
        assert_eq!(pool.get(7).and_then(|slot| slot.index), Some(7));
        pool.release(7);
        assert_eq!(pool.get(7).map(|slot| slot.index), None);
    }
}
