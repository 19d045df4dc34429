// Copyright 2025 the Midstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=midstory_interval --heading-base-level=0

//! Midstory Interval: item geometry for virtualized scrolling.
//!
//! This crate computes and caches per-item rectangles for a dense strip of
//! items indexed `0..len`, in content-local coordinates. It is the geometry
//! half of a virtualized scroll view: a scroll engine asks it "where does item
//! `i` live?" and "which item is near content offset `o`?", and only ever pays
//! for the prefix of items it has actually looked at.
//!
//! The core concepts are:
//!
//! - [`Flow`]: the direction items advance through the content (top-down,
//!   left-to-right, or the wrapped grid variants of either), plus axis helpers
//!   for reading the scroll-axis component out of rectangles and offsets.
//! - [`ItemExtents`]: the caller-supplied size source, `index -> Size`. Any
//!   `FnMut(usize) -> Size` works.
//! - [`RectCache`]: a lazily-validated rectangle cache. Entries form a strict
//!   front-to-back dependency chain (entry `i` is placed after entry `i - 1`),
//!   so validity is always a prefix. [`RectCache::ensure_valid`] walks the
//!   chain forward from the last valid entry, calling the size source once
//!   per newly computed entry.
//!
//! Invalidation comes in two flavors: [`RectCache::invalidate_all`] for a
//! from-scratch refresh, and [`RectCache::invalidate_from`] when only entries
//! at or beyond some index changed (for example, after appending items).
//! Rectangles before the invalidation point survive untouched.
//!
//! All coordinates are y-down, as is conventional for [`kurbo`]. The content
//! origin is the top-left corner of item 0.
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod cache;
mod extents;
mod flow;

pub use cache::RectCache;
pub use extents::ItemExtents;
pub use flow::Flow;
