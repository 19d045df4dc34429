// Copyright 2025 the Midstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=midstory_scroll --heading-base-level=0

//! Midstory Scroll: a virtualized, incrementally-updated scroll engine.
//!
//! This crate manages a logically unbounded strip of variable-size items, of
//! which only the slice overlapping a moving viewport is ever materialized.
//! Off-screen item handles are recycled through a pool, and the visible slice
//! is patched incrementally as the viewport moves — the common case of smooth
//! scrolling costs a handful of boundary checks per frame, independent of the
//! total item count.
//!
//! The moving parts:
//!
//! - [`Viewport`]: scroll offset plus viewport size, yielding the visible
//!   rectangle in content-local coordinates.
//! - [`CriticalWindow`]: the four boundary indices separating materialized
//!   items from everything else. Maintained by the engines; never set by
//!   callers.
//! - [`ScrollEngine`]: the general engine. The host binds three callbacks —
//!   item count, item size, and per-item update — and pushes scroll-offset
//!   and viewport-size changes in; the engine acquires and releases pooled
//!   handles (via [`midstory_pool`]) and reports coarse [`UpdateDamage`].
//! - [`FixedScrollEngine`]: a specialization for uniform item sizes that
//!   replaces the rectangle cache with O(1) arithmetic.
//! - [`PagedScrollEngine`]: a wrapper that windows very large item counts
//!   (100K+) through a bounded page, shifting and re-anchoring the page as
//!   the user approaches its edges.
//! - [`FrameSlot`]: a single-slot deferred-task queue used to coalesce
//!   same-frame refresh requests; the host drains it once per frame via
//!   [`ScrollEngine::end_frame`].
//!
//! The engines are headless: they never touch a display hierarchy. Hosts own
//! widgets/views, describe them through [`midstory_pool::HandleLifecycle`],
//! and position them from the rectangle passed to the update callback.
//!
//! Everything is single-threaded and frame-driven. There are no locks and no
//! background work; the only "waiting" is the end-of-frame drain.
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

#[cfg(test)]
extern crate std;

#[macro_use]
mod macros;

mod damage;
mod engine;
mod fixed;
mod frame;
mod paged;
mod viewport;
mod window;

pub use damage::UpdateDamage;
pub use engine::{Align, CountFn, ScrollEngine, SizeFn, UpdateFn};
pub use fixed::FixedScrollEngine;
pub use frame::FrameSlot;
pub use paged::PagedScrollEngine;
pub use viewport::{Viewport, strictly_overlaps};
pub use window::CriticalWindow;

pub use midstory_interval::Flow;
pub use midstory_pool::{HandleLifecycle, ItemPool};
