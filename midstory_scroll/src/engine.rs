// Copyright 2025 the Midstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The general virtualized scroll engine.

use alloc::boxed::Box;

use kurbo::{Rect, Size, Vec2};

use midstory_interval::{Flow, ItemExtents, RectCache};
use midstory_pool::{HandleLifecycle, ItemPool};

use crate::damage::UpdateDamage;
use crate::frame::FrameSlot;
use crate::viewport::{Viewport, strictly_overlaps};
use crate::window::{self, CriticalWindow, RectSource, Step};

/// The item-count callback, `() -> usize`. Mandatory.
pub type CountFn = Box<dyn FnMut() -> usize>;

/// The item-size callback, `index -> Size`. Optional; defaults to a fixed
/// estimate.
pub type SizeFn = Box<dyn FnMut(usize) -> Size>;

/// The per-item update callback, `(index, handle, rect)`. Optional.
///
/// Invoked whenever an item is materialized or refreshed; hosts position the
/// handle from `rect` and fill it with the data at `index`.
pub type UpdateFn<H> = Box<dyn FnMut(usize, &mut H, Rect)>;

/// Alignment sugar over anchor fractions when scrolling an item into view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    /// Item's leading edge at the viewport's leading edge.
    Start,
    /// Item centered within the viewport.
    Center,
    /// Item's trailing edge at the viewport's trailing edge.
    End,
    /// Move just enough to make the item fully visible; keeps the current
    /// offset when it already is.
    Nearest,
}

/// Item size assumed until a size callback is bound.
const DEFAULT_ITEM_SIZE: Size = Size::new(100.0, 100.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rebuild {
    Full,
    Incremental,
}

fn merge_rebuild(a: Rebuild, b: Rebuild) -> Rebuild {
    if a == Rebuild::Full || b == Rebuild::Full {
        Rebuild::Full
    } else {
        Rebuild::Incremental
    }
}

/// Size source backed by the engine's callback (or the default estimate).
struct EngineExtents<'a> {
    size_fn: Option<&'a mut SizeFn>,
    default_size: Size,
}

impl ItemExtents for EngineExtents<'_> {
    fn size_of(&mut self, index: usize) -> Size {
        match &mut self.size_fn {
            Some(size_fn) => size_fn(index),
            None => self.default_size,
        }
    }
}

/// Rectangle source backed by the engine's lazily-validated cache.
struct CacheRects<'a> {
    cache: &'a mut RectCache,
    extents: EngineExtents<'a>,
}

impl RectSource for CacheRects<'_> {
    fn len(&mut self) -> usize {
        self.cache.len()
    }

    fn rect_of(&mut self, index: usize) -> Rect {
        self.cache.ensure_valid(&mut self.extents, index);
        self.cache.rect(index).unwrap_or(Rect::ZERO)
    }

    fn index_near(&mut self, main_offset: f64) -> usize {
        self.cache.index_at(&mut self.extents, main_offset)
    }
}

/// A virtualized scroll engine over caller-supplied data callbacks.
///
/// The host binds an item-count callback (mandatory), an item-size callback,
/// and a per-item update callback, then drives the engine with scroll-offset
/// and viewport-size changes. The engine maintains the [`CriticalWindow`] of
/// materialized indices, recycling handles through an [`ItemPool`]:
///
/// - [`ScrollEngine::update_data`] / [`ScrollEngine::update_data_incremental`]
///   rebuild after a data change, either immediately or coalesced to the end
///   of the current frame (drained by [`ScrollEngine::end_frame`]).
/// - [`ScrollEngine::set_scroll_offset`] patches the window incrementally:
///   boundary items are checked one at a time, so smooth scrolling costs
///   items-crossed-per-frame, not window size.
/// - [`ScrollEngine::scroll_to`] computes and applies the normalized position
///   that places an item at a given anchor fraction of the viewport.
///
/// Without an item-count callback the engine cannot operate; refreshes warn
/// once (under the `tracing` feature) and degrade to no-ops rather than
/// panicking mid-frame.
pub struct ScrollEngine<L: HandleLifecycle> {
    cache: RectCache,
    viewport: Viewport,
    pool: ItemPool<L>,
    window: Option<CriticalWindow>,
    count_fn: Option<CountFn>,
    size_fn: Option<SizeFn>,
    update_fn: Option<UpdateFn<L::Handle>>,
    default_size: Size,
    len: usize,
    pending: FrameSlot<Rebuild>,
    warned_unconfigured: bool,
}

impl<L: HandleLifecycle> ScrollEngine<L> {
    /// Creates an engine laying items out along `flow`, materializing handles
    /// through `lifecycle`.
    #[must_use]
    pub fn new(lifecycle: L, flow: Flow) -> Self {
        Self {
            cache: RectCache::new(flow, 0.0),
            viewport: Viewport::default(),
            pool: ItemPool::new(lifecycle),
            window: None,
            count_fn: None,
            size_fn: None,
            update_fn: None,
            default_size: DEFAULT_ITEM_SIZE,
            len: 0,
            pending: FrameSlot::new(),
            warned_unconfigured: false,
        }
    }

    /// Binds the item-count callback. Mandatory before any data refresh.
    pub fn set_count_fn(&mut self, count_fn: impl FnMut() -> usize + 'static) {
        self.count_fn = Some(Box::new(count_fn));
        self.warned_unconfigured = false;
    }

    /// Binds the item-size callback, discarding geometry computed with the
    /// previous one.
    pub fn set_size_fn(&mut self, size_fn: impl FnMut(usize) -> Size + 'static) {
        self.size_fn = Some(Box::new(size_fn));
        self.cache.invalidate_all();
    }

    /// Binds the per-item update callback.
    pub fn set_update_fn(
        &mut self,
        update_fn: impl FnMut(usize, &mut L::Handle, Rect) + 'static,
    ) {
        self.update_fn = Some(Box::new(update_fn));
    }

    /// Returns `true` if the mandatory item-count callback is bound.
    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.count_fn.is_some()
    }

    /// Size assumed for items while no size callback is bound.
    pub fn set_default_item_size(&mut self, size: Size) {
        if self.default_size != size {
            self.default_size = size;
            self.cache.invalidate_all();
        }
    }

    /// The layout flow.
    #[must_use]
    pub const fn flow(&self) -> Flow {
        self.cache.flow()
    }

    /// Changes the layout flow, discarding all computed geometry.
    pub fn set_flow(&mut self, flow: Flow) {
        self.cache.set_flow(flow);
        self.sync_cross_limit();
    }

    /// Spacing between adjacent items along the layout flow.
    #[must_use]
    pub const fn spacing(&self) -> f64 {
        self.cache.spacing()
    }

    /// Sets the spacing between adjacent items, discarding computed geometry.
    pub fn set_spacing(&mut self, spacing: f64) {
        self.cache.set_spacing(spacing);
    }

    /// The item count as of the last data refresh.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the last data refresh reported no items.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The current critical window, if any item is materialized.
    #[must_use]
    pub const fn window(&self) -> Option<CriticalWindow> {
        self.window
    }

    /// The viewport (offset + size).
    #[must_use]
    pub const fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// The current scroll offset.
    #[must_use]
    pub const fn scroll_offset(&self) -> Vec2 {
        self.viewport.offset()
    }

    /// The handle pool.
    #[must_use]
    pub const fn pool(&self) -> &ItemPool<L> {
        &self.pool
    }

    /// The handle materialized for `index`, if it is currently shown.
    #[must_use]
    pub fn handle(&self, index: usize) -> Option<&L::Handle> {
        self.pool.get(index)
    }

    /// Mutable access to the handle materialized for `index`.
    pub fn handle_mut(&mut self, index: usize) -> Option<&mut L::Handle> {
        self.pool.get_mut(index)
    }

    /// Extent of the content computed so far.
    ///
    /// Grows as items are measured; stable once everything before (and one
    /// past) the viewport has been seen.
    #[must_use]
    pub fn content_extent(&mut self) -> Size {
        self.cache.content_extent()
    }

    /// The content-local rectangle of `index`, measuring it if necessary.
    ///
    /// Returns `None` for out-of-range indices.
    pub fn item_rect(&mut self, index: usize) -> Option<Rect> {
        let mut extents = EngineExtents {
            size_fn: self.size_fn.as_mut(),
            default_size: self.default_size,
        };
        self.cache.ensure_valid(&mut extents, index);
        self.cache.rect(index)
    }

    /// Forces a full data refresh: re-runs the item-count callback, discards
    /// all computed geometry, and rebuilds the critical window.
    ///
    /// With `immediate` unset, the rebuild is deferred to
    /// [`ScrollEngine::end_frame`]; several same-frame requests coalesce into
    /// one rebuild.
    pub fn update_data(&mut self, immediate: bool) -> UpdateDamage {
        self.request_rebuild(Rebuild::Full, immediate)
    }

    /// Data refresh that preserves geometry for items before the previous
    /// count — appending `k` items leaves the first rectangles untouched.
    ///
    /// Defers and coalesces like [`ScrollEngine::update_data`]; a full
    /// refresh queued in the same frame wins.
    pub fn update_data_incremental(&mut self, immediate: bool) -> UpdateDamage {
        self.request_rebuild(Rebuild::Incremental, immediate)
    }

    /// Drains a deferred data refresh, if one is pending and the viewport has
    /// been sized. Hosts call this once per frame, after layout.
    pub fn end_frame(&mut self) -> UpdateDamage {
        if !self.pending.is_scheduled() {
            return UpdateDamage::empty();
        }
        if !self.viewport_ready() {
            // Still waiting for the host layout to size the viewport; the
            // request stays queued for a later frame.
            mtrace!("deferred refresh parked: viewport not sized yet");
            return UpdateDamage::empty();
        }
        match self.pending.take() {
            Some(mode) => self.rebuild(mode),
            None => UpdateDamage::empty(),
        }
    }

    /// Sets the scroll offset and patches the critical window incrementally.
    ///
    /// Negative components clamp to zero. Deltas so large that the whole
    /// window scrolled out fall back to a full relocation at the new offset.
    pub fn set_scroll_offset(&mut self, offset: Vec2) -> UpdateDamage {
        let offset = Vec2::new(offset.x.max(0.0), offset.y.max(0.0));
        if offset == self.viewport.offset() {
            return UpdateDamage::empty();
        }
        self.viewport.set_offset(offset);
        let before = self.cache.content_extent();
        let mut damage = self.update_window();
        if self.cache.content_extent() != before {
            damage |= UpdateDamage::EXTENT_CHANGED;
        }
        damage
    }

    /// Adjusts the scroll offset by `delta`.
    pub fn scroll_by(&mut self, delta: Vec2) -> UpdateDamage {
        self.set_scroll_offset(self.viewport.offset() + delta)
    }

    /// Sets the viewport size and rebuilds the visible window.
    ///
    /// For wrapped flows this also moves the wrap limit, which discards all
    /// computed geometry.
    pub fn set_viewport_size(&mut self, size: Size) -> UpdateDamage {
        if self.viewport.size() == size {
            return UpdateDamage::empty();
        }
        self.viewport.set_size(size);
        self.sync_cross_limit();
        let before = self.cache.content_extent();
        let mut damage = self.reset_window();
        if self.cache.content_extent() != before {
            damage |= UpdateDamage::EXTENT_CHANGED;
        }
        damage
    }

    /// Clamps the scroll offset so the viewport stays within the content.
    ///
    /// Measures all remaining items to know the full content extent.
    pub fn clamp_scroll_to_content(&mut self) -> UpdateDamage {
        if self.len == 0 {
            return self.set_scroll_offset(Vec2::ZERO);
        }
        self.measure_all();
        let content = self.cache.content_extent();
        let clamped = self.viewport.clamp_offset(self.viewport.offset(), content);
        self.set_scroll_offset(clamped)
    }

    /// The normalized scroll position in `[0, 1]` that places item `index` at
    /// `anchor` fraction of the viewport.
    ///
    /// `anchor` 0 aligns leading edges, 1 aligns trailing edges, 0.5 centers
    /// the item. Measures through the end of the strip so the full content
    /// extent is known; returns 0 when the content fits in the viewport.
    pub fn scroll_value(&mut self, index: usize, anchor: f64) -> f64 {
        if self.len == 0 {
            return 0.0;
        }
        let index = index.min(self.len - 1);
        let anchor = anchor.clamp(0.0, 1.0);
        self.measure_all();
        let Some(rect) = self.cache.rect(index) else {
            return 0.0;
        };
        let flow = self.cache.flow();
        let item_start = flow.main_start(rect);
        let item_extent = flow.main_end(rect) - item_start;
        let viewport = flow.main_of(self.viewport.size());
        let content = flow.main_of(self.cache.content_extent());
        let max = (content - viewport).max(0.0);
        if max <= 0.0 {
            return 0.0;
        }
        let target = item_start - anchor * (viewport - item_extent);
        (target / max).clamp(0.0, 1.0)
    }

    /// Scrolls so that item `index` sits at `anchor` fraction of the
    /// viewport, clamped to the valid scroll range.
    pub fn scroll_to(&mut self, index: usize, anchor: f64) -> UpdateDamage {
        if self.len == 0 {
            return UpdateDamage::empty();
        }
        let value = self.scroll_value(index, anchor);
        let flow = self.cache.flow();
        let content = flow.main_of(self.cache.content_extent());
        let viewport = flow.main_of(self.viewport.size());
        let max = (content - viewport).max(0.0);
        let offset = flow.with_main_offset(self.viewport.offset(), value * max);
        self.set_scroll_offset(offset)
    }

    /// Scrolls item `index` into view with the given alignment.
    pub fn scroll_to_aligned(&mut self, index: usize, align: Align) -> UpdateDamage {
        match align {
            Align::Start => self.scroll_to(index, 0.0),
            Align::Center => self.scroll_to(index, 0.5),
            Align::End => self.scroll_to(index, 1.0),
            Align::Nearest => {
                if self.is_fully_visible(index) {
                    return UpdateDamage::empty();
                }
                let Some(rect) = self.item_rect(index) else {
                    return UpdateDamage::empty();
                };
                let flow = self.cache.flow();
                let view_start = flow.main_offset(self.viewport.offset());
                if flow.main_start(rect) < view_start {
                    self.scroll_to(index, 0.0)
                } else {
                    self.scroll_to(index, 1.0)
                }
            }
        }
    }

    /// Returns `true` if item `index` lies entirely within the viewport.
    pub fn is_fully_visible(&mut self, index: usize) -> bool {
        let Some(rect) = self.item_rect(index) else {
            return false;
        };
        let view = self.viewport.rect();
        rect.x0 >= view.x0 && rect.x1 <= view.x1 && rect.y0 >= view.y0 && rect.y1 <= view.y1
    }

    /// Returns `true` if item `index` overlaps the viewport at all.
    pub fn is_partially_visible(&mut self, index: usize) -> bool {
        match self.item_rect(index) {
            Some(rect) => strictly_overlaps(rect, self.viewport.rect()),
            None => false,
        }
    }

    fn request_rebuild(&mut self, mode: Rebuild, immediate: bool) -> UpdateDamage {
        if immediate {
            let mode = match self.pending.take() {
                Some(pending) => merge_rebuild(pending, mode),
                None => mode,
            };
            self.rebuild(mode)
        } else {
            self.pending.schedule_with(mode, merge_rebuild);
            UpdateDamage::empty()
        }
    }

    fn rebuild(&mut self, mode: Rebuild) -> UpdateDamage {
        let Some(count_fn) = self.count_fn.as_mut() else {
            if !self.warned_unconfigured {
                self.warned_unconfigured = true;
                mwarn!("no item-count source bound; data refresh skipped");
            }
            return UpdateDamage::empty();
        };
        let len = count_fn();
        mdebug!(len, full = matches!(mode, Rebuild::Full), "data refresh");

        let before = self.cache.content_extent();
        let mut damage = UpdateDamage::empty();
        match mode {
            Rebuild::Full => {
                self.cache.invalidate_all();
                self.cache.set_len(len);
            }
            Rebuild::Incremental => {
                self.cache.set_len(len);
            }
        }
        self.len = len;
        if self.pool.release_beyond(len) > 0 {
            damage |= UpdateDamage::ITEMS_RELEASED;
        }
        damage |= self.reset_window();
        if self.cache.content_extent() != before {
            damage |= UpdateDamage::EXTENT_CHANGED;
        }
        damage
    }

    /// Relocates the window from scratch at the current viewport and
    /// refreshes every shown item.
    fn reset_window(&mut self) -> UpdateDamage {
        let flow = self.cache.flow();
        let view = self.viewport.rect();
        let old = self.window;
        let mut rects = CacheRects {
            cache: &mut self.cache,
            extents: EngineExtents {
                size_fn: self.size_fn.as_mut(),
                default_size: self.default_size,
            },
        };
        let next = window::locate(&mut rects, flow, view);
        let damage = window::apply(
            &mut rects,
            &mut self.pool,
            self.update_fn.as_mut(),
            old,
            next,
            true,
        );
        self.window = next;
        damage
    }

    /// Patches the window after an offset change, stepping boundaries.
    fn update_window(&mut self) -> UpdateDamage {
        let Some(current) = self.window else {
            return self.reset_window();
        };
        let flow = self.cache.flow();
        let view = self.viewport.rect();
        let outcome = {
            let mut rects = CacheRects {
                cache: &mut self.cache,
                extents: EngineExtents {
                    size_fn: self.size_fn.as_mut(),
                    default_size: self.default_size,
                },
            };
            window::step(&mut rects, flow, view, current)
        };
        match outcome {
            Step::Unchanged => UpdateDamage::empty(),
            Step::Moved(next) => {
                let mut rects = CacheRects {
                    cache: &mut self.cache,
                    extents: EngineExtents {
                        size_fn: self.size_fn.as_mut(),
                        default_size: self.default_size,
                    },
                };
                let damage = window::apply(
                    &mut rects,
                    &mut self.pool,
                    self.update_fn.as_mut(),
                    Some(current),
                    Some(next),
                    false,
                );
                self.window = Some(next);
                damage
            }
            Step::Lost => {
                mtrace!("window lost the viewport; relocating");
                self.reset_window()
            }
        }
    }

    fn measure_all(&mut self) {
        if self.len > 0 {
            let mut extents = EngineExtents {
                size_fn: self.size_fn.as_mut(),
                default_size: self.default_size,
            };
            self.cache.ensure_valid(&mut extents, self.len - 1);
        }
    }

    fn sync_cross_limit(&mut self) {
        if self.cache.flow().is_wrapped() {
            let cross = self.cache.flow().cross_of(self.viewport.size());
            self.cache.set_cross_limit(cross);
        } else {
            self.cache.set_cross_limit(f64::INFINITY);
        }
    }

    fn viewport_ready(&self) -> bool {
        let size = self.viewport.size();
        size.width > 0.0 && size.height > 0.0
    }
}

impl<L: HandleLifecycle + core::fmt::Debug> core::fmt::Debug for ScrollEngine<L> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ScrollEngine")
            .field("viewport", &self.viewport)
            .field("window", &self.window)
            .field("len", &self.len)
            .field("pool", &self.pool)
            .field("configured", &self.is_configured())
            .finish_non_exhaustive()
    }
}
