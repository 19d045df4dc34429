// Copyright 2025 the Midstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A scroll engine specialized for uniform item sizes.

use alloc::boxed::Box;

use kurbo::{Rect, Size, Vec2};

use midstory_interval::Flow;
use midstory_pool::{HandleLifecycle, ItemPool};

use crate::damage::UpdateDamage;
use crate::engine::{CountFn, UpdateFn};
use crate::frame::FrameSlot;
use crate::viewport::Viewport;
use crate::window::{self, CriticalWindow, RectSource, Step};

/// All geometry inputs of a fixed-size strip, small enough to copy.
///
/// With one shared item size, every rectangle is a closed-form expression of
/// its index; there is no dependency chain to walk and nothing to cache.
#[derive(Clone, Copy, Debug, PartialEq)]
struct FixedGeometry {
    flow: Flow,
    item: Size,
    spacing: f64,
    leading: Option<Size>,
    trailing: Option<Size>,
    cross_limit: f64,
    len: usize,
}

impl FixedGeometry {
    fn size_of(&self, index: usize) -> Size {
        if self.flow.is_wrapped() {
            return self.item;
        }
        if index == 0 {
            if let Some(leading) = self.leading {
                return leading;
            }
        }
        if self.len > 0 && index == self.len - 1 {
            if let Some(trailing) = self.trailing {
                return trailing;
            }
        }
        self.item
    }

    fn main_stride(&self) -> f64 {
        self.flow.main_of(self.item) + self.spacing
    }

    fn cross_stride(&self) -> f64 {
        self.flow.cross_of(self.item) + self.spacing
    }

    /// Number of items per line for wrapped flows, at least 1.
    fn lanes(&self) -> usize {
        if !self.flow.is_wrapped() {
            return 1;
        }
        let stride = self.cross_stride();
        if stride <= 0.0 || !self.cross_limit.is_finite() {
            return 1;
        }
        #[allow(
            clippy::cast_possible_truncation,
            reason = "lane counts are tiny; clamped to at least one below"
        )]
        let lanes = ((self.cross_limit + self.spacing) / stride) as usize;
        lanes.max(1)
    }

    fn main_start_of(&self, index: usize) -> f64 {
        if self.flow.is_wrapped() {
            let line = index / self.lanes();
            line as f64 * self.main_stride()
        } else if index == 0 {
            0.0
        } else {
            let first = self.flow.main_of(self.size_of(0));
            first + self.spacing + (index - 1) as f64 * self.main_stride()
        }
    }

    fn rect_at(&self, index: usize) -> Rect {
        let size = self.size_of(index);
        let main = self.main_start_of(index);
        if self.flow.is_wrapped() {
            let lane = index % self.lanes();
            self.flow.place(main, lane as f64 * self.cross_stride(), size)
        } else {
            self.flow.place(main, 0.0, size)
        }
    }

    fn content(&self) -> Size {
        if self.len == 0 {
            return Size::ZERO;
        }
        if self.flow.is_wrapped() {
            let lanes = self.lanes();
            let lines = self.len.div_ceil(lanes);
            let main = lines as f64 * self.main_stride() - self.spacing;
            let cross = lanes.min(self.len) as f64 * self.cross_stride() - self.spacing;
            self.flow.size_from(main.max(0.0), cross.max(0.0))
        } else {
            let last = self.len - 1;
            let main = self.main_start_of(last) + self.flow.main_of(self.size_of(last));
            let mut cross = self.flow.cross_of(self.item);
            if let Some(leading) = self.leading {
                cross = cross.max(self.flow.cross_of(leading));
            }
            if let Some(trailing) = self.trailing {
                cross = cross.max(self.flow.cross_of(trailing));
            }
            self.flow.size_from(main, cross)
        }
    }

    fn index_from_offset(&self, offset: f64) -> usize {
        if self.len == 0 {
            return 0;
        }
        let offset = offset.max(0.0);
        if self.flow.is_wrapped() {
            let stride = self.main_stride();
            if stride <= 0.0 {
                return 0;
            }
            #[allow(
                clippy::cast_possible_truncation,
                reason = "offsets are clamped non-negative and the result clamps to the strip"
            )]
            let line = (offset / stride) as usize;
            (line * self.lanes()).min(self.len - 1)
        } else {
            let second_start = self.flow.main_of(self.size_of(0)) + self.spacing;
            let stride = self.main_stride();
            if offset < second_start || stride <= 0.0 {
                return 0;
            }
            #[allow(
                clippy::cast_possible_truncation,
                reason = "offsets are clamped non-negative and the result clamps to the strip"
            )]
            let steps = ((offset - second_start) / stride) as usize;
            (1 + steps).min(self.len - 1)
        }
    }
}

impl RectSource for FixedGeometry {
    fn len(&mut self) -> usize {
        self.len
    }

    fn rect_of(&mut self, index: usize) -> Rect {
        self.rect_at(index)
    }

    fn index_near(&mut self, main_offset: f64) -> usize {
        self.index_from_offset(main_offset)
    }
}

/// A virtualized scroll engine for strips where every item shares one size.
///
/// Trading dynamic sizing away buys O(1) geometry: rectangles, content
/// extent, and offset→index localization are all closed-form, so there is no
/// rectangle cache and no size callback — just the item size, the spacing,
/// and optionally a distinct leading and/or trailing item tracked separately
/// (linear flows only; wrapped flows keep every cell uniform).
///
/// Everything else matches [`crate::ScrollEngine`]: the same critical-window
/// maintenance, the same pool recycling, the same deferred refresh drain via
/// [`FixedScrollEngine::end_frame`].
pub struct FixedScrollEngine<L: HandleLifecycle> {
    geometry: FixedGeometry,
    viewport: Viewport,
    pool: ItemPool<L>,
    window: Option<CriticalWindow>,
    count_fn: Option<CountFn>,
    update_fn: Option<UpdateFn<L::Handle>>,
    pending: FrameSlot<()>,
    warned_unconfigured: bool,
}

impl<L: HandleLifecycle> FixedScrollEngine<L> {
    /// Creates an engine with the given uniform `item_size`.
    #[must_use]
    pub fn new(lifecycle: L, flow: Flow, item_size: Size) -> Self {
        Self {
            geometry: FixedGeometry {
                flow,
                item: item_size,
                spacing: 0.0,
                leading: None,
                trailing: None,
                cross_limit: f64::INFINITY,
                len: 0,
            },
            viewport: Viewport::default(),
            pool: ItemPool::new(lifecycle),
            window: None,
            count_fn: None,
            update_fn: None,
            pending: FrameSlot::new(),
            warned_unconfigured: false,
        }
    }

    /// Binds the item-count callback. Mandatory before any data refresh.
    pub fn set_count_fn(&mut self, count_fn: impl FnMut() -> usize + 'static) {
        self.count_fn = Some(Box::new(count_fn));
        self.warned_unconfigured = false;
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

    /// The shared item size.
    #[must_use]
    pub const fn item_size(&self) -> Size {
        self.geometry.item
    }

    /// Sets the shared item size and rebuilds the visible window.
    pub fn set_item_size(&mut self, size: Size) -> UpdateDamage {
        self.geometry.item = size;
        self.reset_window()
    }

    /// Sets the spacing between adjacent items.
    pub fn set_spacing(&mut self, spacing: f64) -> UpdateDamage {
        self.geometry.spacing = if spacing.is_sign_negative() {
            0.0
        } else {
            spacing
        };
        self.reset_window()
    }

    /// Gives the first item a size of its own (linear flows only).
    pub fn set_leading_size(&mut self, size: Option<Size>) -> UpdateDamage {
        self.geometry.leading = size;
        self.reset_window()
    }

    /// Gives the last item a size of its own (linear flows only).
    ///
    /// When the strip has a single item and both edge sizes are set, the
    /// leading size wins.
    pub fn set_trailing_size(&mut self, size: Option<Size>) -> UpdateDamage {
        self.geometry.trailing = size;
        self.reset_window()
    }

    /// The layout flow.
    #[must_use]
    pub const fn flow(&self) -> Flow {
        self.geometry.flow
    }

    /// The item count as of the last data refresh.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.geometry.len
    }

    /// Returns `true` if the last data refresh reported no items.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.geometry.len == 0
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

    /// The content-local rectangle of `index`, or `None` out of range.
    #[must_use]
    pub fn item_rect(&self, index: usize) -> Option<Rect> {
        (index < self.geometry.len).then(|| self.geometry.rect_at(index))
    }

    /// Total content extent, in closed form.
    #[must_use]
    pub fn content_extent(&self) -> Size {
        self.geometry.content()
    }

    /// Forces a data refresh: re-runs the item-count callback and rebuilds
    /// the window. Deferred requests coalesce and drain at
    /// [`FixedScrollEngine::end_frame`].
    pub fn update_data(&mut self, immediate: bool) -> UpdateDamage {
        if immediate {
            self.pending.clear();
            self.rebuild()
        } else {
            self.pending.schedule(());
            UpdateDamage::empty()
        }
    }

    /// Same as [`FixedScrollEngine::update_data`]: with closed-form geometry
    /// there is no per-item cache for an incremental refresh to preserve.
    pub fn update_data_incremental(&mut self, immediate: bool) -> UpdateDamage {
        self.update_data(immediate)
    }

    /// Drains a deferred data refresh, if one is pending and the viewport has
    /// been sized.
    pub fn end_frame(&mut self) -> UpdateDamage {
        if !self.pending.is_scheduled() {
            return UpdateDamage::empty();
        }
        let size = self.viewport.size();
        if size.width <= 0.0 || size.height <= 0.0 {
            mtrace!("deferred refresh parked: viewport not sized yet");
            return UpdateDamage::empty();
        }
        self.pending.clear();
        self.rebuild()
    }

    /// Sets the scroll offset and patches the window incrementally.
    pub fn set_scroll_offset(&mut self, offset: Vec2) -> UpdateDamage {
        let offset = Vec2::new(offset.x.max(0.0), offset.y.max(0.0));
        if offset == self.viewport.offset() {
            return UpdateDamage::empty();
        }
        self.viewport.set_offset(offset);
        self.update_window()
    }

    /// Adjusts the scroll offset by `delta`.
    pub fn scroll_by(&mut self, delta: Vec2) -> UpdateDamage {
        self.set_scroll_offset(self.viewport.offset() + delta)
    }

    /// Sets the viewport size and rebuilds the visible window. For wrapped
    /// flows this also moves the wrap limit.
    pub fn set_viewport_size(&mut self, size: Size) -> UpdateDamage {
        if self.viewport.size() == size {
            return UpdateDamage::empty();
        }
        self.viewport.set_size(size);
        self.geometry.cross_limit = if self.geometry.flow.is_wrapped() {
            self.geometry.flow.cross_of(self.viewport.size())
        } else {
            f64::INFINITY
        };
        self.reset_window()
    }

    /// The normalized scroll position in `[0, 1]` placing item `index` at
    /// `anchor` fraction of the viewport. O(1).
    #[must_use]
    pub fn scroll_value(&self, index: usize, anchor: f64) -> f64 {
        if self.geometry.len == 0 {
            return 0.0;
        }
        let index = index.min(self.geometry.len - 1);
        let anchor = anchor.clamp(0.0, 1.0);
        let flow = self.geometry.flow;
        let rect = self.geometry.rect_at(index);
        let item_start = flow.main_start(rect);
        let item_extent = flow.main_end(rect) - item_start;
        let viewport = flow.main_of(self.viewport.size());
        let content = flow.main_of(self.geometry.content());
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
        if self.geometry.len == 0 {
            return UpdateDamage::empty();
        }
        let value = self.scroll_value(index, anchor);
        let flow = self.geometry.flow;
        let content = flow.main_of(self.geometry.content());
        let viewport = flow.main_of(self.viewport.size());
        let max = (content - viewport).max(0.0);
        let offset = flow.with_main_offset(self.viewport.offset(), value * max);
        self.set_scroll_offset(offset)
    }

    fn rebuild(&mut self) -> UpdateDamage {
        let Some(count_fn) = self.count_fn.as_mut() else {
            if !self.warned_unconfigured {
                self.warned_unconfigured = true;
                mwarn!("no item-count source bound; data refresh skipped");
            }
            return UpdateDamage::empty();
        };
        let len = count_fn();
        mdebug!(len, "fixed data refresh");
        let before = self.geometry.content();
        self.geometry.len = len;
        let mut damage = UpdateDamage::empty();
        if self.pool.release_beyond(len) > 0 {
            damage |= UpdateDamage::ITEMS_RELEASED;
        }
        damage |= self.reset_window();
        if self.geometry.content() != before {
            damage |= UpdateDamage::EXTENT_CHANGED;
        }
        damage
    }

    fn reset_window(&mut self) -> UpdateDamage {
        let flow = self.geometry.flow;
        let view = self.viewport.rect();
        let old = self.window;
        let mut rects = self.geometry;
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

    fn update_window(&mut self) -> UpdateDamage {
        let Some(current) = self.window else {
            return self.reset_window();
        };
        let flow = self.geometry.flow;
        let view = self.viewport.rect();
        let mut rects = self.geometry;
        match window::step(&mut rects, flow, view, current) {
            Step::Unchanged => UpdateDamage::empty(),
            Step::Moved(next) => {
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
            Step::Lost => self.reset_window(),
        }
    }
}

impl<L: HandleLifecycle + core::fmt::Debug> core::fmt::Debug for FixedScrollEngine<L> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FixedScrollEngine")
            .field("geometry", &self.geometry)
            .field("viewport", &self.viewport)
            .field("window", &self.window)
            .field("pool", &self.pool)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use kurbo::{Rect, Size, Vec2};

    use midstory_interval::Flow;
    use midstory_pool::HandleLifecycle;

    use super::FixedScrollEngine;

    #[derive(Debug, Default)]
    struct Slot;

    #[derive(Debug, Default)]
    struct Host;

    impl HandleLifecycle for Host {
        type Handle = Slot;

        fn create(&mut self) -> Slot {
            Slot
        }

        fn attach(&mut self, _handle: &mut Slot, _index: usize) {}

        fn reset(&mut self, _handle: &mut Slot) {}
    }

    fn rows(count: usize) -> FixedScrollEngine<Host> {
        let mut engine = FixedScrollEngine::new(Host, Flow::TopDown, Size::new(100.0, 50.0));
        engine.set_viewport_size(Size::new(100.0, 120.0));
        engine.set_count_fn(move || count);
        engine.update_data(true);
        engine
    }

    #[test]
    fn closed_form_geometry_matches_the_chain() {
        let engine = rows(10);
        assert_eq!(engine.item_rect(0), Some(Rect::new(0.0, 0.0, 100.0, 50.0)));
        assert_eq!(engine.item_rect(7), Some(Rect::new(0.0, 350.0, 100.0, 400.0)));
        assert_eq!(engine.item_rect(10), None);
        assert_eq!(engine.content_extent(), Size::new(100.0, 500.0));
    }

    #[test]
    fn window_and_scrolling_match_the_general_engine() {
        let mut engine = rows(10);
        let window = engine.window().unwrap();
        assert_eq!(window.first_shown, 0);
        assert_eq!(window.last_shown, 2);
        assert_eq!(window.last_hidden, 3);

        engine.set_scroll_offset(Vec2::new(0.0, 50.0));
        let window = engine.window().unwrap();
        assert_eq!(window.first_shown, 1);
        assert_eq!(window.last_shown, 3);
        assert!(!engine.pool().is_bound(0));
        assert!(engine.pool().is_bound(3));
    }

    #[test]
    fn distinct_edge_items_shift_the_strip() {
        let mut engine = rows(10);
        engine.set_leading_size(Some(Size::new(100.0, 80.0)));
        engine.set_trailing_size(Some(Size::new(100.0, 20.0)));

        assert_eq!(engine.item_rect(0), Some(Rect::new(0.0, 0.0, 100.0, 80.0)));
        // Item 1 starts after the taller head.
        assert_eq!(engine.item_rect(1), Some(Rect::new(0.0, 80.0, 100.0, 130.0)));
        // Tail is shorter: content ends at 80 + 8*50 + 20.
        assert_eq!(engine.content_extent(), Size::new(100.0, 500.0));
        assert_eq!(engine.item_rect(9).unwrap().y1, 500.0);
    }

    #[test]
    fn wrapped_flow_computes_lanes_from_the_viewport() {
        let mut engine = FixedScrollEngine::new(Host, Flow::TopDownWrap, Size::new(30.0, 40.0));
        engine.set_spacing(5.0);
        engine.set_viewport_size(Size::new(100.0, 90.0));
        engine.set_count_fn(|| 20);
        engine.update_data(true);

        // (100 + 5) / (30 + 5) = 3 lanes.
        assert_eq!(engine.item_rect(4), Some(Rect::new(35.0, 45.0, 65.0, 85.0)));
        let window = engine.window().unwrap();
        assert_eq!(window.first_shown, 0);
        // Rows at y = 0, 45, 90(?); the third row starts exactly at the
        // viewport edge and stays hidden.
        assert_eq!(window.last_shown, 5);
    }

    #[test]
    fn scroll_value_is_closed_form() {
        let mut engine = rows(10);
        assert_eq!(engine.scroll_value(9, 0.5), 1.0);
        let value = engine.scroll_value(4, 0.5);
        assert!((value - 165.0 / 380.0).abs() < 1e-12);
        engine.scroll_to(9, 0.5);
        assert_eq!(engine.scroll_offset(), Vec2::new(0.0, 380.0));
        let window = engine.window().unwrap();
        assert_eq!(window.first_shown, 7);
        assert_eq!(window.last_shown, 9);
    }

    #[test]
    fn deferred_refresh_drains_once() {
        let mut engine = FixedScrollEngine::new(Host, Flow::TopDown, Size::new(100.0, 50.0));
        engine.set_viewport_size(Size::new(100.0, 120.0));
        engine.set_count_fn(|| 10);
        engine.update_data(false);
        engine.update_data(false);
        assert!(engine.window().is_none());
        engine.end_frame();
        assert!(engine.window().is_some());
        assert!(engine.end_frame().is_empty());
    }
}
