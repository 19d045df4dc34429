// Copyright 2025 the Midstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A paged wrapper that bounds materialization cost on very large strips.

use alloc::rc::Rc;
use core::cell::Cell;
use core::num::NonZeroUsize;

use kurbo::{Rect, Size, Vec2};

use midstory_interval::Flow;
use midstory_pool::{HandleLifecycle, ItemPool};

use crate::damage::UpdateDamage;
use crate::engine::ScrollEngine;
use crate::window::CriticalWindow;

/// Page state shared with the remapping closures handed to the base engine.
#[derive(Debug, Default)]
struct PageState {
    start: Cell<usize>,
    logical_len: Cell<usize>,
    page_size: Cell<usize>,
}

/// A scroll engine that windows a huge logical strip through a bounded page.
///
/// The base [`ScrollEngine`] only ever sees `page_size` items at a time; this
/// wrapper remaps every index through a sliding `start_offset` into the
/// logical index space. When the critical window reaches a page edge with
/// more logical items beyond it, the page shifts by half its size and the
/// scroll offset is re-anchored so the items on screen do not visually jump.
///
/// This bounds handle materialization and geometry cost for strips of 100K+
/// items, at a deliberate price: the scrollbar range covers the current page,
/// not the whole logical strip, so proportional-scrollbar fidelity is lost.
/// Use [`PagedScrollEngine::scroll_to`] for long-distance jumps.
///
/// The page shift re-anchor assumes linear flows (it is exact for them);
/// wrapped flows should page in whole-line multiples to avoid lane drift.
pub struct PagedScrollEngine<L: HandleLifecycle> {
    inner: ScrollEngine<L>,
    state: Rc<PageState>,
}

impl<L: HandleLifecycle> PagedScrollEngine<L> {
    /// Creates a paged engine holding at most `page_size` items at a time.
    #[must_use]
    pub fn new(lifecycle: L, flow: Flow, page_size: NonZeroUsize) -> Self {
        let state = Rc::new(PageState::default());
        state.page_size.set(page_size.get());
        Self {
            inner: ScrollEngine::new(lifecycle, flow),
            state,
        }
    }

    /// Binds the logical item-count callback. Mandatory.
    pub fn set_count_fn(&mut self, mut count_fn: impl FnMut() -> usize + 'static) {
        let state = Rc::clone(&self.state);
        self.inner.set_count_fn(move || {
            let logical = count_fn();
            state.logical_len.set(logical);
            let page = state.page_size.get();
            let start = state.start.get().min(logical.saturating_sub(page));
            state.start.set(start);
            (logical - start).min(page)
        });
    }

    /// Binds the item-size callback, in logical indices.
    pub fn set_size_fn(&mut self, mut size_fn: impl FnMut(usize) -> Size + 'static) {
        let state = Rc::clone(&self.state);
        self.inner
            .set_size_fn(move |index| size_fn(index + state.start.get()));
    }

    /// Binds the per-item update callback, in logical indices.
    pub fn set_update_fn(
        &mut self,
        mut update_fn: impl FnMut(usize, &mut L::Handle, Rect) + 'static,
    ) {
        let state = Rc::clone(&self.state);
        self.inner
            .set_update_fn(move |index, handle, rect| update_fn(index + state.start.get(), handle, rect));
    }

    /// The configured page size.
    #[must_use]
    pub fn page_size(&self) -> usize {
        self.state.page_size.get()
    }

    /// The logical index of the first item in the current page.
    #[must_use]
    pub fn start_offset(&self) -> usize {
        self.state.start.get()
    }

    /// The logical item count as of the last data refresh.
    #[must_use]
    pub fn logical_len(&self) -> usize {
        self.state.logical_len.get()
    }

    /// Number of items in the current page.
    #[must_use]
    pub const fn page_len(&self) -> usize {
        self.inner.len()
    }

    /// The critical window in page-local indices.
    #[must_use]
    pub const fn window(&self) -> Option<CriticalWindow> {
        self.inner.window()
    }

    /// The critical window in logical indices.
    #[must_use]
    pub fn logical_window(&self) -> Option<CriticalWindow> {
        let start = self.state.start.get();
        self.inner.window().map(|w| CriticalWindow {
            first_hidden: w.first_hidden + start,
            first_shown: w.first_shown + start,
            last_shown: w.last_shown + start,
            last_hidden: w.last_hidden + start,
        })
    }

    /// The handle pool.
    #[must_use]
    pub const fn pool(&self) -> &ItemPool<L> {
        self.inner.pool()
    }

    /// The handle materialized for logical index `index`, if shown.
    #[must_use]
    pub fn handle(&self, index: usize) -> Option<&L::Handle> {
        let start = self.state.start.get();
        index.checked_sub(start).and_then(|local| self.inner.handle(local))
    }

    /// The current scroll offset (within the page's content space).
    #[must_use]
    pub const fn scroll_offset(&self) -> Vec2 {
        self.inner.scroll_offset()
    }

    /// Spacing between adjacent items.
    pub fn set_spacing(&mut self, spacing: f64) {
        self.inner.set_spacing(spacing);
    }

    /// Forces a data refresh (see [`ScrollEngine::update_data`]).
    pub fn update_data(&mut self, immediate: bool) -> UpdateDamage {
        self.inner.update_data(immediate)
    }

    /// Geometry-preserving data refresh (see
    /// [`ScrollEngine::update_data_incremental`]).
    pub fn update_data_incremental(&mut self, immediate: bool) -> UpdateDamage {
        self.inner.update_data_incremental(immediate)
    }

    /// Drains a deferred data refresh and re-checks the page boundaries.
    pub fn end_frame(&mut self) -> UpdateDamage {
        let damage = self.inner.end_frame();
        if damage.is_empty() {
            damage
        } else {
            damage | self.maybe_shift()
        }
    }

    /// Sets the viewport size.
    pub fn set_viewport_size(&mut self, size: Size) -> UpdateDamage {
        self.inner.set_viewport_size(size)
    }

    /// Sets the scroll offset, patching the window and shifting the page when
    /// a boundary is reached.
    pub fn set_scroll_offset(&mut self, offset: Vec2) -> UpdateDamage {
        self.inner.set_scroll_offset(offset) | self.maybe_shift()
    }

    /// Adjusts the scroll offset by `delta`.
    pub fn scroll_by(&mut self, delta: Vec2) -> UpdateDamage {
        self.set_scroll_offset(self.inner.scroll_offset() + delta)
    }

    /// Scrolls so that logical item `index` sits at `anchor` fraction of the
    /// viewport, re-centering the page around it when it lies outside.
    pub fn scroll_to(&mut self, index: usize, anchor: f64) -> UpdateDamage {
        if !self.inner.is_configured() {
            return self.inner.update_data(true);
        }
        let start = self.state.start.get();
        let page_len = self.inner.len();
        let mut damage = UpdateDamage::empty();
        if index < start || index >= start + page_len {
            let logical = self.state.logical_len.get();
            let page = self.state.page_size.get();
            let new_start = index
                .saturating_sub(page / 2)
                .min(logical.saturating_sub(page));
            self.state.start.set(new_start);
            damage |= self.inner.update_data(true);
        }
        let local = index.saturating_sub(self.state.start.get());
        damage | self.inner.scroll_to(local, anchor)
    }

    /// Shifts the page when the window has reached an edge that still has
    /// logical items beyond it.
    fn maybe_shift(&mut self) -> UpdateDamage {
        let Some(window) = self.inner.window() else {
            return UpdateDamage::empty();
        };
        let page_len = self.inner.len();
        if page_len == 0 {
            return UpdateDamage::empty();
        }
        let start = self.state.start.get();
        let logical = self.state.logical_len.get();
        let half = (self.state.page_size.get() / 2).max(1);
        if window.last_hidden + 1 >= page_len && start + page_len < logical {
            let ahead = logical - (start + page_len);
            self.shift_forward(half.min(ahead))
        } else if window.first_hidden == 0 && start > 0 {
            self.shift_backward(half.min(start))
        } else {
            UpdateDamage::empty()
        }
    }

    /// Advances the page by `count` items, keeping on-screen items pinned.
    ///
    /// The extent occupied by the `count` leaving items is subtracted from
    /// the scroll offset after the rebuild, so the content under the viewport
    /// does not move.
    fn shift_forward(&mut self, count: usize) -> UpdateDamage {
        if count == 0 {
            return UpdateDamage::empty();
        }
        let flow = self.inner.flow();
        let Some(boundary) = self.inner.item_rect(count) else {
            return UpdateDamage::empty();
        };
        let removed = flow.main_start(boundary);
        let offset = self.inner.scroll_offset();
        self.state.start.set(self.state.start.get() + count);
        mdebug!(start = self.state.start.get(), "page shifted forward");
        let damage = self.inner.update_data(true);
        let main = (flow.main_offset(offset) - removed).max(0.0);
        damage | self.inner.set_scroll_offset(flow.with_main_offset(offset, main))
    }

    /// Rewinds the page by `count` items, keeping on-screen items pinned.
    fn shift_backward(&mut self, count: usize) -> UpdateDamage {
        if count == 0 {
            return UpdateDamage::empty();
        }
        let flow = self.inner.flow();
        let offset = self.inner.scroll_offset();
        self.state.start.set(self.state.start.get() - count);
        mdebug!(start = self.state.start.get(), "page shifted backward");
        let damage = self.inner.update_data(true);
        let added = self
            .inner
            .item_rect(count)
            .map_or(0.0, |rect| flow.main_start(rect));
        let main = flow.main_offset(offset) + added;
        damage | self.inner.set_scroll_offset(flow.with_main_offset(offset, main))
    }
}

impl<L: HandleLifecycle + core::fmt::Debug> core::fmt::Debug for PagedScrollEngine<L> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PagedScrollEngine")
            .field("inner", &self.inner)
            .field("start", &self.state.start.get())
            .field("logical_len", &self.state.logical_len.get())
            .field("page_size", &self.state.page_size.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use core::num::NonZeroUsize;

    use kurbo::{Size, Vec2};

    use midstory_interval::Flow;
    use midstory_pool::HandleLifecycle;

    use super::PagedScrollEngine;

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

    const ROW: f64 = 50.0;

    fn huge_list(logical: usize, page: usize) -> PagedScrollEngine<Host> {
        let mut engine =
            PagedScrollEngine::new(Host, Flow::TopDown, NonZeroUsize::new(page).unwrap());
        engine.set_viewport_size(Size::new(100.0, 120.0));
        engine.set_count_fn(move || logical);
        engine.set_size_fn(|_| Size::new(100.0, ROW));
        engine.update_data(true);
        engine
    }

    /// Position of the page in the (virtual) global content space.
    fn virtual_offset(engine: &PagedScrollEngine<Host>) -> f64 {
        engine.start_offset() as f64 * ROW + engine.scroll_offset().y
    }

    #[test]
    fn materialization_stays_bounded_on_huge_strips() {
        let mut engine = huge_list(100_000, 50);
        assert_eq!(engine.page_len(), 50);

        for _ in 0..400 {
            engine.scroll_by(Vec2::new(0.0, 40.0));
            assert!(engine.pool().bound_len() <= 52);
            assert!(engine.window().is_some());
        }
        // The page slid well past its initial position.
        assert!(engine.start_offset() > 0);
        assert!(engine.logical_window().unwrap().first_shown > 50);
    }

    #[test]
    fn page_shifts_do_not_move_content_under_the_viewport() {
        let mut engine = huge_list(100_000, 50);

        let mut expected = virtual_offset(&engine);
        for _ in 0..400 {
            engine.scroll_by(Vec2::new(0.0, 40.0));
            expected += 40.0;
            assert!(
                (virtual_offset(&engine) - expected).abs() < 1e-6,
                "page shift moved the content"
            );
        }

        // And back up again.
        for _ in 0..400 {
            engine.scroll_by(Vec2::new(0.0, -40.0));
            expected -= 40.0;
            assert!(
                (virtual_offset(&engine) - expected).abs() < 1e-6,
                "backward page shift moved the content"
            );
        }
        assert_eq!(virtual_offset(&engine), 0.0);
        assert_eq!(engine.start_offset(), 0);
    }

    #[test]
    fn scroll_to_recenters_the_page() {
        let mut engine = huge_list(100_000, 50);
        engine.scroll_to(80_000, 0.0);

        let window = engine.logical_window().unwrap();
        assert!(window.is_shown(80_000));
        assert!(engine.start_offset() <= 80_000);
        assert!(engine.pool().bound_len() <= 52);
        assert!(engine.handle(80_000).is_some());
        assert!(engine.handle(80_010).is_none());
    }

    #[test]
    fn shrinking_clamps_the_page_start() {
        use std::cell::Cell;
        use std::rc::Rc;

        let count = Rc::new(Cell::new(100_000_usize));
        let mut engine =
            PagedScrollEngine::new(Host, Flow::TopDown, NonZeroUsize::new(50).unwrap());
        engine.set_viewport_size(Size::new(100.0, 120.0));
        let count_src = Rc::clone(&count);
        engine.set_count_fn(move || count_src.get());
        engine.set_size_fn(|_| Size::new(100.0, ROW));
        engine.update_data(true);

        engine.scroll_to(90_000, 0.0);
        assert!(engine.start_offset() > 0);

        count.set(10);
        engine.update_data(true);
        assert_eq!(engine.start_offset(), 0);
        assert_eq!(engine.page_len(), 10);
        assert_eq!(engine.logical_len(), 10);
    }
}
