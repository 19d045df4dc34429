// Copyright 2025 the Midstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Critical-window bookkeeping: which indices are materialized, and how the
//! window moves as the viewport does.

use kurbo::Rect;

use midstory_interval::Flow;
use midstory_pool::{HandleLifecycle, ItemPool};

use crate::damage::UpdateDamage;
use crate::engine::UpdateFn;
use crate::viewport::strictly_overlaps;

/// The four boundary indices of a virtualized scroll view.
///
/// Items in `first_shown..=last_shown` are materialized and overlap the
/// viewport; `first_hidden` and `last_hidden` are the adjacent candidate
/// indices checked first when the viewport moves. Invariant:
/// `first_hidden <= first_shown <= last_shown <= last_hidden`, with every
/// field clamped into `0..len` (the hidden indices saturate at the ends of
/// the strip rather than going out of range).
///
/// Windows are produced and mutated only by the engines in this crate;
/// callers read them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CriticalWindow {
    /// Candidate index just before the shown range (clamped to 0).
    pub first_hidden: usize,
    /// First materialized index.
    pub first_shown: usize,
    /// Last materialized index.
    pub last_shown: usize,
    /// Candidate index just after the shown range (clamped to `len - 1`).
    pub last_hidden: usize,
}

impl CriticalWindow {
    /// Builds a window around a shown range, clamping the hidden boundaries
    /// into `0..len`.
    #[must_use]
    pub(crate) fn around(first_shown: usize, last_shown: usize, len: usize) -> Self {
        debug_assert!(
            first_shown <= last_shown && last_shown < len,
            "shown range {first_shown}..={last_shown} out of bounds for {len} items"
        );
        Self {
            first_hidden: first_shown.saturating_sub(1),
            first_shown,
            last_shown,
            last_hidden: (last_shown + 1).min(len.saturating_sub(1)),
        }
    }

    /// The materialized index range.
    #[must_use]
    pub const fn shown(&self) -> core::ops::RangeInclusive<usize> {
        self.first_shown..=self.last_shown
    }

    /// Number of materialized indices.
    #[must_use]
    pub const fn shown_len(&self) -> usize {
        self.last_shown - self.first_shown + 1
    }

    /// Returns `true` if `index` is materialized.
    #[must_use]
    pub const fn is_shown(&self, index: usize) -> bool {
        self.first_shown <= index && index <= self.last_shown
    }
}

/// Rectangle source the window algorithms run against.
///
/// [`crate::ScrollEngine`] backs this with the lazily-validated rect cache;
/// [`crate::FixedScrollEngine`] with O(1) arithmetic.
pub(crate) trait RectSource {
    /// Number of items in the strip.
    fn len(&mut self) -> usize;

    /// Content-local rectangle of `index`, computed on demand.
    fn rect_of(&mut self, index: usize) -> Rect;

    /// An index whose leading edge is at or before `main_offset`, used to
    /// localize full window resets.
    fn index_near(&mut self, main_offset: f64) -> usize;
}

/// Finds the window of indices strictly overlapping `view` from scratch.
///
/// Localizes via [`RectSource::index_near`], fixes the starting point up
/// backwards (mirrors how offset lookups can land one past the target), then
/// scans forward until items start at or beyond the viewport's trailing
/// edge. Returns `None` when nothing overlaps.
pub(crate) fn locate<R: RectSource>(rects: &mut R, flow: Flow, view: Rect) -> Option<CriticalWindow> {
    let len = rects.len();
    if len == 0 {
        return None;
    }

    let view_start = flow.main_start(view);
    let view_end = flow.main_end(view);

    let mut start = rects.index_near(view_start).min(len - 1);
    while start > 0 && flow.main_start(rects.rect_of(start)) > view_start {
        start -= 1;
    }

    let mut first = None;
    let mut last = None;
    let mut index = start;
    while index < len {
        let rect = rects.rect_of(index);
        if strictly_overlaps(rect, view) {
            if first.is_none() {
                first = Some(index);
            }
            last = Some(index);
        }
        if flow.main_start(rect) >= view_end {
            break;
        }
        index += 1;
    }

    Some(CriticalWindow::around(first?, last?, len))
}

/// Outcome of one incremental window pass.
pub(crate) enum Step {
    /// The window changed; apply the new one.
    Moved(CriticalWindow),
    /// Nothing crossed a boundary.
    Unchanged,
    /// Every shown item scrolled out; the caller must relocate from scratch.
    Lost,
}

/// Walks the window boundaries one item at a time until they stabilize.
///
/// Each pass hides shown boundary items that no longer overlap the viewport
/// and shows hidden candidates that now do, front then back, repeating until
/// a pass changes nothing. Cost is bounded by how many items crossed the
/// viewport edge since the last update, not by the strip length. A delta so
/// large that no shown item still overlaps reports [`Step::Lost`].
pub(crate) fn step<R: RectSource>(
    rects: &mut R,
    flow: Flow,
    view: Rect,
    window: CriticalWindow,
) -> Step {
    let len = rects.len();
    if len == 0 {
        return Step::Lost;
    }

    // Transient overshoot guard: a stale window may point past a shrunken
    // strip.
    let mut first = window.first_shown.min(len - 1);
    let mut last = window.last_shown.min(len - 1);

    loop {
        let mut changed = false;

        while !strictly_overlaps(rects.rect_of(first), view) {
            if first == last {
                return Step::Lost;
            }
            first += 1;
            changed = true;
        }
        while first > 0 && strictly_overlaps(rects.rect_of(first - 1), view) {
            first -= 1;
            changed = true;
        }
        while !strictly_overlaps(rects.rect_of(last), view) {
            if last == first {
                return Step::Lost;
            }
            last -= 1;
            changed = true;
        }
        while last + 1 < len && strictly_overlaps(rects.rect_of(last + 1), view) {
            last += 1;
            changed = true;
        }

        if !changed {
            break;
        }
    }

    let next = CriticalWindow::around(first, last, len);
    if next == window {
        Step::Unchanged
    } else {
        Step::Moved(next)
    }
}

/// Reconciles the pool with a window change.
///
/// Releases handles leaving the shown range, acquires handles entering it,
/// and invokes the per-item update callback for every newly acquired index
/// (or for every shown index when `refresh_all` is set, as full data
/// refreshes must re-fill surviving items too). Acquire and release are
/// idempotent per index, so re-applying the same window is damage-free.
pub(crate) fn apply<R, L>(
    rects: &mut R,
    pool: &mut ItemPool<L>,
    mut update_fn: Option<&mut UpdateFn<L::Handle>>,
    old: Option<CriticalWindow>,
    next: Option<CriticalWindow>,
    refresh_all: bool,
) -> UpdateDamage
where
    R: RectSource,
    L: HandleLifecycle,
{
    let mut damage = UpdateDamage::empty();

    if let Some(window) = old {
        for index in window.shown() {
            let keep = next.is_some_and(|n| n.is_shown(index));
            if !keep && pool.release(index) {
                damage |= UpdateDamage::ITEMS_RELEASED;
            }
        }
    }

    if let Some(window) = next {
        for index in window.shown() {
            let newly = !pool.is_bound(index);
            if !newly && !refresh_all {
                continue;
            }
            if newly {
                damage |= UpdateDamage::ITEMS_ACQUIRED;
            }
            let rect = rects.rect_of(index);
            let handle = pool.acquire(index);
            if let Some(update) = update_fn.as_deref_mut() {
                update(index, handle, rect);
            }
        }
    }

    if next != old {
        damage |= UpdateDamage::WINDOW_MOVED;
    }
    damage
}

#[cfg(test)]
mod tests {
    use super::{CriticalWindow, RectSource, Step, locate, step};
    use kurbo::Rect;
    use midstory_interval::Flow;

    /// Uniform 50-tall rows, 100 wide.
    struct Rows {
        len: usize,
    }

    impl RectSource for Rows {
        fn len(&mut self) -> usize {
            self.len
        }

        fn rect_of(&mut self, index: usize) -> Rect {
            let top = index as f64 * 50.0;
            Rect::new(0.0, top, 100.0, top + 50.0)
        }

        fn index_near(&mut self, main_offset: f64) -> usize {
            #[allow(
                clippy::cast_possible_truncation,
                reason = "clamped to the strip immediately after the cast"
            )]
            let index = (main_offset.max(0.0) / 50.0) as usize;
            index.min(self.len.saturating_sub(1))
        }
    }

    fn view(top: f64) -> Rect {
        Rect::new(0.0, top, 100.0, top + 120.0)
    }

    #[test]
    fn locate_finds_the_overlapping_range() {
        let mut rows = Rows { len: 10 };
        let window = locate(&mut rows, Flow::TopDown, view(0.0)).unwrap();
        assert_eq!(window.first_shown, 0);
        assert_eq!(window.last_shown, 2);
        assert_eq!(window.first_hidden, 0);
        assert_eq!(window.last_hidden, 3);
    }

    #[test]
    fn locate_handles_nothing_overlapping() {
        let mut rows = Rows { len: 3 };
        // Viewport entirely past the content.
        assert!(locate(&mut rows, Flow::TopDown, view(500.0)).is_none());
        let mut empty = Rows { len: 0 };
        assert!(locate(&mut empty, Flow::TopDown, view(0.0)).is_none());
    }

    #[test]
    fn step_slides_one_boundary_at_a_time() {
        let mut rows = Rows { len: 10 };
        let window = locate(&mut rows, Flow::TopDown, view(0.0)).unwrap();

        let Step::Moved(next) = step(&mut rows, Flow::TopDown, view(50.0), window) else {
            panic!("window should move");
        };
        assert_eq!(next.first_shown, 1);
        assert_eq!(next.last_shown, 3);
        assert_eq!(next.first_hidden, 0);
        assert_eq!(next.last_hidden, 4);

        assert!(matches!(
            step(&mut rows, Flow::TopDown, view(50.0), next),
            Step::Unchanged
        ));
    }

    #[test]
    fn step_reports_lost_after_a_full_jump() {
        let mut rows = Rows { len: 100 };
        let window = locate(&mut rows, Flow::TopDown, view(0.0)).unwrap();
        assert!(matches!(
            step(&mut rows, Flow::TopDown, view(2000.0), window),
            Step::Lost
        ));
    }

    #[test]
    fn step_converges_over_multi_item_deltas() {
        let mut rows = Rows { len: 100 };
        let window = locate(&mut rows, Flow::TopDown, view(0.0)).unwrap();
        // A two-row delta still overlaps the old window, so stepping works.
        let Step::Moved(next) = step(&mut rows, Flow::TopDown, view(100.0), window) else {
            panic!("window should move");
        };
        let direct = locate(&mut rows, Flow::TopDown, view(100.0)).unwrap();
        assert_eq!(next, direct);
    }

    #[test]
    fn window_invariant_holds_at_the_edges() {
        let window = CriticalWindow::around(0, 2, 3);
        assert_eq!(window.first_hidden, 0);
        assert_eq!(window.last_hidden, 2);
        assert!(window.first_hidden <= window.first_shown);
        assert!(window.last_shown <= window.last_hidden);
        assert_eq!(window.shown_len(), 3);
        assert!(window.is_shown(1));
        assert!(!window.is_shown(3));
    }
}
