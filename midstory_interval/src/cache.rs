// Copyright 2025 the Midstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A lazily-validated cache of per-item rectangles.

use alloc::vec::Vec;

use kurbo::{Rect, Size};

use crate::{Flow, ItemExtents};

/// Placement state for the next entry to be computed.
///
/// `main` is the leading edge of the current line on the scroll axis, `lane`
/// the next free position on the cross axis (wrapped flows only), and
/// `line_end` the furthest trailing edge reached on the scroll axis so far.
#[derive(Debug, Clone, Copy, Default)]
struct Cursor {
    main: f64,
    lane: f64,
    line_end: f64,
}

/// A cache of item rectangles in content-local coordinates.
///
/// Entries are computed front to back: the rectangle of entry `i` depends on
/// where entry `i - 1` ended, so validity is always a contiguous prefix
/// `0..valid_len()`. [`RectCache::ensure_valid`] extends that prefix on
/// demand, calling the [`ItemExtents`] source exactly once per newly computed
/// entry; repeated queries for already-valid entries are free.
///
/// The cache does not own the item count as data — callers set the logical
/// length with [`RectCache::set_len`] and invalidate when sizes change. A
/// full invalidation discards every entry; [`RectCache::invalidate_from`]
/// keeps the prefix before the given index, which is what makes append-only
/// data refreshes cheap.
#[derive(Debug, Clone)]
pub struct RectCache {
    flow: Flow,
    spacing: f64,
    cross_limit: f64,
    rects: Vec<Rect>,
    valid: usize,
    cursor: Cursor,
    cross_reach: f64,
    cross_dirty: bool,
}

impl RectCache {
    /// Creates an empty cache for the given flow and item spacing.
    ///
    /// Wrapped flows wrap against [`RectCache::set_cross_limit`]; until a
    /// limit is set, lines never wrap.
    #[must_use]
    pub fn new(flow: Flow, spacing: f64) -> Self {
        Self {
            flow,
            spacing: if spacing.is_sign_negative() { 0.0 } else { spacing },
            cross_limit: f64::INFINITY,
            rects: Vec::new(),
            valid: 0,
            cursor: Cursor::default(),
            cross_reach: 0.0,
            cross_dirty: false,
        }
    }

    /// Returns the flow this cache lays items out in.
    #[must_use]
    pub const fn flow(&self) -> Flow {
        self.flow
    }

    /// Sets the flow, discarding every computed entry.
    pub fn set_flow(&mut self, flow: Flow) {
        if self.flow != flow {
            self.flow = flow;
            self.invalidate_all();
        }
    }

    /// Returns the spacing between adjacent items.
    #[must_use]
    pub const fn spacing(&self) -> f64 {
        self.spacing
    }

    /// Sets the spacing between adjacent items, discarding every computed
    /// entry. Negative spacing is clamped to zero.
    pub fn set_spacing(&mut self, spacing: f64) {
        let spacing = if spacing.is_sign_negative() {
            0.0
        } else {
            spacing
        };
        if self.spacing != spacing {
            self.spacing = spacing;
            self.invalidate_all();
        }
    }

    /// Returns the cross-axis extent wrapped flows wrap against.
    #[must_use]
    pub const fn cross_limit(&self) -> f64 {
        self.cross_limit
    }

    /// Sets the cross-axis extent wrapped flows wrap against (typically the
    /// viewport's cross extent), discarding every computed entry.
    pub fn set_cross_limit(&mut self, limit: f64) {
        if self.cross_limit != limit {
            self.cross_limit = limit;
            self.invalidate_all();
        }
    }

    /// Number of items tracked by the cache.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rects.len()
    }

    /// Returns `true` if the cache tracks no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    /// Length of the valid prefix.
    #[must_use]
    pub const fn valid_len(&self) -> usize {
        self.valid
    }

    /// Sets the number of tracked items.
    ///
    /// Growing appends not-yet-computed entries; the valid prefix survives.
    /// Shrinking truncates, clamping the valid prefix to the new length.
    pub fn set_len(&mut self, len: usize) {
        self.rects.resize(len, Rect::ZERO);
        if self.valid > len {
            self.valid = len;
            self.rebuild_cursor();
            self.cross_dirty = true;
        }
    }

    /// Discards every computed entry.
    pub fn invalidate_all(&mut self) {
        self.valid = 0;
        self.cursor = Cursor::default();
        self.cross_reach = 0.0;
        self.cross_dirty = false;
    }

    /// Discards entries at or beyond `index`, keeping the prefix before it.
    pub fn invalidate_from(&mut self, index: usize) {
        if index < self.valid {
            self.valid = index;
            self.rebuild_cursor();
            self.cross_dirty = true;
        }
    }

    /// Returns the rectangle of `index` if it has been computed.
    #[must_use]
    pub fn rect(&self, index: usize) -> Option<Rect> {
        (index < self.valid).then(|| self.rects[index])
    }

    /// Returns `true` if the rectangle of `index` has been computed.
    #[must_use]
    pub const fn is_valid(&self, index: usize) -> bool {
        index < self.valid
    }

    /// Guarantees that the rectangle for `index` is computed, computing any
    /// missing predecessors first.
    ///
    /// Out-of-range indices are a no-op: boundary arithmetic in scroll
    /// engines transiently overshoots by one and must not fault.
    pub fn ensure_valid<E: ItemExtents>(&mut self, extents: &mut E, index: usize) {
        if index >= self.rects.len() {
            return;
        }
        while self.valid <= index {
            let next = self.valid;
            let size = sanitize(extents.size_of(next));
            let rect = self.place_next(size);
            self.rects[next] = rect;
            if !self.cross_dirty {
                self.cross_reach = self.cross_reach.max(self.flow.cross_end(rect));
            }
            self.valid += 1;
        }
    }

    /// Total extent of the computed portion of the content, including
    /// cross-axis reach. Grows as entries are validated.
    #[must_use]
    pub fn content_extent(&mut self) -> Size {
        if self.valid == 0 {
            return Size::ZERO;
        }
        if self.cross_dirty {
            let flow = self.flow;
            self.cross_reach = self.rects[..self.valid]
                .iter()
                .fold(0.0_f64, |acc, r| acc.max(flow.cross_end(*r)));
            self.cross_dirty = false;
        }
        self.flow.size_from(self.cursor.line_end, self.cross_reach)
    }

    /// Returns the index of the entry whose leading edge is nearest at or
    /// before `main_offset` on the scroll axis.
    ///
    /// Validates entries forward as needed to localize the offset; the result
    /// is clamped into `0..len` (0 for an empty cache).
    pub fn index_at<E: ItemExtents>(&mut self, extents: &mut E, main_offset: f64) -> usize {
        let len = self.rects.len();
        if len == 0 {
            return 0;
        }
        self.ensure_valid(extents, 0);
        while self.valid < len
            && self.flow.main_start(self.rects[self.valid - 1]) <= main_offset
        {
            let next = self.valid;
            self.ensure_valid(extents, next);
        }
        let flow = self.flow;
        let idx = self.rects[..self.valid]
            .partition_point(|r| flow.main_start(*r) <= main_offset);
        idx.saturating_sub(1)
    }

    fn place_next(&mut self, size: Size) -> Rect {
        if self.flow.is_wrapped() {
            let cross_ext = self.flow.cross_of(size);
            if self.cursor.lane > 0.0 && self.cursor.lane + cross_ext > self.cross_limit {
                self.cursor.main = self.cursor.line_end + self.spacing;
                self.cursor.lane = 0.0;
                self.cursor.line_end = self.cursor.main;
            }
            let rect = self.flow.place(self.cursor.main, self.cursor.lane, size);
            self.cursor.lane = self.flow.cross_end(rect) + self.spacing;
            self.cursor.line_end = self.cursor.line_end.max(self.flow.main_end(rect));
            rect
        } else {
            let rect = self.flow.place(self.cursor.main, 0.0, size);
            let end = self.flow.main_end(rect);
            self.cursor.main = end + self.spacing;
            self.cursor.line_end = self.cursor.line_end.max(end);
            rect
        }
    }

    /// Recovers the placement cursor for the current valid prefix.
    ///
    /// Linear flows only need the last entry. Wrapped flows walk back over
    /// the current line (entries sharing the last entry's leading edge) to
    /// recover the line's furthest trailing edge.
    fn rebuild_cursor(&mut self) {
        if self.valid == 0 {
            self.cursor = Cursor::default();
            return;
        }
        let last = self.rects[self.valid - 1];
        if self.flow.is_wrapped() {
            let line_main = self.flow.main_start(last);
            let mut line_end = self.flow.main_end(last);
            let mut i = self.valid - 1;
            while i > 0 && self.flow.main_start(self.rects[i - 1]) == line_main {
                i -= 1;
                line_end = line_end.max(self.flow.main_end(self.rects[i]));
            }
            self.cursor = Cursor {
                main: line_main,
                lane: self.flow.cross_end(last) + self.spacing,
                line_end,
            };
        } else {
            let end = self.flow.main_end(last);
            self.cursor = Cursor {
                main: end + self.spacing,
                lane: 0.0,
                line_end: end,
            };
        }
    }
}

fn sanitize(size: Size) -> Size {
    debug_assert!(
        size.width.is_finite() && size.height.is_finite(),
        "item sizes must be finite; got {size:?}"
    );
    let w = if size.width.is_sign_negative() {
        0.0
    } else {
        size.width
    };
    let h = if size.height.is_sign_negative() {
        0.0
    } else {
        size.height
    };
    Size::new(w, h)
}

#[cfg(test)]
mod tests {
    use super::RectCache;
    use crate::Flow;
    use kurbo::{Rect, Size};

    fn uniform(size: Size) -> impl FnMut(usize) -> Size {
        move |_| size
    }

    #[test]
    fn top_down_chain_accumulates_heights_and_spacing() {
        let mut cache = RectCache::new(Flow::TopDown, 4.0);
        cache.set_len(3);
        let mut sizes = |i: usize| Size::new(100.0, 10.0 * (i + 1) as f64);

        cache.ensure_valid(&mut sizes, 2);
        assert_eq!(cache.rect(0), Some(Rect::new(0.0, 0.0, 100.0, 10.0)));
        assert_eq!(cache.rect(1), Some(Rect::new(0.0, 14.0, 100.0, 34.0)));
        assert_eq!(cache.rect(2), Some(Rect::new(0.0, 38.0, 100.0, 68.0)));
        assert_eq!(cache.content_extent(), Size::new(100.0, 68.0));
    }

    #[test]
    fn left_to_right_advances_along_x() {
        let mut cache = RectCache::new(Flow::LeftToRight, 0.0);
        cache.set_len(2);
        let mut sizes = uniform(Size::new(30.0, 50.0));

        cache.ensure_valid(&mut sizes, 1);
        assert_eq!(cache.rect(0), Some(Rect::new(0.0, 0.0, 30.0, 50.0)));
        assert_eq!(cache.rect(1), Some(Rect::new(30.0, 0.0, 60.0, 50.0)));
        assert_eq!(cache.content_extent(), Size::new(60.0, 50.0));
    }

    #[test]
    fn wrapped_flow_wraps_at_the_cross_limit() {
        let mut cache = RectCache::new(Flow::TopDownWrap, 0.0);
        cache.set_cross_limit(100.0);
        cache.set_len(5);
        let mut sizes = uniform(Size::new(40.0, 20.0));

        cache.ensure_valid(&mut sizes, 4);
        // Two items per row: a third 40-wide item would end at 120 > 100.
        assert_eq!(cache.rect(0), Some(Rect::new(0.0, 0.0, 40.0, 20.0)));
        assert_eq!(cache.rect(1), Some(Rect::new(40.0, 0.0, 80.0, 20.0)));
        assert_eq!(cache.rect(2), Some(Rect::new(0.0, 20.0, 40.0, 40.0)));
        assert_eq!(cache.rect(3), Some(Rect::new(40.0, 20.0, 80.0, 40.0)));
        assert_eq!(cache.rect(4), Some(Rect::new(0.0, 40.0, 40.0, 60.0)));
        assert_eq!(cache.content_extent(), Size::new(80.0, 60.0));
    }

    #[test]
    fn wrapped_line_advance_uses_the_tallest_item() {
        let mut cache = RectCache::new(Flow::TopDownWrap, 0.0);
        cache.set_cross_limit(100.0);
        cache.set_len(3);
        // First row: a short item next to a tall one.
        let mut sizes = |i: usize| match i {
            0 => Size::new(50.0, 10.0),
            1 => Size::new(50.0, 30.0),
            _ => Size::new(50.0, 10.0),
        };

        cache.ensure_valid(&mut sizes, 2);
        assert_eq!(cache.rect(2), Some(Rect::new(0.0, 30.0, 50.0, 40.0)));
    }

    #[test]
    fn invalidate_from_keeps_the_prefix() {
        let mut cache = RectCache::new(Flow::TopDown, 0.0);
        cache.set_len(4);
        let mut sizes = uniform(Size::new(10.0, 10.0));
        cache.ensure_valid(&mut sizes, 3);

        cache.invalidate_from(2);
        assert_eq!(cache.valid_len(), 2);
        assert_eq!(cache.rect(1), Some(Rect::new(0.0, 10.0, 10.0, 20.0)));
        assert_eq!(cache.rect(2), None);

        // Recomputation resumes from the cursor left at index 2.
        let mut bigger = uniform(Size::new(10.0, 40.0));
        cache.ensure_valid(&mut bigger, 3);
        assert_eq!(cache.rect(2), Some(Rect::new(0.0, 20.0, 10.0, 60.0)));
        assert_eq!(cache.rect(3), Some(Rect::new(0.0, 60.0, 10.0, 100.0)));
    }

    #[test]
    fn growing_keeps_valid_entries_and_shrinking_truncates() {
        let mut cache = RectCache::new(Flow::TopDown, 0.0);
        cache.set_len(2);
        let mut sizes = uniform(Size::new(10.0, 10.0));
        cache.ensure_valid(&mut sizes, 1);

        cache.set_len(5);
        assert_eq!(cache.valid_len(), 2);
        assert_eq!(cache.rect(1), Some(Rect::new(0.0, 10.0, 10.0, 20.0)));

        cache.set_len(1);
        assert_eq!(cache.valid_len(), 1);
        assert_eq!(cache.content_extent(), Size::new(10.0, 10.0));
    }

    #[test]
    fn index_at_localizes_offsets() {
        let mut cache = RectCache::new(Flow::TopDown, 0.0);
        cache.set_len(10);
        let mut sizes = uniform(Size::new(10.0, 50.0));

        assert_eq!(cache.index_at(&mut sizes, 0.0), 0);
        assert_eq!(cache.index_at(&mut sizes, 49.0), 0);
        assert_eq!(cache.index_at(&mut sizes, 50.0), 1);
        assert_eq!(cache.index_at(&mut sizes, 125.0), 2);
        // Past the end: clamps to the last item.
        assert_eq!(cache.index_at(&mut sizes, 10_000.0), 9);
        // Before the start: clamps to the anchor.
        assert_eq!(cache.index_at(&mut sizes, -5.0), 0);
    }

    #[test]
    fn degenerate_sizes_terminate_and_clamp() {
        let mut cache = RectCache::new(Flow::TopDown, 0.0);
        cache.set_len(3);
        let mut sizes = |i: usize| {
            if i == 1 {
                Size::new(-10.0, -10.0)
            } else {
                Size::new(10.0, 10.0)
            }
        };

        cache.ensure_valid(&mut sizes, 2);
        // The negative size collapses to zero and the chain continues.
        assert_eq!(cache.rect(1), Some(Rect::new(0.0, 10.0, 0.0, 10.0)));
        assert_eq!(cache.rect(2), Some(Rect::new(0.0, 10.0, 10.0, 20.0)));

        // All-zero sizes still terminate at the data count.
        let mut zero = uniform(Size::ZERO);
        let mut flat = RectCache::new(Flow::TopDown, 0.0);
        flat.set_len(100);
        assert_eq!(flat.index_at(&mut zero, 10.0), 99);
    }

    #[test]
    fn out_of_range_ensure_valid_is_a_no_op() {
        let mut cache = RectCache::new(Flow::TopDown, 0.0);
        cache.set_len(2);
        let mut sizes = uniform(Size::new(10.0, 10.0));
        cache.ensure_valid(&mut sizes, 7);
        assert_eq!(cache.valid_len(), 0);
    }
}
