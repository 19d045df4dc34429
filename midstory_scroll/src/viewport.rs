// Copyright 2025 the Midstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The visible rectangle in content-local coordinates.

use kurbo::{Rect, Size, Vec2};

/// Tracks the scroll offset and viewport size of a scrollable container.
///
/// The offset is the content-local position of the viewport's origin and is
/// never negative. The visible rectangle is simply `offset + size`; it is
/// recomputed on demand rather than cached, since both inputs are trivial.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Viewport {
    offset: Vec2,
    size: Size,
}

impl Viewport {
    /// Creates a viewport of the given size at offset zero.
    #[must_use]
    pub fn new(size: Size) -> Self {
        Self {
            offset: Vec2::ZERO,
            size: clamp_size(size),
        }
    }

    /// The current scroll offset.
    #[must_use]
    pub const fn offset(&self) -> Vec2 {
        self.offset
    }

    /// Sets the scroll offset. Negative components clamp to zero.
    pub fn set_offset(&mut self, offset: Vec2) {
        self.offset = Vec2::new(offset.x.max(0.0), offset.y.max(0.0));
    }

    /// The viewport size.
    #[must_use]
    pub const fn size(&self) -> Size {
        self.size
    }

    /// Sets the viewport size. Negative components clamp to zero.
    pub fn set_size(&mut self, size: Size) {
        self.size = clamp_size(size);
    }

    /// The visible rectangle in content-local coordinates.
    #[must_use]
    pub fn rect(&self) -> Rect {
        Rect::from_origin_size(self.offset.to_point(), self.size)
    }

    /// The largest scroll offset that keeps the viewport inside `content`.
    #[must_use]
    pub fn max_scroll(&self, content: Size) -> Vec2 {
        Vec2::new(
            (content.width - self.size.width).max(0.0),
            (content.height - self.size.height).max(0.0),
        )
    }

    /// Clamps `offset` into `[0, max_scroll(content)]` per axis.
    #[must_use]
    pub fn clamp_offset(&self, offset: Vec2, content: Size) -> Vec2 {
        let max = self.max_scroll(content);
        Vec2::new(offset.x.clamp(0.0, max.x), offset.y.clamp(0.0, max.y))
    }
}

fn clamp_size(size: Size) -> Size {
    Size::new(size.width.max(0.0), size.height.max(0.0))
}

/// Half-open rectangle overlap: shared edges do not count.
///
/// Visibility checks use strict inequalities so that an item exactly touching
/// the viewport edge is treated as hidden. The closed test (as in
/// [`Rect::overlaps`]) would flip such items in and out across consecutive
/// frames as accumulated float error moves the boundary.
#[must_use]
pub fn strictly_overlaps(a: Rect, b: Rect) -> bool {
    a.x0 < b.x1 && a.x1 > b.x0 && a.y0 < b.y1 && a.y1 > b.y0
}

#[cfg(test)]
mod tests {
    use super::{Viewport, strictly_overlaps};
    use kurbo::{Rect, Size, Vec2};

    #[test]
    fn rect_tracks_offset_and_size() {
        let mut viewport = Viewport::new(Size::new(100.0, 50.0));
        assert_eq!(viewport.rect(), Rect::new(0.0, 0.0, 100.0, 50.0));

        viewport.set_offset(Vec2::new(10.0, 20.0));
        assert_eq!(viewport.rect(), Rect::new(10.0, 20.0, 110.0, 70.0));

        viewport.set_offset(Vec2::new(-5.0, 30.0));
        assert_eq!(viewport.offset(), Vec2::new(0.0, 30.0));
    }

    #[test]
    fn max_scroll_and_clamping() {
        let viewport = Viewport::new(Size::new(100.0, 50.0));
        let content = Size::new(100.0, 400.0);
        assert_eq!(viewport.max_scroll(content), Vec2::new(0.0, 350.0));
        assert_eq!(
            viewport.clamp_offset(Vec2::new(30.0, 1000.0), content),
            Vec2::new(0.0, 350.0)
        );
        // Content smaller than the viewport pins the offset at zero.
        assert_eq!(
            viewport.clamp_offset(Vec2::new(5.0, 5.0), Size::new(10.0, 10.0)),
            Vec2::ZERO
        );
    }

    #[test]
    fn shared_edges_do_not_overlap() {
        let view = Rect::new(0.0, 0.0, 100.0, 120.0);
        assert!(strictly_overlaps(Rect::new(0.0, 100.0, 100.0, 150.0), view));
        assert!(!strictly_overlaps(Rect::new(0.0, 120.0, 100.0, 170.0), view));
        assert!(!strictly_overlaps(Rect::new(0.0, -50.0, 100.0, 0.0), view));
        // Zero-area rectangles never overlap anything.
        assert!(!strictly_overlaps(Rect::new(10.0, 10.0, 10.0, 10.0), view));
    }
}
