// Copyright 2025 the Midstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Flow directions and scroll-axis helpers.

use kurbo::{Rect, Size, Vec2};

/// The direction in which items advance through the scrollable content.
///
/// The *main* axis is the scroll axis; the *cross* axis is perpendicular to
/// it. Wrapped flows fill a line along the cross axis first and step the main
/// axis when the next item would exceed the available cross extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Flow {
    /// Items stack vertically; the list scrolls along y.
    #[default]
    TopDown,
    /// Items stack horizontally; the list scrolls along x.
    LeftToRight,
    /// Items fill rows left-to-right and wrap; the grid scrolls along y.
    TopDownWrap,
    /// Items fill columns top-to-bottom and wrap; the grid scrolls along x.
    LeftToRightWrap,
}

impl Flow {
    /// Returns `true` if the scroll axis is vertical.
    #[must_use]
    pub const fn is_vertical(self) -> bool {
        matches!(self, Self::TopDown | Self::TopDownWrap)
    }

    /// Returns `true` if items wrap onto new lines.
    #[must_use]
    pub const fn is_wrapped(self) -> bool {
        matches!(self, Self::TopDownWrap | Self::LeftToRightWrap)
    }

    /// The extent of `size` along the scroll axis.
    #[must_use]
    pub const fn main_of(self, size: Size) -> f64 {
        if self.is_vertical() {
            size.height
        } else {
            size.width
        }
    }

    /// The extent of `size` along the cross axis.
    #[must_use]
    pub const fn cross_of(self, size: Size) -> f64 {
        if self.is_vertical() {
            size.width
        } else {
            size.height
        }
    }

    /// The leading edge of `rect` along the scroll axis.
    #[must_use]
    pub const fn main_start(self, rect: Rect) -> f64 {
        if self.is_vertical() { rect.y0 } else { rect.x0 }
    }

    /// The trailing edge of `rect` along the scroll axis.
    #[must_use]
    pub const fn main_end(self, rect: Rect) -> f64 {
        if self.is_vertical() { rect.y1 } else { rect.x1 }
    }

    /// The trailing edge of `rect` along the cross axis.
    #[must_use]
    pub const fn cross_end(self, rect: Rect) -> f64 {
        if self.is_vertical() { rect.x1 } else { rect.y1 }
    }

    /// The scroll-axis component of an offset vector.
    #[must_use]
    pub const fn main_offset(self, offset: Vec2) -> f64 {
        if self.is_vertical() { offset.y } else { offset.x }
    }

    /// Replaces the scroll-axis component of `offset` with `main`.
    #[must_use]
    pub const fn with_main_offset(self, offset: Vec2, main: f64) -> Vec2 {
        if self.is_vertical() {
            Vec2::new(offset.x, main)
        } else {
            Vec2::new(main, offset.y)
        }
    }

    /// Builds a rectangle from main/cross line coordinates and an item size.
    ///
    /// `main` is the item's leading edge on the scroll axis, `cross` its
    /// leading edge on the cross axis.
    #[must_use]
    pub fn place(self, main: f64, cross: f64, size: Size) -> Rect {
        if self.is_vertical() {
            Rect::new(cross, main, cross + size.width, main + size.height)
        } else {
            Rect::new(main, cross, main + size.width, cross + size.height)
        }
    }

    /// Builds a [`Size`] from main/cross extents.
    #[must_use]
    pub const fn size_from(self, main: f64, cross: f64) -> Size {
        if self.is_vertical() {
            Size::new(cross, main)
        } else {
            Size::new(main, cross)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Flow;
    use kurbo::{Rect, Size, Vec2};

    #[test]
    fn axis_helpers_follow_the_scroll_axis() {
        let size = Size::new(30.0, 40.0);
        assert_eq!(Flow::TopDown.main_of(size), 40.0);
        assert_eq!(Flow::TopDown.cross_of(size), 30.0);
        assert_eq!(Flow::LeftToRight.main_of(size), 30.0);
        assert_eq!(Flow::LeftToRight.cross_of(size), 40.0);

        let rect = Rect::new(1.0, 2.0, 3.0, 4.0);
        assert_eq!(Flow::TopDownWrap.main_start(rect), 2.0);
        assert_eq!(Flow::TopDownWrap.main_end(rect), 4.0);
        assert_eq!(Flow::LeftToRightWrap.main_start(rect), 1.0);
        assert_eq!(Flow::LeftToRightWrap.main_end(rect), 3.0);
    }

    #[test]
    fn place_orients_main_and_cross() {
        let size = Size::new(10.0, 20.0);
        assert_eq!(
            Flow::TopDown.place(100.0, 5.0, size),
            Rect::new(5.0, 100.0, 15.0, 120.0)
        );
        assert_eq!(
            Flow::LeftToRight.place(100.0, 5.0, size),
            Rect::new(100.0, 5.0, 110.0, 25.0)
        );
    }

    #[test]
    fn offset_helpers_round_trip() {
        let offset = Vec2::new(7.0, 9.0);
        assert_eq!(Flow::TopDown.main_offset(offset), 9.0);
        assert_eq!(
            Flow::TopDown.with_main_offset(offset, 42.0),
            Vec2::new(7.0, 42.0)
        );
        assert_eq!(Flow::LeftToRight.main_offset(offset), 7.0);
        assert_eq!(
            Flow::LeftToRight.with_main_offset(offset, 42.0),
            Vec2::new(42.0, 9.0)
        );
    }
}
