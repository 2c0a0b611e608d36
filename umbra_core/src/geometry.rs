// Copyright 2026 the Umbra Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Integer pixel geometry.
//!
//! Occlusion is tracked on whole pixels. [`PixelRect`] is the unit every
//! region, clip, and visible rect is expressed in; float geometry from
//! transforms is converted with [`PixelRect::from_enclosing`] (for things that
//! must not lose coverage, like the area a layer touches) or
//! [`PixelRect::from_enclosed`] (for things that must not gain coverage, like
//! opaque occluders).

use kurbo::Rect;
#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;

/// A width and height in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct PixelSize {
    /// Width in pixels.
    pub width: i32,
    /// Height in pixels.
    pub height: i32,
}

impl PixelSize {
    /// The zero size.
    pub const ZERO: Self = Self {
        width: 0,
        height: 0,
    };

    /// Creates a size, clamping negative extents to zero.
    #[inline]
    #[must_use]
    pub const fn new(width: i32, height: i32) -> Self {
        Self {
            width: if width < 0 { 0 } else { width },
            height: if height < 0 { 0 } else { height },
        }
    }

    /// Returns `true` if either extent is zero.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.width <= 0 || self.height <= 0
    }
}

/// An axis-aligned rectangle on the integer pixel grid.
///
/// The rectangle covers `x..x + width` horizontally and `y..y + height`
/// vertically. A rectangle with a zero extent is empty; empty rectangles
/// never intersect anything.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct PixelRect {
    /// Left edge.
    pub x: i32,
    /// Top edge.
    pub y: i32,
    /// Width (never negative when built through the constructors).
    pub width: i32,
    /// Height (never negative when built through the constructors).
    pub height: i32,
}

impl PixelRect {
    /// The empty rectangle at the origin.
    pub const ZERO: Self = Self {
        x: 0,
        y: 0,
        width: 0,
        height: 0,
    };

    /// Creates a rectangle, clamping negative extents to zero.
    #[inline]
    #[must_use]
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width: if width < 0 { 0 } else { width },
            height: if height < 0 { 0 } else { height },
        }
    }

    /// Creates a rectangle at the origin with the given size.
    #[inline]
    #[must_use]
    pub const fn from_size(size: PixelSize) -> Self {
        Self::new(0, 0, size.width, size.height)
    }

    /// Creates a rectangle from its four edges.
    ///
    /// Inverted edges produce an empty rectangle anchored at `(left, top)`.
    #[inline]
    #[must_use]
    pub const fn from_edges(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self::new(
            left,
            top,
            right.saturating_sub(left),
            bottom.saturating_sub(top),
        )
    }

    /// Right edge (exclusive).
    #[inline]
    #[must_use]
    pub const fn right(self) -> i32 {
        self.x.saturating_add(self.width)
    }

    /// Bottom edge (exclusive).
    #[inline]
    #[must_use]
    pub const fn bottom(self) -> i32 {
        self.y.saturating_add(self.height)
    }

    /// Returns the size of the rectangle.
    #[inline]
    #[must_use]
    pub const fn size(self) -> PixelSize {
        PixelSize::new(self.width, self.height)
    }

    /// Returns `true` if the rectangle covers no pixels.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Number of pixels covered.
    #[inline]
    #[must_use]
    pub const fn area(self) -> i64 {
        if self.is_empty() {
            0
        } else {
            self.width as i64 * self.height as i64
        }
    }

    /// Returns the overlap of two rectangles, or [`ZERO`](Self::ZERO).
    #[must_use]
    pub fn intersect(self, other: Self) -> Self {
        let left = self.x.max(other.x);
        let top = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if right <= left || bottom <= top {
            return Self::ZERO;
        }
        Self::from_edges(left, top, right, bottom)
    }

    /// Returns the smallest rectangle containing both.
    ///
    /// Empty operands are ignored.
    #[must_use]
    pub fn union(self, other: Self) -> Self {
        if self.is_empty() {
            return other;
        }
        if other.is_empty() {
            return self;
        }
        Self::from_edges(
            self.x.min(other.x),
            self.y.min(other.y),
            self.right().max(other.right()),
            self.bottom().max(other.bottom()),
        )
    }

    /// Returns `true` if `other` lies within the edges of `self`.
    #[inline]
    #[must_use]
    pub fn contains(self, other: Self) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// Returns `true` if the rectangles share at least one pixel.
    #[inline]
    #[must_use]
    pub fn intersects(self, other: Self) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && other.x < self.right()
            && self.x < other.right()
            && other.y < self.bottom()
            && self.y < other.bottom()
    }

    /// Removes `other` from `self`, keeping a single rectangle.
    ///
    /// The result only shrinks when `other` spans the full height of `self`
    /// (cutting the left or right side) or its full width (cutting the top or
    /// bottom). Any other overlap leaves `self` unchanged, so the result is
    /// always a superset of the exact difference.
    #[must_use]
    pub fn subtract(self, other: Self) -> Self {
        if !self.intersects(other) {
            return self;
        }
        if other.contains(self) {
            return Self::ZERO;
        }

        let mut left = self.x;
        let mut top = self.y;
        let mut right = self.right();
        let mut bottom = self.bottom();

        if other.y <= self.y && other.bottom() >= self.bottom() {
            if other.x <= self.x {
                left = other.right();
            } else if other.right() >= self.right() {
                right = other.x;
            }
        } else if other.x <= self.x && other.right() >= self.right() {
            if other.y <= self.y {
                top = other.bottom();
            } else if other.bottom() >= self.bottom() {
                bottom = other.y;
            }
        }
        Self::from_edges(left, top, right, bottom)
    }

    /// Moves each edge inward by the given amount.
    ///
    /// Negative amounts move the edge outward. Extents are clamped at zero.
    #[must_use]
    pub fn inset(self, left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self::new(
            self.x.saturating_add(left),
            self.y.saturating_add(top),
            self.width.saturating_sub(left).saturating_sub(right),
            self.height.saturating_sub(top).saturating_sub(bottom),
        )
    }

    /// Moves each edge outward by the given amount.
    #[must_use]
    pub fn outset(self, left: i32, top: i32, right: i32, bottom: i32) -> Self {
        self.inset(
            left.saturating_neg(),
            top.saturating_neg(),
            right.saturating_neg(),
            bottom.saturating_neg(),
        )
    }

    /// Translates the rectangle.
    #[inline]
    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
            width: self.width,
            height: self.height,
        }
    }

    /// Converts to a float rectangle.
    #[inline]
    #[must_use]
    pub fn to_kurbo(self) -> Rect {
        Rect::new(
            f64::from(self.x),
            f64::from(self.y),
            f64::from(self.right()),
            f64::from(self.bottom()),
        )
    }

    /// Smallest pixel rectangle covering `rect`.
    ///
    /// Non-finite or inverted input yields [`ZERO`](Self::ZERO).
    #[must_use]
    pub fn from_enclosing(rect: Rect) -> Self {
        if !rect.is_finite() || rect.x1 <= rect.x0 || rect.y1 <= rect.y0 {
            return Self::ZERO;
        }
        Self::from_float_edges(
            rect.x0.floor(),
            rect.y0.floor(),
            rect.x1.ceil(),
            rect.y1.ceil(),
        )
    }

    /// Largest pixel rectangle inside `rect`.
    ///
    /// Non-finite, inverted, or sub-pixel input yields [`ZERO`](Self::ZERO).
    #[must_use]
    pub fn from_enclosed(rect: Rect) -> Self {
        if !rect.is_finite() || rect.x1 <= rect.x0 || rect.y1 <= rect.y0 {
            return Self::ZERO;
        }
        let left = rect.x0.ceil();
        let top = rect.y0.ceil();
        let right = rect.x1.floor();
        let bottom = rect.y1.floor();
        if right <= left || bottom <= top {
            return Self::ZERO;
        }
        Self::from_float_edges(left, top, right, bottom)
    }

    #[expect(
        clippy::cast_possible_truncation,
        reason = "edges are already integral; out-of-range values saturate"
    )]
    fn from_float_edges(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self::from_edges(left as i32, top as i32, right as i32, bottom as i32)
    }
}
