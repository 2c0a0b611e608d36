// Copyright 2026 the Umbra Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Opaque-coverage regions.
//!
//! A [`Region`] is a set of pairwise non-overlapping [`PixelRect`]s. Set
//! operations (`union_rect`, `subtract_rect`, `intersect_rect`) are exact below
//! the rectangle cap, so coverage never depends on the order rectangles were
//! added in. The one
//! deliberately lossy operation is [`Region::subtract_from`], which answers
//! "what is left of this candidate" with a single rectangle that may be
//! larger than the true remainder but never smaller.
//!
//! Rectangles produced by a mutation are coalesced with the neighbours they
//! share a full edge with, then inserted in `(y, x)` order, which keeps the
//! common cases of one or two rectangles small. A region never holds more
//! than [`Region::MAX_RECTS`] rectangles: past that, the smallest ones are
//! dropped, so a region may under-report coverage but never over-report it.

use alloc::vec::Vec;

use crate::geometry::PixelRect;

/// A set of disjoint pixel rectangles.
///
/// Equality compares covered pixels, not the particular decomposition into
/// rectangles.
#[derive(Clone, Debug, Default)]
pub struct Region {
    rects: Vec<PixelRect>,
}

impl Region {
    /// Most rectangles a region keeps before dropping the smallest.
    pub const MAX_RECTS: usize = 256;

    /// Creates an empty region.
    #[must_use]
    pub const fn new() -> Self {
        Self { rects: Vec::new() }
    }

    /// Creates a region covering `rect`.
    #[must_use]
    pub fn from_rect(rect: PixelRect) -> Self {
        let mut region = Self::new();
        region.union_rect(rect);
        region
    }

    /// Returns `true` if the region covers no pixels.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    /// The disjoint rectangles making up the region, sorted by `(y, x)`.
    #[inline]
    #[must_use]
    pub fn rects(&self) -> &[PixelRect] {
        &self.rects
    }

    /// Removes all coverage.
    pub fn clear(&mut self) {
        self.rects.clear();
    }

    /// Total number of covered pixels.
    #[must_use]
    pub fn area(&self) -> i64 {
        self.rects.iter().map(|r| r.area()).sum()
    }

    /// Smallest rectangle enclosing the whole region.
    #[must_use]
    pub fn bounds(&self) -> PixelRect {
        self.rects
            .iter()
            .fold(PixelRect::ZERO, |acc, r| acc.union(*r))
    }

    /// Adds `rect` to the covered set.
    pub fn union_rect(&mut self, rect: PixelRect) {
        if rect.is_empty() || self.contains(rect) {
            return;
        }
        let mut pieces = Vec::from([rect]);
        for existing in &self.rects {
            if !pieces.iter().any(|p| p.intersects(*existing)) {
                continue;
            }
            let mut next = Vec::with_capacity(pieces.len() + 3);
            for piece in pieces {
                push_difference(piece, *existing, &mut next);
            }
            pieces = next;
        }
        for piece in pieces {
            self.insert(piece);
        }
        self.enforce_limit();
    }

    /// Adds every rectangle of `other`.
    pub fn union(&mut self, other: &Self) {
        for rect in &other.rects {
            self.union_rect(*rect);
        }
    }

    /// Removes `rect` from the covered set exactly.
    pub fn subtract_rect(&mut self, rect: PixelRect) {
        if rect.is_empty() || !self.intersects(rect) {
            return;
        }
        let mut fragments = Vec::new();
        self.rects.retain(|existing| {
            if !existing.intersects(rect) {
                return true;
            }
            push_difference(*existing, rect, &mut fragments);
            false
        });
        for fragment in fragments {
            self.insert(fragment);
        }
        self.enforce_limit();
    }

    /// Removes every rectangle of `other` exactly.
    pub fn subtract(&mut self, other: &Self) {
        for rect in &other.rects {
            self.subtract_rect(*rect);
        }
    }

    /// Restricts the covered set to `rect`.
    pub fn intersect_rect(&mut self, rect: PixelRect) {
        let mut clipped = Vec::new();
        self.rects.retain(|r| {
            if rect.contains(*r) {
                return true;
            }
            let part = r.intersect(rect);
            if !part.is_empty() {
                clipped.push(part);
            }
            false
        });
        for part in clipped {
            self.insert(part);
        }
    }

    /// Returns `true` if any covered pixel lies in `rect`.
    #[must_use]
    pub fn intersects(&self, rect: PixelRect) -> bool {
        self.rects.iter().any(|r| r.intersects(rect))
    }

    /// Returns `true` if every pixel of `rect` is covered.
    ///
    /// Empty rectangles are never contained.
    #[must_use]
    pub fn contains(&self, rect: PixelRect) -> bool {
        if rect.is_empty() {
            return false;
        }
        // Stored rects are disjoint, so overlap areas add up exactly.
        let covered: i64 = self.rects.iter().map(|r| r.intersect(rect).area()).sum();
        covered == rect.area()
    }

    /// Returns `true` if every pixel of `rect` is covered by `self` or
    /// `other`, without building their union.
    ///
    /// Empty rectangles are never contained.
    #[must_use]
    pub fn contains_with(&self, other: &Self, rect: PixelRect) -> bool {
        if rect.is_empty() {
            return false;
        }
        let mut rest = Vec::from([rect]);
        for covered in &self.rects {
            if !rest.iter().any(|r| r.intersects(*covered)) {
                continue;
            }
            let mut next = Vec::with_capacity(rest.len() + 3);
            for piece in rest {
                push_difference(piece, *covered, &mut next);
            }
            rest = next;
            if rest.is_empty() {
                return true;
            }
        }
        rest.into_iter().all(|r| other.contains(r))
    }

    /// Shrinks `candidate` by each rectangle of the region in turn, keeping a
    /// single rectangle.
    ///
    /// This inherits the lossiness of [`PixelRect::subtract`]: a stored
    /// rectangle only removes area when it spans a full side of the remaining
    /// candidate. The result contains every uncovered pixel of `candidate`.
    #[must_use]
    pub fn subtract_from(&self, candidate: PixelRect) -> PixelRect {
        self.rects
            .iter()
            .fold(candidate, |acc, r| acc.subtract(*r))
    }

    /// Inserts `rect`, disjoint from every stored rectangle, merging it
    /// with neighbours that share a full edge.
    ///
    /// Stored rectangles never share a full edge with each other, so only
    /// the incoming one needs checking.
    fn insert(&mut self, mut rect: PixelRect) {
        while let Some((i, joined)) = self
            .rects
            .iter()
            .enumerate()
            .find_map(|(i, r)| join(*r, rect).map(|joined| (i, joined)))
        {
            self.rects.remove(i);
            rect = joined;
        }
        let at = self.rects.partition_point(|r| (r.y, r.x) < (rect.y, rect.x));
        self.rects.insert(at, rect);
    }

    /// Drops the smallest rectangles until at most [`Self::MAX_RECTS`] remain.
    fn enforce_limit(&mut self) {
        while self.rects.len() > Self::MAX_RECTS {
            let Some((smallest, _)) = self
                .rects
                .iter()
                .enumerate()
                .min_by_key(|(_, r)| r.area())
            else {
                break;
            };
            self.rects.remove(smallest);
        }
    }
}

impl PartialEq for Region {
    fn eq(&self, other: &Self) -> bool {
        self.area() == other.area() && self.rects.iter().all(|r| other.contains(*r))
    }
}

impl Eq for Region {}

impl From<PixelRect> for Region {
    fn from(rect: PixelRect) -> Self {
        Self::from_rect(rect)
    }
}

/// Pushes the exact difference `a - b` as up to four disjoint bands.
fn push_difference(a: PixelRect, b: PixelRect, out: &mut Vec<PixelRect>) {
    if !a.intersects(b) {
        out.push(a);
        return;
    }
    if b.y > a.y {
        out.push(PixelRect::from_edges(a.x, a.y, a.right(), b.y));
    }
    if b.bottom() < a.bottom() {
        out.push(PixelRect::from_edges(a.x, b.bottom(), a.right(), a.bottom()));
    }
    let top = a.y.max(b.y);
    let bottom = a.bottom().min(b.bottom());
    if b.x > a.x {
        out.push(PixelRect::from_edges(a.x, top, b.x, bottom));
    }
    if b.right() < a.right() {
        out.push(PixelRect::from_edges(b.right(), top, a.right(), bottom));
    }
}

/// Joins two rectangles if their union is exactly a rectangle sharing an edge.
fn join(a: PixelRect, b: PixelRect) -> Option<PixelRect> {
    let same_rows = a.y == b.y && a.height == b.height;
    let same_cols = a.x == b.x && a.width == b.width;
    if same_rows && (a.right() == b.x || b.right() == a.x) {
        return Some(a.union(b));
    }
    if same_cols && (a.bottom() == b.y || b.bottom() == a.y) {
        return Some(a.union(b));
    }
    None
}
