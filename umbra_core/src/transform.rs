// Copyright 2026 the Umbra Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Minimal column-major 4×4 transform.
//!
//! This type covers the subset of 3-D transforms the occlusion engine needs:
//! composition, inversion, classification (axis alignment, perspective), and
//! mapping 2-D rectangles through the matrix with clipping against the
//! `w = 0` plane. Points are treated as `(x, y, 0, 1)`; the resulting `z` is
//! dropped.

use core::ops::Mul;
#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;
use kurbo::{Point, Rect};

use crate::geometry::PixelRect;

/// Points closer to the camera plane than this are clipped.
const CLIP_W: f64 = 1e-5;

/// Tolerance used when classifying the 2×2 linear part.
const AXIS_EPSILON: f64 = f32::EPSILON as f64;

/// A column-major 4×4 transform stored as `[[f64; 4]; 4]`.
///
/// Each inner array is one *column* of the matrix, so the element at row `r`
/// and column `c` is `cols[c][r]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform3d {
    /// Four columns, each a 4-element array `[x, y, z, w]`.
    pub cols: [[f64; 4]; 4],
}

impl Transform3d {
    /// The 4×4 identity matrix.
    pub const IDENTITY: Self = Self {
        cols: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    /// Creates a transform from four column arrays.
    #[inline]
    #[must_use]
    pub const fn from_cols(col0: [f64; 4], col1: [f64; 4], col2: [f64; 4], col3: [f64; 4]) -> Self {
        Self {
            cols: [col0, col1, col2, col3],
        }
    }

    /// Returns column `i` (0-based).
    ///
    /// # Panics
    ///
    /// Panics if `i >= 4`.
    #[inline]
    #[must_use]
    pub const fn col(self, i: usize) -> [f64; 4] {
        self.cols[i]
    }

    /// Creates a pure translation transform.
    #[inline]
    #[must_use]
    pub const fn from_translation(x: f64, y: f64, z: f64) -> Self {
        Self {
            cols: [
                [1.0, 0.0, 0.0, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [x, y, z, 1.0],
            ],
        }
    }

    /// Creates a non-uniform scale transform.
    #[inline]
    #[must_use]
    pub const fn from_scale(sx: f64, sy: f64, sz: f64) -> Self {
        Self {
            cols: [
                [sx, 0.0, 0.0, 0.0],
                [0.0, sy, 0.0, 0.0],
                [0.0, 0.0, sz, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    /// Creates a rotation around the Z axis (radians).
    #[inline]
    #[must_use]
    pub fn from_rotation_z(radians: f64) -> Self {
        #[cfg(feature = "std")]
        let (s, c) = radians.sin_cos();
        #[cfg(not(feature = "std"))]
        let (s, c) = (radians.sin(), radians.cos());
        Self::rotation_from_sin_cos(s, c)
    }

    /// Creates a rotation around the Z axis (degrees).
    ///
    /// Multiples of 90° produce exact zeros and ones so that quarter turns
    /// keep rectangles pixel-aligned.
    #[must_use]
    pub fn from_rotation_z_degrees(degrees: f64) -> Self {
        let quarter = degrees / 90.0;
        if quarter == quarter.floor() {
            let turn = quarter.rem_euclid(4.0);
            let (s, c) = if turn < 0.5 {
                (0.0, 1.0)
            } else if turn < 1.5 {
                (1.0, 0.0)
            } else if turn < 2.5 {
                (0.0, -1.0)
            } else {
                (-1.0, 0.0)
            };
            return Self::rotation_from_sin_cos(s, c);
        }
        Self::from_rotation_z(degrees.to_radians())
    }

    /// Creates a perspective projection with the eye `depth` units in front
    /// of the `z = 0` plane.
    #[must_use]
    pub fn from_perspective(depth: f64) -> Self {
        let mut t = Self::IDENTITY;
        if depth != 0.0 {
            t.cols[2][3] = -1.0 / depth;
        }
        t
    }

    const fn rotation_from_sin_cos(s: f64, c: f64) -> Self {
        Self {
            cols: [
                [c, s, 0.0, 0.0],
                [-s, c, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    /// Is this transform [finite]?
    ///
    /// [finite]: f64::is_finite
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.cols.iter().flatten().all(|v| v.is_finite())
    }

    /// Returns `true` if the transform only translates.
    #[must_use]
    pub fn is_identity_or_translation(&self) -> bool {
        let c = &self.cols;
        c[0] == [1.0, 0.0, 0.0, 0.0]
            && c[1] == [0.0, 1.0, 0.0, 0.0]
            && c[2] == [0.0, 0.0, 1.0, 0.0]
            && c[3][3] == 1.0
    }

    /// Returns the translation if the transform only translates by whole
    /// pixels in x and y.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "only integral values within i32 range are converted"
    )]
    fn integer_translation(&self) -> Option<(i32, i32)> {
        if !self.is_identity_or_translation() {
            return None;
        }
        let (tx, ty) = (self.cols[3][0], self.cols[3][1]);
        let range = f64::from(i32::MIN)..=f64::from(i32::MAX);
        if tx == tx.floor() && ty == ty.floor() && range.contains(&tx) && range.contains(&ty) {
            Some((tx as i32, ty as i32))
        } else {
            None
        }
    }

    /// Returns `true` if the bottom row is not `[0, 0, 0, 1]`.
    #[must_use]
    pub fn has_perspective(&self) -> bool {
        let c = &self.cols;
        c[0][3] != 0.0 || c[1][3] != 0.0 || c[2][3] != 0.0 || c[3][3] != 1.0
    }

    /// Returns `true` if axis-aligned rectangles stay axis-aligned.
    ///
    /// Only scales and axis swaps in the 2×2 linear part qualify, and the
    /// perspective terms must not depend on x or y. Collapsing an axis to zero
    /// still counts as aligned.
    #[must_use]
    pub fn preserves_2d_axis_alignment(&self) -> bool {
        let c = &self.cols;
        let nz = |v: f64| v.abs() > AXIS_EPSILON;
        let (m00, m01, m10, m11) = (nz(c[0][0]), nz(c[1][0]), nz(c[0][1]), nz(c[1][1]));

        let row0 = usize::from(m00) + usize::from(m01);
        let row1 = usize::from(m10) + usize::from(m11);
        let col0 = usize::from(m00) + usize::from(m10);
        let col1 = usize::from(m01) + usize::from(m11);
        if row0 > 1 || row1 > 1 || col0 > 1 || col1 > 1 {
            return false;
        }
        !(nz(c[0][3]) || nz(c[1][3]))
    }

    /// Scale factors along the x and y axes, or `(1, 1)` under perspective.
    #[must_use]
    pub fn scale_components(&self) -> (f64, f64) {
        if self.has_perspective() {
            return (1.0, 1.0);
        }
        let c = &self.cols;
        let len = |v: [f64; 4]| (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
        (len(c[0]), len(c[1]))
    }

    /// Returns the inverse, or `None` if the matrix is singular.
    #[must_use]
    pub fn inverse(&self) -> Option<Self> {
        let m: [f64; 16] = [
            self.cols[0][0],
            self.cols[0][1],
            self.cols[0][2],
            self.cols[0][3],
            self.cols[1][0],
            self.cols[1][1],
            self.cols[1][2],
            self.cols[1][3],
            self.cols[2][0],
            self.cols[2][1],
            self.cols[2][2],
            self.cols[2][3],
            self.cols[3][0],
            self.cols[3][1],
            self.cols[3][2],
            self.cols[3][3],
        ];
        let mut inv = [0.0_f64; 16];

        inv[0] = m[5] * m[10] * m[15] - m[5] * m[11] * m[14] - m[9] * m[6] * m[15]
            + m[9] * m[7] * m[14]
            + m[13] * m[6] * m[11]
            - m[13] * m[7] * m[10];
        inv[4] = -m[4] * m[10] * m[15] + m[4] * m[11] * m[14] + m[8] * m[6] * m[15]
            - m[8] * m[7] * m[14]
            - m[12] * m[6] * m[11]
            + m[12] * m[7] * m[10];
        inv[8] = m[4] * m[9] * m[15] - m[4] * m[11] * m[13] - m[8] * m[5] * m[15]
            + m[8] * m[7] * m[13]
            + m[12] * m[5] * m[11]
            - m[12] * m[7] * m[9];
        inv[12] = -m[4] * m[9] * m[14] + m[4] * m[10] * m[13] + m[8] * m[5] * m[14]
            - m[8] * m[6] * m[13]
            - m[12] * m[5] * m[10]
            + m[12] * m[6] * m[9];
        inv[1] = -m[1] * m[10] * m[15] + m[1] * m[11] * m[14] + m[9] * m[2] * m[15]
            - m[9] * m[3] * m[14]
            - m[13] * m[2] * m[11]
            + m[13] * m[3] * m[10];
        inv[5] = m[0] * m[10] * m[15] - m[0] * m[11] * m[14] - m[8] * m[2] * m[15]
            + m[8] * m[3] * m[14]
            + m[12] * m[2] * m[11]
            - m[12] * m[3] * m[10];
        inv[9] = -m[0] * m[9] * m[15] + m[0] * m[11] * m[13] + m[8] * m[1] * m[15]
            - m[8] * m[3] * m[13]
            - m[12] * m[1] * m[11]
            + m[12] * m[3] * m[9];
        inv[13] = m[0] * m[9] * m[14] - m[0] * m[10] * m[13] - m[8] * m[1] * m[14]
            + m[8] * m[2] * m[13]
            + m[12] * m[1] * m[10]
            - m[12] * m[2] * m[9];
        inv[2] = m[1] * m[6] * m[15] - m[1] * m[7] * m[14] - m[5] * m[2] * m[15]
            + m[5] * m[3] * m[14]
            + m[13] * m[2] * m[7]
            - m[13] * m[3] * m[6];
        inv[6] = -m[0] * m[6] * m[15] + m[0] * m[7] * m[14] + m[4] * m[2] * m[15]
            - m[4] * m[3] * m[14]
            - m[12] * m[2] * m[7]
            + m[12] * m[3] * m[6];
        inv[10] = m[0] * m[5] * m[15] - m[0] * m[7] * m[13] - m[4] * m[1] * m[15]
            + m[4] * m[3] * m[13]
            + m[12] * m[1] * m[7]
            - m[12] * m[3] * m[5];
        inv[14] = -m[0] * m[5] * m[14] + m[0] * m[6] * m[13] + m[4] * m[1] * m[14]
            - m[4] * m[2] * m[13]
            - m[12] * m[1] * m[6]
            + m[12] * m[2] * m[5];
        inv[3] = -m[1] * m[6] * m[11] + m[1] * m[7] * m[10] + m[5] * m[2] * m[11]
            - m[5] * m[3] * m[10]
            - m[9] * m[2] * m[7]
            + m[9] * m[3] * m[6];
        inv[7] = m[0] * m[6] * m[11] - m[0] * m[7] * m[10] - m[4] * m[2] * m[11]
            + m[4] * m[3] * m[10]
            + m[8] * m[2] * m[7]
            - m[8] * m[3] * m[6];
        inv[11] = -m[0] * m[5] * m[11] + m[0] * m[7] * m[9] + m[4] * m[1] * m[11]
            - m[4] * m[3] * m[9]
            - m[8] * m[1] * m[7]
            + m[8] * m[3] * m[5];
        inv[15] = m[0] * m[5] * m[10] - m[0] * m[6] * m[9] - m[4] * m[1] * m[10]
            + m[4] * m[2] * m[9]
            + m[8] * m[1] * m[6]
            - m[8] * m[2] * m[5];

        let det = m[0] * inv[0] + m[1] * inv[4] + m[2] * inv[8] + m[3] * inv[12];
        if !det.is_finite() || det.abs() <= f64::MIN_POSITIVE {
            return None;
        }
        let inv_det = 1.0 / det;
        let mut cols = [[0.0_f64; 4]; 4];
        for (i, v) in inv.iter().enumerate() {
            cols[i / 4][i % 4] = v * inv_det;
        }
        Some(Self { cols })
    }

    /// Returns `true` if [`inverse`](Self::inverse) would succeed.
    #[must_use]
    pub fn is_invertible(&self) -> bool {
        self.inverse().is_some()
    }

    /// Maps `(x, y, 0, 1)` to homogeneous `[x, y, z, w]`.
    #[must_use]
    pub fn map_homogeneous(&self, x: f64, y: f64) -> [f64; 4] {
        self.map_homogeneous_3d(x, y, 0.0)
    }

    fn map_homogeneous_3d(&self, x: f64, y: f64, z: f64) -> [f64; 4] {
        let c = &self.cols;
        let mut out = [0.0_f64; 4];
        for (r, o) in out.iter_mut().enumerate() {
            *o = c[0][r] * x + c[1][r] * y + c[2][r] * z + c[3][r];
        }
        out
    }

    /// Maps `(x, y, 0, 1)` onto the plane `z = 0` of this transform's output
    /// by casting a ray along the z axis.
    ///
    /// This is the mapping needed to go *back* through an inverse transform:
    /// the input point sits in the flat output space, and the matching point
    /// on the source plane is found first. When the source plane is edge-on,
    /// the origin is returned.
    fn project_homogeneous(&self, x: f64, y: f64) -> [f64; 4] {
        let c = &self.cols;
        if c[2][2] == 0.0 {
            return [0.0, 0.0, 0.0, 1.0];
        }
        let z = -(c[0][2] * x + c[1][2] * y + c[3][2]) / c[2][2];
        self.map_homogeneous_3d(x, y, z)
    }

    /// Maps `rect` and returns the bounding box of the visible part of the
    /// resulting quad, clipped to `w > 0`.
    ///
    /// Returns an empty rectangle when the whole quad is behind the camera.
    #[must_use]
    pub fn map_clipped_rect(&self, rect: Rect) -> Rect {
        let corners = rect_corners(rect).map(|p| self.map_homogeneous(p.x, p.y));
        clipped_bounds(&corners)
    }

    /// Like [`map_clipped_rect`](Self::map_clipped_rect), but projects each
    /// corner onto this transform's source plane first.
    #[must_use]
    pub fn project_clipped_rect(&self, rect: Rect) -> Rect {
        let corners = rect_corners(rect).map(|p| self.project_homogeneous(p.x, p.y));
        clipped_bounds(&corners)
    }

    /// Maps a pixel rect and returns the smallest pixel rect covering the
    /// visible result.
    #[must_use]
    pub fn map_enclosing_clipped_rect(&self, rect: PixelRect) -> PixelRect {
        if let Some((dx, dy)) = self.integer_translation() {
            return rect.offset(dx, dy);
        }
        PixelRect::from_enclosing(self.map_clipped_rect(rect.to_kurbo()))
    }

    /// Projects a pixel rect through this transform (typically an inverse)
    /// and returns the smallest pixel rect covering the result.
    #[must_use]
    pub fn project_enclosing_clipped_rect(&self, rect: PixelRect) -> PixelRect {
        if let Some((dx, dy)) = self.integer_translation() {
            return rect.offset(dx, dy);
        }
        PixelRect::from_enclosing(self.project_clipped_rect(rect.to_kurbo()))
    }

    /// Maps a pixel rect through an axis-aligned transform and returns the
    /// largest pixel rect inside the result.
    ///
    /// Returns `None` if any corner lands behind the camera (`w <= 0`).
    #[must_use]
    pub fn map_enclosed_rect(&self, rect: PixelRect) -> Option<PixelRect> {
        debug_assert!(
            self.preserves_2d_axis_alignment(),
            "enclosed mapping requires an axis-aligned transform"
        );
        if let Some((dx, dy)) = self.integer_translation() {
            return Some(rect.offset(dx, dy));
        }
        let mut bounds: Option<Rect> = None;
        for p in rect_corners(rect.to_kurbo()) {
            let [x, y, _, w] = self.map_homogeneous(p.x, p.y);
            if w <= 0.0 {
                return None;
            }
            let q = Point::new(x / w, y / w);
            bounds = Some(match bounds {
                Some(b) => b.union_pt(q),
                None => Rect::from_points(q, q),
            });
        }
        Some(bounds.map_or(PixelRect::ZERO, PixelRect::from_enclosed))
    }

    /// Returns `true` if any corner of `rect` maps behind the camera.
    #[must_use]
    pub fn clips_rect(&self, rect: PixelRect) -> bool {
        rect_corners(rect.to_kurbo())
            .iter()
            .any(|p| self.map_homogeneous(p.x, p.y)[3] <= 0.0)
    }
}

impl Default for Transform3d {
    #[inline]
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul for Transform3d {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: Self) -> Self {
        let a = &self.cols;
        let b = &rhs.cols;
        let mut out = [[0.0_f64; 4]; 4];
        let mut j = 0;
        while j < 4 {
            let mut i = 0;
            while i < 4 {
                out[j][i] =
                    a[0][i] * b[j][0] + a[1][i] * b[j][1] + a[2][i] * b[j][2] + a[3][i] * b[j][3];
                i += 1;
            }
            j += 1;
        }
        Self { cols: out }
    }
}

/// Corners in quad order (top-left, top-right, bottom-right, bottom-left).
fn rect_corners(rect: Rect) -> [Point; 4] {
    [
        Point::new(rect.x0, rect.y0),
        Point::new(rect.x1, rect.y0),
        Point::new(rect.x1, rect.y1),
        Point::new(rect.x0, rect.y1),
    ]
}

/// Bounding box of a homogeneous quad after clipping each edge to `w > 0`.
fn clipped_bounds(quad: &[[f64; 4]; 4]) -> Rect {
    let mut bounds: Option<Rect> = None;
    let mut add = |h: [f64; 4]| {
        let p = Point::new(h[0] / h[3], h[1] / h[3]);
        bounds = Some(match bounds {
            Some(b) => b.union_pt(p),
            None => Rect::from_points(p, p),
        });
    };
    for (i, &h1) in quad.iter().enumerate() {
        let h2 = quad[(i + 1) % 4];
        let visible1 = h1[3] > 0.0;
        let visible2 = h2[3] > 0.0;
        if visible1 {
            add(h1);
        }
        if visible1 != visible2 {
            // Interpolate to the point on the edge where w == CLIP_W.
            let t = (CLIP_W - h1[3]) / (h2[3] - h1[3]);
            let mut p = [0.0_f64; 4];
            for (k, v) in p.iter_mut().enumerate() {
                *v = h1[k] + t * (h2[k] - h1[k]);
            }
            add(p);
        }
    }
    bounds.unwrap_or(Rect::ZERO)
}
