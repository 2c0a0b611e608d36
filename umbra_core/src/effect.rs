// Copyright 2026 the Umbra Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compositing effects: blend modes and filter chains.
//!
//! The occlusion engine only needs to know two things about a filter chain:
//! whether it can change alpha (so content under it is no longer guaranteed
//! opaque) and whether it samples pixels from a neighbourhood (so occlusion
//! next to it has to be eroded). Everything else about the filters is for
//! the rasterizer.

use alloc::vec::Vec;
#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;

/// Blend mode used to composite a layer or surface onto its target.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BlendMode {
    /// Standard source-over alpha compositing.
    #[default]
    SourceOver,
    /// Multiply blend.
    Multiply,
    /// Screen blend.
    Screen,
    /// Overlay blend.
    Overlay,
    /// Darken blend.
    Darken,
    /// Lighten blend.
    Lighten,
    /// Color-dodge blend.
    ColorDodge,
    /// Color-burn blend.
    ColorBurn,
    /// Hard-light blend.
    HardLight,
    /// Soft-light blend.
    SoftLight,
    /// Difference blend.
    Difference,
    /// Exclusion blend.
    Exclusion,
    /// Hue blend.
    Hue,
    /// Saturation blend.
    Saturation,
    /// Color blend.
    Color,
    /// Luminosity blend.
    Luminosity,
}

impl BlendMode {
    /// Returns `true` for anything other than source-over.
    #[inline]
    #[must_use]
    pub fn is_blended(self) -> bool {
        self != Self::SourceOver
    }
}

/// A single filter operation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FilterOperation {
    /// Grayscale conversion by `amount`.
    Grayscale(f32),
    /// Sepia tone by `amount`.
    Sepia(f32),
    /// Saturation scale.
    Saturate(f32),
    /// Hue rotation in degrees.
    HueRotate(f32),
    /// Color inversion by `amount`.
    Invert(f32),
    /// Brightness scale.
    Brightness(f32),
    /// Contrast scale.
    Contrast(f32),
    /// Alpha multiplier.
    Opacity(f32),
    /// Gaussian blur with the given standard deviation in pixels.
    Blur(f32),
    /// Drop shadow offset by `(dx, dy)` with the given blur deviation.
    DropShadow {
        /// Horizontal shadow offset.
        dx: i32,
        /// Vertical shadow offset.
        dy: i32,
        /// Blur standard deviation.
        std_deviation: f32,
    },
    /// A 4×5 row-major color matrix (RGBA rows, last column is the offset).
    ColorMatrix([f32; 20]),
    /// Magnifier lens with the given inset.
    Zoom {
        /// Zoom factor.
        amount: f32,
        /// Lens border inset in pixels.
        inset: i32,
    },
    /// An externally defined image filter.
    ///
    /// Reference filters are opaque to the compositor, so they are treated as
    /// both moving pixels and affecting opacity.
    Reference,
    /// Binary alpha threshold.
    AlphaThreshold,
}

impl FilterOperation {
    /// Returns `true` if the output at a pixel can depend on input pixels
    /// elsewhere.
    #[must_use]
    pub fn moves_pixels(&self) -> bool {
        matches!(
            self,
            Self::Blur(_) | Self::DropShadow { .. } | Self::Zoom { .. } | Self::Reference
        )
    }

    /// Returns `true` if the filter can make opaque input non-opaque.
    #[must_use]
    pub fn affects_opacity(&self) -> bool {
        match self {
            Self::Opacity(amount) => *amount != 1.0,
            Self::Blur(_)
            | Self::DropShadow { .. }
            | Self::Zoom { .. }
            | Self::Reference
            | Self::AlphaThreshold => true,
            Self::ColorMatrix(m) => {
                m[15] != 0.0 || m[16] != 0.0 || m[17] != 0.0 || m[18] != 1.0 || m[19] != 0.0
            }
            Self::Grayscale(_)
            | Self::Sepia(_)
            | Self::Saturate(_)
            | Self::HueRotate(_)
            | Self::Invert(_)
            | Self::Brightness(_)
            | Self::Contrast(_) => false,
        }
    }

    /// Outsets this single operation reaches beyond the filtered bounds.
    #[must_use]
    pub fn outsets(&self) -> FilterOutsets {
        match *self {
            Self::Blur(sd) => FilterOutsets::uniform(blur_spread(sd)),
            Self::DropShadow {
                dx,
                dy,
                std_deviation,
            } => {
                let spread = blur_spread(std_deviation);
                FilterOutsets {
                    top: spread.saturating_sub(dy).max(0),
                    right: spread.saturating_add(dx).max(0),
                    bottom: spread.saturating_add(dy).max(0),
                    left: spread.saturating_sub(dx).max(0),
                }
            }
            _ => FilterOutsets::ZERO,
        }
    }
}

/// Distance a blur with standard deviation `sd` samples beyond a pixel.
///
/// Three box-blur passes of width `d` approximate the gaussian; their
/// combined reach is `ceil(3d / 2)`.
#[expect(
    clippy::cast_possible_truncation,
    reason = "blur radii are far below i32::MAX"
)]
fn blur_spread(sd: f32) -> i32 {
    let sd = f64::from(sd.max(0.0));
    let d = (sd * 3.0 * (2.0 * core::f64::consts::PI).sqrt() / 4.0 + 0.5).floor();
    (d * 3.0 / 2.0).ceil() as i32
}

/// Pixel distances a filter reaches outside each side of its input.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct FilterOutsets {
    /// Reach above the top edge.
    pub top: i32,
    /// Reach past the right edge.
    pub right: i32,
    /// Reach below the bottom edge.
    pub bottom: i32,
    /// Reach past the left edge.
    pub left: i32,
}

impl FilterOutsets {
    /// No reach.
    pub const ZERO: Self = Self {
        top: 0,
        right: 0,
        bottom: 0,
        left: 0,
    };

    /// The same reach on all four sides.
    #[must_use]
    pub const fn uniform(v: i32) -> Self {
        Self {
            top: v,
            right: v,
            bottom: v,
            left: v,
        }
    }

    /// Returns `true` if every side is zero.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.top == 0 && self.right == 0 && self.bottom == 0 && self.left == 0
    }

    fn accumulate(self, other: Self) -> Self {
        Self {
            top: self.top.saturating_add(other.top),
            right: self.right.saturating_add(other.right),
            bottom: self.bottom.saturating_add(other.bottom),
            left: self.left.saturating_add(other.left),
        }
    }
}

/// An ordered list of filter operations.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FilterChain {
    ops: Vec<FilterOperation>,
}

impl FilterChain {
    /// Creates an empty chain.
    #[must_use]
    pub const fn new() -> Self {
        Self { ops: Vec::new() }
    }

    /// Appends an operation.
    pub fn push(&mut self, op: FilterOperation) {
        self.ops.push(op);
    }

    /// Builder-style [`push`](Self::push).
    #[must_use]
    pub fn with(mut self, op: FilterOperation) -> Self {
        self.push(op);
        self
    }

    /// The operations in application order.
    #[must_use]
    pub fn operations(&self) -> &[FilterOperation] {
        &self.ops
    }

    /// Returns `true` if the chain has no operations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Returns `true` if any operation samples neighbouring pixels.
    #[must_use]
    pub fn moves_pixels(&self) -> bool {
        self.ops.iter().any(FilterOperation::moves_pixels)
    }

    /// Returns `true` if any operation can reduce alpha.
    #[must_use]
    pub fn affects_opacity(&self) -> bool {
        self.ops.iter().any(FilterOperation::affects_opacity)
    }

    /// Accumulated reach of the whole chain.
    #[must_use]
    pub fn outsets(&self) -> FilterOutsets {
        self.ops
            .iter()
            .fold(FilterOutsets::ZERO, |acc, op| acc.accumulate(op.outsets()))
    }
}

impl FromIterator<FilterOperation> for FilterChain {
    fn from_iter<I: IntoIterator<Item = FilterOperation>>(iter: I) -> Self {
        Self {
            ops: iter.into_iter().collect(),
        }
    }
}
