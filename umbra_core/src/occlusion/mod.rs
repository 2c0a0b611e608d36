// Copyright 2026 the Umbra Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Front-to-back occlusion tracking.
//!
//! The scene is walked front to back: top-most content first. Each opaque
//! layer adds its footprint to the occlusion of the render target it draws
//! into, and everything visited later can ask how much of itself is already
//! covered.
//!
//! ```text
//!   TraversalEvent stream
//!       │
//!       ▼
//!   enter_layer ──► query (occluded_layer / unoccluded_*_content_rect)
//!       │
//!       ▼
//!   leave_layer ──► occlusion grows, or a surface folds into its target
//! ```
//!
//! Render surfaces nest, so the tracker keeps a stack with one entry per
//! target currently being filled. Occlusion from enclosing targets is
//! projected into a nested target's space when it is entered, and the nested
//! target's own occlusion is projected back out when it is left (unless the
//! surface is composited in a way that makes it non-opaque).
//!
//! The tracker is conservative: it may under-report occlusion, never
//! over-report it.

mod element;
mod tracker;

#[cfg(test)]
mod scenarios;

pub use element::{ElementKind, OcclusionElement, RenderSurface};
pub use tracker::OcclusionTracker;

use crate::geometry::PixelSize;

/// One step of a front-to-back walk over the scene.
///
/// Every surface appears as a [`TargetSurface`](Self::TargetSurface) event
/// immediately followed by its [`ContributingSurface`](Self::ContributingSurface)
/// event, after all of the surface's own content.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TraversalEvent<E> {
    /// A layer drawing its own content into `target`.
    Itself {
        /// The drawing layer.
        layer: E,
        /// Owner of the surface it draws into.
        target: E,
    },
    /// All content of the surface owned by this layer has been visited.
    TargetSurface(E),
    /// The surface owned by `surface` is composited into `target`.
    ContributingSurface {
        /// Owner of the finished surface.
        surface: E,
        /// Owner of the surface it is composited into.
        target: E,
    },
}

impl<E: Copy> TraversalEvent<E> {
    /// The element the event is about.
    #[must_use]
    pub fn current(&self) -> E {
        match *self {
            Self::Itself { layer, .. } => layer,
            Self::TargetSurface(owner) => owner,
            Self::ContributingSurface { surface, .. } => surface,
        }
    }

    /// Owner of the target that is current once the event is entered.
    #[must_use]
    pub fn target(&self) -> E {
        match *self {
            Self::Itself { target, .. } | Self::ContributingSurface { target, .. } => target,
            Self::TargetSurface(owner) => owner,
        }
    }
}

/// Tracker parameters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct TrackerConfig {
    /// Occluders and queries smaller than this in both dimensions are
    /// ignored.
    pub minimum_tracking_size: PixelSize,
    /// Whether layers in a 3D rendering context are drawn depth-sorted.
    ///
    /// When they are not, their draw order is ambiguous and they never
    /// occlude.
    pub sorts_3d_contexts: bool,
}

impl TrackerConfig {
    /// Parameters for a tracker running against the main-side scene, where
    /// 3D contexts are not sorted.
    #[must_use]
    pub const fn main_thread() -> Self {
        Self {
            minimum_tracking_size: PixelSize::ZERO,
            sorts_3d_contexts: false,
        }
    }

    /// Parameters for a tracker running against the compositor-side scene,
    /// where 3D contexts are sorted before drawing.
    #[must_use]
    pub const fn impl_thread() -> Self {
        Self {
            minimum_tracking_size: PixelSize::ZERO,
            sorts_3d_contexts: true,
        }
    }

    /// Builder-style setter for
    /// [`minimum_tracking_size`](Self::minimum_tracking_size).
    #[must_use]
    pub const fn with_minimum_tracking_size(mut self, size: PixelSize) -> Self {
        self.minimum_tracking_size = size;
        self
    }
}
