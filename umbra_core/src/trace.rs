// Copyright 2026 the Umbra Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for the occlusion tracker.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that the
//! tracker calls as it enters and leaves render targets, adds or skips
//! occluders, and erodes occlusion around background filters. All method
//! bodies default to no-ops, so implementing only the events you care about is
//! fine.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. When the `trace` feature
//! is **off**, every `Tracer` method compiles to nothing (zero overhead). When
//! **on**, each method performs a single `Option` branch before dispatching.
//!
//! Layers and surfaces are identified by their diagnostic index
//! ([`OcclusionElement::index`](crate::occlusion::OcclusionElement::index)).
//!
//! # Crate features
//!
//! - `trace`: enables the `Tracer` method bodies (one branch per call).
//! - `trace-rich` (implies `trace`): gates the region snapshot event and the
//!   corresponding `TraceSink` method.

use crate::effect::FilterOutsets;
use crate::geometry::PixelRect;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Why a layer did not contribute occlusion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// Draw opacity below one, or opacity animating.
    OpacityOrAnimation,
    /// Non-default blend mode.
    BlendMode,
    /// Part of a 3D rendering context that is not depth-sorted.
    Unsorted3d,
    /// Draw transform animating.
    TransformAnimating,
    /// No opaque pixels.
    EmptyOpaqueRegion,
    /// Draw transform does not keep rectangles axis-aligned.
    NonAxisAligned,
    /// Some corner projects behind the camera.
    BehindCamera,
}

/// Why a finished surface's own occlusion was thrown away.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DiscardReason {
    /// The surface has a mask.
    Mask,
    /// Surface opacity below one, or animating.
    Opacity,
    /// Non-default blend mode.
    BlendMode,
    /// Copy request inside a hidden subtree.
    HiddenCopyRequest,
    /// A filter can reduce alpha.
    FilterAffectsOpacity,
    /// Surface transform animating relative to its target.
    TransformAnimating,
}

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted when the tracker pushes a new render target.
#[derive(Clone, Copy, Debug)]
pub struct TargetEnteredEvent {
    /// Index of the target's owning layer.
    pub target: u32,
    /// Stack depth after the push.
    pub depth: u32,
    /// Whether occlusion from the previous target was carried in.
    pub inherited_outside: bool,
    /// Rectangles in the inherited outside region.
    pub outside_rects: u32,
}

/// Emitted when a layer's opaque region is added to the current target.
#[derive(Clone, Copy, Debug)]
pub struct OccluderAddedEvent {
    /// Index of the occluding layer.
    pub layer: u32,
    /// Rectangles that passed clipping and the size threshold.
    pub rects_added: u32,
    /// Rectangles in the inside region afterwards.
    pub inside_rects: u32,
}

/// Emitted when a layer is not allowed to occlude.
#[derive(Clone, Copy, Debug)]
pub struct OccluderSkippedEvent {
    /// Index of the skipped layer.
    pub layer: u32,
    /// Why it was skipped.
    pub reason: SkipReason,
}

/// Emitted when a finished surface drops its accumulated occlusion.
#[derive(Clone, Copy, Debug)]
pub struct SurfaceDiscardedEvent {
    /// Index of the surface's owning layer.
    pub surface: u32,
    /// Why the occlusion was dropped.
    pub reason: DiscardReason,
}

/// Emitted when a surface's occlusion is folded into its parent target.
#[derive(Clone, Copy, Debug)]
pub struct TargetLeftEvent {
    /// Index of the surface being left.
    pub surface: u32,
    /// Index of the target now current.
    pub new_target: u32,
    /// `true` if merged into an existing frame, `false` if the frame was
    /// retargeted in place.
    pub merged: bool,
}

/// Emitted when occlusion around a background-filtering surface is eroded.
#[derive(Clone, Copy, Debug)]
pub struct FilterErosionEvent {
    /// Index of the filtering surface.
    pub surface: u32,
    /// Filter reach on each side.
    pub outsets: FilterOutsets,
    /// Footprint, in target space, that was eroded around.
    pub rect: PixelRect,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the occlusion tracker.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called after a render target is pushed.
    fn on_target_entered(&mut self, e: &TargetEnteredEvent) {
        _ = e;
    }

    /// Called after a layer adds occlusion.
    fn on_occluder_added(&mut self, e: &OccluderAddedEvent) {
        _ = e;
    }

    /// Called when a layer is rejected as an occluder.
    fn on_occluder_skipped(&mut self, e: &OccluderSkippedEvent) {
        _ = e;
    }

    /// Called when a finished surface discards its occlusion.
    fn on_surface_discarded(&mut self, e: &SurfaceDiscardedEvent) {
        _ = e;
    }

    /// Called after a surface is left.
    fn on_target_left(&mut self, e: &TargetLeftEvent) {
        _ = e;
    }

    /// Called when background-filter erosion is applied.
    fn on_filter_erosion(&mut self, e: &FilterErosionEvent) {
        _ = e;
    }

    /// Called with full region contents after each target transition
    /// (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    fn on_region_snapshot(&mut self, target: u32, inside: &[PixelRect], outside: &[PixelRect]) {
        _ = (target, inside, outside);
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing. When
/// **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl Default for Tracer<'_> {
    fn default() -> Self {
        Self::none()
    }
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Emits a [`TargetEnteredEvent`].
    #[inline]
    pub fn target_entered(&mut self, e: &TargetEnteredEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_target_entered(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits an [`OccluderAddedEvent`].
    #[inline]
    pub fn occluder_added(&mut self, e: &OccluderAddedEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_occluder_added(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits an [`OccluderSkippedEvent`].
    #[inline]
    pub fn occluder_skipped(&mut self, e: &OccluderSkippedEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_occluder_skipped(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`SurfaceDiscardedEvent`].
    #[inline]
    pub fn surface_discarded(&mut self, e: &SurfaceDiscardedEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_surface_discarded(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`TargetLeftEvent`].
    #[inline]
    pub fn target_left(&mut self, e: &TargetLeftEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_target_left(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`FilterErosionEvent`].
    #[inline]
    pub fn filter_erosion(&mut self, e: &FilterErosionEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_filter_erosion(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a region snapshot (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    #[inline]
    pub fn region_snapshot(&mut self, target: u32, inside: &[PixelRect], outside: &[PixelRect]) {
        if let Some(s) = &mut self.sink {
            s.on_region_snapshot(target, inside, outside);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_added() -> OccluderAddedEvent {
        OccluderAddedEvent {
            layer: 7,
            rects_added: 1,
            inside_rects: 2,
        }
    }

    #[test]
    fn noop_sink_compiles() {
        let mut sink = NoopSink;
        sink.on_occluder_added(&sample_added());
        sink.on_occluder_skipped(&OccluderSkippedEvent {
            layer: 3,
            reason: SkipReason::BlendMode,
        });
        sink.on_filter_erosion(&FilterErosionEvent {
            surface: 1,
            outsets: FilterOutsets::uniform(3),
            rect: PixelRect::new(0, 0, 10, 10),
        });
    }

    #[test]
    fn tracer_none_does_nothing() {
        let mut tracer = Tracer::none();
        tracer.occluder_added(&sample_added());
        tracer.target_left(&TargetLeftEvent {
            surface: 2,
            new_target: 0,
            merged: true,
        });
    }

    #[cfg(feature = "trace")]
    #[test]
    fn tracer_dispatches_to_sink() {
        use alloc::vec::Vec;

        struct RecordingSink {
            added: Vec<u32>,
            discarded: Vec<DiscardReason>,
        }
        impl TraceSink for RecordingSink {
            fn on_occluder_added(&mut self, e: &OccluderAddedEvent) {
                self.added.push(e.layer);
            }
            fn on_surface_discarded(&mut self, e: &SurfaceDiscardedEvent) {
                self.discarded.push(e.reason);
            }
        }

        let mut sink = RecordingSink {
            added: Vec::new(),
            discarded: Vec::new(),
        };
        let mut tracer = Tracer::new(&mut sink);
        tracer.occluder_added(&sample_added());
        tracer.surface_discarded(&SurfaceDiscardedEvent {
            surface: 4,
            reason: DiscardReason::Mask,
        });
        // Access sink after tracer is dropped.
        drop(tracer);
        assert_eq!(sink.added, &[7]);
        assert_eq!(sink.discarded, &[DiscardReason::Mask]);
    }
}
