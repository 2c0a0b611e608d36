// Copyright 2026 the Umbra Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`] and encodes events into a
//! `Vec<u8>` as fixed-size little-endian records. [`decode`] reads them back
//! as an iterator of [`RecordedEvent`].
//!
//! Region snapshots ([`on_region_snapshot`](TraceSink::on_region_snapshot))
//! store only the rectangle counts.

use umbra_core::effect::FilterOutsets;
use umbra_core::geometry::PixelRect;
use umbra_core::trace::{
    DiscardReason, FilterErosionEvent, OccluderAddedEvent, OccluderSkippedEvent, SkipReason,
    SurfaceDiscardedEvent, TargetEnteredEvent, TargetLeftEvent, TraceSink,
};

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_TARGET_ENTERED: u8 = 1;
const TAG_OCCLUDER_ADDED: u8 = 2;
const TAG_OCCLUDER_SKIPPED: u8 = 3;
const TAG_SURFACE_DISCARDED: u8 = 4;
const TAG_TARGET_LEFT: u8 = 5;
const TAG_FILTER_EROSION: u8 = 6;
const TAG_REGION_SNAPSHOT_COUNT: u8 = 7;

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that encodes events into a compact binary buffer.
#[derive(Debug, Default)]
pub struct RecorderSink {
    buf: Vec<u8>,
}

impl RecorderSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    // -- encoding helpers --------------------------------------------------

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_rect(&mut self, r: PixelRect) {
        self.write_i32(r.x);
        self.write_i32(r.y);
        self.write_i32(r.width);
        self.write_i32(r.height);
    }

    fn write_outsets(&mut self, o: FilterOutsets) {
        self.write_i32(o.top);
        self.write_i32(o.right);
        self.write_i32(o.bottom);
        self.write_i32(o.left);
    }

    fn write_count(&mut self, n: usize) {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "rect count capped at u32::MAX for recording"
        )]
        self.write_u32(n.min(u32::MAX as usize) as u32);
    }

    fn write_skip_reason(&mut self, r: SkipReason) {
        self.write_u8(match r {
            SkipReason::OpacityOrAnimation => 0,
            SkipReason::BlendMode => 1,
            SkipReason::Unsorted3d => 2,
            SkipReason::TransformAnimating => 3,
            SkipReason::EmptyOpaqueRegion => 4,
            SkipReason::NonAxisAligned => 5,
            SkipReason::BehindCamera => 6,
        });
    }

    fn write_discard_reason(&mut self, r: DiscardReason) {
        self.write_u8(match r {
            DiscardReason::Mask => 0,
            DiscardReason::Opacity => 1,
            DiscardReason::BlendMode => 2,
            DiscardReason::HiddenCopyRequest => 3,
            DiscardReason::FilterAffectsOpacity => 4,
            DiscardReason::TransformAnimating => 5,
        });
    }
}

impl TraceSink for RecorderSink {
    fn on_target_entered(&mut self, e: &TargetEnteredEvent) {
        self.write_u8(TAG_TARGET_ENTERED);
        self.write_u32(e.target);
        self.write_u32(e.depth);
        self.write_u8(u8::from(e.inherited_outside));
        self.write_u32(e.outside_rects);
    }

    fn on_occluder_added(&mut self, e: &OccluderAddedEvent) {
        self.write_u8(TAG_OCCLUDER_ADDED);
        self.write_u32(e.layer);
        self.write_u32(e.rects_added);
        self.write_u32(e.inside_rects);
    }

    fn on_occluder_skipped(&mut self, e: &OccluderSkippedEvent) {
        self.write_u8(TAG_OCCLUDER_SKIPPED);
        self.write_u32(e.layer);
        self.write_skip_reason(e.reason);
    }

    fn on_surface_discarded(&mut self, e: &SurfaceDiscardedEvent) {
        self.write_u8(TAG_SURFACE_DISCARDED);
        self.write_u32(e.surface);
        self.write_discard_reason(e.reason);
    }

    fn on_target_left(&mut self, e: &TargetLeftEvent) {
        self.write_u8(TAG_TARGET_LEFT);
        self.write_u32(e.surface);
        self.write_u32(e.new_target);
        self.write_u8(u8::from(e.merged));
    }

    fn on_filter_erosion(&mut self, e: &FilterErosionEvent) {
        self.write_u8(TAG_FILTER_EROSION);
        self.write_u32(e.surface);
        self.write_outsets(e.outsets);
        self.write_rect(e.rect);
    }

    fn on_region_snapshot(&mut self, target: u32, inside: &[PixelRect], outside: &[PixelRect]) {
        self.write_u8(TAG_REGION_SNAPSHOT_COUNT);
        self.write_u32(target);
        self.write_count(inside.len());
        self.write_count(outside.len());
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// A decoded event from a binary recording.
#[derive(Clone, Debug)]
pub enum RecordedEvent {
    /// A [`TargetEnteredEvent`].
    TargetEntered(TargetEnteredEvent),
    /// An [`OccluderAddedEvent`].
    OccluderAdded(OccluderAddedEvent),
    /// An [`OccluderSkippedEvent`].
    OccluderSkipped(OccluderSkippedEvent),
    /// A [`SurfaceDiscardedEvent`].
    SurfaceDiscarded(SurfaceDiscardedEvent),
    /// A [`TargetLeftEvent`].
    TargetLeft(TargetLeftEvent),
    /// A [`FilterErosionEvent`].
    FilterErosion(FilterErosionEvent),
    /// Region sizes after a target transition.
    RegionSnapshotCount {
        /// Index of the current target's owning layer.
        target: u32,
        /// Rectangles in the inside region.
        inside: u32,
        /// Rectangles in the outside region.
        outside: u32,
    },
}

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`RecordedEvent`].
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter {
        data: bytes,
        pos: 0,
    }
}

/// Iterator over decoded events.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn read_u8(&mut self) -> Option<u8> {
        if self.remaining() < 1 {
            return None;
        }
        let v = self.data[self.pos];
        self.pos += 1;
        Some(v)
    }

    fn read_u32(&mut self) -> Option<u32> {
        if self.remaining() < 4 {
            return None;
        }
        let v = u32::from_le_bytes(self.data[self.pos..self.pos + 4].try_into().ok()?);
        self.pos += 4;
        Some(v)
    }

    fn read_i32(&mut self) -> Option<i32> {
        if self.remaining() < 4 {
            return None;
        }
        let v = i32::from_le_bytes(self.data[self.pos..self.pos + 4].try_into().ok()?);
        self.pos += 4;
        Some(v)
    }

    fn read_bool(&mut self) -> Option<bool> {
        Some(self.read_u8()? != 0)
    }

    fn read_rect(&mut self) -> Option<PixelRect> {
        Some(PixelRect {
            x: self.read_i32()?,
            y: self.read_i32()?,
            width: self.read_i32()?,
            height: self.read_i32()?,
        })
    }

    fn read_outsets(&mut self) -> Option<FilterOutsets> {
        Some(FilterOutsets {
            top: self.read_i32()?,
            right: self.read_i32()?,
            bottom: self.read_i32()?,
            left: self.read_i32()?,
        })
    }

    fn read_skip_reason(&mut self) -> Option<SkipReason> {
        Some(match self.read_u8()? {
            0 => SkipReason::OpacityOrAnimation,
            1 => SkipReason::BlendMode,
            2 => SkipReason::Unsorted3d,
            3 => SkipReason::TransformAnimating,
            4 => SkipReason::EmptyOpaqueRegion,
            5 => SkipReason::NonAxisAligned,
            6 => SkipReason::BehindCamera,
            _ => return None,
        })
    }

    fn read_discard_reason(&mut self) -> Option<DiscardReason> {
        Some(match self.read_u8()? {
            0 => DiscardReason::Mask,
            1 => DiscardReason::Opacity,
            2 => DiscardReason::BlendMode,
            3 => DiscardReason::HiddenCopyRequest,
            4 => DiscardReason::FilterAffectsOpacity,
            5 => DiscardReason::TransformAnimating,
            _ => return None,
        })
    }

    fn decode_target_entered(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::TargetEntered(TargetEnteredEvent {
            target: self.read_u32()?,
            depth: self.read_u32()?,
            inherited_outside: self.read_bool()?,
            outside_rects: self.read_u32()?,
        }))
    }

    fn decode_occluder_added(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::OccluderAdded(OccluderAddedEvent {
            layer: self.read_u32()?,
            rects_added: self.read_u32()?,
            inside_rects: self.read_u32()?,
        }))
    }

    fn decode_occluder_skipped(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::OccluderSkipped(OccluderSkippedEvent {
            layer: self.read_u32()?,
            reason: self.read_skip_reason()?,
        }))
    }

    fn decode_surface_discarded(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::SurfaceDiscarded(SurfaceDiscardedEvent {
            surface: self.read_u32()?,
            reason: self.read_discard_reason()?,
        }))
    }

    fn decode_target_left(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::TargetLeft(TargetLeftEvent {
            surface: self.read_u32()?,
            new_target: self.read_u32()?,
            merged: self.read_bool()?,
        }))
    }

    fn decode_filter_erosion(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::FilterErosion(FilterErosionEvent {
            surface: self.read_u32()?,
            outsets: self.read_outsets()?,
            rect: self.read_rect()?,
        }))
    }

    fn decode_region_snapshot_count(&mut self) -> Option<RecordedEvent> {
        let target = self.read_u32()?;
        let inside = self.read_u32()?;
        let outside = self.read_u32()?;
        Some(RecordedEvent::RegionSnapshotCount {
            target,
            inside,
            outside,
        })
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = RecordedEvent;

    fn next(&mut self) -> Option<RecordedEvent> {
        let tag = self.read_u8()?;
        match tag {
            TAG_TARGET_ENTERED => self.decode_target_entered(),
            TAG_OCCLUDER_ADDED => self.decode_occluder_added(),
            TAG_OCCLUDER_SKIPPED => self.decode_occluder_skipped(),
            TAG_SURFACE_DISCARDED => self.decode_surface_discarded(),
            TAG_TARGET_LEFT => self.decode_target_left(),
            TAG_FILTER_EROSION => self.decode_filter_erosion(),
            TAG_REGION_SNAPSHOT_COUNT => self.decode_region_snapshot_count(),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
