// Copyright 2026 the Umbra Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr). Lines are
//! indented by render-target depth so nested surfaces read as a tree.

use std::io::Write;

use umbra_core::geometry::PixelRect;
use umbra_core::trace::{
    DiscardReason, FilterErosionEvent, OccluderAddedEvent, OccluderSkippedEvent, SkipReason,
    SurfaceDiscardedEvent, TargetEnteredEvent, TargetLeftEvent, TraceSink,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
    depth: u32,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink")
            .field("depth", &self.depth)
            .finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self {
            writer: Box::new(std::io::stderr()),
            depth: 0,
        }
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self { writer, depth: 0 }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self { writer, depth: 0 }
    }

    /// Consumes the sink and returns the writer.
    #[must_use]
    pub fn into_writer(self) -> W {
        self.writer
    }

    fn indent(&self) -> usize {
        self.depth.saturating_sub(1) as usize * 2
    }
}

fn skip_name(reason: SkipReason) -> &'static str {
    match reason {
        SkipReason::OpacityOrAnimation => "opacity",
        SkipReason::BlendMode => "blend",
        SkipReason::Unsorted3d => "unsorted-3d",
        SkipReason::TransformAnimating => "animating",
        SkipReason::EmptyOpaqueRegion => "no-opaque",
        SkipReason::NonAxisAligned => "non-axis-aligned",
        SkipReason::BehindCamera => "behind-camera",
    }
}

fn discard_name(reason: DiscardReason) -> &'static str {
    match reason {
        DiscardReason::Mask => "mask",
        DiscardReason::Opacity => "opacity",
        DiscardReason::BlendMode => "blend",
        DiscardReason::HiddenCopyRequest => "hidden-copy",
        DiscardReason::FilterAffectsOpacity => "filter-alpha",
        DiscardReason::TransformAnimating => "animating",
    }
}

fn write_rects(out: &mut String, rects: &[PixelRect]) {
    use std::fmt::Write as _;
    out.push('[');
    for (i, r) in rects.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{},{} {}x{}", r.x, r.y, r.width, r.height);
    }
    out.push(']');
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_target_entered(&mut self, e: &TargetEnteredEvent) {
        self.depth = e.depth;
        let pad = self.indent();
        let _ = writeln!(
            self.writer,
            "{:w$}[enter] target={} depth={} inherited={} outside={}",
            "",
            e.target,
            e.depth,
            e.inherited_outside,
            e.outside_rects,
            w = pad,
        );
    }

    fn on_occluder_added(&mut self, e: &OccluderAddedEvent) {
        let pad = self.indent();
        let _ = writeln!(
            self.writer,
            "{:w$}  [occlude] layer={} rects={} inside={}",
            "",
            e.layer,
            e.rects_added,
            e.inside_rects,
            w = pad,
        );
    }

    fn on_occluder_skipped(&mut self, e: &OccluderSkippedEvent) {
        let pad = self.indent();
        let _ = writeln!(
            self.writer,
            "{:w$}  [skip] layer={} reason={}",
            "",
            e.layer,
            skip_name(e.reason),
            w = pad,
        );
    }

    fn on_surface_discarded(&mut self, e: &SurfaceDiscardedEvent) {
        let pad = self.indent();
        let _ = writeln!(
            self.writer,
            "{:w$}  [discard] surface={} reason={}",
            "",
            e.surface,
            discard_name(e.reason),
            w = pad,
        );
    }

    fn on_target_left(&mut self, e: &TargetLeftEvent) {
        let pad = self.indent();
        let _ = writeln!(
            self.writer,
            "{:w$}[leave] surface={} into={} {}",
            "",
            e.surface,
            e.new_target,
            if e.merged { "merged" } else { "retargeted" },
            w = pad,
        );
        if e.merged {
            self.depth = self.depth.saturating_sub(1);
        }
    }

    fn on_filter_erosion(&mut self, e: &FilterErosionEvent) {
        let o = e.outsets;
        let r = e.rect;
        let pad = self.indent();
        let _ = writeln!(
            self.writer,
            "{:w$}  [erode] surface={} rect={},{} {}x{} outsets={}/{}/{}/{}",
            "",
            e.surface,
            r.x,
            r.y,
            r.width,
            r.height,
            o.top,
            o.right,
            o.bottom,
            o.left,
            w = pad,
        );
    }

    fn on_region_snapshot(&mut self, target: u32, inside: &[PixelRect], outside: &[PixelRect]) {
        let mut line = String::new();
        line.push_str("inside=");
        write_rects(&mut line, inside);
        line.push_str(" outside=");
        write_rects(&mut line, outside);
        let pad = self.indent();
        let _ = writeln!(
            self.writer,
            "{:w$}  [regions] target={target} {line}",
            "",
            w = pad,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pretty_print_skip() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        sink.on_occluder_skipped(&OccluderSkippedEvent {
            layer: 4,
            reason: SkipReason::NonAxisAligned,
        });
        let output = String::from_utf8(sink.into_writer()).unwrap();
        assert!(output.contains("[skip]"), "got: {output}");
        assert!(output.contains("layer=4"), "got: {output}");
        assert!(output.contains("non-axis-aligned"), "got: {output}");
    }

    #[test]
    fn nested_targets_are_indented() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        sink.on_target_entered(&TargetEnteredEvent {
            target: 0,
            depth: 1,
            inherited_outside: false,
            outside_rects: 0,
        });
        sink.on_target_entered(&TargetEnteredEvent {
            target: 5,
            depth: 2,
            inherited_outside: true,
            outside_rects: 1,
        });
        sink.on_target_left(&TargetLeftEvent {
            surface: 5,
            new_target: 0,
            merged: true,
        });
        let output = String::from_utf8(sink.into_writer()).unwrap();
        let lines: Vec<_> = output.lines().collect();
        assert_eq!(lines.len(), 3, "got: {output}");
        assert!(lines[0].starts_with("[enter] target=0"), "got: {output}");
        assert!(lines[1].starts_with("  [enter] target=5"), "got: {output}");
        assert!(lines[2].contains("merged"), "got: {output}");
    }

    #[test]
    fn region_snapshot_lists_rects() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        sink.on_region_snapshot(
            2,
            &[PixelRect::new(0, 0, 10, 20)],
            &[PixelRect::new(-5, 3, 1, 1)],
        );
        let output = String::from_utf8(sink.into_writer()).unwrap();
        assert!(output.contains("inside=[0,0 10x20]"), "got: {output}");
        assert!(output.contains("outside=[-5,3 1x1]"), "got: {output}");
    }
}
