// Copyright 2026 the Umbra Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] reads recorded bytes from a [`RecorderSink`](super::recorder::RecorderSink)
//! and writes [Chrome Trace Event Format][format] JSON to the given writer.
//!
//! Tracker events carry no timestamps, so each event is placed one
//! microsecond after the previous one. Render targets become nested duration
//! slices; everything else is an instant event inside them.
//!
//! [format]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use serde_json::{Value, json};

use crate::recorder::{RecordedEvent, decode};

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// The output is a complete JSON array of trace event objects, suitable for
/// loading into `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
pub fn export(bytes: &[u8], writer: &mut dyn Write) -> io::Result<()> {
    let mut events: Vec<Value> = Vec::new();
    // Targets with an open "B" slice, innermost last.
    let mut open: Vec<u32> = Vec::new();
    let mut ts: u64 = 0;

    for recorded in decode(bytes) {
        ts += 1;
        match recorded {
            RecordedEvent::TargetEntered(e) => {
                open.push(e.target);
                events.push(json!({
                    "ph": "B",
                    "name": format!("target {}", e.target),
                    "cat": "Target",
                    "ts": ts,
                    "pid": 0,
                    "tid": 0,
                    "args": {
                        "depth": e.depth,
                        "inherited_outside": e.inherited_outside,
                        "outside_rects": e.outside_rects,
                    }
                }));
            }
            RecordedEvent::TargetLeft(e) => {
                if open.last() == Some(&e.surface) {
                    open.pop();
                    events.push(json!({
                        "ph": "E",
                        "name": format!("target {}", e.surface),
                        "cat": "Target",
                        "ts": ts,
                        "pid": 0,
                        "tid": 0,
                        "args": {
                            "new_target": e.new_target,
                            "merged": e.merged,
                        }
                    }));
                }
                if !e.merged {
                    // The frame now belongs to the parent target.
                    open.push(e.new_target);
                    events.push(json!({
                        "ph": "B",
                        "name": format!("target {}", e.new_target),
                        "cat": "Target",
                        "ts": ts,
                        "pid": 0,
                        "tid": 0,
                        "args": { "retargeted_from": e.surface }
                    }));
                }
            }
            RecordedEvent::OccluderAdded(e) => {
                events.push(instant(
                    "OccluderAdded",
                    "Occlusion",
                    ts,
                    json!({
                        "layer": e.layer,
                        "rects_added": e.rects_added,
                        "inside_rects": e.inside_rects,
                    }),
                ));
            }
            RecordedEvent::OccluderSkipped(e) => {
                events.push(instant(
                    "OccluderSkipped",
                    "Occlusion",
                    ts,
                    json!({
                        "layer": e.layer,
                        "reason": format!("{:?}", e.reason),
                    }),
                ));
            }
            RecordedEvent::SurfaceDiscarded(e) => {
                events.push(instant(
                    "SurfaceDiscarded",
                    "Occlusion",
                    ts,
                    json!({
                        "surface": e.surface,
                        "reason": format!("{:?}", e.reason),
                    }),
                ));
            }
            RecordedEvent::FilterErosion(e) => {
                events.push(instant(
                    "FilterErosion",
                    "Occlusion",
                    ts,
                    json!({
                        "surface": e.surface,
                        "outsets": [e.outsets.top, e.outsets.right, e.outsets.bottom, e.outsets.left],
                        "rect": [e.rect.x, e.rect.y, e.rect.width, e.rect.height],
                    }),
                ));
            }
            RecordedEvent::RegionSnapshotCount {
                target,
                inside,
                outside,
            } => {
                events.push(json!({
                    "ph": "C",
                    "name": "Regions",
                    "cat": "Rich",
                    "ts": ts,
                    "pid": 0,
                    "tid": 0,
                    "args": {
                        "inside": inside,
                        "outside": outside,
                    },
                    "id": target,
                }));
            }
        }
    }

    // Close anything still open so viewers don't show runaway slices.
    while let Some(target) = open.pop() {
        ts += 1;
        events.push(json!({
            "ph": "E",
            "name": format!("target {target}"),
            "cat": "Target",
            "ts": ts,
            "pid": 0,
            "tid": 0,
        }));
    }

    serde_json::to_writer_pretty(writer, &events)?;
    Ok(())
}

fn instant(name: &str, cat: &str, ts: u64, args: Value) -> Value {
    json!({
        "ph": "i",
        "name": name,
        "cat": cat,
        "ts": ts,
        "pid": 0,
        "tid": 0,
        "s": "t",
        "args": args,
    })
}
