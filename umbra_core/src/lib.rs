// Copyright 2026 the Umbra Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Occlusion tracking for layer compositors.
//!
//! `umbra_core` decides which parts of a layer tree are hidden behind opaque
//! content drawn in front of them, so a compositor can skip drawing pixels
//! nobody will see. It is `no_std` compatible (with `alloc`) and uses
//! struct-of-arrays layer storage with index handles.
//!
//! # Architecture
//!
//! ```text
//!   LayerStore (caller-set properties)
//!       │
//!       ▼
//!   update_draw_properties() ──► DrawPropertiesUpdate
//!       │
//!       ▼
//!   front_to_back(root) ──► TraversalEvent stream
//!                                 │
//!                                 ▼
//!   OcclusionTracker: enter_layer ─► queries ─► leave_layer
//!                                 │
//!                                 ▼
//!                     TraceSink (optional diagnostics)
//! ```
//!
//! **[`layer`]**: Struct-of-arrays layer tree with generational handles,
//! attached mask and replica layers, and the draw-properties pass that
//! computes transforms, clips, render surfaces and the traversal order.
//!
//! **[`occlusion`]**: The [`OcclusionTracker`](occlusion::OcclusionTracker)
//! and the [`OcclusionElement`](occlusion::OcclusionElement) trait it reads
//! scene elements through. Any scene representation implementing the trait
//! can be tracked; [`LayerRef`](layer::LayerRef) is the in-tree one.
//!
//! **[`region`]**: Sets of disjoint pixel rectangles with the deliberately
//! lossy single-rectangle subtraction used by occlusion queries.
//!
//! **[`geometry`]** / **[`transform`]**: Integer pixel rects and a 4×4
//! transform with enclosing/enclosed rect mapping.
//!
//! **[`effect`]**: Blend modes and filter chains, including filter outsets.
//!
//! **[`dirty`]**: Multi-channel dirty tracking via `understory_dirty`.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and event types for
//! tracker instrumentation, with a zero-overhead [`Tracer`](trace::Tracer)
//! wrapper.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).
//! - `trace-rich` (disabled by default, implies `trace`): Gates region
//!   snapshot events carrying full rect lists.

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod dirty;
pub mod effect;
pub mod geometry;
pub mod layer;
pub mod occlusion;
pub mod region;
pub mod trace;
pub mod transform;
