// Copyright 2026 the Umbra Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Occlusion-culled render plans for umbra.
//!
//! This crate sits between [`umbra_core`]'s layer store and a backend that
//! actually draws. It walks the front-to-back traversal with an
//! [`OcclusionTracker`](umbra_core::occlusion::OcclusionTracker), asks for
//! each drawable's unoccluded rect before marking its own coverage, and emits:
//!
//! - [`RenderItem`]: a single draw command clipped to its visible part
//! - [`RenderPlan`]: the draw commands for one frame, plus what was culled
//! - [`PlanStats`]: drawn and culled counts for diagnostics
//!
//! Use [`build_plan`] (or [`build_plan_into`] to reuse allocations) after
//! [`LayerStore::update_draw_properties`](umbra_core::layer::LayerStore::update_draw_properties).

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

mod plan;

pub use plan::{ItemKind, PlanStats, RenderItem, RenderPlan, build_plan, build_plan_into};
pub use umbra_core::effect::BlendMode;
