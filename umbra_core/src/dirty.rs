// Copyright 2026 the Umbra Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dirty-tracking channel constants.
//!
//! The layer store uses multi-channel dirty tracking (via [`understory_dirty`])
//! to decide whether the draw-properties pass has anything to do. Each channel
//! represents an independent category of change.
//!
//! # Propagation semantics
//!
//! - **Propagating**: [`GEOMETRY`] and [`EFFECTS`] use
//!   [`EagerPolicy`](understory_dirty::EagerPolicy) and have dependency edges
//!   from child to parent. Screen-space transforms, clips, draw opacity and
//!   render-surface membership are all inherited, so marking a parent marks
//!   every descendant.
//!
//! - **Local-only**: [`CONTENT`] covers draws-content and opacity of the
//!   layer's own pixels. Only the marked layer appears in the drain output.
//!
//! - **Structural**: [`TOPOLOGY`] is marked on create/destroy and on every
//!   parent/child mutation. It does not propagate.
//!
//! # Consumption
//!
//! [`LayerStore::update_draw_properties`](crate::layer::LayerStore::update_draw_properties)
//! drains all channels and reports the results as
//! [`DrawPropertiesUpdate`](crate::layer::DrawPropertiesUpdate).

use understory_dirty::Channel;

/// Transform, position, bounds or clipping changed.
pub const GEOMETRY: Channel = Channel::new(0);

/// Opacity, blend mode, filters, mask, replica, animation state, copy
/// request or hidden flag changed.
pub const EFFECTS: Channel = Channel::new(1);

/// Drawn content or its opacity changed.
pub const CONTENT: Channel = Channel::new(2);

/// Tree topology changed.
pub const TOPOLOGY: Channel = Channel::new(3);
