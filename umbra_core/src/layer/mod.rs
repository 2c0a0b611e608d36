// Copyright 2026 the Umbra Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layer tree data model.
//!
//! A *layer* is a node in a compositing tree. Each layer has:
//!
//! - An identity ([`LayerId`]), a generational handle that becomes stale when
//!   the layer is destroyed.
//! - Topology: parent, first-child, and sibling links forming an ordered
//!   tree, plus optional *attached* mask and replica layers.
//! - **Local properties** set by the caller:
//!   [`transform`](LayerStore::set_transform),
//!   [`position`](LayerStore::set_position), [`bounds`](LayerStore::set_bounds),
//!   [`opacity`](LayerStore::set_opacity), blend mode, filters, an opaque
//!   contents rect, and [`flags`](LayerStore::set_flags).
//! - **Draw properties** produced by
//!   [`update_draw_properties`](LayerStore::update_draw_properties): screen
//!   space and draw transforms, draw opacity, clip and visible rects, render
//!   surfaces and targets.
//!
//! Computed properties are read through [`LayerRef`], which implements
//! [`OcclusionElement`](crate::occlusion::OcclusionElement) so that the
//! occlusion tracker can run directly against a store.
//!
//! # Dirty tracking
//!
//! Property mutations automatically mark the corresponding dirty channel
//! (see [`dirty`](crate::dirty)):
//!
//! - **GEOMETRY** / **EFFECTS**: propagate to all descendants.
//! - **CONTENT**: local-only.
//! - **TOPOLOGY**: structural changes (add/remove child, create/destroy
//!   layer, attach a mask or replica).

mod draw;
mod element;
mod id;
mod store;
mod traverse;

pub use draw::DrawPropertiesUpdate;
pub use element::LayerRef;
pub use id::{INVALID, LayerId};
pub use store::{LayerFlags, LayerStore};
pub use traverse::{Children, FrontToBack};
