// Copyright 2026 the Umbra Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Read-only layer views for the occlusion tracker.

use core::fmt;

use crate::effect::{BlendMode, FilterChain};
use crate::geometry::PixelRect;
use crate::occlusion::{ElementKind, OcclusionElement, RenderSurface};
use crate::region::Region;
use crate::transform::Transform3d;

use super::id::{INVALID, LayerId};
use super::store::LayerStore;

/// A borrowed view of one layer and its computed draw properties.
///
/// Created by [`LayerStore::layer`] and by front-to-back traversal. Two views
/// are equal when they refer to the same slot of the same store.
#[derive(Clone, Copy)]
pub struct LayerRef<'a> {
    store: &'a LayerStore,
    idx: u32,
}

impl<'a> LayerRef<'a> {
    pub(crate) fn new(store: &'a LayerStore, idx: u32) -> Self {
        Self { store, idx }
    }

    fn at(self, idx: u32) -> Option<Self> {
        (idx != INVALID).then(|| Self::new(self.store, idx))
    }

    /// The handle of the viewed layer.
    #[must_use]
    pub fn id(self) -> LayerId {
        self.store.id_at(self.idx)
    }

    /// Content bounds in the layer's own space.
    #[must_use]
    pub fn content_bounds(self) -> PixelRect {
        PixelRect::from_size(self.store.bounds[self.idx as usize])
    }

    /// Whether the layer draws content of its own.
    #[must_use]
    pub fn draws_content(self) -> bool {
        self.store.flags[self.idx as usize].draws_content
    }

    /// Whether the layer and everything under it is hidden for this frame.
    #[must_use]
    pub fn effective_hidden(self) -> bool {
        self.store.effective_hidden[self.idx as usize]
    }

    /// Owner of the surface that this layer's surface is composited into.
    ///
    /// `None` for layers that own no surface, and for roots.
    #[must_use]
    pub fn surface_target(self) -> Option<Self> {
        self.at(self.store.surface_target[self.idx as usize])
    }
}

impl PartialEq for LayerRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        core::ptr::eq(self.store, other.store) && self.idx == other.idx
    }
}

impl Eq for LayerRef<'_> {}

impl fmt::Debug for LayerRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LayerRef({})", self.idx)
    }
}

impl OcclusionElement for LayerRef<'_> {
    fn index(&self) -> u32 {
        self.idx
    }

    fn kind(&self) -> ElementKind {
        let s = self.store;
        let i = self.idx as usize;
        let owner = s.owner[i];
        if owner != INVALID && s.replica[owner as usize] == self.idx {
            ElementKind::Replica
        } else if s.render_surface[i].is_some() {
            ElementKind::SurfaceOwning
        } else {
            ElementKind::Plain
        }
    }

    fn parent(&self) -> Option<Self> {
        let i = self.idx as usize;
        self.at(self.store.parent[i])
            .or_else(|| self.at(self.store.owner[i]))
    }

    fn render_target(&self) -> Self {
        self.at(self.store.render_target[self.idx as usize])
            .unwrap_or(*self)
    }

    fn render_surface(&self) -> Option<RenderSurface> {
        self.store.render_surface[self.idx as usize]
    }

    fn mask_layer(&self) -> Option<Self> {
        self.at(self.store.mask[self.idx as usize])
    }

    fn replica_layer(&self) -> Option<Self> {
        self.at(self.store.replica[self.idx as usize])
    }

    fn visible_content_rect(&self) -> PixelRect {
        self.store.visible_content_rect[self.idx as usize]
    }

    fn visible_content_opaque_region(&self) -> Region {
        let s = self.store;
        let i = self.idx as usize;
        if self.kind() == ElementKind::Replica || !s.flags[i].draws_content {
            return Region::new();
        }
        let visible = s.visible_content_rect[i];
        if s.flags[i].contents_opaque {
            Region::from_rect(visible)
        } else {
            Region::from_rect(s.opaque_contents_rect[i].intersect(visible))
        }
    }

    fn draw_transform(&self) -> Transform3d {
        self.store.draw_transform[self.idx as usize]
    }

    fn screen_space_transform(&self) -> Transform3d {
        self.store.screen_space_transform[self.idx as usize]
    }

    fn is_clipped(&self) -> bool {
        self.store.is_clipped[self.idx as usize]
    }

    fn clip_rect(&self) -> PixelRect {
        self.store.clip_rect[self.idx as usize]
    }

    fn filters(&self) -> &FilterChain {
        &self.store.filters[self.idx as usize]
    }

    fn background_filters(&self) -> &FilterChain {
        &self.store.background_filters[self.idx as usize]
    }

    fn blend_mode(&self) -> BlendMode {
        self.store.blend_mode[self.idx as usize]
    }

    fn draw_opacity(&self) -> f32 {
        self.store.draw_opacity[self.idx as usize]
    }

    fn draw_opacity_is_animating(&self) -> bool {
        self.store.draw_opacity_is_animating[self.idx as usize]
    }

    fn draw_transform_is_animating(&self) -> bool {
        self.store.draw_transform_is_animating[self.idx as usize]
    }

    fn screen_space_transform_is_animating(&self) -> bool {
        self.store.screen_space_transform_is_animating[self.idx as usize]
    }

    fn has_copy_request(&self) -> bool {
        self.store.flags[self.idx as usize].has_copy_request
    }

    fn hide_layer_and_subtree(&self) -> bool {
        self.store.flags[self.idx as usize].hide_layer_and_subtree
    }

    fn sorting_context_id(&self) -> i32 {
        self.store.sorting_context_id[self.idx as usize]
    }

    fn nearest_occlusion_immune_ancestor(&self) -> Option<Self> {
        self.at(self.store.immune_ancestor[self.idx as usize])
    }
}
