// Copyright 2026 the Umbra Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Struct-of-arrays layer storage with allocation, topology, and property management.

use alloc::vec::Vec;

use kurbo::Point;
use understory_dirty::{CycleHandling, DirtyTracker, EagerPolicy};

use crate::effect::{BlendMode, FilterChain};
use crate::geometry::{PixelRect, PixelSize};
use crate::occlusion::{RenderSurface, TraversalEvent};
use crate::transform::Transform3d;

use super::element::LayerRef;
use super::id::{INVALID, LayerId};
use super::traverse::Children;
use crate::dirty;

/// Per-layer boolean flags.
///
/// Setting [`hide_layer_and_subtree`](Self::hide_layer_and_subtree)
/// suppresses the layer and its subtree, except for subtrees holding a copy
/// request: those are still drawn (for the copy) but never occlude.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct LayerFlags {
    /// Whether the layer draws content of its own.
    pub draws_content: bool,
    /// Whether every pixel of the layer's content is opaque.
    pub contents_opaque: bool,
    /// Whether descendants are clipped to the layer's bounds.
    pub masks_to_bounds: bool,
    /// Whether the layer and its subtree are hidden.
    pub hide_layer_and_subtree: bool,
    /// Whether the layer always gets its own render surface.
    pub force_render_surface: bool,
    /// Whether a readback of the layer's surface was requested.
    pub has_copy_request: bool,
    /// Whether the layer's opacity is running an animation.
    pub opacity_is_animating: bool,
    /// Whether the layer's transform is running an animation.
    pub transform_is_animating: bool,
}

/// Struct-of-arrays storage for all layers.
///
/// Layers are addressed by [`LayerId`] handles. Internally, each layer occupies
/// a slot in parallel arrays. Destroyed layers are recycled via a free list,
/// and generation counters prevent stale handle access.
///
/// Mask and replica layers are not children: they are *attached* to an owner
/// with [`set_mask_layer`](Self::set_mask_layer) and
/// [`set_replica_layer`](Self::set_replica_layer), and are positioned relative
/// to it.
#[derive(Debug)]
pub struct LayerStore {
    // -- Topology --
    pub(crate) parent: Vec<u32>,
    pub(crate) first_child: Vec<u32>,
    pub(crate) next_sibling: Vec<u32>,
    pub(crate) prev_sibling: Vec<u32>,
    pub(crate) mask: Vec<u32>,
    pub(crate) replica: Vec<u32>,
    pub(crate) owner: Vec<u32>,

    // -- Local properties (set by callers) --
    pub(crate) local_transform: Vec<Transform3d>,
    pub(crate) position: Vec<Point>,
    pub(crate) bounds: Vec<PixelSize>,
    pub(crate) opacity: Vec<f32>,
    pub(crate) blend_mode: Vec<BlendMode>,
    pub(crate) filters: Vec<FilterChain>,
    pub(crate) background_filters: Vec<FilterChain>,
    pub(crate) opaque_contents_rect: Vec<PixelRect>,
    pub(crate) sorting_context_id: Vec<i32>,
    pub(crate) flags: Vec<LayerFlags>,

    // -- Computed properties (written by update_draw_properties) --
    pub(crate) screen_space_transform: Vec<Transform3d>,
    pub(crate) draw_transform: Vec<Transform3d>,
    pub(crate) draw_opacity: Vec<f32>,
    pub(crate) draw_opacity_is_animating: Vec<bool>,
    pub(crate) draw_transform_is_animating: Vec<bool>,
    pub(crate) screen_space_transform_is_animating: Vec<bool>,
    pub(crate) is_clipped: Vec<bool>,
    pub(crate) clip_rect: Vec<PixelRect>,
    pub(crate) visible_content_rect: Vec<PixelRect>,
    pub(crate) effective_hidden: Vec<bool>,
    pub(crate) render_target: Vec<u32>,
    pub(crate) surface_target: Vec<u32>,
    pub(crate) render_surface: Vec<Option<RenderSurface>>,
    pub(crate) immune_ancestor: Vec<u32>,

    // -- Allocation --
    pub(crate) generation: Vec<u32>,
    pub(crate) free_list: Vec<u32>,
    pub(crate) len: u32,

    // -- Dirty tracking --
    pub(crate) dirty: DirtyTracker<u32>,

    // -- Traversal cache --
    pub(crate) front_to_back: Vec<(u32, Vec<TraversalEvent<u32>>)>,
    pub(crate) viewport: Option<PixelRect>,

    // -- Lifecycle tracking --
    pub(crate) pending_added: Vec<u32>,
    pub(crate) pending_removed: Vec<u32>,
}

impl Default for LayerStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LayerStore {
    /// Creates an empty layer store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            parent: Vec::new(),
            first_child: Vec::new(),
            next_sibling: Vec::new(),
            prev_sibling: Vec::new(),
            mask: Vec::new(),
            replica: Vec::new(),
            owner: Vec::new(),
            local_transform: Vec::new(),
            position: Vec::new(),
            bounds: Vec::new(),
            opacity: Vec::new(),
            blend_mode: Vec::new(),
            filters: Vec::new(),
            background_filters: Vec::new(),
            opaque_contents_rect: Vec::new(),
            sorting_context_id: Vec::new(),
            flags: Vec::new(),
            screen_space_transform: Vec::new(),
            draw_transform: Vec::new(),
            draw_opacity: Vec::new(),
            draw_opacity_is_animating: Vec::new(),
            draw_transform_is_animating: Vec::new(),
            screen_space_transform_is_animating: Vec::new(),
            is_clipped: Vec::new(),
            clip_rect: Vec::new(),
            visible_content_rect: Vec::new(),
            effective_hidden: Vec::new(),
            render_target: Vec::new(),
            surface_target: Vec::new(),
            render_surface: Vec::new(),
            immune_ancestor: Vec::new(),
            generation: Vec::new(),
            free_list: Vec::new(),
            len: 0,
            dirty: DirtyTracker::with_cycle_handling(CycleHandling::Error),
            front_to_back: Vec::new(),
            viewport: None,
            pending_added: Vec::new(),
            pending_removed: Vec::new(),
        }
    }

    // -- Allocation API --

    /// Creates a new layer and returns its handle.
    ///
    /// The layer starts with an identity transform at the origin, zero
    /// bounds, full opacity, no effects, default flags, and no parent.
    pub fn create_layer(&mut self) -> LayerId {
        let idx = if let Some(idx) = self.free_list.pop() {
            // Reuse a freed slot.
            let i = idx as usize;
            self.generation[i] += 1;
            self.parent[i] = INVALID;
            self.first_child[i] = INVALID;
            self.next_sibling[i] = INVALID;
            self.prev_sibling[i] = INVALID;
            self.mask[i] = INVALID;
            self.replica[i] = INVALID;
            self.owner[i] = INVALID;
            self.local_transform[i] = Transform3d::IDENTITY;
            self.position[i] = Point::ZERO;
            self.bounds[i] = PixelSize::ZERO;
            self.opacity[i] = 1.0;
            self.blend_mode[i] = BlendMode::SourceOver;
            self.filters[i] = FilterChain::new();
            self.background_filters[i] = FilterChain::new();
            self.opaque_contents_rect[i] = PixelRect::ZERO;
            self.sorting_context_id[i] = 0;
            self.flags[i] = LayerFlags::default();
            self.reset_computed(idx);
            idx
        } else {
            // Allocate a new slot.
            let idx = self.len;
            self.len += 1;
            self.parent.push(INVALID);
            self.first_child.push(INVALID);
            self.next_sibling.push(INVALID);
            self.prev_sibling.push(INVALID);
            self.mask.push(INVALID);
            self.replica.push(INVALID);
            self.owner.push(INVALID);
            self.local_transform.push(Transform3d::IDENTITY);
            self.position.push(Point::ZERO);
            self.bounds.push(PixelSize::ZERO);
            self.opacity.push(1.0);
            self.blend_mode.push(BlendMode::SourceOver);
            self.filters.push(FilterChain::new());
            self.background_filters.push(FilterChain::new());
            self.opaque_contents_rect.push(PixelRect::ZERO);
            self.sorting_context_id.push(0);
            self.flags.push(LayerFlags::default());
            self.screen_space_transform.push(Transform3d::IDENTITY);
            self.draw_transform.push(Transform3d::IDENTITY);
            self.draw_opacity.push(1.0);
            self.draw_opacity_is_animating.push(false);
            self.draw_transform_is_animating.push(false);
            self.screen_space_transform_is_animating.push(false);
            self.is_clipped.push(false);
            self.clip_rect.push(PixelRect::ZERO);
            self.visible_content_rect.push(PixelRect::ZERO);
            self.effective_hidden.push(false);
            self.render_target.push(INVALID);
            self.surface_target.push(INVALID);
            self.render_surface.push(None);
            self.immune_ancestor.push(INVALID);
            self.generation.push(0);
            idx
        };

        self.pending_added.push(idx);
        self.dirty.mark(idx, dirty::TOPOLOGY);

        LayerId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    /// Destroys a layer, freeing its slot for reuse.
    ///
    /// Attached mask and replica layers are detached (not destroyed), and the
    /// layer is detached from its owner if it is itself attached.
    ///
    /// # Panics
    ///
    /// Panics if the layer has children (remove them first) or if the handle
    /// is stale.
    pub fn destroy_layer(&mut self, id: LayerId) {
        self.validate(id);
        let idx = id.idx;
        assert!(
            self.first_child[idx as usize] == INVALID,
            "cannot destroy layer with children"
        );

        // Remove from parent's child list if attached.
        if self.parent[idx as usize] != INVALID {
            self.unlink_from_parent(idx);
        }
        if self.owner[idx as usize] != INVALID {
            let owner = self.owner[idx as usize];
            if self.mask[owner as usize] == idx {
                self.mask[owner as usize] = INVALID;
            }
            if self.replica[owner as usize] == idx {
                self.replica[owner as usize] = INVALID;
            }
            self.detach(idx);
            self.dirty.mark_with(owner, dirty::EFFECTS, &EagerPolicy);
        }
        for attached in [self.mask[idx as usize], self.replica[idx as usize]] {
            if attached != INVALID {
                self.detach(attached);
            }
        }
        self.mask[idx as usize] = INVALID;
        self.replica[idx as usize] = INVALID;

        // Remove dirty tracking dependencies.
        self.dirty.remove_key(idx);

        // Bump generation so old handles immediately fail validation.
        self.generation[idx as usize] += 1;

        self.free_list.push(idx);
        self.pending_removed.push(idx);
        self.dirty.mark(idx, dirty::TOPOLOGY);
    }

    /// Returns whether the given handle refers to a live layer.
    #[must_use]
    pub fn is_alive(&self, id: LayerId) -> bool {
        (id.idx < self.len)
            && self.generation[id.idx as usize] == id.generation
            && !self.free_list.contains(&id.idx)
    }

    // -- Topology API --

    /// Adds `child` as the last child of `parent`.
    ///
    /// Marks inherited channels for `child`'s subtree so draw properties are
    /// recomputed under the new ancestry.
    ///
    /// # Panics
    ///
    /// Panics if either handle is stale, if `child` already has a parent, or
    /// if `child` is attached as a mask or replica.
    pub fn add_child(&mut self, parent: LayerId, child: LayerId) {
        self.validate(parent);
        self.validate(child);
        let p = parent.idx;
        let c = child.idx;
        assert!(
            self.parent[c as usize] == INVALID,
            "child already has a parent"
        );
        assert!(
            self.owner[c as usize] == INVALID,
            "child is attached as a mask or replica"
        );

        self.parent[c as usize] = p;
        self.prev_sibling[c as usize] = INVALID;
        self.next_sibling[c as usize] = INVALID;
        self.append_to_children(p, c);

        self.add_inherited_dependencies(c, p);
        self.mark_subtree_inherited_dirty(c);
        self.dirty.mark(p, dirty::TOPOLOGY);
    }

    /// Removes `child` from its current parent.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale or the layer has no parent.
    pub fn remove_from_parent(&mut self, child: LayerId) {
        self.validate(child);
        let c = child.idx;
        assert!(self.parent[c as usize] != INVALID, "layer has no parent");

        let p = self.parent[c as usize];
        self.unlink_from_parent(c);
        self.remove_inherited_dependencies(c, p);

        self.mark_subtree_inherited_dirty(c);
        self.dirty.mark(p, dirty::TOPOLOGY);
    }

    /// Moves `child` to be the last child of `new_parent`.
    ///
    /// If `child` already has a parent, it is removed first.
    ///
    /// # Panics
    ///
    /// Panics if either handle is stale, or if `child` is attached as a mask
    /// or replica.
    pub fn reparent(&mut self, child: LayerId, new_parent: LayerId) {
        self.validate(child);
        self.validate(new_parent);
        assert!(
            self.owner[child.idx as usize] == INVALID,
            "child is attached as a mask or replica"
        );

        if self.parent[child.idx as usize] != INVALID {
            let old_p = self.parent[child.idx as usize];
            self.unlink_from_parent(child.idx);
            self.remove_inherited_dependencies(child.idx, old_p);
            self.dirty.mark(old_p, dirty::TOPOLOGY);
        }

        let p = new_parent.idx;
        let c = child.idx;
        self.parent[c as usize] = p;
        self.prev_sibling[c as usize] = INVALID;
        self.next_sibling[c as usize] = INVALID;
        self.append_to_children(p, c);

        self.add_inherited_dependencies(c, p);
        self.mark_subtree_inherited_dirty(c);
        self.dirty.mark(p, dirty::TOPOLOGY);
    }

    /// Inserts `child` before `sibling` in the sibling list.
    ///
    /// `child` must not already have a parent. `sibling` must have a parent.
    ///
    /// # Panics
    ///
    /// Panics if handles are stale, `child` already has a parent, or `sibling`
    /// has no parent.
    pub fn insert_before(&mut self, child: LayerId, sibling: LayerId) {
        self.validate(child);
        self.validate(sibling);
        let c = child.idx;
        let s = sibling.idx;
        assert!(
            self.parent[c as usize] == INVALID && self.owner[c as usize] == INVALID,
            "child already has a parent"
        );
        let p = self.parent[s as usize];
        assert!(p != INVALID, "sibling has no parent");

        self.parent[c as usize] = p;
        self.next_sibling[c as usize] = s;
        self.prev_sibling[c as usize] = self.prev_sibling[s as usize];

        if self.prev_sibling[s as usize] != INVALID {
            self.next_sibling[self.prev_sibling[s as usize] as usize] = c;
        } else {
            // `sibling` was the first child.
            self.first_child[p as usize] = c;
        }
        self.prev_sibling[s as usize] = c;

        self.add_inherited_dependencies(c, p);
        self.mark_subtree_inherited_dirty(c);
        self.dirty.mark(p, dirty::TOPOLOGY);
    }

    /// Attaches `mask` to `owner`, replacing any previous mask.
    ///
    /// A mask gives its owner a render surface and is positioned in the
    /// owner's space. Passing `None` detaches the current mask.
    ///
    /// # Panics
    ///
    /// Panics if a handle is stale or `mask` already has a parent or owner.
    pub fn set_mask_layer(&mut self, owner: LayerId, mask: Option<LayerId>) {
        self.validate(owner);
        let o = owner.idx;
        let old = self.mask[o as usize];
        if old != INVALID {
            self.detach(old);
        }
        self.mask[o as usize] = match mask {
            Some(mask) => {
                self.validate(mask);
                self.attach(o, mask.idx);
                mask.idx
            }
            None => INVALID,
        };
        self.dirty.mark_with(o, dirty::EFFECTS, &EagerPolicy);
        self.dirty.mark(o, dirty::TOPOLOGY);
    }

    /// Attaches `replica` to `owner`, replacing any previous replica.
    ///
    /// The replica draws a second copy of the owner's surface, placed by the
    /// replica's own position and transform. A replica may carry its own mask
    /// via [`set_mask_layer`](Self::set_mask_layer).
    ///
    /// # Panics
    ///
    /// Panics if a handle is stale or `replica` already has a parent or owner.
    pub fn set_replica_layer(&mut self, owner: LayerId, replica: Option<LayerId>) {
        self.validate(owner);
        let o = owner.idx;
        let old = self.replica[o as usize];
        if old != INVALID {
            self.detach(old);
        }
        self.replica[o as usize] = match replica {
            Some(replica) => {
                self.validate(replica);
                self.attach(o, replica.idx);
                replica.idx
            }
            None => INVALID,
        };
        self.dirty.mark_with(o, dirty::EFFECTS, &EagerPolicy);
        self.dirty.mark(o, dirty::TOPOLOGY);
    }

    /// Returns the parent of a layer, if any.
    ///
    /// Mask and replica layers have no parent; see [`owner`](Self::owner).
    #[must_use]
    pub fn parent(&self, id: LayerId) -> Option<LayerId> {
        self.validate(id);
        self.handle_at(self.parent[id.idx as usize])
    }

    /// Returns the layer a mask or replica is attached to.
    #[must_use]
    pub fn owner(&self, id: LayerId) -> Option<LayerId> {
        self.validate(id);
        self.handle_at(self.owner[id.idx as usize])
    }

    /// Returns the mask attached to a layer.
    #[must_use]
    pub fn mask_layer(&self, id: LayerId) -> Option<LayerId> {
        self.validate(id);
        self.handle_at(self.mask[id.idx as usize])
    }

    /// Returns the replica attached to a layer.
    #[must_use]
    pub fn replica_layer(&self, id: LayerId) -> Option<LayerId> {
        self.validate(id);
        self.handle_at(self.replica[id.idx as usize])
    }

    /// Returns an iterator over the direct children of a layer.
    #[must_use]
    pub fn children(&self, id: LayerId) -> Children<'_> {
        self.validate(id);
        Children::new(self, self.first_child[id.idx as usize])
    }

    /// Returns the root layers: live layers with neither a parent nor an
    /// owner.
    #[must_use]
    pub fn roots(&self) -> Vec<LayerId> {
        self.root_indices()
            .into_iter()
            .map(|idx| LayerId {
                idx,
                generation: self.generation[idx as usize],
            })
            .collect()
    }

    // -- Property getters (read-only, no dirty marking) --

    /// Returns the local transform of a layer.
    #[must_use]
    pub fn local_transform(&self, id: LayerId) -> Transform3d {
        self.validate(id);
        self.local_transform[id.idx as usize]
    }

    /// Returns the position of a layer in its parent's space.
    #[must_use]
    pub fn position(&self, id: LayerId) -> Point {
        self.validate(id);
        self.position[id.idx as usize]
    }

    /// Returns the content bounds of a layer.
    #[must_use]
    pub fn bounds(&self, id: LayerId) -> PixelSize {
        self.validate(id);
        self.bounds[id.idx as usize]
    }

    /// Returns the local opacity of a layer.
    #[must_use]
    pub fn opacity(&self, id: LayerId) -> f32 {
        self.validate(id);
        self.opacity[id.idx as usize]
    }

    /// Returns the blend mode of a layer.
    #[must_use]
    pub fn blend_mode(&self, id: LayerId) -> BlendMode {
        self.validate(id);
        self.blend_mode[id.idx as usize]
    }

    /// Returns the filters of a layer.
    #[must_use]
    pub fn filters(&self, id: LayerId) -> &FilterChain {
        self.validate(id);
        &self.filters[id.idx as usize]
    }

    /// Returns the background filters of a layer.
    #[must_use]
    pub fn background_filters(&self, id: LayerId) -> &FilterChain {
        self.validate(id);
        &self.background_filters[id.idx as usize]
    }

    /// Returns the opaque part of a non-opaque layer's content.
    #[must_use]
    pub fn opaque_contents_rect(&self, id: LayerId) -> PixelRect {
        self.validate(id);
        self.opaque_contents_rect[id.idx as usize]
    }

    /// Returns the 3D rendering context of a layer (`0` for none).
    #[must_use]
    pub fn sorting_context_id(&self, id: LayerId) -> i32 {
        self.validate(id);
        self.sorting_context_id[id.idx as usize]
    }

    /// Returns the flags of a layer.
    #[must_use]
    pub fn flags(&self, id: LayerId) -> LayerFlags {
        self.validate(id);
        self.flags[id.idx as usize]
    }

    /// Returns whether the layer is effectively hidden.
    ///
    /// Only valid after
    /// [`update_draw_properties`](Self::update_draw_properties) has been
    /// called.
    #[must_use]
    pub fn effective_hidden(&self, id: LayerId) -> bool {
        self.validate(id);
        self.effective_hidden[id.idx as usize]
    }

    /// Viewport of the most recent draw-properties pass, if one has run.
    #[must_use]
    pub fn viewport(&self) -> Option<PixelRect> {
        self.viewport
    }

    /// Returns a read-only view of a layer with its computed draw properties.
    ///
    /// The view implements
    /// [`OcclusionElement`](crate::occlusion::OcclusionElement).
    #[must_use]
    pub fn layer(&self, id: LayerId) -> LayerRef<'_> {
        self.validate(id);
        LayerRef::new(self, id.idx)
    }

    // -- Mutation API (auto-marks dirty) --

    /// Sets the local transform of a layer.
    ///
    /// Marks the GEOMETRY channel dirty with eager propagation to descendants.
    pub fn set_transform(&mut self, id: LayerId, transform: Transform3d) {
        self.validate(id);
        self.local_transform[id.idx as usize] = transform;
        self.dirty.mark_with(id.idx, dirty::GEOMETRY, &EagerPolicy);
    }

    /// Sets the position of a layer in its parent's space.
    pub fn set_position(&mut self, id: LayerId, position: Point) {
        self.validate(id);
        self.position[id.idx as usize] = position;
        self.dirty.mark_with(id.idx, dirty::GEOMETRY, &EagerPolicy);
    }

    /// Sets the content bounds of a layer.
    pub fn set_bounds(&mut self, id: LayerId, bounds: PixelSize) {
        self.validate(id);
        self.bounds[id.idx as usize] = bounds;
        self.dirty.mark_with(id.idx, dirty::GEOMETRY, &EagerPolicy);
    }

    /// Sets the local opacity of a layer.
    ///
    /// Marks the EFFECTS channel dirty with eager propagation to descendants.
    pub fn set_opacity(&mut self, id: LayerId, opacity: f32) {
        self.validate(id);
        self.opacity[id.idx as usize] = opacity;
        self.dirty.mark_with(id.idx, dirty::EFFECTS, &EagerPolicy);
    }

    /// Sets the blend mode of a layer.
    pub fn set_blend_mode(&mut self, id: LayerId, mode: BlendMode) {
        self.validate(id);
        self.blend_mode[id.idx as usize] = mode;
        self.dirty.mark_with(id.idx, dirty::EFFECTS, &EagerPolicy);
    }

    /// Sets the filters of a layer.
    pub fn set_filters(&mut self, id: LayerId, filters: FilterChain) {
        self.validate(id);
        self.filters[id.idx as usize] = filters;
        self.dirty.mark_with(id.idx, dirty::EFFECTS, &EagerPolicy);
    }

    /// Sets the background filters of a layer.
    pub fn set_background_filters(&mut self, id: LayerId, filters: FilterChain) {
        self.validate(id);
        self.background_filters[id.idx as usize] = filters;
        self.dirty.mark_with(id.idx, dirty::EFFECTS, &EagerPolicy);
    }

    /// Sets the opaque part of a non-opaque layer's content.
    ///
    /// Marks only the CONTENT channel.
    pub fn set_opaque_contents_rect(&mut self, id: LayerId, rect: PixelRect) {
        self.validate(id);
        self.opaque_contents_rect[id.idx as usize] = rect;
        self.dirty.mark(id.idx, dirty::CONTENT);
    }

    /// Sets the 3D rendering context of a layer.
    pub fn set_sorting_context_id(&mut self, id: LayerId, context: i32) {
        self.validate(id);
        self.sorting_context_id[id.idx as usize] = context;
        self.dirty.mark_with(id.idx, dirty::EFFECTS, &EagerPolicy);
    }

    /// Sets the flags of a layer.
    pub fn set_flags(&mut self, id: LayerId, flags: LayerFlags) {
        self.validate(id);
        self.flags[id.idx as usize] = flags;
        // Flags feed clipping, surfaces, hiding, and content alike.
        self.dirty.mark_with(id.idx, dirty::GEOMETRY, &EagerPolicy);
        self.dirty.mark_with(id.idx, dirty::EFFECTS, &EagerPolicy);
        self.dirty.mark(id.idx, dirty::CONTENT);
    }

    // -- Raw-index accessors --
    //
    // These accept raw slot indices (as found in `DrawPropertiesUpdate` and
    // traversal events) rather than `LayerId` handles, skipping generation
    // validation.

    /// Returns a view of the layer at raw slot `idx`.
    ///
    /// # Panics
    ///
    /// Panics if `idx >= self.len`.
    #[must_use]
    pub fn layer_at(&self, idx: u32) -> LayerRef<'_> {
        assert!(
            idx < self.len,
            "slot index {idx} out of range (len {})",
            self.len
        );
        LayerRef::new(self, idx)
    }

    /// Returns the handle for raw slot `idx`.
    ///
    /// # Panics
    ///
    /// Panics if `idx >= self.len`.
    #[must_use]
    pub fn id_at(&self, idx: u32) -> LayerId {
        assert!(
            idx < self.len,
            "slot index {idx} out of range (len {})",
            self.len
        );
        LayerId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    // -- Internal helpers --

    /// Panics if the handle is stale.
    pub(super) fn validate(&self, id: LayerId) {
        assert!(
            id.idx < self.len && self.generation[id.idx as usize] == id.generation,
            "stale LayerId: {id:?} (current gen: {})",
            if id.idx < self.len {
                self.generation[id.idx as usize]
            } else {
                u32::MAX
            }
        );
    }

    fn handle_at(&self, idx: u32) -> Option<LayerId> {
        (idx != INVALID).then(|| LayerId {
            idx,
            generation: self.generation[idx as usize],
        })
    }

    /// Slot indices of live layers with neither parent nor owner.
    pub(crate) fn root_indices(&self) -> Vec<u32> {
        (0..self.len)
            .filter(|&idx| {
                self.parent[idx as usize] == INVALID
                    && self.owner[idx as usize] == INVALID
                    && !self.free_list.contains(&idx)
            })
            .collect()
    }

    fn reset_computed(&mut self, idx: u32) {
        let i = idx as usize;
        self.screen_space_transform[i] = Transform3d::IDENTITY;
        self.draw_transform[i] = Transform3d::IDENTITY;
        self.draw_opacity[i] = 1.0;
        self.draw_opacity_is_animating[i] = false;
        self.draw_transform_is_animating[i] = false;
        self.screen_space_transform_is_animating[i] = false;
        self.is_clipped[i] = false;
        self.clip_rect[i] = PixelRect::ZERO;
        self.visible_content_rect[i] = PixelRect::ZERO;
        self.effective_hidden[i] = false;
        self.render_target[i] = INVALID;
        self.surface_target[i] = INVALID;
        self.render_surface[i] = None;
        self.immune_ancestor[i] = INVALID;
    }

    fn append_to_children(&mut self, p: u32, c: u32) {
        if self.first_child[p as usize] == INVALID {
            self.first_child[p as usize] = c;
        } else {
            // Walk to last child.
            let mut last = self.first_child[p as usize];
            while self.next_sibling[last as usize] != INVALID {
                last = self.next_sibling[last as usize];
            }
            self.next_sibling[last as usize] = c;
            self.prev_sibling[c as usize] = last;
        }
    }

    /// Removes `idx` from its parent's child list without touching dirty state.
    fn unlink_from_parent(&mut self, idx: u32) {
        let p = self.parent[idx as usize];
        let prev = self.prev_sibling[idx as usize];
        let next = self.next_sibling[idx as usize];

        if prev != INVALID {
            self.next_sibling[prev as usize] = next;
        } else {
            // Was first child.
            self.first_child[p as usize] = next;
        }

        if next != INVALID {
            self.prev_sibling[next as usize] = prev;
        }

        self.parent[idx as usize] = INVALID;
        self.prev_sibling[idx as usize] = INVALID;
        self.next_sibling[idx as usize] = INVALID;
    }

    fn attach(&mut self, owner: u32, layer: u32) {
        assert!(layer != owner, "layer cannot be attached to itself");
        assert!(
            self.parent[layer as usize] == INVALID && self.owner[layer as usize] == INVALID,
            "attached layer already has a parent or owner"
        );
        self.owner[layer as usize] = owner;
        self.add_inherited_dependencies(layer, owner);
        self.mark_subtree_inherited_dirty(layer);
    }

    fn detach(&mut self, layer: u32) {
        let owner = self.owner[layer as usize];
        self.owner[layer as usize] = INVALID;
        self.remove_inherited_dependencies(layer, owner);
        self.mark_subtree_inherited_dirty(layer);
    }

    /// `child` depends on `parent` for GEOMETRY and EFFECTS.
    fn add_inherited_dependencies(&mut self, child: u32, parent: u32) {
        let _ = self.dirty.add_dependency(child, parent, dirty::GEOMETRY);
        let _ = self.dirty.add_dependency(child, parent, dirty::EFFECTS);
    }

    fn remove_inherited_dependencies(&mut self, child: u32, parent: u32) {
        self.dirty.remove_dependency(child, parent, dirty::GEOMETRY);
        self.dirty.remove_dependency(child, parent, dirty::EFFECTS);
    }

    /// Marks the subtree rooted at `idx` dirty for inherited channels.
    fn mark_subtree_inherited_dirty(&mut self, idx: u32) {
        self.dirty.mark_with(idx, dirty::GEOMETRY, &EagerPolicy);
        self.dirty.mark_with(idx, dirty::EFFECTS, &EagerPolicy);
    }
}
