// Copyright 2026 the Umbra Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Draw-properties pass and change tracking.
//!
//! [`LayerStore::update_draw_properties`] first drains every dirty channel:
//!
//! 1. **GEOMETRY** / **EFFECTS**: drained with propagation, so the reported
//!    indices include every descendant of a changed layer.
//! 2. **CONTENT**: drained locally.
//! 3. **TOPOLOGY**: drained to detect structural change.
//!
//! If nothing was dirty and the viewport is unchanged the previous results
//! stand. Otherwise every root is walked once, top-down, computing for each
//! layer:
//!
//! - the screen-space transform, `parent · T(position) · transform`;
//! - whether the layer owns a render surface, and if so the surface's draw
//!   and screen-space transforms (with the layer's scale pushed into the
//!   surface so content rasterizes at full resolution);
//! - the draw transform, draw opacity and animation state relative to the
//!   render target;
//! - the clip rect and the visible content rect;
//! - the nearest occlusion-immune ancestor surface.
//!
//! Surface content rects are unioned bottom-up on the way out, and each
//! surface's layer list is recorded in paint order. The front-to-back
//! traversal for each root is those lists read backwards.
//!
//! [`DrawPropertiesUpdate`] carries raw slot indices that can be fed to
//! [`layer_at`](LayerStore::layer_at).

use alloc::vec;
use alloc::vec::Vec;

use crate::geometry::PixelRect;
use crate::occlusion::{RenderSurface, TraversalEvent};
use crate::transform::Transform3d;

use super::id::INVALID;
use super::store::LayerStore;
use crate::dirty;

/// The outcome of a single [`LayerStore::update_draw_properties`] call.
#[derive(Clone, Debug, Default)]
pub struct DrawPropertiesUpdate {
    /// Layers whose geometry (or an ancestor's) changed.
    pub geometry: Vec<u32>,
    /// Layers whose effects (or an ancestor's) changed.
    pub effects: Vec<u32>,
    /// Layers whose own content changed.
    pub content: Vec<u32>,
    /// Layers added since the last pass.
    pub added: Vec<u32>,
    /// Layers removed since the last pass.
    pub removed: Vec<u32>,
    /// Whether the tree topology changed.
    pub topology_changed: bool,
    /// Whether the viewport differs from the previous pass.
    pub viewport_changed: bool,
    /// Whether draw properties were recomputed.
    pub recomputed: bool,
}

impl DrawPropertiesUpdate {
    /// Clears all change lists.
    pub fn clear(&mut self) {
        self.geometry.clear();
        self.effects.clear();
        self.content.clear();
        self.added.clear();
        self.removed.clear();
        self.topology_changed = false;
        self.viewport_changed = false;
        self.recomputed = false;
    }

    fn is_empty(&self) -> bool {
        self.geometry.is_empty()
            && self.effects.is_empty()
            && self.content.is_empty()
            && self.added.is_empty()
            && self.removed.is_empty()
            && !self.topology_changed
            && !self.viewport_changed
    }
}

/// State inherited from the nearest ancestors while walking down.
#[derive(Clone, Copy, Debug)]
struct Inherited {
    parent_ss: Transform3d,
    parent_ss_animating: bool,
    /// Owner of the current render target.
    target: u32,
    /// Inverse of the target surface's screen-space transform.
    target_ss_inverse: Option<Transform3d>,
    /// Opacity accumulated since the target.
    opacity: f32,
    opacity_animating: bool,
    /// Whether a transform between the target and here is animating.
    transform_animating: bool,
    /// Clip in target space.
    clip: Option<PixelRect>,
    /// Part of the target that can reach the screen, in target space.
    target_visible: PixelRect,
    hidden: bool,
    immune: u32,
}

#[derive(Clone, Copy, Debug)]
enum Entry {
    Layer(u32),
    Surface(u32),
}

/// Per-pass scratch storage, indexed by slot.
#[derive(Debug)]
struct Scratch {
    drawing_descendants: Vec<u32>,
    copy_request_in_subtree: Vec<bool>,
    /// Paint-order layer list of each surface, keyed by owner.
    lists: Vec<Vec<Entry>>,
}

impl Scratch {
    fn new(len: usize) -> Self {
        Self {
            drawing_descendants: vec![0; len],
            copy_request_in_subtree: vec![false; len],
            lists: vec![Vec::new(); len],
        }
    }
}

impl LayerStore {
    /// Recomputes draw properties for the given screen viewport and returns
    /// what changed.
    ///
    /// Every root gets a render surface covering `viewport`. The pass is
    /// skipped when no dirty channel has entries and `viewport` equals the
    /// previous one.
    pub fn update_draw_properties(&mut self, viewport: PixelRect) -> DrawPropertiesUpdate {
        let mut update = DrawPropertiesUpdate::default();
        self.update_draw_properties_into(viewport, &mut update);
        update
    }

    /// Like [`update_draw_properties`](Self::update_draw_properties), but
    /// reuses a caller-provided buffer to avoid allocation.
    pub fn update_draw_properties_into(
        &mut self,
        viewport: PixelRect,
        update: &mut DrawPropertiesUpdate,
    ) {
        update.clear();

        update.geometry = self
            .dirty
            .drain(dirty::GEOMETRY)
            .affected()
            .deterministic()
            .run()
            .collect();
        update.effects = self
            .dirty
            .drain(dirty::EFFECTS)
            .affected()
            .deterministic()
            .run()
            .collect();
        update.content = self
            .dirty
            .drain(dirty::CONTENT)
            .deterministic()
            .run()
            .collect();
        let topology: Vec<u32> = self
            .dirty
            .drain(dirty::TOPOLOGY)
            .deterministic()
            .run()
            .collect();
        update.topology_changed = !topology.is_empty();
        update.viewport_changed = self.viewport != Some(viewport);

        // Move lifecycle lists.
        core::mem::swap(&mut self.pending_added, &mut update.added);
        core::mem::swap(&mut self.pending_removed, &mut update.removed);

        if update.is_empty() {
            return;
        }
        self.viewport = Some(viewport);
        self.recompute(viewport);
        update.recomputed = true;
    }

    fn recompute(&mut self, viewport: PixelRect) {
        let mut scratch = Scratch::new(self.len as usize);
        self.front_to_back.clear();
        for root in self.root_indices() {
            self.count_subtree(root, &mut scratch);
            self.visit_root(root, viewport, &mut scratch);
            let mut events = Vec::new();
            emit_front_to_back(&scratch.lists, root, &mut events);
            events.push(TraversalEvent::TargetSurface(root));
            self.front_to_back.push((root, events));
        }
    }

    /// Fills `drawing_descendants` and `copy_request_in_subtree` bottom-up.
    fn count_subtree(&self, idx: u32, scratch: &mut Scratch) -> (u32, bool) {
        let mut drawing = 0_u32;
        let mut copy = self.flags[idx as usize].has_copy_request;
        let mut child = self.first_child[idx as usize];
        while child != INVALID {
            let (d, c) = self.count_subtree(child, scratch);
            drawing += d + u32::from(self.flags[child as usize].draws_content);
            copy |= c;
            child = self.next_sibling[child as usize];
        }
        scratch.drawing_descendants[idx as usize] = drawing;
        scratch.copy_request_in_subtree[idx as usize] = copy;
        (drawing, copy)
    }

    fn needs_render_surface(&self, idx: u32, scratch: &Scratch) -> bool {
        let i = idx as usize;
        let flags = self.flags[i];
        if flags.force_render_surface
            || flags.has_copy_request
            || self.mask[i] != INVALID
            || self.replica[i] != INVALID
            || !self.filters[i].is_empty()
            || !self.background_filters[i].is_empty()
            || self.blend_mode[i].is_blended()
        {
            return true;
        }
        // Group opacity only matters when more than one thing draws.
        let descendants = scratch.drawing_descendants[i];
        (self.opacity[i] < 1.0 || flags.opacity_is_animating)
            && descendants > 0
            && (flags.draws_content || descendants > 1)
    }

    fn is_occlusion_immune_owner(&self, idx: u32) -> bool {
        let i = idx as usize;
        self.flags[i].has_copy_request
            || self.replica[i] != INVALID
            || self.filters[i].moves_pixels()
    }

    fn local_to_parent(&self, idx: u32) -> Transform3d {
        let p = self.position[idx as usize];
        Transform3d::from_translation(p.x, p.y, 0.0) * self.local_transform[idx as usize]
    }

    fn is_drawn(&self, idx: u32) -> bool {
        let i = idx as usize;
        self.flags[i].draws_content
            && !self.effective_hidden[i]
            && !self.visible_content_rect[i].is_empty()
    }

    fn visit_root(&mut self, root: u32, viewport: PixelRect, scratch: &mut Scratch) {
        let i = root as usize;
        let flags = self.flags[i];
        let hidden = !flags.has_copy_request && flags.hide_layer_and_subtree;
        let ss = self.local_to_parent(root);
        let bounds = PixelRect::from_size(self.bounds[i]);
        let immune = if self.is_occlusion_immune_owner(root) {
            root
        } else {
            INVALID
        };

        // The root surface is the screen: its space is screen space.
        let replica = self.replica[i];
        let replica_draw = match ss.inverse() {
            Some(inverse) if replica != INVALID => ss * self.local_to_parent(replica) * inverse,
            _ => Transform3d::IDENTITY,
        };
        self.render_surface[i] = Some(RenderSurface {
            replica_draw_transform: replica_draw,
            content_rect: viewport,
            draw_opacity: self.opacity[i],
            draw_opacity_is_animating: flags.opacity_is_animating,
            ..RenderSurface::default()
        });
        self.effective_hidden[i] = hidden;
        self.render_target[i] = root;
        self.surface_target[i] = INVALID;
        self.immune_ancestor[i] = immune;
        self.screen_space_transform[i] = ss;
        self.screen_space_transform_is_animating[i] = flags.transform_is_animating;
        self.draw_transform[i] = ss;
        self.draw_transform_is_animating[i] = flags.transform_is_animating;
        self.draw_opacity[i] = 1.0;
        self.draw_opacity_is_animating[i] = false;
        self.is_clipped[i] = true;
        self.clip_rect[i] = viewport;
        self.visible_content_rect[i] = visible_content_rect(ss, Some(viewport), viewport, bounds);
        if hidden && !scratch.copy_request_in_subtree[i] {
            self.hide_subtree(root, root);
            return;
        }
        if self.is_drawn(root) {
            scratch.lists[i].push(Entry::Layer(root));
        }

        let clip = if flags.masks_to_bounds {
            viewport.intersect(ss.map_enclosing_clipped_rect(bounds))
        } else {
            viewport
        };
        let inherited = Inherited {
            parent_ss: ss,
            parent_ss_animating: flags.transform_is_animating,
            target: root,
            target_ss_inverse: Some(Transform3d::IDENTITY),
            opacity: 1.0,
            opacity_animating: false,
            transform_animating: flags.transform_is_animating,
            clip: Some(clip),
            target_visible: viewport,
            hidden,
            immune,
        };
        self.visit_children(root, &inherited, scratch);
        self.place_attachments(root, &inherited, ss, replica_draw);
    }

    /// Visits the children of `idx`, returning the union of their drawable
    /// rects in target space.
    fn visit_children(&mut self, idx: u32, inherited: &Inherited, scratch: &mut Scratch) -> PixelRect {
        let mut content = PixelRect::ZERO;
        let mut child = self.first_child[idx as usize];
        while child != INVALID {
            content = content.union(self.visit(child, inherited, scratch));
            child = self.next_sibling[child as usize];
        }
        content
    }

    /// Visits a non-root layer, returning its subtree's drawable rect in the
    /// space of `inherited.target`.
    fn visit(&mut self, idx: u32, inherited: &Inherited, scratch: &mut Scratch) -> PixelRect {
        let i = idx as usize;
        let flags = self.flags[i];
        let hidden =
            !flags.has_copy_request && (inherited.hidden || flags.hide_layer_and_subtree);
        self.effective_hidden[i] = hidden;
        if hidden && !scratch.copy_request_in_subtree[i] {
            self.hide_subtree(idx, inherited.target);
            return PixelRect::ZERO;
        }

        let ss = inherited.parent_ss * self.local_to_parent(idx);
        let ss_animating = inherited.parent_ss_animating || flags.transform_is_animating;
        self.screen_space_transform[i] = ss;
        self.screen_space_transform_is_animating[i] = ss_animating;

        if self.needs_render_surface(idx, scratch) {
            self.visit_surface_owner(idx, inherited, ss, ss_animating, scratch)
        } else {
            self.visit_plain(idx, inherited, ss, scratch)
        }
    }

    fn visit_plain(
        &mut self,
        idx: u32,
        inherited: &Inherited,
        ss: Transform3d,
        scratch: &mut Scratch,
    ) -> PixelRect {
        let i = idx as usize;
        let flags = self.flags[i];
        let bounds = PixelRect::from_size(self.bounds[i]);
        let draw = inherited
            .target_ss_inverse
            .map_or(ss, |inverse| inverse * ss);
        let opacity = inherited.opacity * self.opacity[i];
        let opacity_animating = inherited.opacity_animating || flags.opacity_is_animating;
        let transform_animating = inherited.transform_animating || flags.transform_is_animating;

        self.draw_transform[i] = draw;
        self.draw_opacity[i] = opacity;
        self.draw_opacity_is_animating[i] = opacity_animating;
        self.draw_transform_is_animating[i] = transform_animating;
        self.is_clipped[i] = inherited.clip.is_some();
        self.clip_rect[i] = inherited.clip.unwrap_or(PixelRect::ZERO);
        self.render_target[i] = inherited.target;
        self.surface_target[i] = INVALID;
        self.render_surface[i] = None;
        self.immune_ancestor[i] = inherited.immune;
        self.visible_content_rect[i] =
            visible_content_rect(draw, inherited.clip, inherited.target_visible, bounds);

        let mapped = draw.map_enclosing_clipped_rect(bounds);
        let mut content = PixelRect::ZERO;
        if self.is_drawn(idx) {
            scratch.lists[inherited.target as usize].push(Entry::Layer(idx));
            content = clip_to(mapped, inherited.clip);
        }

        let clip = if flags.masks_to_bounds {
            Some(clip_to(mapped, inherited.clip))
        } else {
            inherited.clip
        };
        let below = Inherited {
            parent_ss: ss,
            parent_ss_animating: self.screen_space_transform_is_animating[i],
            opacity,
            opacity_animating,
            transform_animating,
            clip,
            hidden: self.effective_hidden[i],
            ..*inherited
        };
        content.union(self.visit_children(idx, &below, scratch))
    }

    fn visit_surface_owner(
        &mut self,
        idx: u32,
        inherited: &Inherited,
        ss: Transform3d,
        ss_animating: bool,
        scratch: &mut Scratch,
    ) -> PixelRect {
        let i = idx as usize;
        let flags = self.flags[i];
        let bounds = PixelRect::from_size(self.bounds[i]);

        // Content is rasterized at the layer's scale; the surface carries the
        // remainder of the transform.
        let (sx, sy) = sublayer_scale(ss);
        let scale = Transform3d::from_scale(sx, sy, 1.0);
        let unscale = Transform3d::from_scale(1.0 / sx, 1.0 / sy, 1.0);
        let surface_ss = ss * unscale;
        let surface_draw = inherited
            .target_ss_inverse
            .map_or(surface_ss, |inverse| inverse * surface_ss);
        let replica = self.replica[i];
        let replica_draw = if replica == INVALID {
            surface_draw
        } else {
            surface_draw * scale * self.local_to_parent(replica) * unscale
        };
        let immune = if self.is_occlusion_immune_owner(idx) {
            idx
        } else {
            inherited.immune
        };

        // The owner draws into its own surface at full opacity.
        let owner_bounds = scale.map_enclosing_clipped_rect(bounds);
        let owner_clip = flags.masks_to_bounds.then_some(owner_bounds);
        let parent_visible = clip_to(inherited.target_visible, inherited.clip);
        let surface_visible = surface_draw
            .inverse()
            .map_or(PixelRect::ZERO, |inverse| {
                inverse.project_enclosing_clipped_rect(parent_visible)
            });
        self.draw_transform[i] = scale;
        self.draw_opacity[i] = 1.0;
        self.draw_opacity_is_animating[i] = false;
        self.draw_transform_is_animating[i] = false;
        self.is_clipped[i] = owner_clip.is_some();
        self.clip_rect[i] = owner_clip.unwrap_or(PixelRect::ZERO);
        self.render_target[i] = idx;
        self.surface_target[i] = inherited.target;
        self.immune_ancestor[i] = immune;
        self.visible_content_rect[i] =
            visible_content_rect(scale, owner_clip, surface_visible, bounds);

        let mut content = PixelRect::ZERO;
        if self.is_drawn(idx) {
            scratch.lists[i].push(Entry::Layer(idx));
            content = owner_bounds;
        }

        let below = Inherited {
            parent_ss: ss,
            parent_ss_animating: ss_animating,
            target: idx,
            target_ss_inverse: surface_ss.inverse(),
            opacity: 1.0,
            opacity_animating: false,
            transform_animating: false,
            clip: owner_clip,
            target_visible: surface_visible,
            hidden: self.effective_hidden[i],
            immune,
        };
        content = content.union(self.visit_children(idx, &below, scratch));
        self.place_attachments(idx, &below, ss, replica_draw);

        if let Some(clip) = inherited.clip {
            if replica == INVALID {
                let clip_in_surface = surface_draw
                    .inverse()
                    .map_or(content, |inverse| inverse.project_enclosing_clipped_rect(clip));
                content = content.intersect(clip_in_surface);
            }
        }

        self.render_surface[i] = Some(RenderSurface {
            draw_transform: surface_draw,
            screen_space_transform: surface_ss,
            replica_draw_transform: replica_draw,
            content_rect: content,
            is_clipped: inherited.clip.is_some(),
            clip_rect: inherited.clip.unwrap_or(PixelRect::ZERO),
            draw_opacity: inherited.opacity * self.opacity[i],
            draw_opacity_is_animating: inherited.opacity_animating || flags.opacity_is_animating,
            target_surface_transforms_are_animating: inherited.transform_animating
                || flags.transform_is_animating,
            screen_space_transforms_are_animating: ss_animating,
        });

        if scratch.lists[i].is_empty() && !flags.has_copy_request {
            return PixelRect::ZERO;
        }
        scratch.lists[inherited.target as usize].push(Entry::Surface(idx));

        let mut contribution = surface_draw.map_enclosing_clipped_rect(content);
        if replica != INVALID {
            contribution = contribution.union(replica_draw.map_enclosing_clipped_rect(content));
        }
        clip_to(contribution, inherited.clip)
    }

    /// Gives mask and replica layers of `owner` draw properties of their own.
    ///
    /// Neither is ever traversed; masks live in the owner's surface, replicas
    /// in the owner's target.
    fn place_attachments(
        &mut self,
        owner: u32,
        below: &Inherited,
        owner_ss: Transform3d,
        replica_draw: Transform3d,
    ) {
        let o = owner as usize;
        let owner_draw = self.draw_transform[o];
        let hidden = self.effective_hidden[o];
        let mask = self.mask[o];
        if mask != INVALID {
            let local = self.local_to_parent(mask);
            self.place_attached(mask, owner, owner_draw * local, owner_ss * local, hidden);
        }
        let replica = self.replica[o];
        if replica != INVALID {
            let local = self.local_to_parent(replica);
            let target = self.surface_target[o];
            let target = if target == INVALID { below.target } else { target };
            self.place_attached(replica, target, replica_draw, owner_ss * local, hidden);
            let replica_mask = self.mask[replica as usize];
            if replica_mask != INVALID {
                let mask_local = self.local_to_parent(replica_mask);
                self.place_attached(
                    replica_mask,
                    target,
                    replica_draw * mask_local,
                    owner_ss * local * mask_local,
                    hidden,
                );
            }
        }
    }

    fn place_attached(
        &mut self,
        idx: u32,
        target: u32,
        draw: Transform3d,
        ss: Transform3d,
        hidden: bool,
    ) {
        let i = idx as usize;
        self.draw_transform[i] = draw;
        self.screen_space_transform[i] = ss;
        self.draw_opacity[i] = 1.0;
        self.draw_opacity_is_animating[i] = false;
        self.draw_transform_is_animating[i] = false;
        self.screen_space_transform_is_animating[i] = false;
        self.is_clipped[i] = false;
        self.clip_rect[i] = PixelRect::ZERO;
        self.visible_content_rect[i] = PixelRect::from_size(self.bounds[i]);
        self.effective_hidden[i] = hidden;
        self.render_target[i] = target;
        self.surface_target[i] = INVALID;
        self.render_surface[i] = None;
        self.immune_ancestor[i] = INVALID;
    }

    /// Marks a skipped subtree as hidden and not visible.
    fn hide_subtree(&mut self, idx: u32, target: u32) {
        let i = idx as usize;
        self.effective_hidden[i] = true;
        self.visible_content_rect[i] = PixelRect::ZERO;
        self.render_target[i] = target;
        self.surface_target[i] = INVALID;
        self.render_surface[i] = None;
        let mut child = self.first_child[i];
        while child != INVALID {
            self.hide_subtree(child, target);
            child = self.next_sibling[child as usize];
        }
    }
}

/// Appends the front-to-back events for the surface owned by `owner`,
/// excluding the surface's own `TargetSurface` event.
fn emit_front_to_back(lists: &[Vec<Entry>], owner: u32, out: &mut Vec<TraversalEvent<u32>>) {
    for entry in lists[owner as usize].iter().rev() {
        match *entry {
            Entry::Layer(layer) => out.push(TraversalEvent::Itself {
                layer,
                target: owner,
            }),
            Entry::Surface(surface) => {
                emit_front_to_back(lists, surface, out);
                out.push(TraversalEvent::TargetSurface(surface));
                out.push(TraversalEvent::ContributingSurface {
                    surface,
                    target: owner,
                });
            }
        }
    }
}

/// Scale factors pushed into a render surface, never zero or non-finite.
fn sublayer_scale(ss: Transform3d) -> (f64, f64) {
    let sanitize = |v: f64| if v.is_finite() && v != 0.0 { v } else { 1.0 };
    let (sx, sy) = ss.scale_components();
    (sanitize(sx), sanitize(sy))
}

fn clip_to(rect: PixelRect, clip: Option<PixelRect>) -> PixelRect {
    match clip {
        Some(clip) => rect.intersect(clip),
        None => rect,
    }
}

/// Part of `bounds` that lands inside the visible part of the target.
fn visible_content_rect(
    draw: Transform3d,
    clip: Option<PixelRect>,
    target_visible: PixelRect,
    bounds: PixelRect,
) -> PixelRect {
    if bounds.is_empty() {
        return PixelRect::ZERO;
    }
    let visible_in_target = clip_to(target_visible, clip);
    match draw.inverse() {
        Some(inverse) => inverse
            .project_enclosing_clipped_rect(visible_in_target)
            .intersect(bounds),
        None => PixelRect::ZERO,
    }
}
