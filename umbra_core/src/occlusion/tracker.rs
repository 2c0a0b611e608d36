// Copyright 2026 the Umbra Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The occlusion tracker state machine.

use alloc::vec::Vec;

use crate::effect::FilterOutsets;
use crate::geometry::PixelRect;
use crate::region::Region;
use crate::trace::{
    DiscardReason, FilterErosionEvent, OccluderAddedEvent, OccluderSkippedEvent, SkipReason,
    SurfaceDiscardedEvent, TargetEnteredEvent, TargetLeftEvent, Tracer,
};
use crate::transform::Transform3d;

use super::element::{OcclusionElement, RenderSurface};
use super::{TrackerConfig, TraversalEvent};

/// Occlusion accumulated for one render target.
#[derive(Clone, Debug)]
struct TargetState<E> {
    target: E,
    /// Coverage drawn into this target so far, in target space.
    inside: Region,
    /// Coverage from enclosing targets, projected into target space on entry.
    outside: Region,
}

impl<E> TargetState<E> {
    fn new(target: E) -> Self {
        Self {
            target,
            inside: Region::new(),
            outside: Region::new(),
        }
    }
}

/// Tracks which pixels are already covered while a scene is walked front to
/// back.
///
/// Feed every [`TraversalEvent`] to [`enter_layer`](Self::enter_layer) and
/// then [`leave_layer`](Self::leave_layer), in traversal order. Between the
/// two calls the query methods answer questions about the current element.
///
/// # Contract
///
/// Calls must pair up exactly as the traversal emits them. Violations trip
/// `debug_assert!`s in debug builds; in release builds they are not detected
/// and produce meaningless (but memory-safe) results.
#[derive(Debug)]
pub struct OcclusionTracker<'t, E: OcclusionElement> {
    viewport: PixelRect,
    config: TrackerConfig,
    stack: Vec<TargetState<E>>,
    entered: Option<TraversalEvent<E>>,
    tracer: Tracer<'t>,
}

impl<E: OcclusionElement> OcclusionTracker<'static, E> {
    /// Creates a tracker for a screen `viewport`.
    #[must_use]
    pub fn new(viewport: PixelRect, config: TrackerConfig) -> Self {
        Self::with_tracer(viewport, config, Tracer::none())
    }
}

impl<'t, E: OcclusionElement> OcclusionTracker<'t, E> {
    /// Creates a tracker that reports what it does to `tracer`.
    #[must_use]
    pub fn with_tracer(viewport: PixelRect, config: TrackerConfig, tracer: Tracer<'t>) -> Self {
        Self {
            viewport,
            config,
            stack: Vec::new(),
            entered: None,
            tracer,
        }
    }

    /// The screen viewport.
    #[must_use]
    pub fn viewport(&self) -> PixelRect {
        self.viewport
    }

    /// The tracker parameters.
    #[must_use]
    pub fn config(&self) -> TrackerConfig {
        self.config
    }

    /// Number of render targets currently being tracked.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Consumes the tracker and hands back its tracer, so one sink can
    /// follow several walks.
    #[must_use]
    pub fn into_tracer(self) -> Tracer<'t> {
        self.tracer
    }

    // -- Protocol --

    /// Called before the element of `event` is drawn.
    pub fn enter_layer(&mut self, event: TraversalEvent<E>) {
        debug_assert!(
            self.entered.is_none(),
            "enter_layer({event:?}) while {:?} is still entered",
            self.entered
        );
        self.entered = Some(event);
        match event {
            TraversalEvent::Itself { target, .. } => self.enter_render_target(target),
            TraversalEvent::TargetSurface(owner) => self.finished_render_target(owner),
            TraversalEvent::ContributingSurface { .. } => {}
        }
    }

    /// Called after the element of `event` is drawn.
    pub fn leave_layer(&mut self, event: TraversalEvent<E>) {
        debug_assert!(
            self.entered == Some(event),
            "leave_layer({event:?}) does not match entered {:?}",
            self.entered
        );
        self.entered = None;
        match event {
            TraversalEvent::Itself { layer, .. } => self.mark_occluded_behind_layer(layer),
            TraversalEvent::TargetSurface(_) => {}
            TraversalEvent::ContributingSurface { surface, target } => {
                self.leave_to_render_target(surface, target);
            }
        }
    }

    // -- Queries --

    /// Returns `true` if `content_rect`, in `layer`'s content space, is
    /// entirely covered by occlusion in the current target.
    ///
    /// `content_rect` must lie within the layer's visible content rect.
    #[must_use]
    pub fn occluded_layer(&self, layer: E, content_rect: PixelRect) -> bool {
        let Some(top) = self.stack.last() else {
            return false;
        };
        if content_rect.is_empty() {
            return true;
        }
        debug_assert!(
            layer.visible_content_rect().contains(content_rect),
            "query rect {content_rect:?} is outside the visible content rect of {layer:?}"
        );
        if top.inside.is_empty() && top.outside.is_empty() {
            return false;
        }
        let draw = layer.draw_transform();
        if !draw.is_invertible() {
            return false;
        }
        let in_target = draw.map_enclosing_clipped_rect(content_rect);
        if self.below_minimum(in_target) {
            return false;
        }
        top.inside.contains_with(&top.outside, in_target)
    }

    /// Returns the part of `content_rect`, in `layer`'s content space, that
    /// may still be visible.
    ///
    /// The result is a single rectangle covering every uncovered pixel; it
    /// can be larger than the exact uncovered area.
    ///
    /// `content_rect` must lie within the layer's visible content rect.
    #[must_use]
    pub fn unoccluded_layer_content_rect(&self, layer: E, content_rect: PixelRect) -> PixelRect {
        let Some(top) = self.stack.last() else {
            return content_rect;
        };
        if content_rect.is_empty() {
            return content_rect;
        }
        debug_assert!(
            layer.visible_content_rect().contains(content_rect),
            "query rect {content_rect:?} is outside the visible content rect of {layer:?}"
        );
        let draw = layer.draw_transform();
        let Some(inverse) = draw.inverse() else {
            return content_rect;
        };
        let in_target = draw.map_enclosing_clipped_rect(content_rect);
        if self.below_minimum(in_target) {
            return content_rect;
        }
        let remaining = top.outside.subtract_from(top.inside.subtract_from(in_target));
        if remaining.is_empty() {
            return PixelRect::ZERO;
        }
        inverse
            .project_enclosing_clipped_rect(remaining)
            .intersect(content_rect)
    }

    /// Returns the part of `content_rect`, in the surface space of the
    /// surface owned by `owner`, that may still be visible once the surface
    /// is composited into its target.
    ///
    /// Only occlusion from outside the surface counts, so this is meant to be
    /// called while the surface is the current target (between its
    /// `TargetSurface` and `ContributingSurface` steps).
    #[must_use]
    pub fn unoccluded_surface_content_rect(&self, owner: E, content_rect: PixelRect) -> PixelRect {
        match owner.render_surface() {
            Some(surface) => {
                self.unoccluded_surface_rect(&surface, content_rect, surface.draw_transform)
            }
            None => content_rect,
        }
    }

    /// Like [`unoccluded_surface_content_rect`](Self::unoccluded_surface_content_rect)
    /// but maps through `draw_transform`, such as the surface's replica draw
    /// transform.
    #[must_use]
    pub fn unoccluded_surface_content_rect_with(
        &self,
        owner: E,
        content_rect: PixelRect,
        draw_transform: Transform3d,
    ) -> PixelRect {
        match owner.render_surface() {
            Some(surface) => self.unoccluded_surface_rect(&surface, content_rect, draw_transform),
            None => content_rect,
        }
    }

    // -- Test hooks --

    /// Occlusion drawn into the current target.
    #[must_use]
    pub fn occlusion_from_inside_target(&self) -> Region {
        self.stack.last().map(|s| s.inside.clone()).unwrap_or_default()
    }

    /// Occlusion inherited by the current target.
    #[must_use]
    pub fn occlusion_from_outside_target(&self) -> Region {
        self.stack.last().map(|s| s.outside.clone()).unwrap_or_default()
    }

    /// Occlusion drawn into the target the current surface contributes to.
    #[must_use]
    pub fn occlusion_on_contributing_surface_from_inside_target(&self) -> Region {
        self.contributing().map(|s| s.inside.clone()).unwrap_or_default()
    }

    /// Occlusion inherited by the target the current surface contributes to.
    #[must_use]
    pub fn occlusion_on_contributing_surface_from_outside_target(&self) -> Region {
        self.contributing().map(|s| s.outside.clone()).unwrap_or_default()
    }

    /// Replaces the occlusion drawn into the current target.
    pub fn set_occlusion_from_inside_target(&mut self, region: Region) {
        if let Some(top) = self.stack.last_mut() {
            top.inside = region;
        }
    }

    /// Replaces the occlusion inherited by the current target.
    pub fn set_occlusion_from_outside_target(&mut self, region: Region) {
        if let Some(top) = self.stack.last_mut() {
            top.outside = region;
        }
    }

    /// Replaces the occlusion drawn into the contributing target.
    pub fn set_occlusion_on_contributing_surface_from_inside_target(&mut self, region: Region) {
        if let Some(state) = self.contributing_mut() {
            state.inside = region;
        }
    }

    /// Replaces the occlusion inherited by the contributing target.
    pub fn set_occlusion_on_contributing_surface_from_outside_target(&mut self, region: Region) {
        if let Some(state) = self.contributing_mut() {
            state.outside = region;
        }
    }

    // -- Internals --

    fn contributing(&self) -> Option<&TargetState<E>> {
        let len = self.stack.len();
        (len > 1).then(|| &self.stack[len - 2])
    }

    fn contributing_mut(&mut self) -> Option<&mut TargetState<E>> {
        let len = self.stack.len();
        if len > 1 {
            Some(&mut self.stack[len - 2])
        } else {
            None
        }
    }

    fn below_minimum(&self, rect: PixelRect) -> bool {
        let min = self.config.minimum_tracking_size;
        rect.width < min.width && rect.height < min.height
    }

    fn enter_render_target(&mut self, new_target: E) {
        let old_target = self.stack.last().map(|s| s.target);
        if old_target == Some(new_target) {
            return;
        }
        let old_immune = old_target.and_then(|t| t.nearest_occlusion_immune_ancestor());
        let new_immune = new_target.nearest_occlusion_immune_ancestor();
        self.stack.push(TargetState::new(new_target));

        let entering_immune = new_immune.is_some() && new_immune != old_immune;
        let inverse = new_target
            .render_surface()
            .filter(|s| !s.screen_space_transforms_are_animating)
            .and_then(|s| s.screen_space_transform.inverse());

        let mut inherited = false;
        if let (Some(old_target), Some(inverse)) = (old_target, inverse) {
            if !entering_immune && new_target.parent().is_some() {
                let old_ss = old_target
                    .render_surface()
                    .map_or(Transform3d::IDENTITY, |s| s.screen_space_transform);
                let old_to_new = inverse * old_ss;
                let len = self.stack.len();
                let previous = &self.stack[len - 2];
                let mut outside = transform_region(&previous.outside, None, old_to_new);
                outside.union(&transform_region(&previous.inside, None, old_to_new));
                self.stack[len - 1].outside = outside;
                inherited = true;
            }
        }

        let top = &self.stack[self.stack.len() - 1];
        self.tracer.target_entered(&TargetEnteredEvent {
            target: new_target.index(),
            depth: depth_u32(self.stack.len()),
            inherited_outside: inherited,
            outside_rects: depth_u32(top.outside.rects().len()),
        });
    }

    fn finished_render_target(&mut self, owner: E) {
        // A surface with no content of its own has not been entered yet.
        self.enter_render_target(owner);

        let Some(surface) = owner.render_surface() else {
            return;
        };
        let reason = if owner.mask_layer().is_some() {
            Some(DiscardReason::Mask)
        } else if surface.draw_opacity < 1.0 || surface.draw_opacity_is_animating {
            Some(DiscardReason::Opacity)
        } else if owner.blend_mode().is_blended() {
            Some(DiscardReason::BlendMode)
        } else if owner.has_copy_request() && is_hidden(owner) {
            Some(DiscardReason::HiddenCopyRequest)
        } else if owner.filters().affects_opacity() {
            Some(DiscardReason::FilterAffectsOpacity)
        } else if surface.target_surface_transforms_are_animating {
            Some(DiscardReason::TransformAnimating)
        } else {
            None
        };

        if let Some(reason) = reason {
            if let Some(top) = self.stack.last_mut() {
                top.inside.clear();
                top.outside.clear();
            }
            self.tracer.surface_discarded(&SurfaceDiscardedEvent {
                surface: owner.index(),
                reason,
            });
        }
    }

    fn mark_occluded_behind_layer(&mut self, layer: E) {
        let Some(top) = self.stack.last() else {
            return;
        };
        debug_assert!(
            top.target == layer.render_target(),
            "{layer:?} does not draw into the current target {:?}",
            top.target
        );
        let target = top.target;

        if let Some(reason) = self.occluder_skip_reason(layer) {
            self.tracer.occluder_skipped(&OccluderSkippedEvent {
                layer: layer.index(),
                reason,
            });
            return;
        }

        let opaque = layer.visible_content_opaque_region();
        let draw = layer.draw_transform();
        let mut clip = self.viewport_in_target(target);
        let content_rect = target
            .render_surface()
            .map_or(self.viewport, |s| s.content_rect);
        clip = if layer.is_clipped() {
            clip.intersect(layer.clip_rect())
        } else {
            clip.intersect(content_rect)
        };

        let min = self.config.minimum_tracking_size;
        let mut added = 0_u32;
        let Some(top) = self.stack.last_mut() else {
            return;
        };
        for rect in opaque.rects() {
            let Some(mapped) = draw.map_enclosed_rect(*rect) else {
                continue;
            };
            let mapped = mapped.intersect(clip);
            if mapped.width < min.width && mapped.height < min.height {
                continue;
            }
            top.inside.union_rect(mapped);
            added += 1;
        }
        let inside_rects = depth_u32(top.inside.rects().len());
        self.tracer.occluder_added(&OccluderAddedEvent {
            layer: layer.index(),
            rects_added: added,
            inside_rects,
        });
    }

    fn occluder_skip_reason(&self, layer: E) -> Option<SkipReason> {
        if layer.draw_opacity() < 1.0 || layer.draw_opacity_is_animating() {
            return Some(SkipReason::OpacityOrAnimation);
        }
        if layer.blend_mode().is_blended() {
            return Some(SkipReason::BlendMode);
        }
        if layer.sorting_context_id() != 0 && !self.config.sorts_3d_contexts {
            return Some(SkipReason::Unsorted3d);
        }
        if layer.draw_transform_is_animating() {
            return Some(SkipReason::TransformAnimating);
        }
        let opaque = layer.visible_content_opaque_region();
        if opaque.is_empty() {
            return Some(SkipReason::EmptyOpaqueRegion);
        }
        let draw = layer.draw_transform();
        if !draw.preserves_2d_axis_alignment() {
            return Some(SkipReason::NonAxisAligned);
        }
        if draw.map_enclosed_rect(opaque.bounds()).is_none() {
            return Some(SkipReason::BehindCamera);
        }
        None
    }

    /// The viewport projected into the space of `target`'s surface.
    fn viewport_in_target(&self, target: E) -> PixelRect {
        let Some(surface) = target.render_surface() else {
            return self.viewport;
        };
        match surface.screen_space_transform.inverse() {
            Some(inverse) => inverse.project_enclosing_clipped_rect(self.viewport),
            None => surface.content_rect,
        }
    }

    fn leave_to_render_target(&mut self, owner: E, new_target: E) {
        let len = self.stack.len();
        let Some(top) = self.stack.last() else {
            return;
        };
        debug_assert!(
            top.target == owner,
            "leaving {owner:?} but the current target is {:?}",
            top.target
        );
        let Some(surface) = owner.render_surface() else {
            return;
        };
        let clip = surface.is_clipped.then_some(surface.clip_rect);
        let replica = owner.replica_layer();

        let mut inside = transform_region(&top.inside, clip, surface.draw_transform);
        if replica.is_some_and(|r| r.mask_layer().is_none()) {
            inside.union(&transform_region(
                &top.inside,
                clip,
                surface.replica_draw_transform,
            ));
        }
        let outside = transform_region(&top.outside, None, surface.draw_transform);

        // Footprints are taken before this surface's occlusion is merged.
        let background_filters = owner.background_filters();
        let erosion = background_filters.moves_pixels().then(|| {
            let surface_rect =
                self.unoccluded_surface_rect(&surface, surface.content_rect, surface.draw_transform);
            let replica_rect = replica.map(|_| {
                self.unoccluded_surface_rect(
                    &surface,
                    surface.content_rect,
                    surface.replica_draw_transform,
                )
            });
            (background_filters.outsets(), surface_rect, replica_rect)
        });

        let merged = len > 1 && self.stack[len - 2].target == new_target;
        if merged {
            self.stack.pop();
            let parent = &mut self.stack[len - 2];
            parent.inside.union(&inside);
            if new_target.parent().is_some() {
                parent.outside.union(&outside);
            }
        } else {
            let top = &mut self.stack[len - 1];
            top.target = new_target;
            top.inside = inside;
            top.outside = if new_target.parent().is_some() {
                outside
            } else {
                Region::new()
            };
        }
        self.tracer.target_left(&TargetLeftEvent {
            surface: owner.index(),
            new_target: new_target.index(),
            merged,
        });

        if let Some((outsets, surface_rect, replica_rect)) = erosion {
            let Some(top) = self.stack.last_mut() else {
                return;
            };
            let footprints = [
                (surface_rect, surface.draw_transform),
                (
                    replica_rect.unwrap_or(PixelRect::ZERO),
                    surface.replica_draw_transform,
                ),
            ];
            for (rect, draw) in footprints {
                reduce_occlusion_below_surface(&mut top.inside, rect, draw, clip, outsets);
                reduce_occlusion_below_surface(&mut top.outside, rect, draw, clip, outsets);
            }
            self.tracer.filter_erosion(&FilterErosionEvent {
                surface: owner.index(),
                outsets,
                rect: surface.draw_transform.map_enclosing_clipped_rect(surface_rect),
            });
        }

        #[cfg(feature = "trace-rich")]
        if let Some(top) = self.stack.last() {
            self.tracer
                .region_snapshot(top.target.index(), top.inside.rects(), top.outside.rects());
        }
    }

    fn unoccluded_surface_rect(
        &self,
        surface: &RenderSurface,
        content_rect: PixelRect,
        draw: Transform3d,
    ) -> PixelRect {
        if content_rect.is_empty() || surface.target_surface_transforms_are_animating {
            return content_rect;
        }
        let Some(inverse) = draw.inverse() else {
            return content_rect;
        };
        let Some(parent) = self.contributing() else {
            return content_rect;
        };
        let in_target = draw.map_enclosing_clipped_rect(content_rect);
        let remaining = parent
            .outside
            .subtract_from(parent.inside.subtract_from(in_target));
        if remaining.is_empty() {
            return PixelRect::ZERO;
        }
        inverse
            .project_enclosing_clipped_rect(remaining)
            .intersect(content_rect)
    }
}

/// Walks `parent()` links from `element` (inclusive) looking for a hidden
/// subtree root.
fn is_hidden<E: OcclusionElement>(element: E) -> bool {
    let mut current = Some(element);
    while let Some(e) = current {
        if e.hide_layer_and_subtree() {
            return true;
        }
        current = e.parent();
    }
    false
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "stack depths and rect counts stay far below u32::MAX"
)]
fn depth_u32(n: usize) -> u32 {
    n as u32
}

/// Maps every rect of `region` through an axis-aligned `transform`, keeping
/// only pixels fully covered after mapping.
///
/// Returns an empty region when `transform` does not keep rectangles
/// axis-aligned or maps any part behind the camera.
fn transform_region(region: &Region, clip: Option<PixelRect>, transform: Transform3d) -> Region {
    let mut out = Region::new();
    if region.is_empty() {
        return out;
    }
    if !transform.preserves_2d_axis_alignment()
        || transform.map_enclosed_rect(region.bounds()).is_none()
    {
        return out;
    }
    for rect in region.rects() {
        let Some(mut mapped) = transform.map_enclosed_rect(*rect) else {
            continue;
        };
        if let Some(clip) = clip {
            mapped = mapped.intersect(clip);
        }
        out.union_rect(mapped);
    }
    out
}

/// Erodes `occlusion` around a background-filtering surface's footprint so
/// pixels the filter samples stay unoccluded.
fn reduce_occlusion_below_surface(
    occlusion: &mut Region,
    surface_rect: PixelRect,
    draw: Transform3d,
    clip: Option<PixelRect>,
    outsets: FilterOutsets,
) {
    if surface_rect.is_empty() {
        return;
    }
    let mut affected = draw.map_enclosing_clipped_rect(surface_rect);
    if let Some(clip) = clip {
        affected = affected.intersect(clip);
    }
    if affected.is_empty() {
        return;
    }
    let affected = affected.outset(outsets.left, outsets.top, outsets.right, outsets.bottom);

    let mut affected_occlusion = occlusion.clone();
    affected_occlusion.intersect_rect(affected);
    occlusion.subtract_rect(affected);

    for rect in affected_occlusion.rects() {
        // Filter reach on one side pulls in pixels from the opposite side.
        let shrink_left = if rect.x == affected.x { 0 } else { outsets.right };
        let shrink_top = if rect.y == affected.y { 0 } else { outsets.bottom };
        let shrink_right = if rect.right() == affected.right() { 0 } else { outsets.left };
        let shrink_bottom = if rect.bottom() == affected.bottom() { 0 } else { outsets.top };
        let shrunk = rect.inset(shrink_left, shrink_top, shrink_right, shrink_bottom);
        if !shrunk.is_empty() {
            occlusion.union_rect(shrunk);
        }
    }
}
