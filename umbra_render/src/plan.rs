// Copyright 2026 the Umbra Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Render plan: the visible draw commands for one frame.

use alloc::vec::Vec;

use umbra_core::effect::BlendMode;
use umbra_core::geometry::PixelRect;
use umbra_core::layer::{LayerId, LayerRef, LayerStore};
use umbra_core::occlusion::{
    ElementKind, OcclusionElement, OcclusionTracker, TrackerConfig, TraversalEvent,
};
use umbra_core::trace::Tracer;
use umbra_core::transform::Transform3d;

/// What a [`RenderItem`] draws.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ItemKind {
    /// The layer's own content.
    Content,
    /// The render surface owned by the layer, composited into its target.
    Surface,
    /// The reflection of the layer's render surface.
    Replica,
}

/// A single draw command in the render plan.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderItem {
    /// The layer this item originates from. For surfaces and replicas, the
    /// surface owner.
    pub layer: LayerId,
    /// Owner of the render surface the item draws into.
    pub target: LayerId,
    /// What is drawn.
    pub kind: ItemKind,
    /// The part that may be visible, in content space (surface space for
    /// surfaces and replicas).
    pub rect: PixelRect,
    /// Maps [`rect`](Self::rect) into the target's space.
    pub draw_transform: Transform3d,
    /// Opacity to draw with.
    pub draw_opacity: f32,
    /// Blend mode to composite with.
    pub blend_mode: BlendMode,
}

/// Counters gathered while building a plan.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PlanStats {
    /// Content items kept.
    pub drawn: u32,
    /// Content items dropped as fully occluded.
    pub culled: u32,
    /// Pixels, in content space, removed from content items by occlusion.
    pub culled_area: i64,
    /// Surface and replica items kept.
    pub surfaces: u32,
    /// Surface and replica items dropped as fully occluded.
    pub culled_surfaces: u32,
}

/// The draw commands for a single frame.
///
/// Items that share a [`target`](RenderItem::target) are in back-to-front
/// order. A surface's own content precedes nothing in particular relative
/// to the surface item: backends draw each target's items into it before
/// compositing it.
#[derive(Clone, Debug, Default)]
pub struct RenderPlan {
    /// Screen viewport the plan was built for.
    pub viewport: PixelRect,
    /// Visible draw commands.
    pub items: Vec<RenderItem>,
    /// Layers whose content was fully occluded.
    pub culled: Vec<LayerId>,
    /// Counters for diagnostics.
    pub stats: PlanStats,
}

impl RenderPlan {
    /// Creates an empty render plan for the given viewport.
    #[must_use]
    pub fn new(viewport: PixelRect) -> Self {
        Self {
            viewport,
            ..Self::default()
        }
    }

    /// Clears the plan for reuse.
    pub fn clear(&mut self) {
        self.items.clear();
        self.culled.clear();
        self.stats = PlanStats::default();
    }
}

/// Builds an occlusion-culled plan for every root of `store`.
///
/// Uses the draw properties and traversal of the most recent
/// [`update_draw_properties`](LayerStore::update_draw_properties) pass; with
/// no pass yet, the plan is empty.
#[must_use]
pub fn build_plan(store: &LayerStore, config: TrackerConfig, tracer: Tracer<'_>) -> RenderPlan {
    let mut plan = RenderPlan::default();
    build_plan_into(store, config, tracer, &mut plan);
    plan
}

/// Like [`build_plan`] but writes into an existing plan, reusing its
/// allocations.
pub fn build_plan_into(
    store: &LayerStore,
    config: TrackerConfig,
    tracer: Tracer<'_>,
    plan: &mut RenderPlan,
) {
    plan.clear();
    let Some(viewport) = store.viewport() else {
        return;
    };
    plan.viewport = viewport;

    let mut tracer = tracer;
    for root in store.roots() {
        let start = plan.items.len();
        let culled_start = plan.culled.len();
        let mut tracker = OcclusionTracker::with_tracer(viewport, config, tracer);
        for event in store.front_to_back(root) {
            tracker.enter_layer(event);
            match event {
                TraversalEvent::Itself { layer, target } => {
                    plan_content(&tracker, layer, target, plan);
                }
                TraversalEvent::TargetSurface(owner) => plan_surface(&tracker, owner, plan),
                TraversalEvent::ContributingSurface { .. } => {}
            }
            tracker.leave_layer(event);
        }
        tracer = tracker.into_tracer();
        // Collected front to back.
        plan.items[start..].reverse();
        plan.culled[culled_start..].reverse();
    }
}

fn plan_content<'a>(
    tracker: &OcclusionTracker<'_, LayerRef<'a>>,
    layer: LayerRef<'a>,
    target: LayerRef<'a>,
    plan: &mut RenderPlan,
) {
    if !layer.draws_content() || layer.kind() == ElementKind::Replica {
        return;
    }
    let visible = layer.visible_content_rect();
    if visible.is_empty() {
        return;
    }
    let rect = tracker.unoccluded_layer_content_rect(layer, visible);
    plan.stats.culled_area += visible.area() - rect.area();
    if rect.is_empty() {
        plan.stats.culled += 1;
        plan.culled.push(layer.id());
        return;
    }
    plan.stats.drawn += 1;
    // Blend modes other than source-over force a surface, so content always
    // draws source-over into it.
    let blend_mode = match layer.kind() {
        ElementKind::Plain => layer.blend_mode(),
        _ => BlendMode::default(),
    };
    plan.items.push(RenderItem {
        layer: layer.id(),
        target: target.id(),
        kind: ItemKind::Content,
        rect,
        draw_transform: layer.draw_transform(),
        draw_opacity: layer.draw_opacity(),
        blend_mode,
    });
}

fn plan_surface(
    tracker: &OcclusionTracker<'_, LayerRef<'_>>,
    owner: LayerRef<'_>,
    plan: &mut RenderPlan,
) {
    // Roots draw straight into the framebuffer.
    let Some(target) = owner.surface_target() else {
        return;
    };
    let Some(surface) = owner.render_surface() else {
        return;
    };
    let content = surface.content_rect;
    if content.is_empty() {
        return;
    }

    let mut push = |kind: ItemKind, rect: PixelRect, draw_transform: Transform3d| {
        if rect.is_empty() {
            plan.stats.culled_surfaces += 1;
            return;
        }
        plan.stats.surfaces += 1;
        plan.items.push(RenderItem {
            layer: owner.id(),
            target: target.id(),
            kind,
            rect,
            draw_transform,
            draw_opacity: surface.draw_opacity,
            blend_mode: owner.blend_mode(),
        });
    };

    push(
        ItemKind::Surface,
        tracker.unoccluded_surface_content_rect(owner, content),
        surface.draw_transform,
    );
    // Pushed after the surface so the replica lands behind it once reversed.
    if owner.replica_layer().is_some() {
        push(
            ItemKind::Replica,
            tracker.unoccluded_surface_content_rect_with(
                owner,
                content,
                surface.replica_draw_transform,
            ),
            surface.replica_draw_transform,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Point;
    use umbra_core::geometry::PixelSize;
    use umbra_core::layer::LayerFlags;

    const VIEWPORT: PixelRect = PixelRect::new(0, 0, 1000, 1000);

    const OPAQUE: LayerFlags = LayerFlags {
        draws_content: true,
        contents_opaque: true,
        masks_to_bounds: false,
        hide_layer_and_subtree: false,
        force_render_surface: false,
        has_copy_request: false,
        opacity_is_animating: false,
        transform_is_animating: false,
    };

    const TRANSLUCENT: LayerFlags = LayerFlags {
        contents_opaque: false,
        ..OPAQUE
    };

    const EMPTY: LayerFlags = LayerFlags {
        draws_content: false,
        contents_opaque: false,
        ..OPAQUE
    };

    const SURFACE: LayerFlags = LayerFlags {
        force_render_surface: true,
        ..EMPTY
    };

    fn add(
        store: &mut LayerStore,
        parent: Option<LayerId>,
        position: (f64, f64),
        size: (i32, i32),
        flags: LayerFlags,
    ) -> LayerId {
        let id = store.create_layer();
        store.set_position(id, Point::new(position.0, position.1));
        store.set_bounds(id, PixelSize::new(size.0, size.1));
        store.set_flags(id, flags);
        if let Some(parent) = parent {
            store.add_child(parent, id);
        }
        id
    }

    fn root(store: &mut LayerStore) -> LayerId {
        add(store, None, (0.0, 0.0), (1000, 1000), EMPTY)
    }

    fn plan(store: &LayerStore) -> RenderPlan {
        build_plan(store, TrackerConfig::default(), Tracer::none())
    }

    #[test]
    fn empty_without_draw_pass() {
        let mut store = LayerStore::new();
        let root = root(&mut store);
        let _ = add(&mut store, Some(root), (0.0, 0.0), (10, 10), OPAQUE);
        let plan = plan(&store);
        assert!(plan.items.is_empty(), "no pass, no items");
        assert_eq!(plan.stats, PlanStats::default());
    }

    #[test]
    fn fully_covered_layer_is_culled() {
        let mut store = LayerStore::new();
        let root = root(&mut store);
        let back = add(&mut store, Some(root), (0.0, 0.0), (100, 100), OPAQUE);
        let front = add(&mut store, Some(root), (0.0, 0.0), (200, 200), OPAQUE);
        let _ = store.update_draw_properties(VIEWPORT);

        let plan = plan(&store);
        assert_eq!(plan.viewport, VIEWPORT);
        assert_eq!(plan.items.len(), 1, "only the front layer is drawn");
        assert_eq!(plan.items[0].layer, front);
        assert_eq!(plan.items[0].rect, PixelRect::new(0, 0, 200, 200));
        assert_eq!(plan.culled, [back]);
        assert_eq!(plan.stats.drawn, 1);
        assert_eq!(plan.stats.culled, 1);
        assert_eq!(plan.stats.culled_area, 100 * 100);
    }

    #[test]
    fn partly_covered_layer_is_trimmed_and_ordered_back_to_front() {
        let mut store = LayerStore::new();
        let root = root(&mut store);
        let back = add(&mut store, Some(root), (0.0, 0.0), (100, 100), OPAQUE);
        let front = add(&mut store, Some(root), (0.0, 50.0), (100, 100), OPAQUE);
        let _ = store.update_draw_properties(VIEWPORT);

        let plan = plan(&store);
        let layers: Vec<_> = plan.items.iter().map(|item| item.layer).collect();
        assert_eq!(layers, [back, front]);
        assert_eq!(plan.items[0].rect, PixelRect::new(0, 0, 100, 50));
        assert_eq!(plan.items[0].target, root);
        assert_eq!(plan.items[0].kind, ItemKind::Content);
        assert_eq!(plan.stats.culled_area, 100 * 50);
        assert!(plan.culled.is_empty(), "nothing fully hidden");
    }

    #[test]
    fn translucent_layer_culls_nothing() {
        let mut store = LayerStore::new();
        let root = root(&mut store);
        let _ = add(&mut store, Some(root), (0.0, 0.0), (100, 100), OPAQUE);
        let _ = add(&mut store, Some(root), (0.0, 0.0), (200, 200), TRANSLUCENT);
        let _ = store.update_draw_properties(VIEWPORT);

        let plan = plan(&store);
        assert_eq!(plan.items.len(), 2, "both layers drawn");
        assert_eq!(plan.items[0].rect, PixelRect::new(0, 0, 100, 100));
        assert_eq!(plan.stats.culled_area, 0);
    }

    #[test]
    fn surface_is_composited_into_its_target() {
        let mut store = LayerStore::new();
        let root = root(&mut store);
        let surface = add(&mut store, Some(root), (100.0, 100.0), (200, 200), SURFACE);
        store.set_opacity(surface, 0.5);
        let inner = add(&mut store, Some(surface), (0.0, 0.0), (200, 200), OPAQUE);
        let _ = store.update_draw_properties(VIEWPORT);

        let plan = plan(&store);
        let into_root: Vec<_> = plan.items.iter().filter(|i| i.target == root).collect();
        assert_eq!(into_root.len(), 1, "the surface quad");
        assert_eq!(into_root[0].kind, ItemKind::Surface);
        assert_eq!(into_root[0].layer, surface);
        assert_eq!(into_root[0].rect, PixelRect::new(0, 0, 200, 200));
        assert_eq!(into_root[0].draw_opacity, 0.5);

        let into_surface: Vec<_> = plan.items.iter().filter(|i| i.target == surface).collect();
        assert_eq!(into_surface.len(), 1, "the inner content");
        assert_eq!(into_surface[0].layer, inner);
        assert_eq!(plan.stats.surfaces, 1);
    }

    #[test]
    fn covered_surface_and_its_content_are_culled() {
        let mut store = LayerStore::new();
        let root = root(&mut store);
        let surface = add(&mut store, Some(root), (100.0, 100.0), (200, 200), SURFACE);
        store.set_opacity(surface, 0.5);
        let inner = add(&mut store, Some(surface), (0.0, 0.0), (200, 200), OPAQUE);
        let cover = add(&mut store, Some(root), (100.0, 100.0), (200, 200), OPAQUE);
        let _ = store.update_draw_properties(VIEWPORT);

        let plan = plan(&store);
        assert_eq!(plan.items.len(), 1, "only the cover is drawn");
        assert_eq!(plan.items[0].layer, cover);
        assert_eq!(plan.culled, [inner]);
        assert_eq!(plan.stats.culled_surfaces, 1);
    }

    #[test]
    fn plan_into_reuses_and_resets() {
        let mut store = LayerStore::new();
        let root = root(&mut store);
        let _ = add(&mut store, Some(root), (0.0, 0.0), (100, 100), OPAQUE);
        let _ = store.update_draw_properties(VIEWPORT);

        let mut plan = RenderPlan::new(PixelRect::ZERO);
        build_plan_into(&store, TrackerConfig::default(), Tracer::none(), &mut plan);
        build_plan_into(&store, TrackerConfig::default(), Tracer::none(), &mut plan);
        assert_eq!(plan.items.len(), 1, "second build replaces the first");
        assert_eq!(plan.stats.drawn, 1);
    }
}
