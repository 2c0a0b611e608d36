// Copyright 2026 the Umbra Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! End-to-end tracker scenarios over a [`LayerStore`].
//!
//! Each scenario builds a small tree, runs the draw-properties pass, then
//! walks the front-to-back traversal, pausing between `enter_layer` and
//! `leave_layer` to inspect or poke the tracker.

use alloc::vec::Vec;

use kurbo::Point;

use super::{OcclusionElement, OcclusionTracker, TrackerConfig, TraversalEvent};
use crate::effect::{BlendMode, FilterChain, FilterOperation, FilterOutsets};
use crate::geometry::{PixelRect, PixelSize};
use crate::layer::{LayerFlags, LayerId, LayerRef, LayerStore};
use crate::region::Region;
use crate::transform::Transform3d;

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

const SURFACE: LayerFlags = LayerFlags {
    draws_content: false,
    contents_opaque: false,
    force_render_surface: true,
    ..OPAQUE
};

const EMPTY: LayerFlags = LayerFlags {
    draws_content: false,
    contents_opaque: false,
    ..OPAQUE
};

type Tracker<'a> = OcclusionTracker<'static, LayerRef<'a>>;

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

/// Drives `tracker` over the traversal of `root`, calling `at` between each
/// enter and leave.
fn walk<'a>(
    store: &'a LayerStore,
    root: LayerId,
    tracker: &mut Tracker<'a>,
    mut at: impl FnMut(&mut Tracker<'a>, TraversalEvent<LayerRef<'a>>),
) {
    for event in store.front_to_back(root) {
        tracker.enter_layer(event);
        at(tracker, event);
        tracker.leave_layer(event);
    }
}

/// Walks the whole traversal and returns the final root occlusion.
fn final_occlusion(store: &LayerStore, root: LayerId, config: TrackerConfig) -> Region {
    let mut tracker = Tracker::new(VIEWPORT, config);
    walk(store, root, &mut tracker, |_, _| {});
    tracker.occlusion_from_inside_target()
}

fn is_itself(event: TraversalEvent<LayerRef<'_>>, id: LayerId) -> bool {
    matches!(event, TraversalEvent::Itself { layer, .. } if layer.id() == id)
}

fn region(rects: &[PixelRect]) -> Region {
    let mut region = Region::new();
    for rect in rects {
        region.union_rect(*rect);
    }
    region
}

#[test]
fn opaque_layer_occludes_layers_behind() {
    let mut store = LayerStore::new();
    let root = root(&mut store);
    let behind = add(&mut store, Some(root), (0.0, 0.0), (100, 100), OPAQUE);
    let _ = add(&mut store, Some(root), (30.0, 30.0), (500, 500), OPAQUE);
    let _ = store.update_draw_properties(VIEWPORT);

    let mut tracker = Tracker::new(VIEWPORT, TrackerConfig::default());
    let mut checked = false;
    walk(&store, root, &mut tracker, |tracker, event| {
        if is_itself(event, behind) {
            let layer = event.current();
            assert!(tracker.occluded_layer(layer, PixelRect::new(30, 30, 70, 70)));
            assert!(!tracker.occluded_layer(layer, PixelRect::new(29, 30, 70, 70)));
            assert_eq!(
                tracker.unoccluded_layer_content_rect(layer, PixelRect::new(30, 0, 70, 100)),
                PixelRect::new(30, 0, 70, 30)
            );
            // An L-shaped remainder is not representable; the query is lossy.
            assert_eq!(
                tracker.unoccluded_layer_content_rect(layer, PixelRect::new(0, 0, 100, 100)),
                PixelRect::new(0, 0, 100, 100)
            );
            checked = true;
        }
    });
    assert!(checked, "the layer behind was visited");
    assert_eq!(
        tracker.occlusion_from_inside_target(),
        region(&[
            PixelRect::new(0, 0, 100, 100),
            PixelRect::new(30, 30, 500, 500),
        ])
    );
}

#[test]
fn empty_rect_is_occluded_and_unchanged() {
    let mut store = LayerStore::new();
    let root = root(&mut store);
    let layer = add(&mut store, Some(root), (0.0, 0.0), (100, 100), OPAQUE);
    let _ = store.update_draw_properties(VIEWPORT);

    let mut tracker = Tracker::new(VIEWPORT, TrackerConfig::default());
    walk(&store, root, &mut tracker, |tracker, event| {
        if is_itself(event, layer) {
            let layer = event.current();
            assert!(tracker.occluded_layer(layer, PixelRect::ZERO));
            assert_eq!(
                tracker.unoccluded_layer_content_rect(layer, PixelRect::ZERO),
                PixelRect::ZERO
            );
            // Nothing occludes yet.
            assert!(!tracker.occluded_layer(layer, PixelRect::new(0, 0, 10, 10)));
        }
    });
}

#[test]
fn rotated_layer_does_not_occlude() {
    let mut store = LayerStore::new();
    let root = root(&mut store);
    let layer = add(&mut store, Some(root), (300.0, 300.0), (100, 100), OPAQUE);
    store.set_transform(layer, Transform3d::from_rotation_z_degrees(30.0));
    let _ = store.update_draw_properties(VIEWPORT);

    assert!(final_occlusion(&store, root, TrackerConfig::default()).is_empty());
}

#[test]
fn scaled_surface_occludes_in_target_space() {
    let mut store = LayerStore::new();
    let root = root(&mut store);
    let behind = add(&mut store, Some(root), (0.0, 0.0), (400, 400), OPAQUE);
    let surface = add(&mut store, Some(root), (100.0, 100.0), (500, 500), SURFACE);
    store.set_transform(surface, Transform3d::from_scale(0.5, 0.5, 1.0));
    let content = add(&mut store, Some(surface), (0.0, 0.0), (500, 500), OPAQUE);
    let _ = store.update_draw_properties(VIEWPORT);

    let mut tracker = Tracker::new(VIEWPORT, TrackerConfig::default());
    let mut checked = 0;
    walk(&store, root, &mut tracker, |tracker, event| {
        if is_itself(event, content) {
            assert_eq!(tracker.depth(), 1);
            assert!(tracker.occlusion_from_inside_target().is_empty());
        }
        if let TraversalEvent::ContributingSurface { surface: s, .. } = event {
            assert_eq!(s.id(), surface);
            assert_eq!(
                tracker.occlusion_from_inside_target(),
                Region::from_rect(PixelRect::new(0, 0, 250, 250))
            );
            checked += 1;
        }
        if is_itself(event, behind) {
            let layer = event.current();
            assert!(tracker.occluded_layer(layer, PixelRect::new(100, 100, 250, 250)));
            assert_eq!(
                tracker.unoccluded_layer_content_rect(layer, PixelRect::new(100, 100, 300, 250)),
                PixelRect::new(350, 100, 50, 250)
            );
            checked += 1;
        }
    });
    assert_eq!(checked, 2, "surface and layer behind were visited");
}

#[test]
fn translucent_surface_discards_its_occlusion() {
    let mut store = LayerStore::new();
    let root = root(&mut store);
    let surface = add(&mut store, Some(root), (100.0, 100.0), (200, 200), SURFACE);
    store.set_opacity(surface, 0.5);
    let _ = add(&mut store, Some(surface), (0.0, 0.0), (200, 200), OPAQUE);
    let _ = store.update_draw_properties(VIEWPORT);

    assert!(final_occlusion(&store, root, TrackerConfig::default()).is_empty());
}

#[test]
fn surface_with_opacity_filter_discards_its_occlusion() {
    let mut store = LayerStore::new();
    let root = root(&mut store);
    let surface = add(&mut store, Some(root), (100.0, 100.0), (200, 200), EMPTY);
    store.set_filters(
        surface,
        FilterChain::new().with(FilterOperation::Opacity(0.5)),
    );
    let _ = add(&mut store, Some(surface), (0.0, 0.0), (200, 200), OPAQUE);
    let _ = store.update_draw_properties(VIEWPORT);

    assert!(final_occlusion(&store, root, TrackerConfig::default()).is_empty());
}

#[test]
fn color_filter_keeps_occlusion() {
    let mut store = LayerStore::new();
    let root = root(&mut store);
    let surface = add(&mut store, Some(root), (100.0, 100.0), (200, 200), EMPTY);
    store.set_filters(
        surface,
        FilterChain::new().with(FilterOperation::Grayscale(1.0)),
    );
    let _ = add(&mut store, Some(surface), (0.0, 0.0), (200, 200), OPAQUE);
    let _ = store.update_draw_properties(VIEWPORT);

    assert_eq!(
        final_occlusion(&store, root, TrackerConfig::default()),
        Region::from_rect(PixelRect::new(100, 100, 200, 200))
    );
}

#[test]
fn masked_surface_discards_its_occlusion() {
    let mut store = LayerStore::new();
    let root = root(&mut store);
    let surface = add(&mut store, Some(root), (100.0, 100.0), (200, 200), EMPTY);
    let mask = add(&mut store, None, (0.0, 0.0), (200, 200), TRANSLUCENT);
    store.set_mask_layer(surface, Some(mask));
    let _ = add(&mut store, Some(surface), (0.0, 0.0), (200, 200), OPAQUE);
    let _ = store.update_draw_properties(VIEWPORT);

    assert!(final_occlusion(&store, root, TrackerConfig::default()).is_empty());
}

#[test]
fn replica_adds_a_second_occluder() {
    let mut store = LayerStore::new();
    let root = root(&mut store);
    let surface = add(&mut store, Some(root), (100.0, 100.0), (200, 200), SURFACE);
    let _ = add(&mut store, Some(surface), (0.0, 0.0), (200, 200), OPAQUE);
    let replica = add(&mut store, None, (200.0, 0.0), (200, 200), EMPTY);
    store.set_replica_layer(surface, Some(replica));
    let _ = store.update_draw_properties(VIEWPORT);

    assert_eq!(
        final_occlusion(&store, root, TrackerConfig::default()),
        Region::from_rect(PixelRect::new(100, 100, 400, 200))
    );
}

#[test]
fn masked_replica_does_not_occlude() {
    let mut store = LayerStore::new();
    let root = root(&mut store);
    let surface = add(&mut store, Some(root), (100.0, 100.0), (200, 200), SURFACE);
    let _ = add(&mut store, Some(surface), (0.0, 0.0), (200, 200), OPAQUE);
    let replica = add(&mut store, None, (200.0, 0.0), (200, 200), EMPTY);
    let replica_mask = add(&mut store, None, (0.0, 0.0), (200, 200), TRANSLUCENT);
    store.set_replica_layer(surface, Some(replica));
    store.set_mask_layer(replica, Some(replica_mask));
    let _ = store.update_draw_properties(VIEWPORT);

    assert_eq!(
        final_occlusion(&store, root, TrackerConfig::default()),
        Region::from_rect(PixelRect::new(100, 100, 200, 200))
    );
}

#[test]
fn animating_layers_do_not_occlude() {
    let mut store = LayerStore::new();
    let root = root(&mut store);
    let _ = add(
        &mut store,
        Some(root),
        (0.0, 0.0),
        (100, 100),
        LayerFlags {
            opacity_is_animating: true,
            ..OPAQUE
        },
    );
    let _ = add(
        &mut store,
        Some(root),
        (200.0, 0.0),
        (100, 100),
        LayerFlags {
            transform_is_animating: true,
            ..OPAQUE
        },
    );
    let _ = add(&mut store, Some(root), (400.0, 0.0), (100, 100), OPAQUE);
    let _ = store.update_draw_properties(VIEWPORT);

    assert_eq!(
        final_occlusion(&store, root, TrackerConfig::default()),
        Region::from_rect(PixelRect::new(400, 0, 100, 100))
    );
}

#[test]
fn surface_animating_in_target_discards_occlusion() {
    let mut store = LayerStore::new();
    let root = root(&mut store);
    let surface = add(
        &mut store,
        Some(root),
        (100.0, 100.0),
        (200, 200),
        LayerFlags {
            transform_is_animating: true,
            ..SURFACE
        },
    );
    let _ = add(&mut store, Some(surface), (0.0, 0.0), (200, 200), OPAQUE);
    let _ = store.update_draw_properties(VIEWPORT);

    assert!(final_occlusion(&store, root, TrackerConfig::default()).is_empty());
}

#[test]
fn occlusion_in_front_of_animating_content_reaches_later_siblings() {
    let mut store = LayerStore::new();
    let root = root(&mut store);
    let behind_surface = add(&mut store, Some(root), (0.0, 0.0), (500, 500), SURFACE);
    let behind = add(&mut store, Some(behind_surface), (0.0, 0.0), (500, 500), TRANSLUCENT);
    let animating_surface = add(
        &mut store,
        Some(root),
        (100.0, 100.0),
        (200, 200),
        LayerFlags {
            transform_is_animating: true,
            ..SURFACE
        },
    );
    let _ = add(&mut store, Some(animating_surface), (0.0, 0.0), (200, 200), OPAQUE);
    let animating = add(
        &mut store,
        Some(root),
        (300.0, 0.0),
        (100, 100),
        LayerFlags {
            transform_is_animating: true,
            ..OPAQUE
        },
    );
    let _ = add(&mut store, Some(root), (0.0, 0.0), (100, 100), OPAQUE);
    let _ = store.update_draw_properties(VIEWPORT);

    let front = Region::from_rect(PixelRect::new(0, 0, 100, 100));
    let mut tracker = Tracker::new(VIEWPORT, TrackerConfig::default());
    let mut checked = 0;
    walk(&store, root, &mut tracker, |tracker, event| {
        if is_itself(event, animating) {
            assert_eq!(tracker.occlusion_from_inside_target(), front);
            checked += 1;
        }
        if is_itself(event, behind) {
            // Neither animating sibling added anything; the front layer
            // arrives from outside the surface.
            assert_eq!(tracker.occlusion_from_outside_target(), front);
            assert!(tracker.occlusion_from_inside_target().is_empty());
            let layer = event.current();
            assert!(tracker.occluded_layer(layer, PixelRect::new(0, 0, 100, 100)));
            assert!(!tracker.occluded_layer(layer, PixelRect::new(100, 100, 200, 200)));
            assert!(!tracker.occluded_layer(layer, PixelRect::new(300, 0, 100, 100)));
            assert_eq!(
                tracker.unoccluded_layer_content_rect(layer, PixelRect::new(0, 0, 200, 100)),
                PixelRect::new(100, 0, 100, 100)
            );
            checked += 1;
        }
    });
    assert_eq!(checked, 2, "animating layer and later sibling were visited");
}

#[test]
fn adding_occluders_never_grows_the_unoccluded_rect() {
    let occluders = [
        PixelRect::new(0, 0, 100, 30),
        PixelRect::new(0, 0, 20, 100),
        PixelRect::new(60, 60, 40, 40),
        PixelRect::new(20, 30, 80, 30),
    ];
    let candidate = PixelRect::new(0, 0, 100, 100);
    let mut previous = candidate;
    for count in 0..=occluders.len() {
        let mut store = LayerStore::new();
        let root = root(&mut store);
        let back = add(&mut store, Some(root), (0.0, 0.0), (100, 100), TRANSLUCENT);
        for r in &occluders[..count] {
            let position = (f64::from(r.x), f64::from(r.y));
            let _ = add(&mut store, Some(root), position, (r.width, r.height), OPAQUE);
        }
        let _ = store.update_draw_properties(VIEWPORT);

        let mut tracker = Tracker::new(VIEWPORT, TrackerConfig::default());
        let mut unoccluded = None;
        walk(&store, root, &mut tracker, |tracker, event| {
            if is_itself(event, back) {
                unoccluded =
                    Some(tracker.unoccluded_layer_content_rect(event.current(), candidate));
            }
        });
        let unoccluded = unoccluded.expect("the back layer was visited");
        assert!(
            previous.contains(unoccluded),
            "{count} occluders left {unoccluded:?}, more than {previous:?}"
        );
        previous = unoccluded;
    }
    assert_eq!(previous, PixelRect::new(20, 60, 40, 40));
}

#[test]
fn blended_layer_does_not_occlude() {
    let mut store = LayerStore::new();
    let root = root(&mut store);
    let layer = add(&mut store, Some(root), (0.0, 0.0), (100, 100), OPAQUE);
    store.set_blend_mode(layer, BlendMode::Multiply);
    let _ = store.update_draw_properties(VIEWPORT);

    assert!(final_occlusion(&store, root, TrackerConfig::default()).is_empty());
}

#[test]
fn unsorted_3d_context_does_not_occlude() {
    let mut store = LayerStore::new();
    let root = root(&mut store);
    let layer = add(&mut store, Some(root), (0.0, 0.0), (100, 100), OPAQUE);
    store.set_sorting_context_id(layer, 1);
    let _ = store.update_draw_properties(VIEWPORT);

    assert!(final_occlusion(&store, root, TrackerConfig::main_thread()).is_empty());
    assert_eq!(
        final_occlusion(&store, root, TrackerConfig::impl_thread()),
        Region::from_rect(PixelRect::new(0, 0, 100, 100))
    );
}

#[test]
fn layer_behind_camera_does_not_occlude() {
    let mut store = LayerStore::new();
    let root = root(&mut store);
    store.set_sorting_context_id(root, 1);
    let layer = add(&mut store, Some(root), (0.0, 0.0), (100, 100), OPAQUE);
    store.set_sorting_context_id(layer, 1);
    // Pushed 110 pixels toward a camera 100 pixels away.
    store.set_transform(
        layer,
        Transform3d::from_translation(50.0, 50.0, 0.0)
            * Transform3d::from_perspective(100.0)
            * Transform3d::from_translation(0.0, 0.0, 110.0)
            * Transform3d::from_translation(-50.0, -50.0, 0.0),
    );
    let _ = store.update_draw_properties(VIEWPORT);

    assert!(store
        .layer(layer)
        .draw_transform()
        .map_enclosed_rect(PixelRect::new(0, 0, 100, 100))
        .is_none());
    let mut tracker = Tracker::new(VIEWPORT, TrackerConfig::impl_thread());
    walk(&store, root, &mut tracker, |_, _| {});
    assert!(tracker.occlusion_from_inside_target().is_empty());
    assert!(tracker.occlusion_from_outside_target().is_empty());
}

#[test]
fn minimum_tracking_size_filters_small_occluders() {
    let mut store = LayerStore::new();
    let root = root(&mut store);
    let tiny = add(&mut store, Some(root), (500.0, 500.0), (9, 9), OPAQUE);
    let _ = add(&mut store, Some(root), (0.0, 0.0), (9, 9), OPAQUE);
    let _ = add(&mut store, Some(root), (100.0, 100.0), (10, 5), OPAQUE);
    let _ = store.update_draw_properties(VIEWPORT);

    let config = TrackerConfig::default().with_minimum_tracking_size(PixelSize::new(10, 10));
    let mut tracker = Tracker::new(VIEWPORT, config);
    walk(&store, root, &mut tracker, |tracker, event| {
        if is_itself(event, tiny) {
            // Below the minimum, queries never report occlusion.
            let saved = tracker.occlusion_from_inside_target();
            tracker.set_occlusion_from_inside_target(Region::from_rect(VIEWPORT));
            let layer = event.current();
            assert!(!tracker.occluded_layer(layer, PixelRect::new(0, 0, 9, 9)));
            assert_eq!(
                tracker.unoccluded_layer_content_rect(layer, PixelRect::new(0, 0, 9, 9)),
                PixelRect::new(0, 0, 9, 9)
            );
            tracker.set_occlusion_from_inside_target(saved);
        }
    });
    assert_eq!(
        tracker.occlusion_from_inside_target(),
        Region::from_rect(PixelRect::new(100, 100, 10, 5))
    );
}

#[test]
fn copy_request_occludes_unless_hidden() {
    fn scene(hidden: bool) -> (LayerStore, LayerId) {
        let mut store = LayerStore::new();
        let root = root(&mut store);
        let parent = add(
            &mut store,
            Some(root),
            (0.0, 0.0),
            (100, 100),
            LayerFlags {
                hide_layer_and_subtree: hidden,
                ..EMPTY
            },
        );
        let copied = add(
            &mut store,
            Some(parent),
            (0.0, 0.0),
            (100, 100),
            LayerFlags {
                has_copy_request: true,
                ..EMPTY
            },
        );
        let _ = add(&mut store, Some(copied), (0.0, 0.0), (100, 100), OPAQUE);
        let _ = store.update_draw_properties(VIEWPORT);
        (store, root)
    }

    let (store, root) = scene(false);
    assert_eq!(
        final_occlusion(&store, root, TrackerConfig::default()),
        Region::from_rect(PixelRect::new(0, 0, 100, 100))
    );

    let (store, root) = scene(true);
    assert!(final_occlusion(&store, root, TrackerConfig::default()).is_empty());
}

#[test]
fn occlusion_immune_surface_ignores_outside_occlusion() {
    let mut store = LayerStore::new();
    let root = root(&mut store);
    let copied = add(
        &mut store,
        Some(root),
        (0.0, 0.0),
        (100, 100),
        LayerFlags {
            has_copy_request: true,
            ..EMPTY
        },
    );
    let inside = add(&mut store, Some(copied), (0.0, 0.0), (100, 100), TRANSLUCENT);
    let _ = add(&mut store, Some(root), (0.0, 0.0), (500, 500), OPAQUE);
    let _ = store.update_draw_properties(VIEWPORT);

    let mut tracker = Tracker::new(VIEWPORT, TrackerConfig::default());
    let mut checked = false;
    walk(&store, root, &mut tracker, |tracker, event| {
        if is_itself(event, inside) {
            assert!(tracker.occlusion_from_outside_target().is_empty());
            assert!(!tracker.occluded_layer(event.current(), PixelRect::new(0, 0, 100, 100)));
            checked = true;
        }
    });
    assert!(checked, "the copied content was visited");
}

/// Root children, back to front: a full-screen layer, a 100×100 surface at
/// (100, 100) holding translucent content, and an opaque strip covering
/// `x < 150`.
fn background_filter_scene(filters: FilterChain) -> (LayerStore, LayerId, LayerId, LayerId) {
    let mut store = LayerStore::new();
    let root = root(&mut store);
    let behind = add(&mut store, Some(root), (0.0, 0.0), (1000, 1000), OPAQUE);
    let surface = add(&mut store, Some(root), (100.0, 100.0), (100, 100), EMPTY);
    store.set_background_filters(surface, filters);
    let _ = add(&mut store, Some(surface), (0.0, 0.0), (100, 100), TRANSLUCENT);
    let _ = add(&mut store, Some(root), (0.0, 0.0), (150, 1000), OPAQUE);
    let _ = store.update_draw_properties(VIEWPORT);
    (store, root, surface, behind)
}

#[test]
fn background_filter_erodes_occlusion_around_surface() {
    let blur = FilterChain::new().with(FilterOperation::Blur(2.0));
    let (store, root, surface, behind) = background_filter_scene(blur);
    assert!(store.layer(surface).render_surface().is_some());

    let mut tracker = Tracker::new(VIEWPORT, TrackerConfig::default());
    let mut behind_occlusion = None;
    walk(&store, root, &mut tracker, |tracker, event| match event {
        TraversalEvent::Itself { target, .. } if target.id() == surface => {
            assert_eq!(
                tracker.occlusion_from_outside_target(),
                Region::from_rect(PixelRect::new(-100, -100, 150, 1000))
            );
        }
        TraversalEvent::ContributingSurface { surface: s, .. } => {
            // Only the part right of the strip can reach the screen.
            assert_eq!(
                tracker.unoccluded_surface_content_rect(s, PixelRect::new(0, 0, 100, 100)),
                PixelRect::new(50, 0, 50, 100)
            );
        }
        _ if is_itself(event, behind) => {
            let layer = event.current();
            // Blur(2) reaches 6 pixels, so a 6 pixel band of the strip next
            // to the visible footprint is revealed.
            assert!(tracker.occluded_layer(layer, PixelRect::new(0, 0, 144, 1000)));
            assert!(!tracker.occluded_layer(layer, PixelRect::new(144, 94, 6, 112)));
            assert!(tracker.occluded_layer(layer, PixelRect::new(144, 0, 6, 94)));
            behind_occlusion = Some(tracker.occlusion_from_inside_target());
        }
        _ => {}
    });

    let mut expected = Region::from_rect(PixelRect::new(0, 0, 150, 1000));
    expected.subtract_rect(PixelRect::new(144, 94, 62, 112));
    assert_eq!(behind_occlusion, Some(expected));
}

#[test]
fn no_erosion_without_background_filter() {
    let (store, root, _, behind) = background_filter_scene(FilterChain::new());
    let mut tracker = Tracker::new(VIEWPORT, TrackerConfig::default());
    let mut behind_occlusion = None;
    walk(&store, root, &mut tracker, |tracker, event| {
        if is_itself(event, behind) {
            behind_occlusion = Some(tracker.occlusion_from_inside_target());
        }
    });
    assert_eq!(
        behind_occlusion,
        Some(Region::from_rect(PixelRect::new(0, 0, 150, 1000)))
    );
}

#[test]
fn fully_occluded_filter_surface_skips_erosion() {
    let mut store = LayerStore::new();
    let root = root(&mut store);
    let behind = add(&mut store, Some(root), (0.0, 0.0), (1000, 1000), OPAQUE);
    let surface = add(&mut store, Some(root), (100.0, 100.0), (100, 100), EMPTY);
    store.set_background_filters(
        surface,
        FilterChain::new().with(FilterOperation::Blur(2.0)),
    );
    let _ = add(&mut store, Some(surface), (0.0, 0.0), (100, 100), TRANSLUCENT);
    let _ = add(&mut store, Some(root), (0.0, 0.0), (500, 500), OPAQUE);
    let _ = store.update_draw_properties(VIEWPORT);

    let mut tracker = Tracker::new(VIEWPORT, TrackerConfig::default());
    let mut behind_occlusion = None;
    walk(&store, root, &mut tracker, |tracker, event| {
        if is_itself(event, behind) {
            behind_occlusion = Some(tracker.occlusion_from_inside_target());
        }
    });
    assert_eq!(
        behind_occlusion,
        Some(Region::from_rect(PixelRect::new(0, 0, 500, 500)))
    );
}

/// A 200×200 layer at (10, 20) inside a surface at the origin, queried while
/// it is the current layer with `occlusion` installed by `install`.
fn query_in_surface(
    install: impl Fn(&mut Tracker<'_>),
    queries: &[(PixelRect, PixelRect)],
) {
    let mut store = LayerStore::new();
    let root = root(&mut store);
    let surface = add(&mut store, Some(root), (0.0, 0.0), (1000, 1000), SURFACE);
    let layer = add(&mut store, Some(surface), (10.0, 20.0), (200, 200), TRANSLUCENT);
    let _ = store.update_draw_properties(VIEWPORT);

    let mut tracker = Tracker::new(VIEWPORT, TrackerConfig::default());
    let mut checked = false;
    walk(&store, root, &mut tracker, |tracker, event| {
        if is_itself(event, layer) {
            install(tracker);
            let layer = event.current();
            for &(query, expected) in queries {
                assert_eq!(
                    tracker.unoccluded_layer_content_rect(layer, query),
                    expected,
                    "unoccluded part of {query:?}"
                );
                assert_eq!(
                    tracker.occluded_layer(layer, query),
                    expected.is_empty(),
                    "occlusion of {query:?}"
                );
            }
            checked = true;
        }
    });
    assert!(checked, "the queried layer was visited");
}

fn single_rect_queries() -> Vec<(PixelRect, PixelRect)> {
    Vec::from([
        (PixelRect::new(0, 0, 100, 100), PixelRect::new(0, 0, 100, 100)),
        (PixelRect::new(90, 30, 100, 100), PixelRect::new(140, 30, 50, 100)),
        (PixelRect::new(40, 0, 100, 100), PixelRect::new(40, 0, 100, 30)),
        (PixelRect::new(40, 80, 100, 100), PixelRect::new(40, 130, 100, 50)),
        (PixelRect::new(0, 0, 80, 100), PixelRect::new(0, 0, 80, 100)),
        (PixelRect::new(90, 80, 100, 100), PixelRect::new(90, 80, 100, 100)),
        (PixelRect::new(0, 80, 100, 100), PixelRect::new(0, 80, 100, 100)),
        (PixelRect::new(90, 0, 100, 100), PixelRect::new(90, 0, 100, 100)),
        (PixelRect::new(40, 30, 100, 100), PixelRect::ZERO),
        (PixelRect::new(40, 30, 10, 10), PixelRect::ZERO),
        (PixelRect::new(130, 120, 10, 10), PixelRect::ZERO),
        (PixelRect::new(80, 70, 50, 50), PixelRect::ZERO),
    ])
}

#[test]
fn layer_queries_against_outside_occlusion() {
    query_in_surface(
        |tracker| {
            tracker.set_occlusion_from_outside_target(Region::from_rect(PixelRect::new(
                50, 50, 100, 100,
            )));
        },
        &single_rect_queries(),
    );
}

#[test]
fn layer_queries_against_inside_occlusion() {
    query_in_surface(
        |tracker| {
            tracker.set_occlusion_from_inside_target(Region::from_rect(PixelRect::new(
                50, 50, 100, 100,
            )));
        },
        &single_rect_queries(),
    );
}

#[test]
fn layer_queries_against_split_occlusion() {
    let mut queries = single_rect_queries();
    // Each half spans the query alone on no side, so nothing is removed.
    queries[1] = (
        PixelRect::new(90, 30, 100, 100),
        PixelRect::new(90, 30, 100, 100),
    );
    query_in_surface(
        |tracker| {
            tracker.set_occlusion_from_outside_target(Region::from_rect(PixelRect::new(
                50, 50, 100, 50,
            )));
            tracker.set_occlusion_from_inside_target(Region::from_rect(PixelRect::new(
                50, 100, 100, 50,
            )));
        },
        &queries,
    );
}

#[test]
fn layer_queries_against_l_shaped_inside_and_outside_notch() {
    query_in_surface(
        |tracker| {
            tracker.set_occlusion_from_inside_target(region(&[
                PixelRect::new(50, 50, 100, 50),
                PixelRect::new(50, 100, 50, 50),
            ]));
            tracker.set_occlusion_from_outside_target(Region::from_rect(PixelRect::new(
                100, 100, 50, 50,
            )));
        },
        &[
            (PixelRect::new(40, 30, 100, 100), PixelRect::ZERO),
            (PixelRect::new(80, 70, 50, 50), PixelRect::ZERO),
            (
                PixelRect::new(30, 30, 100, 100),
                PixelRect::new(30, 30, 100, 100),
            ),
        ],
    );
}

#[cfg(debug_assertions)]
#[test]
#[should_panic(expected = "is outside the visible content rect")]
fn unoccluded_query_outside_visible_rect_panics() {
    let mut store = LayerStore::new();
    let root = root(&mut store);
    let layer = add(&mut store, Some(root), (0.0, 0.0), (100, 100), OPAQUE);
    let _ = store.update_draw_properties(VIEWPORT);

    let mut tracker = Tracker::new(VIEWPORT, TrackerConfig::default());
    walk(&store, root, &mut tracker, |tracker, event| {
        if is_itself(event, layer) {
            let _ = tracker.unoccluded_layer_content_rect(
                event.current(),
                PixelRect::new(50, 50, 100, 100),
            );
        }
    });
}

#[test]
fn contributing_frame_hooks_address_the_parent_target() {
    let mut store = LayerStore::new();
    let root = root(&mut store);
    let surface = add(&mut store, Some(root), (100.0, 100.0), (100, 100), SURFACE);
    let _ = add(&mut store, Some(surface), (0.0, 0.0), (100, 100), TRANSLUCENT);
    // Draws into the root first, so the root frame exists below the surface.
    let _ = add(&mut store, Some(root), (600.0, 600.0), (10, 10), TRANSLUCENT);
    let _ = store.update_draw_properties(VIEWPORT);

    let mut tracker = Tracker::new(VIEWPORT, TrackerConfig::default());
    let mut checked = false;
    walk(&store, root, &mut tracker, |tracker, event| {
        if let TraversalEvent::ContributingSurface { surface: s, .. } = event {
            let occluder = Region::from_rect(PixelRect::new(100, 100, 50, 100));
            tracker.set_occlusion_on_contributing_surface_from_inside_target(occluder.clone());
            assert_eq!(
                tracker.occlusion_on_contributing_surface_from_inside_target(),
                occluder
            );
            assert!(tracker
                .occlusion_on_contributing_surface_from_outside_target()
                .is_empty());
            assert_eq!(
                tracker.unoccluded_surface_content_rect(s, PixelRect::new(0, 0, 100, 100)),
                PixelRect::new(50, 0, 50, 100)
            );
            checked = true;
        }
    });
    assert!(checked, "the surface contributed to the root");
}

#[test]
fn masks_to_bounds_clips_child_occlusion() {
    let mut store = LayerStore::new();
    let root = add(&mut store, None, (0.0, 0.0), (200, 200), EMPTY);
    let clipping = LayerFlags {
        masks_to_bounds: true,
        ..OPAQUE
    };
    let a = add(&mut store, Some(root), (0.0, 0.0), (100, 100), clipping);
    let _ = add(&mut store, Some(a), (30.0, 30.0), (500, 500), OPAQUE);
    let _ = store.update_draw_properties(VIEWPORT);

    let mut tracker = Tracker::new(VIEWPORT, TrackerConfig::default());
    let mut checked = false;
    walk(&store, root, &mut tracker, |tracker, event| {
        if is_itself(event, a) {
            assert_eq!(
                tracker.occlusion_from_inside_target(),
                Region::from_rect(PixelRect::new(30, 30, 70, 70))
            );
            assert!(tracker.occlusion_from_outside_target().is_empty());
            checked = true;
        }
    });
    assert!(checked, "the clipping layer was visited");
}

#[test]
fn opaque_contents_rect_occludes_only_its_part() {
    let mut store = LayerStore::new();
    let root = add(&mut store, None, (0.0, 0.0), (300, 300), EMPTY);
    let layer = add(&mut store, Some(root), (100.0, 100.0), (200, 200), TRANSLUCENT);
    store.set_opaque_contents_rect(layer, PixelRect::new(0, 0, 100, 100));
    let _ = store.update_draw_properties(VIEWPORT);

    assert_eq!(
        final_occlusion(&store, root, TrackerConfig::default()),
        Region::from_rect(PixelRect::new(100, 100, 100, 100))
    );
}

#[test]
fn two_background_filters_erode_twice() {
    let mut store = LayerStore::new();
    let root = add(&mut store, None, (0.0, 0.0), (75, 75), EMPTY);
    let parent = add(
        &mut store,
        Some(root),
        (0.0, 0.0),
        (150, 150),
        LayerFlags {
            masks_to_bounds: true,
            ..SURFACE
        },
    );
    store.set_transform(parent, Transform3d::from_scale(0.5, 0.5, 1.0));
    let blur = FilterChain::new().with(FilterOperation::Blur(1.0));
    let filtered = LayerFlags {
        force_render_surface: true,
        ..TRANSLUCENT
    };
    for _ in 0..2 {
        let surface = add(&mut store, Some(parent), (0.0, 0.0), (300, 300), filtered);
        store.set_transform(surface, Transform3d::from_scale(0.5, 0.5, 1.0));
        store.set_background_filters(surface, blur.clone());
    }
    let _ = add(&mut store, Some(parent), (100.0, 100.0), (50, 50), OPAQUE);
    let _ = store.update_draw_properties(VIEWPORT);

    // Blur(1) reaches 3 pixels; each filter pulls 3 pixels in from each side
    // of the 25×25 occluder footprint.
    let outset = blur.outsets();
    assert_eq!(outset, FilterOutsets::uniform(3));
    let expected = Region::from_rect(PixelRect::new(56, 56, 13, 13));

    let mut tracker = Tracker::new(VIEWPORT, TrackerConfig::default());
    let mut checked = false;
    walk(&store, root, &mut tracker, |tracker, event| {
        // `parent` draws no content, so its own target step is the last
        // point where its frame is current.
        if matches!(event, TraversalEvent::TargetSurface(owner) if owner.id() == parent) {
            assert_eq!(tracker.occlusion_from_inside_target(), expected);
            assert_eq!(tracker.occlusion_from_outside_target(), expected);
            checked = true;
        }
    });
    assert!(checked, "the parent surface finished its target");
}
