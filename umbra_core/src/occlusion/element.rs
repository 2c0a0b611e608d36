// Copyright 2026 the Umbra Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The read-only view of a scene element that the tracker consumes.

use core::fmt::Debug;

use crate::effect::{BlendMode, FilterChain};
use crate::geometry::PixelRect;
use crate::region::Region;
use crate::transform::Transform3d;

/// What an element is, as far as opaque coverage goes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ElementKind {
    /// An ordinary layer drawing into its target.
    #[default]
    Plain,
    /// A layer that owns a render surface; its own content still draws into
    /// that surface like a plain layer.
    SurfaceOwning,
    /// A reflection of another layer's surface. Replicas never draw content
    /// of their own.
    Replica,
}

/// Draw properties of an offscreen render surface.
///
/// A surface is owned by a layer; its content is everything drawn into it
/// (the owner plus descendants that do not own surfaces themselves). The
/// surface is then composited into its *target*, the nearest ancestor
/// surface.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderSurface {
    /// Maps surface space into the target's space.
    pub draw_transform: Transform3d,
    /// Maps surface space to the screen.
    pub screen_space_transform: Transform3d,
    /// Maps surface space into the target's space for the replica copy.
    pub replica_draw_transform: Transform3d,
    /// Bounds of everything drawn into the surface, in surface space.
    pub content_rect: PixelRect,
    /// Whether [`clip_rect`](Self::clip_rect) applies.
    pub is_clipped: bool,
    /// Clip in the target's space.
    pub clip_rect: PixelRect,
    /// Opacity the surface is composited with.
    pub draw_opacity: f32,
    /// Whether [`draw_opacity`](Self::draw_opacity) is animating.
    pub draw_opacity_is_animating: bool,
    /// Whether the transform into the target is animating.
    pub target_surface_transforms_are_animating: bool,
    /// Whether the transform to the screen is animating.
    pub screen_space_transforms_are_animating: bool,
}

impl Default for RenderSurface {
    fn default() -> Self {
        Self {
            draw_transform: Transform3d::IDENTITY,
            screen_space_transform: Transform3d::IDENTITY,
            replica_draw_transform: Transform3d::IDENTITY,
            content_rect: PixelRect::ZERO,
            is_clipped: false,
            clip_rect: PixelRect::ZERO,
            draw_opacity: 1.0,
            draw_opacity_is_animating: false,
            target_surface_transforms_are_animating: false,
            screen_space_transforms_are_animating: false,
        }
    }
}

/// A handle to a scene element with computed draw properties.
///
/// Implementors are cheap copyable references into some scene
/// representation. Render surfaces are addressed through the layer that
/// owns them: a `target` is always the owning layer of a target surface.
///
/// All geometry is expected to be the output of a draw-properties pass that
/// ran before traversal; the tracker never mutates the scene.
pub trait OcclusionElement: Copy + PartialEq + Debug {
    /// Stable index for diagnostics.
    fn index(&self) -> u32;

    /// Kind tag deciding how opaque coverage is derived.
    fn kind(&self) -> ElementKind;

    /// Parent in the scene. For masks and replicas this is the owning layer.
    fn parent(&self) -> Option<Self>;

    /// Owner of the surface this element draws into.
    fn render_target(&self) -> Self;

    /// The surface this element owns, if any.
    fn render_surface(&self) -> Option<RenderSurface>;

    /// Mask layer attached to this element.
    fn mask_layer(&self) -> Option<Self>;

    /// Replica layer attached to this element.
    fn replica_layer(&self) -> Option<Self>;

    /// Part of the content bounds that can end up on screen, in content
    /// space.
    fn visible_content_rect(&self) -> PixelRect;

    /// Opaque pixels within [`visible_content_rect`](Self::visible_content_rect).
    fn visible_content_opaque_region(&self) -> Region;

    /// Maps content space into the render target's space.
    fn draw_transform(&self) -> Transform3d;

    /// Maps content space to the screen.
    fn screen_space_transform(&self) -> Transform3d;

    /// Whether [`clip_rect`](Self::clip_rect) applies.
    fn is_clipped(&self) -> bool;

    /// Clip in the render target's space.
    fn clip_rect(&self) -> PixelRect;

    /// Filters applied to the element's own output.
    fn filters(&self) -> &FilterChain;

    /// Filters applied to whatever is behind the element.
    fn background_filters(&self) -> &FilterChain;

    /// Blend mode used when compositing into the target.
    fn blend_mode(&self) -> BlendMode;

    /// Opacity accumulated since the render target.
    fn draw_opacity(&self) -> f32;

    /// Whether [`draw_opacity`](Self::draw_opacity) may change without a new
    /// draw-properties pass.
    fn draw_opacity_is_animating(&self) -> bool;

    /// Whether [`draw_transform`](Self::draw_transform) is animating.
    fn draw_transform_is_animating(&self) -> bool;

    /// Whether [`screen_space_transform`](Self::screen_space_transform) is
    /// animating.
    fn screen_space_transform_is_animating(&self) -> bool;

    /// Whether a readback of this element's surface was requested.
    fn has_copy_request(&self) -> bool;

    /// Whether this element hides itself and its subtree.
    fn hide_layer_and_subtree(&self) -> bool;

    /// 3D rendering context; `0` means none.
    fn sorting_context_id(&self) -> i32;

    /// Nearest surface owner (possibly this element) whose content must not
    /// be occluded by anything outside it.
    fn nearest_occlusion_immune_ancestor(&self) -> Option<Self>;
}
