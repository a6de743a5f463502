//! Responsive scaling of the lettering.

use scene_shared::{
    config::LayoutConfig,
    math::Vec3,
    scene::{PrimitiveId, SceneGraph},
    viewport::ViewportState,
};

/// Uniform scale for the current viewport width.
///
/// `clamp(width / reference_width, min_scale, max_scale)`. A zero, negative
/// or NaN width yields `min_scale`; an infinite one yields `max_scale`.
pub fn responsive_scale(viewport: ViewportState, layout: &LayoutConfig) -> f32 {
    let width = viewport.width;
    if width.is_nan() || width <= 0.0 {
        return layout.min_scale;
    }
    (width / layout.reference_width).clamp(layout.min_scale, layout.max_scale)
}

/// Writes `scale` to the group node only, so letter spacing is preserved.
///
/// Returns false if the group does not exist.
pub fn apply_group_scale(graph: &mut SceneGraph, group: PrimitiveId, scale: f32) -> bool {
    match graph.get_mut(group) {
        Some(node) => {
            node.transform.scale = Vec3::splat(scale);
            true
        }
        None => false,
    }
}
