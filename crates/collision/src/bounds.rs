use glam::DVec3;
use saberline_common::{Aabb, Pose};

use crate::cut::SaberDimensions;

/// Box around everything the blade touched between two frames, grown by
/// `padding` so that a block whose centre lies outside cannot be reached.
///
/// Used as a broadphase: only blocks whose centre is inside go through the
/// full cut test.
pub fn sweep_bounds(saber_prev: &Pose, saber: &Pose, dims: &SaberDimensions, padding: f64) -> Aabb {
    let inner = dims.handle_length / 2.0;
    let points = [
        saber_prev.point_along(inner),
        saber_prev.point_along(dims.saber_length),
        saber.point_along(inner),
        saber.point_along(dims.saber_length),
    ];
    let mut min = points[0];
    let mut max = points[0];
    for p in &points[1..] {
        min = min.min(*p);
        max = max.max(*p);
    }
    Aabb::new(min, max).expanded(padding)
}

/// Padding that keeps every point of `hitbox` reachable from its centre.
pub fn hitbox_reach(hitbox: &Aabb) -> f64 {
    hitbox.half_extents().length()
}

/// Whether a block at `block_center` is worth a narrow-phase cut test.
pub fn may_reach(bounds: &Aabb, block_center: DVec3) -> bool {
    bounds.contains_point(block_center)
}
