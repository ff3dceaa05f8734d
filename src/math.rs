use cgmath::{InnerSpace, Vector3};

pub type Vec3 = Vector3<f32>;

// Numeric tolerances shared by the whole pipeline. These are compile-wide
// constants, not per-call knobs; the plane table's normal/distance epsilons
// are the only tolerances exposed through `CompileOptions`.

/// Thickness of a plane for front/back/on point classification.
pub const ON_EPSILON: f32 = 0.1;
/// Thickness used when clipping brush sides and volumes down the tree.
pub const CLIP_EPSILON: f32 = 0.1;
/// Two plane normals match if their components differ by less than this.
pub const NORMAL_EPSILON: f32 = 0.00001;
/// Two plane distances match if they differ by less than this.
pub const DIST_EPSILON: f32 = 0.01;
/// Windings with any bounding extent below this are dropped as slivers.
pub const DEGENERATE_EPSILON: f32 = 0.1;
/// Two winding points are the same point if within this distance.
pub const POINT_EPSILON: f32 = 0.1;

/// Half-extent of the representable world. Base windings for splitting
/// planes are built at this size so they cover any tree volume.
pub const WORLD_EXTENT: f32 = 65536.0;

/// Signed distance from a point to a plane given as (normal, dist).
#[inline]
pub fn plane_distance(point: Vec3, normal: Vec3, dist: f32) -> f32 {
    point.dot(normal) - dist
}

pub fn points_are_same(p: Vec3, q: Vec3) -> bool {
    (p.x - q.x).abs() < POINT_EPSILON
        && (p.y - q.y).abs() < POINT_EPSILON
        && (p.z - q.z).abs() < POINT_EPSILON
}

/// Intersection of the line through `p1`/`p2` with a plane. The segment must
/// actually cross the plane; callers guarantee this from their side tests.
pub fn line_plane_intersection(p1: Vec3, p2: Vec3, normal: Vec3, dist: f32) -> Vec3 {
    let d1 = plane_distance(p1, normal, dist);
    let d2 = plane_distance(p2, normal, dist);
    p1 + (p2 - p1) * (d1 / (d1 - d2))
}
