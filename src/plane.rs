use std::collections::HashMap;

use cgmath::InnerSpace;
use log::debug;

use crate::error::CompileError;
use crate::math::{plane_distance, Vec3};

/// Axis classification of a plane, for the fast side test and the axial
/// bonus in split selection.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PlaneKind {
    AxialX,
    AxialY,
    AxialZ,
    NonAxial,
}

impl PlaneKind {
    pub fn of(normal: Vec3) -> PlaneKind {
        if normal.x == 1.0 || normal.x == -1.0 {
            PlaneKind::AxialX
        } else if normal.y == 1.0 || normal.y == -1.0 {
            PlaneKind::AxialY
        } else if normal.z == 1.0 || normal.z == -1.0 {
            PlaneKind::AxialZ
        } else {
            PlaneKind::NonAxial
        }
    }

    pub fn is_axial(&self) -> bool {
        *self != PlaneKind::NonAxial
    }
}

/// Which side of a plane a point (or winding) is on.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PlaneSide {
    Front,
    Back,
    On,
}

/// An infinite half-space boundary. Immutable once interned in the table.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Plane {
    pub normal: Vec3,
    pub dist: f32,
    pub kind: PlaneKind,
}

impl Plane {
    pub fn new(normal: Vec3, dist: f32) -> Plane {
        Plane {
            normal,
            dist,
            kind: PlaneKind::of(normal),
        }
    }

    pub fn flipped(&self) -> Plane {
        Plane::new(-self.normal, -self.dist)
    }

    /// Signed distance from a point to this plane, with the axial fast path.
    #[inline]
    pub fn distance_to(&self, point: Vec3) -> f32 {
        match self.kind {
            PlaneKind::AxialX => self.normal.x * point.x - self.dist,
            PlaneKind::AxialY => self.normal.y * point.y - self.dist,
            PlaneKind::AxialZ => self.normal.z * point.z - self.dist,
            PlaneKind::NonAxial => plane_distance(point, self.normal, self.dist),
        }
    }

    pub fn side_of(&self, point: Vec3, epsilon: f32) -> PlaneSide {
        let d = self.distance_to(point);
        if d > epsilon {
            PlaneSide::Front
        } else if d < -epsilon {
            PlaneSide::Back
        } else {
            PlaneSide::On
        }
    }
}

/// Identifier of an interned plane. Planes are stored in +/- pairs, so
/// `id ^ 1` is always the opposite-facing plane.
pub type PlaneId = usize;

#[inline]
pub fn opposite(id: PlaneId) -> PlaneId {
    id ^ 1
}

/// Deduplicated registry of splitting planes. Everything downstream refers
/// to planes by index, so entries are never removed during a compile.
pub struct PlaneTable {
    planes: Vec<Plane>,
    hash: HashMap<i32, Vec<PlaneId>>,
    normal_epsilon: f32,
    dist_epsilon: f32,
    capacity: usize,
}

impl PlaneTable {
    pub fn new(normal_epsilon: f32, dist_epsilon: f32, capacity: usize) -> PlaneTable {
        PlaneTable {
            planes: Vec::new(),
            hash: HashMap::new(),
            normal_epsilon,
            dist_epsilon,
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.planes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.planes.is_empty()
    }

    #[inline]
    pub fn plane(&self, id: PlaneId) -> &Plane {
        &self.planes[id]
    }

    fn hash_key(dist: f32) -> i32 {
        (dist.abs() / 8.0) as i32
    }

    fn matches(&self, plane: &Plane, normal: Vec3, dist: f32) -> bool {
        (plane.dist - dist).abs() <= self.dist_epsilon
            && (plane.normal.x - normal.x).abs() <= self.normal_epsilon
            && (plane.normal.y - normal.y).abs() <= self.normal_epsilon
            && (plane.normal.z - normal.z).abs() <= self.normal_epsilon
    }

    /// Snap near-axial normals exactly onto the axis and near-integer
    /// distances onto the integer, so coplanar faces authored with slight
    /// float error land on one shared plane.
    fn snap(&self, normal: Vec3, dist: f32) -> (Vec3, f32) {
        let mut normal = normal.normalize();
        for i in 0..3 {
            if (normal[i] - 1.0).abs() < self.normal_epsilon {
                normal = Vec3::new(0.0, 0.0, 0.0);
                normal[i] = 1.0;
                break;
            }
            if (normal[i] + 1.0).abs() < self.normal_epsilon {
                normal = Vec3::new(0.0, 0.0, 0.0);
                normal[i] = -1.0;
                break;
            }
        }
        let rounded = dist.round();
        let dist = if (dist - rounded).abs() < self.dist_epsilon {
            rounded
        } else {
            dist
        };
        (normal, dist)
    }

    /// True when the plane faces its canonical direction: the first nonzero
    /// normal component is positive. The canonical plane of each pair gets
    /// the even index.
    fn is_canonical(normal: Vec3) -> bool {
        for i in 0..3 {
            if normal[i] > 0.0 {
                return true;
            }
            if normal[i] < 0.0 {
                return false;
            }
        }
        false
    }

    /// Intern a plane, returning the id of the existing entry that matches
    /// within the table epsilons (the opposite orientation is found through
    /// its paired entry) or of a freshly allocated pair.
    pub fn find_or_insert(&mut self, normal: Vec3, dist: f32) -> Result<PlaneId, CompileError> {
        let (normal, dist) = self.snap(normal, dist);

        // Matching entries can sit one bucket over when dist is near a
        // bucket boundary, so probe the neighbors too.
        let key = Self::hash_key(dist);
        for k in [key, key - 1, key + 1] {
            if let Some(ids) = self.hash.get(&k) {
                for &id in ids {
                    if self.matches(&self.planes[id], normal, dist) {
                        return Ok(id);
                    }
                    if self.matches(&self.planes[id], -normal, -dist) {
                        return Ok(opposite(id));
                    }
                }
            }
        }

        if self.planes.len() + 2 > self.capacity {
            return Err(CompileError::TooManyPlanes(self.capacity));
        }

        let (canonical, canonical_dist, flipped) = if Self::is_canonical(normal) {
            (normal, dist, false)
        } else {
            (-normal, -dist, true)
        };

        let id = self.planes.len();
        self.planes.push(Plane::new(canonical, canonical_dist));
        self.planes.push(Plane::new(-canonical, -canonical_dist));
        self.hash
            .entry(Self::hash_key(canonical_dist))
            .or_default()
            .push(id);
        debug!(
            "plane {} ({:.3} {:.3} {:.3}) {:.3}",
            id, canonical.x, canonical.y, canonical.z, canonical_dist
        );

        Ok(if flipped { opposite(id) } else { id })
    }
}
