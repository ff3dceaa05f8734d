use arrayvec::ArrayVec;
use cgmath::InnerSpace;

use crate::bounds::Bounds;
use crate::error::CompileError;
use crate::math::{
    line_plane_intersection, plane_distance, points_are_same, Vec3, DEGENERATE_EPSILON,
    WORLD_EXTENT,
};
use crate::plane::{Plane, PlaneKind, PlaneSide};

/// Maximum vertices a winding may carry. Splitting past this is fatal; it
/// only happens with degenerate input geometry or a runaway tree.
pub const MAX_WINDING_POINTS: usize = 96;

/// Result of splitting a winding with a plane.
#[derive(Clone, Debug, PartialEq)]
pub enum SplitResult {
    /// Winding lies on the plane within epsilon.
    OnPlane,
    /// Winding is entirely in front of the plane.
    Front,
    /// Winding is entirely behind the plane.
    Back,
    /// Winding crosses the plane.
    Split { front: Winding, back: Winding },
}

/// A convex polygon as an ordered vertex loop. The transient currency of
/// the whole compiler: brush sides, tree faces and portals all carry one.
#[derive(Clone, Debug, PartialEq)]
pub struct Winding {
    pub points: ArrayVec<Vec3, MAX_WINDING_POINTS>,
}

impl Winding {
    pub fn new() -> Winding {
        Winding { points: ArrayVec::new() }
    }

    pub fn from_points(points: &[Vec3]) -> Winding {
        let mut winding = Winding::new();
        let _ = winding.points.try_extend_from_slice(points);
        winding
    }

    /// A huge quad lying on the given plane, the starting point for deriving
    /// brush side windings and portal windings by repeated chopping.
    pub fn base_for_plane(normal: Vec3, dist: f32) -> Winding {
        // Project a world axis that is not the normal's major axis onto
        // the plane to get the up vector.
        let major = if normal.x.abs() >= normal.y.abs() && normal.x.abs() >= normal.z.abs() {
            0
        } else if normal.y.abs() >= normal.z.abs() {
            1
        } else {
            2
        };
        let axis = if major == 2 {
            Vec3::new(1.0, 0.0, 0.0)
        } else {
            Vec3::new(0.0, 0.0, 1.0)
        };

        let org = normal * dist;
        let mut up = axis - normal * axis.dot(normal);
        up = up.normalize() * WORLD_EXTENT;
        let right = up.cross(normal);

        let mut winding = Winding::new();
        winding.points.push(org - right + up);
        winding.points.push(org + right + up);
        winding.points.push(org + right - up);
        winding.points.push(org - right - up);
        winding
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn reversed(&self) -> Winding {
        let mut winding = self.clone();
        winding.points.reverse();
        winding
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::from_points(&self.points)
    }

    pub fn center(&self) -> Vec3 {
        let mut sum = Vec3::new(0.0, 0.0, 0.0);
        for point in &self.points {
            sum += *point;
        }
        sum / self.points.len() as f32
    }

    pub fn area(&self) -> f32 {
        let mut area = 0.0;
        for i in 2..self.points.len() {
            let d1 = self.points[i - 1] - self.points[0];
            let d2 = self.points[i] - self.points[0];
            area += d1.cross(d2).magnitude();
        }
        area * 0.5
    }

    /// Plane the winding lies on, from its first three vertices
    /// (counter-clockwise winding order, normal facing the viewer).
    pub fn plane(&self) -> Plane {
        let v1 = self.points[1] - self.points[0];
        let v2 = self.points[2] - self.points[0];
        let normal = v2.cross(v1).normalize();
        Plane::new(normal, self.points[0].dot(normal))
    }

    /// A winding whose every extent is below the degenerate threshold, or
    /// that collapsed below 3 points, carries no usable area.
    pub fn is_degenerate(&self) -> bool {
        if self.points.len() < 3 {
            return true;
        }
        let bounds = self.bounds();
        let size = bounds.size();
        size.x < DEGENERATE_EPSILON && size.y < DEGENERATE_EPSILON && size.z < DEGENERATE_EPSILON
    }

    /// A winding with edges shorter than the merge threshold on every side.
    /// Tiny fragments are dropped rather than kept as slivers.
    pub fn is_tiny(&self) -> bool {
        let mut edges = 0;
        for i in 0..self.points.len() {
            let j = (i + 1) % self.points.len();
            if !points_are_same(self.points[i], self.points[j]) {
                edges += 1;
            }
        }
        edges < 3
    }

    /// Classify every vertex against the plane and split at sign changes.
    /// Points within `epsilon` of the plane count as on it and are emitted
    /// to both halves. A winding entirely on the plane reports `OnPlane`;
    /// `clip` and `chop` decide what that means for their callers.
    pub fn split(
        &self,
        normal: Vec3,
        dist: f32,
        epsilon: f32,
    ) -> Result<SplitResult, CompileError> {
        let mut dists: ArrayVec<f32, { MAX_WINDING_POINTS + 1 }> = ArrayVec::new();
        let mut sides: ArrayVec<PlaneSide, { MAX_WINDING_POINTS + 1 }> = ArrayVec::new();
        let mut counts = [0usize; 3];

        for point in &self.points {
            let d = plane_distance(*point, normal, dist);
            let side = if d > epsilon {
                PlaneSide::Front
            } else if d < -epsilon {
                PlaneSide::Back
            } else {
                PlaneSide::On
            };
            counts[side as usize] += 1;
            dists.push(d);
            sides.push(side);
        }
        dists.push(dists[0]);
        sides.push(sides[0]);

        if counts[PlaneSide::Front as usize] == 0 && counts[PlaneSide::Back as usize] == 0 {
            return Ok(SplitResult::OnPlane);
        }
        if counts[PlaneSide::Back as usize] == 0 {
            return Ok(SplitResult::Front);
        }
        if counts[PlaneSide::Front as usize] == 0 {
            return Ok(SplitResult::Back);
        }

        if self.points.len() + 4 > MAX_WINDING_POINTS {
            return Err(CompileError::WindingOverflow(MAX_WINDING_POINTS));
        }

        let mut front = Winding::new();
        let mut back = Winding::new();
        let plane_kind = PlaneKind::of(normal);

        for i in 0..self.points.len() {
            let p1 = self.points[i];

            if sides[i] == PlaneSide::On {
                front.points.push(p1);
                back.points.push(p1);
                continue;
            }
            if sides[i] == PlaneSide::Front {
                front.points.push(p1);
            } else {
                back.points.push(p1);
            }

            if sides[i + 1] == PlaneSide::On || sides[i + 1] == sides[i] {
                continue;
            }

            // Crossing: generate the intersection point, snapping the
            // axial coordinate exactly to avoid epsilon creep.
            let p2 = self.points[(i + 1) % self.points.len()];
            let mut mid = line_plane_intersection(p1, p2, normal, dist);
            match plane_kind {
                PlaneKind::AxialX => mid.x = normal.x * dist,
                PlaneKind::AxialY => mid.y = normal.y * dist,
                PlaneKind::AxialZ => mid.z = normal.z * dist,
                PlaneKind::NonAxial => {}
            }
            front.points.push(mid);
            back.points.push(mid);
        }

        Ok(SplitResult::Split { front, back })
    }

    /// Split into (front, back) fragments. A winding lying on the plane is
    /// routed to the front when `keep_on` is set, else discarded. Degenerate
    /// fragments come back as `None`.
    pub fn clip(
        self,
        normal: Vec3,
        dist: f32,
        epsilon: f32,
        keep_on: bool,
    ) -> Result<(Option<Winding>, Option<Winding>), CompileError> {
        match self.split(normal, dist, epsilon)? {
            SplitResult::OnPlane => {
                if keep_on {
                    Ok((Some(self), None))
                } else {
                    Ok((None, None))
                }
            }
            SplitResult::Front => Ok((Some(self), None)),
            SplitResult::Back => Ok((None, Some(self))),
            SplitResult::Split { front, back } => Ok((
                if front.is_degenerate() { None } else { Some(front) },
                if back.is_degenerate() { None } else { Some(back) },
            )),
        }
    }

    /// Keep only the part in front of the plane.
    pub fn chop(
        self,
        normal: Vec3,
        dist: f32,
        epsilon: f32,
    ) -> Result<Option<Winding>, CompileError> {
        let (front, _) = self.clip(normal, dist, epsilon, true)?;
        Ok(front)
    }
}

impl Default for Winding {
    fn default() -> Self {
        Self::new()
    }
}
