use crate::math::Vec3;

/// A rectangular minimum bounding volume.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub min: Vec3,
    pub max: Vec3,
    pub is_valid: bool,
}

impl Default for Bounds {
    fn default() -> Self {
        Self::new()
    }
}

impl Bounds {
    pub fn new() -> Bounds {
        Bounds {
            min: Vec3::new(0.0, 0.0, 0.0),
            max: Vec3::new(0.0, 0.0, 0.0),
            is_valid: false,
        }
    }

    pub fn from_min_max(min: Vec3, max: Vec3) -> Bounds {
        Bounds { min, max, is_valid: true }
    }

    pub fn from_points(points: &[Vec3]) -> Bounds {
        let mut bounds = Bounds::new();
        bounds.add_points(points);
        bounds
    }

    /// Returns the midpoint between the min and max points.
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Returns the extent around the center.
    pub fn extent(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn add_point(&mut self, point: Vec3) {
        if self.is_valid {
            self.min.x = self.min.x.min(point.x);
            self.min.y = self.min.y.min(point.y);
            self.min.z = self.min.z.min(point.z);
            self.max.x = self.max.x.max(point.x);
            self.max.y = self.max.y.max(point.y);
            self.max.z = self.max.z.max(point.z);
        } else {
            self.min = point;
            self.max = point;
            self.is_valid = true;
        }
    }

    pub fn add_points(&mut self, points: &[Vec3]) {
        for point in points {
            self.add_point(*point);
        }
    }

    pub fn add_bounds(&mut self, other: &Bounds) {
        if self.is_valid && other.is_valid {
            self.add_point(other.min);
            self.add_point(other.max);
        } else if other.is_valid {
            *self = *other;
        }
    }

    pub fn expand_by(&self, w: f32) -> Bounds {
        Bounds::from_min_max(
            self.min - Vec3::new(w, w, w),
            self.max + Vec3::new(w, w, w),
        )
    }

    pub fn intersects(&self, other: &Bounds) -> bool {
        self.min.x <= other.max.x && self.max.x >= other.min.x
            && self.min.y <= other.max.y && self.max.y >= other.min.y
            && self.min.z <= other.max.z && self.max.z >= other.min.z
    }

    pub fn contains(&self, point: Vec3) -> bool {
        self.is_valid
            && point.x >= self.min.x && point.x <= self.max.x
            && point.y >= self.min.y && point.y <= self.max.y
            && point.z >= self.min.z && point.z <= self.max.z
    }
}
