use cgmath::InnerSpace;
use log::warn;

use crate::bounds::Bounds;
use crate::error::CompileError;
use crate::math::{Vec3, CLIP_EPSILON, ON_EPSILON};
use crate::plane::{opposite, PlaneId, PlaneTable};
use crate::shader::{ContentFlags, ShaderInfo, SurfaceFlags};
use crate::winding::Winding;

/// Brushes whose split fragments fall below this volume are dropped.
const MIN_BRUSH_VOLUME: f32 = 1.0;

/// One face of a brush: a plane, the winding derived from it, and the
/// shader that decides how the face participates in the compile.
#[derive(Clone, Debug)]
pub struct BrushSide {
    pub plane: PlaneId,
    pub winding: Option<Winding>,
    /// Convex hull of the fragments that survived clipping into the tree.
    pub visible_hull: Option<Winding>,
    pub shader: ShaderInfo,
    /// Side produced at least one surviving fragment and will be emitted.
    pub visible: bool,
    /// Side only bevels the hull; it carries no winding of its own.
    pub bevel: bool,
}

impl BrushSide {
    pub fn new(plane: PlaneId, shader: ShaderInfo) -> BrushSide {
        BrushSide {
            plane,
            winding: None,
            visible_hull: None,
            shader,
            visible: false,
            bevel: false,
        }
    }
}

/// A convex solid: the intersection of its sides' half-spaces.
#[derive(Clone, Debug)]
pub struct Brush {
    pub sides: Vec<BrushSide>,
    pub bounds: Bounds,
    pub contents: ContentFlags,
    /// Entity this brush belongs to and its index there.
    pub entity_num: usize,
    pub brush_num: usize,
}

impl Brush {
    pub fn from_sides(entity_num: usize, brush_num: usize, sides: Vec<BrushSide>) -> Brush {
        let mut contents = ContentFlags::empty();
        for side in &sides {
            contents |= side.shader.contents;
        }
        Brush {
            sides,
            bounds: Bounds::new(),
            contents,
            entity_num,
            brush_num,
        }
    }

    pub fn opaque(&self) -> bool {
        self.contents.contains(ContentFlags::Solid)
            && !self.contents.contains(ContentFlags::Translucent)
    }

    pub fn is_detail(&self) -> bool {
        self.contents.contains(ContentFlags::Detail)
    }

    pub fn is_areaportal(&self) -> bool {
        self.contents.contains(ContentFlags::AreaPortal)
    }

    /// Derive every side's winding by chopping a huge base quad with all
    /// the other sides, and accumulate the brush bounds. Returns false if
    /// the brush collapses to nothing (malformed input geometry).
    pub fn create_windings(&mut self, planes: &PlaneTable) -> Result<bool, CompileError> {
        self.bounds = Bounds::new();

        for i in 0..self.sides.len() {
            let plane = planes.plane(self.sides[i].plane);
            let mut winding = Some(Winding::base_for_plane(plane.normal, plane.dist));
            for j in 0..self.sides.len() {
                if i == j {
                    continue;
                }
                if self.sides[j].plane == opposite(self.sides[i].plane) {
                    // Back-to-back sides would erase each other.
                    continue;
                }
                let clip = planes.plane(opposite(self.sides[j].plane));
                winding = match winding {
                    Some(w) => w.chop(clip.normal, clip.dist, CLIP_EPSILON)?,
                    None => None,
                };
            }
            if let Some(w) = &winding {
                self.bounds.add_points(&w.points);
            }
            self.sides[i].bevel = winding.is_none();
            self.sides[i].winding = winding;
        }

        Ok(self.sides.iter().any(|side| side.winding.is_some()))
    }

    /// Volume from the side windings: tetrahedra against a corner point.
    pub fn volume(&self, planes: &PlaneTable) -> f32 {
        let corner = match self
            .sides
            .iter()
            .find_map(|side| side.winding.as_ref())
            .map(|w| w.points[0])
        {
            Some(point) => point,
            None => return 0.0,
        };

        let mut volume = 0.0;
        for side in &self.sides {
            let winding = match &side.winding {
                Some(w) => w,
                None => continue,
            };
            let plane = planes.plane(side.plane);
            let d = -plane.distance_to(corner);
            volume += d * winding.area();
        }
        volume / 3.0
    }

    /// Split the brush volume in two with a plane. Either half can come
    /// back `None` when the brush sits entirely on one side (or a fragment
    /// collapses below the minimum volume).
    pub fn split(
        &self,
        split_plane: PlaneId,
        planes: &PlaneTable,
    ) -> Result<(Option<Brush>, Option<Brush>), CompileError> {
        let plane = *planes.plane(split_plane);

        // Quick extent test against all side windings.
        let mut d_front = f32::MIN;
        let mut d_back = f32::MAX;
        for side in &self.sides {
            if let Some(winding) = &side.winding {
                for point in &winding.points {
                    let d = plane.distance_to(*point);
                    d_front = d_front.max(d);
                    d_back = d_back.min(d);
                }
            }
        }
        if d_front < 0.1 {
            return Ok((None, Some(self.clone())));
        }
        if d_back > -0.1 {
            return Ok((Some(self.clone()), None));
        }

        // The cross-section of the brush along the split plane.
        let mut midwinding = Some(Winding::base_for_plane(plane.normal, plane.dist));
        for side in &self.sides {
            let clip = planes.plane(opposite(side.plane));
            midwinding = match midwinding {
                Some(w) => w.chop(clip.normal, clip.dist, CLIP_EPSILON)?,
                None => None,
            };
        }
        let midwinding = match midwinding {
            Some(w) if !w.is_tiny() => w,
            _ => {
                // The plane only shaves the brush; put it all on the
                // heavier side.
                return if d_front > -d_back {
                    Ok((Some(self.clone()), None))
                } else {
                    Ok((None, Some(self.clone())))
                };
            }
        };

        let mut front = self.hollow_copy();
        let mut back = self.hollow_copy();

        for side in &self.sides {
            let winding = match &side.winding {
                Some(w) => w.clone(),
                None => continue,
            };
            let (fw, bw) = winding.clip(plane.normal, plane.dist, CLIP_EPSILON, false)?;
            if let Some(w) = fw {
                let mut s = side.clone();
                s.winding = Some(w);
                s.visible_hull = None;
                front.sides.push(s);
            }
            if let Some(w) = bw {
                let mut s = side.clone();
                s.winding = Some(w);
                s.visible_hull = None;
                back.sides.push(s);
            }
        }

        // Seal both halves with the cross-section, outward normals opposed.
        let shader = self
            .sides
            .first()
            .map(|s| s.shader.clone())
            .unwrap_or_else(|| crate::shader::ShaderTable::info_for("textures/common/caulk"));

        let mut front_cap = BrushSide::new(opposite(split_plane), shader.clone());
        front_cap.winding = Some(midwinding.reversed());
        front.sides.push(front_cap);

        let mut back_cap = BrushSide::new(split_plane, shader);
        back_cap.winding = Some(midwinding);
        back.sides.push(back_cap);

        let front = self.accept_fragment(front, planes);
        let back = self.accept_fragment(back, planes);
        Ok((front, back))
    }

    fn hollow_copy(&self) -> Brush {
        Brush {
            sides: Vec::with_capacity(self.sides.len() + 1),
            bounds: Bounds::new(),
            contents: self.contents,
            entity_num: self.entity_num,
            brush_num: self.brush_num,
        }
    }

    fn accept_fragment(&self, mut fragment: Brush, planes: &PlaneTable) -> Option<Brush> {
        if fragment.sides.len() < 4 {
            return None;
        }
        for side in &fragment.sides {
            if let Some(winding) = &side.winding {
                fragment.bounds.add_points(&winding.points);
            }
        }
        if fragment.volume(planes) < MIN_BRUSH_VOLUME {
            warn!(
                "tiny fragment of brush {} (entity {}) dropped",
                self.brush_num, self.entity_num
            );
            return None;
        }
        Some(fragment)
    }

    /// Sides that contribute faces to the structural tree: visible shader,
    /// a real winding, not skip.
    pub fn structural_sides(&self) -> impl Iterator<Item = &BrushSide> {
        self.sides.iter().filter(|side| {
            side.winding.is_some()
                && !side.bevel
                && !side.shader.surface.contains(SurfaceFlags::Skip)
        })
    }
}

/// Point-in-brush test against all side planes, used by tests and the
/// occupant placement diagnostics.
pub fn brush_contains_point(brush: &Brush, planes: &PlaneTable, point: Vec3) -> bool {
    brush.sides.iter().all(|side| {
        let plane = planes.plane(side.plane);
        plane.normal.dot(point) - plane.dist < ON_EPSILON
    })
}
