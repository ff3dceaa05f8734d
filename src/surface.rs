use log::{debug, info};

use crate::error::CompileError;
use crate::shader::{ShaderInfo, SurfaceFlags};
use crate::winding::Winding;

/// Windings above this area are subdivided before emission when the
/// max-area mode is on.
const MAX_FACE_AREA: f32 = 65536.0;

/// A visible polygon produced by clipping, bound for the serializer.
#[derive(Clone, Debug)]
pub struct DrawSurface {
    pub shader: ShaderInfo,
    pub winding: Winding,
    pub entity_num: usize,
    /// Originating brush and side, when the surface came from a brush.
    pub brush_num: Option<usize>,
    pub side_num: Option<usize>,
    /// Position in the serializer's surface order; assigned by the model
    /// emitter.
    pub output_num: Option<usize>,
}

/// The compile's growing surface set, with the explicit capacity ceiling
/// from the options.
#[derive(Debug)]
pub struct SurfaceList {
    pub surfaces: Vec<DrawSurface>,
    capacity: usize,
}

impl SurfaceList {
    pub fn new(capacity: usize) -> SurfaceList {
        SurfaceList {
            surfaces: Vec::new(),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }

    pub fn push(&mut self, surface: DrawSurface) -> Result<usize, CompileError> {
        if self.surfaces.len() >= self.capacity {
            return Err(CompileError::TooManySurfaces(self.capacity));
        }
        self.surfaces.push(surface);
        Ok(self.surfaces.len() - 1)
    }
}

/// Recursively halve a winding until every piece is under the area cap.
/// Splits run through the center along the longest bounded axis.
pub fn subdivide_winding(winding: Winding, pieces: &mut Vec<Winding>) -> Result<(), CompileError> {
    if winding.area() <= MAX_FACE_AREA {
        pieces.push(winding);
        return Ok(());
    }

    let bounds = winding.bounds();
    let size = bounds.size();
    let mut axis = 0;
    if size.y > size[axis] {
        axis = 1;
    }
    if size.z > size[axis] {
        axis = 2;
    }
    let mut normal = crate::math::Vec3::new(0.0, 0.0, 0.0);
    normal[axis] = 1.0;
    let dist = bounds.center()[axis];

    let (front, back) = winding.clip(normal, dist, crate::math::ON_EPSILON, true)?;
    match (front, back) {
        (Some(f), Some(b)) => {
            subdivide_winding(f, pieces)?;
            subdivide_winding(b, pieces)?;
        }
        (Some(w), None) | (None, Some(w)) => pieces.push(w),
        (None, None) => {}
    }
    Ok(())
}

/// Emit one side's surface winding(s), applying the nodraw check and the
/// optional max-area subdivision. Returns the new surface indices.
pub fn emit_side_winding(
    surfaces: &mut SurfaceList,
    shader: &ShaderInfo,
    winding: Winding,
    entity_num: usize,
    brush_num: Option<usize>,
    side_num: Option<usize>,
    max_area: bool,
) -> Result<Vec<usize>, CompileError> {
    if shader.surface.contains(SurfaceFlags::NoDraw) {
        return Ok(Vec::new());
    }

    let mut pieces = Vec::new();
    if max_area {
        subdivide_winding(winding, &mut pieces)?;
    } else {
        pieces.push(winding);
    }

    let mut ids = Vec::with_capacity(pieces.len());
    for piece in pieces {
        ids.push(surfaces.push(DrawSurface {
            shader: shader.clone(),
            winding: piece,
            entity_num,
            brush_num,
            side_num,
            output_num: None,
        })?);
    }
    Ok(ids)
}

pub fn log_surface_stats(surfaces: &SurfaceList, first: usize) {
    info!("--- DrawSurfaces ---");
    debug!("{:9} surfaces emitted for this model", surfaces.len() - first);
}
