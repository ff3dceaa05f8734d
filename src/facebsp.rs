use std::collections::HashSet;

use log::{debug, info};

use crate::bounds::Bounds;
use crate::brush::Brush;
use crate::error::CompileError;
use crate::math::{Vec3, ON_EPSILON};
use crate::options::{CompileOptions, DetailMode};
use crate::plane::{PlaneId, PlaneTable};
use crate::shader::SurfaceFlags;
use crate::tree::{NodeId, NodeKind, Tree};
use crate::winding::Winding;

/// A candidate face for tree construction: a winding tagged with its source
/// plane. Faces are consumed when a node splits on their plane.
#[derive(Clone, Debug)]
pub struct Face {
    pub plane: PlaneId,
    pub winding: Winding,
    pub hint: bool,
}

/// Side classification of a whole winding against a plane.
#[derive(Clone, Copy, Debug, PartialEq)]
enum WindingSide {
    Front,
    Back,
    On,
    Cross,
}

fn winding_side(winding: &Winding, normal: Vec3, dist: f32) -> WindingSide {
    let mut front = false;
    let mut back = false;
    for point in &winding.points {
        let d = point.x * normal.x + point.y * normal.y + point.z * normal.z - dist;
        if d > ON_EPSILON {
            front = true;
        } else if d < -ON_EPSILON {
            back = true;
        }
        if front && back {
            return WindingSide::Cross;
        }
    }
    match (front, back) {
        (true, false) => WindingSide::Front,
        (false, true) => WindingSide::Back,
        _ => WindingSide::On,
    }
}

/// Faces of the structural brushes of one entity, the input to the first
/// tree build. Detail brushes stay out unless promoted.
pub fn structural_face_list(brushes: &[Brush], options: &CompileOptions) -> Vec<Face> {
    let mut faces = Vec::new();
    for brush in brushes {
        if brush.is_detail() {
            match options.detail_mode {
                DetailMode::Normal | DetailMode::Ignore => continue,
                DetailMode::Promote => {}
            }
        }
        for side in brush.structural_sides() {
            let winding = match &side.winding {
                Some(w) => w.clone(),
                None => continue,
            };
            faces.push(Face {
                plane: side.plane,
                winding,
                hint: side.shader.surface.contains(SurfaceFlags::Hint),
            });
        }
    }
    debug!("{:9} structural faces", faces.len());
    faces
}

/// Faces rebuilt from the visible hulls left by side clipping, the input to
/// the tighter second tree build.
pub fn visible_face_list(brushes: &[Brush], options: &CompileOptions) -> Vec<Face> {
    let mut faces = Vec::new();
    for brush in brushes {
        if brush.is_detail() {
            match options.detail_mode {
                DetailMode::Normal | DetailMode::Ignore => continue,
                DetailMode::Promote => {}
            }
        }
        for side in &brush.sides {
            let winding = match &side.visible_hull {
                Some(w) => w.clone(),
                None => continue,
            };
            if side.shader.surface.contains(SurfaceFlags::Skip) {
                continue;
            }
            faces.push(Face {
                plane: side.plane,
                winding,
                hint: side.shader.surface.contains(SurfaceFlags::Hint),
            });
        }
    }
    debug!("{:9} visible faces", faces.len());
    faces
}

/// Build a tree from a face list. An empty list yields a single-leaf tree
/// covering all space.
pub fn face_bsp(
    faces: Vec<Face>,
    planes: &mut PlaneTable,
    options: &CompileOptions,
) -> Result<Tree, CompileError> {
    info!("--- FaceBsp ---");
    debug!("{:9} faces in", faces.len());

    let mut bounds = Bounds::new();
    for face in &faces {
        bounds.add_points(&face.winding.points);
    }

    let mut tree = Tree::new();
    tree.bounds = bounds;
    tree.head = build_face_tree_r(&mut tree, faces, bounds, planes, options, 0)?;

    let (internal, leaves) = tree.stats();
    debug!("{:9} splitter nodes", internal);
    debug!("{:9} leaves", leaves);
    Ok(tree)
}

/// Pick the splitting plane for this face set, or None to finish as a leaf.
fn select_split_plane(
    faces: &[Face],
    bounds: &Bounds,
    planes: &mut PlaneTable,
    options: &CompileOptions,
) -> Result<Option<PlaneId>, CompileError> {
    if faces.is_empty() {
        return Ok(None);
    }

    // Oversized world regions are partitioned at block boundaries first, so
    // distant geometry never ends up sharing splitters.
    if bounds.is_valid {
        for axis in 0..3 {
            let block = options.block_size[axis] as f32;
            if block <= 0.0 {
                continue;
            }
            if bounds.max[axis] - bounds.min[axis] > block {
                let dist = block * ((bounds.min[axis] / block).floor() + 1.0);
                if dist > bounds.min[axis] + 1.0 && dist < bounds.max[axis] - 1.0 {
                    let mut normal = Vec3::new(0.0, 0.0, 0.0);
                    normal[axis] = 1.0;
                    let id = planes.find_or_insert(normal, dist)?;
                    return Ok(Some(id));
                }
            }
        }
    }

    let weights = &options.split_weights;
    let mut checked: HashSet<PlaneId> = HashSet::new();
    let mut best: Option<(i32, PlaneId)> = None;

    for candidate in faces {
        // Both orientations of a plane partition identically.
        let pair = candidate.plane & !1;
        if !checked.insert(pair) {
            continue;
        }
        let plane = *planes.plane(candidate.plane);

        let mut facing = 0i32;
        let mut splits = 0i32;
        let mut front = 0i32;
        let mut back = 0i32;
        for face in faces {
            if face.plane & !1 == pair {
                facing += 1;
                continue;
            }
            match winding_side(&face.winding, plane.normal, plane.dist) {
                WindingSide::Front => front += 1,
                WindingSide::Back => back += 1,
                WindingSide::Cross => splits += 1,
                WindingSide::On => {}
            }
        }

        let mut value = if options.alternate_split_weights {
            // Weighting that prefers large faces near the middle of the
            // node, shortening average traversal depth.
            20000 - weights.split_penalty * splits
                - weights.balance_penalty * (front - back).abs()
                + candidate.winding.area().sqrt() as i32
        } else {
            weights.facing_bonus * facing - weights.split_penalty * splits
                - weights.balance_penalty * (front - back).abs()
        };
        if plane.kind.is_axial() {
            value += weights.axial_bonus;
        }
        if candidate.hint {
            value += weights.hint_bonus;
        }

        // Strictly greater: equal scores keep the earliest face in input
        // order, which makes rebuilds reproducible.
        if best.map_or(true, |(best_value, _)| value > best_value) {
            best = Some((value, candidate.plane));
        }
    }

    Ok(best.map(|(_, id)| id))
}

fn build_face_tree_r(
    tree: &mut Tree,
    faces: Vec<Face>,
    bounds: Bounds,
    planes: &mut PlaneTable,
    options: &CompileOptions,
    depth: usize,
) -> Result<NodeId, CompileError> {
    if depth > options.tree_depth_limit() {
        return Err(CompileError::TreeTooDeep(options.tree_depth_limit()));
    }

    let split = select_split_plane(&faces, &bounds, planes, options)?;
    let split = match split {
        Some(id) => id,
        None => {
            let leaf = tree.alloc_leaf();
            tree.nodes[leaf].bounds = bounds;
            return Ok(leaf);
        }
    };

    let node = tree.alloc_internal(split, [0, 0]);
    tree.nodes[node].bounds = bounds;
    let plane = *planes.plane(split);
    let pair = split & !1;

    let mut front_faces = Vec::new();
    let mut back_faces = Vec::new();
    for face in faces {
        if face.plane & !1 == pair {
            // Coincident faces are consumed by this split.
            continue;
        }
        match winding_side(&face.winding, plane.normal, plane.dist) {
            WindingSide::Front => front_faces.push(face),
            WindingSide::Back => back_faces.push(face),
            WindingSide::On => {}
            WindingSide::Cross => {
                let (fw, bw) =
                    face.winding
                        .clone()
                        .clip(plane.normal, plane.dist, ON_EPSILON, false)?;
                if let Some(w) = fw {
                    front_faces.push(Face { winding: w, ..face.clone() });
                }
                if let Some(w) = bw {
                    back_faces.push(Face { winding: w, ..face });
                }
            }
        }
    }

    let mut front_bounds = Bounds::new();
    for face in &front_faces {
        front_bounds.add_points(&face.winding.points);
    }
    let mut back_bounds = Bounds::new();
    for face in &back_faces {
        back_bounds.add_points(&face.winding.points);
    }

    let front = build_face_tree_r(tree, front_faces, front_bounds, planes, options, depth + 1)?;
    let back = build_face_tree_r(tree, back_faces, back_bounds, planes, options, depth + 1)?;
    match &mut tree.nodes[node].kind {
        NodeKind::Internal { children, .. } => *children = [front, back],
        NodeKind::Leaf(_) => unreachable!(),
    }

    Ok(node)
}
