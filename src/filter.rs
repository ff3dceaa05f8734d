use cgmath::InnerSpace;
use log::{debug, info};
use rayon::prelude::*;

use crate::brush::Brush;
use crate::entity::Patch;
use crate::error::CompileError;
use crate::math::{points_are_same, Vec3, CLIP_EPSILON};
use crate::plane::{opposite, PlaneId, PlaneTable};
use crate::surface::{emit_side_winding, SurfaceList};
use crate::tree::{LeafBrush, NodeId, NodeKind, Tree};
use crate::winding::{SplitResult, Winding};

/// Sentinel for windings that carry no interned plane (patch faces); it
/// compares unequal to every real plane id and its opposite.
const NO_PLANE: PlaneId = usize::MAX - 1;

/// Walk one brush down the tree, splitting its volume at every node, and
/// record the leaf each fragment lands in.
fn filter_brush_r(
    tree: &Tree,
    node: NodeId,
    brush: Brush,
    planes: &PlaneTable,
    out: &mut Vec<(NodeId, LeafBrush)>,
) -> Result<(), CompileError> {
    match &tree.nodes[node].kind {
        NodeKind::Leaf(_) => {
            out.push((
                node,
                LeafBrush {
                    entity_num: brush.entity_num,
                    brush_num: brush.brush_num,
                    opaque: brush.opaque(),
                    areaportal: brush.is_areaportal(),
                },
            ));
            Ok(())
        }
        NodeKind::Internal { plane, children } => {
            let children = *children;
            let (front, back) = brush.split(*plane, planes)?;
            if let Some(fragment) = front {
                filter_brush_r(tree, children[0], fragment, planes, out)?;
            }
            if let Some(fragment) = back {
                filter_brush_r(tree, children[1], fragment, planes, out)?;
            }
            Ok(())
        }
    }
}

/// Clip every brush into the tree and attach the fragments to leaves.
/// Structural passes also mark leaves holding opaque fragments as solid.
///
/// The per-brush descent only reads the tree and the plane table, so the
/// fan-out runs on the rayon pool; fragment attachment happens on this
/// thread after the join.
pub fn filter_brushes_into_tree(
    tree: &mut Tree,
    brushes: &[Brush],
    planes: &PlaneTable,
    structural: bool,
) -> Result<usize, CompileError> {
    if structural {
        info!("--- FilterStructuralBrushesIntoTree ---");
    } else {
        info!("--- FilterDetailBrushesIntoTree ---");
    }

    let shared: &Tree = tree;
    let collected: Result<Vec<Vec<(NodeId, LeafBrush)>>, CompileError> = brushes
        .par_iter()
        .map(|brush| {
            let mut out = Vec::new();
            filter_brush_r(shared, shared.head, brush.clone(), planes, &mut out)?;
            Ok(out)
        })
        .collect();

    let mut fragments = 0;
    for list in collected? {
        for (leaf_id, leaf_brush) in list {
            fragments += 1;
            if structural && leaf_brush.opaque {
                tree.leaf_mut(leaf_id).opaque = true;
            }
            tree.leaf_mut(leaf_id).brushes.push(leaf_brush);
        }
    }
    debug!("{:9} brush fragments", fragments);
    Ok(fragments)
}

/// Clip a side winding down the tree, collecting the fragments that reach
/// open leaves. A winding lying on a node's plane continues into the child
/// its own plane faces.
fn clip_side_fragments_r(
    tree: &Tree,
    node: NodeId,
    planes: &PlaneTable,
    winding: Winding,
    side_plane: PlaneId,
    out: &mut Vec<(NodeId, Winding)>,
) -> Result<(), CompileError> {
    match &tree.nodes[node].kind {
        NodeKind::Leaf(leaf) => {
            if !leaf.opaque && !winding.is_tiny() {
                out.push((node, winding));
            }
            Ok(())
        }
        NodeKind::Internal { plane, children } => {
            let children = *children;
            let node_plane = *plane;
            let p = *planes.plane(node_plane);
            match winding.split(p.normal, p.dist, CLIP_EPSILON)? {
                SplitResult::OnPlane => {
                    let child = if side_plane == node_plane {
                        children[0]
                    } else if side_plane == opposite(node_plane) {
                        children[1]
                    } else {
                        children[0]
                    };
                    clip_side_fragments_r(tree, child, planes, winding, side_plane, out)
                }
                SplitResult::Front => {
                    clip_side_fragments_r(tree, children[0], planes, winding, side_plane, out)
                }
                SplitResult::Back => {
                    clip_side_fragments_r(tree, children[1], planes, winding, side_plane, out)
                }
                SplitResult::Split { front, back } => {
                    if !front.is_degenerate() {
                        clip_side_fragments_r(tree, children[0], planes, front, side_plane, out)?;
                    }
                    if !back.is_degenerate() {
                        clip_side_fragments_r(tree, children[1], planes, back, side_plane, out)?;
                    }
                    Ok(())
                }
            }
        }
    }
}

/// Convex hull of coplanar points, wound to match `normal` (vertices
/// clockwise seen from the front side).
fn convex_hull_winding(points: &[Vec3], normal: Vec3) -> Result<Option<Winding>, CompileError> {
    // Planar basis.
    let up = if normal.z.abs() < 0.9 {
        Vec3::new(0.0, 0.0, 1.0)
    } else {
        Vec3::new(1.0, 0.0, 0.0)
    };
    let u_axis = (up - normal * up.dot(normal)).normalize();
    let v_axis = normal.cross(u_axis);

    let mut unique: Vec<Vec3> = Vec::new();
    for point in points {
        if !unique.iter().any(|q| points_are_same(*q, *point)) {
            unique.push(*point);
        }
    }
    if unique.len() < 3 {
        return Ok(None);
    }

    // Monotone chain over (u, v) projections; ties keep earlier points so
    // the result is stable across runs.
    let mut order: Vec<usize> = (0..unique.len()).collect();
    order.sort_by(|&a, &b| {
        let pa = (unique[a].dot(u_axis), unique[a].dot(v_axis));
        let pb = (unique[b].dot(u_axis), unique[b].dot(v_axis));
        pa.partial_cmp(&pb).unwrap_or(std::cmp::Ordering::Equal)
    });

    let proj = |i: usize| (unique[i].dot(u_axis), unique[i].dot(v_axis));
    let cross = |o: (f32, f32), a: (f32, f32), b: (f32, f32)| {
        (a.0 - o.0) * (b.1 - o.1) - (a.1 - o.1) * (b.0 - o.0)
    };

    let mut hull: Vec<usize> = Vec::new();
    for &i in &order {
        while hull.len() >= 2
            && cross(proj(hull[hull.len() - 2]), proj(hull[hull.len() - 1]), proj(i)) <= 0.0
        {
            hull.pop();
        }
        hull.push(i);
    }
    let lower_len = hull.len() + 1;
    for &i in order.iter().rev() {
        while hull.len() >= lower_len
            && cross(proj(hull[hull.len() - 2]), proj(hull[hull.len() - 1]), proj(i)) <= 0.0
        {
            hull.pop();
        }
        hull.push(i);
    }
    hull.pop();

    if hull.len() < 3 {
        return Ok(None);
    }
    if hull.len() > crate::winding::MAX_WINDING_POINTS {
        return Err(CompileError::WindingOverflow(
            crate::winding::MAX_WINDING_POINTS,
        ));
    }

    // The chain comes out counter-clockwise in (u, v); windings are stored
    // clockwise seen from the normal side.
    let mut winding = Winding::new();
    for &i in hull.iter().rev() {
        winding.points.push(unique[i]);
    }
    Ok(Some(winding))
}

/// Chop every side's winding to the convex hull of its fragments that
/// survive in open leaves, and flag sides with nothing left as invisible.
pub fn clip_sides_into_tree(
    brushes: &mut [Brush],
    tree: &Tree,
    planes: &PlaneTable,
) -> Result<(), CompileError> {
    info!("--- ClipSidesIntoTree ---");
    let mut visible = 0;
    let mut culled = 0;

    for brush in brushes.iter_mut() {
        for side in brush.sides.iter_mut() {
            let winding = match &side.winding {
                Some(w) => w.clone(),
                None => continue,
            };
            let mut fragments = Vec::new();
            clip_side_fragments_r(tree, tree.head, planes, winding, side.plane, &mut fragments)?;

            if fragments.is_empty() {
                side.visible = false;
                side.visible_hull = None;
                culled += 1;
                continue;
            }

            let mut points = Vec::new();
            for (_, fragment) in &fragments {
                points.extend_from_slice(&fragment.points);
            }
            let normal = planes.plane(side.plane).normal;
            side.visible_hull = convex_hull_winding(&points, normal)?;
            side.visible = side.visible_hull.is_some();
            if side.visible {
                visible += 1;
            } else {
                culled += 1;
            }
        }
    }
    debug!("{:9} sides visible", visible);
    debug!("{:9} sides culled", culled);
    Ok(())
}

/// Exact surface generation: every fragment a visible side leaves in an
/// open leaf becomes its own draw surface, attached to that leaf. The
/// minimal visible set, usable only when inside/outside classification is
/// trustworthy.
pub fn filter_sides_into_tree(
    surfaces: &mut SurfaceList,
    tree: &mut Tree,
    brushes: &mut [Brush],
    planes: &PlaneTable,
    max_area: bool,
) -> Result<usize, CompileError> {
    info!("--- FilterSidesIntoTree ---");
    let mut emitted = 0;

    for brush_index in 0..brushes.len() {
        let brush = &mut brushes[brush_index];
        let entity_num = brush.entity_num;
        let brush_num = brush.brush_num;
        for side_num in 0..brush.sides.len() {
            let side = &brush.sides[side_num];
            if !side.visible {
                continue;
            }
            let winding = match side.visible_hull.as_ref().or(side.winding.as_ref()) {
                Some(w) => w.clone(),
                None => continue,
            };
            let mut fragments = Vec::new();
            clip_side_fragments_r(tree, tree.head, planes, winding, side.plane, &mut fragments)?;
            if fragments.is_empty() {
                brush.sides[side_num].visible = false;
                continue;
            }
            let shader = brush.sides[side_num].shader.clone();
            for (leaf_id, fragment) in fragments {
                let ids = emit_side_winding(
                    surfaces,
                    &shader,
                    fragment,
                    entity_num,
                    Some(brush_num),
                    Some(side_num),
                    max_area,
                )?;
                emitted += ids.len();
                tree.leaf_mut(leaf_id).surfaces.extend(ids);
            }
        }
    }
    debug!("{:9} exact surfaces", emitted);
    Ok(emitted)
}

/// Hull surface generation: one draw surface per visible side, from its
/// convex visible hull, attached to every open leaf the hull touches. The
/// cheaper policy for leaked maps and brush models.
pub fn emit_hull_surfaces(
    surfaces: &mut SurfaceList,
    tree: &mut Tree,
    brushes: &[Brush],
    planes: &PlaneTable,
    max_area: bool,
) -> Result<usize, CompileError> {
    info!("--- EmitHullSurfaces ---");
    let mut emitted = 0;

    for brush in brushes {
        for (side_num, side) in brush.sides.iter().enumerate() {
            if !side.visible {
                continue;
            }
            let winding = match &side.visible_hull {
                Some(w) => w.clone(),
                None => continue,
            };
            let ids = emit_side_winding(
                surfaces,
                &side.shader,
                winding.clone(),
                brush.entity_num,
                Some(brush.brush_num),
                Some(side_num),
                max_area,
            )?;
            emitted += ids.len();

            let mut fragments = Vec::new();
            clip_side_fragments_r(tree, tree.head, planes, winding, side.plane, &mut fragments)?;
            for (leaf_id, _) in fragments {
                for &id in &ids {
                    let leaf = tree.leaf_mut(leaf_id);
                    if !leaf.surfaces.contains(&id) {
                        leaf.surfaces.push(id);
                    }
                }
            }
        }
    }
    debug!("{:9} hull surfaces", emitted);
    Ok(emitted)
}

/// Clip patch faces into the tree. Patches never carve or occlude; their
/// faces just ride the same clipper as brush sides.
pub fn filter_patches_into_tree(
    surfaces: &mut SurfaceList,
    tree: &mut Tree,
    patches: &[Patch],
    entity_num: usize,
    planes: &PlaneTable,
    exact: bool,
    max_area: bool,
) -> Result<usize, CompileError> {
    if patches.is_empty() {
        return Ok(0);
    }
    info!("--- FilterPatchesIntoTree ---");
    let mut emitted = 0;

    for patch in patches {
        for face in &patch.faces {
            if face.len() < 3 {
                continue;
            }
            if exact {
                let mut fragments = Vec::new();
                clip_side_fragments_r(
                    tree,
                    tree.head,
                    planes,
                    face.clone(),
                    NO_PLANE,
                    &mut fragments,
                )?;
                for (leaf_id, fragment) in fragments {
                    let ids = emit_side_winding(
                        surfaces,
                        &patch.shader,
                        fragment,
                        entity_num,
                        None,
                        None,
                        max_area,
                    )?;
                    emitted += ids.len();
                    tree.leaf_mut(leaf_id).surfaces.extend(ids);
                }
            } else {
                let ids = emit_side_winding(
                    surfaces,
                    &patch.shader,
                    face.clone(),
                    entity_num,
                    None,
                    None,
                    max_area,
                )?;
                emitted += ids.len();
                let mut fragments = Vec::new();
                clip_side_fragments_r(
                    tree,
                    tree.head,
                    planes,
                    face.clone(),
                    NO_PLANE,
                    &mut fragments,
                )?;
                for (leaf_id, _) in fragments {
                    for &id in &ids {
                        let leaf = tree.leaf_mut(leaf_id);
                        if !leaf.surfaces.contains(&id) {
                            leaf.surfaces.push(id);
                        }
                    }
                }
            }
        }
    }
    debug!("{:9} patch surfaces", emitted);
    Ok(emitted)
}
