use log::{debug, info, warn};

use crate::bounds::Bounds;
use crate::error::CompileError;
use crate::math::Vec3;
use crate::plane::{Plane, PlaneTable};
use crate::tree::{NodeId, NodeKind, Portal, PortalId, Tree};
use crate::winding::Winding;

/// Margin between the tree bounds and the outer sealing portals.
const SIDE_SPACE: f32 = 8.0;
/// Tighter epsilon for pushing portals down the tree; portal windings must
/// stay on their planes much more exactly than brush clips.
const SPLIT_WINDING_EPSILON: f32 = 0.001;

fn add_portal_to_nodes(tree: &mut Tree, portal: PortalId, front: NodeId, back: NodeId) {
    tree.portals[portal].nodes = [front, back];
    tree.nodes[front].portals.push(portal);
    tree.nodes[back].portals.push(portal);
}

fn remove_portal_from_node(tree: &mut Tree, portal: PortalId, node: NodeId) {
    tree.nodes[node].portals.retain(|&id| id != portal);
}

/// Which side of the portal the given node is on: 0 front, 1 back.
fn portal_side(tree: &Tree, portal: PortalId, node: NodeId) -> usize {
    if tree.portals[portal].nodes[0] == node {
        0
    } else {
        1
    }
}

/// Create the outside leaf and the six portals sealing the head node
/// against it, spanning the expanded tree bounds.
fn make_headnode_portals(tree: &mut Tree) {
    let bounds = tree.bounds.expand_by(SIDE_SPACE);
    tree.outside = tree.alloc_leaf();

    // Inward-facing boundary planes; the tree interior is in front of all
    // six.
    let mut box_planes = Vec::with_capacity(6);
    for axis in 0..3 {
        for side in 0..2 {
            let mut normal = Vec3::new(0.0, 0.0, 0.0);
            let dist;
            if side == 0 {
                normal[axis] = 1.0;
                dist = bounds.min[axis];
            } else {
                normal[axis] = -1.0;
                dist = -bounds.max[axis];
            }
            box_planes.push(Plane::new(normal, dist));
        }
    }

    let head = tree.head;
    for i in 0..6 {
        let mut winding = Winding::base_for_plane(box_planes[i].normal, box_planes[i].dist);
        for (j, clip) in box_planes.iter().enumerate() {
            if j == i {
                continue;
            }
            // The six box planes can never clip a box face away entirely.
            winding = match winding.chop(clip.normal, clip.dist, SPLIT_WINDING_EPSILON) {
                Ok(Some(w)) => w,
                _ => unreachable!("headnode portal clipped away"),
            };
        }
        let id = tree.portals.len();
        tree.portals.push(Portal {
            plane: box_planes[i],
            winding,
            nodes: [0, 0],
            on_node: false,
        });
        add_portal_to_nodes(tree, id, head, tree.outside);
    }
}

/// Shrink a node's bounds to what its portals actually enclose.
fn calc_node_bounds(tree: &mut Tree, node: NodeId) {
    let mut bounds = Bounds::new();
    for &portal in &tree.nodes[node].portals {
        bounds.add_points(&tree.portals[portal].winding.points);
    }
    tree.nodes[node].bounds = bounds;
}

/// Create the portal lying on this node's plane, separating its children:
/// the plane's base winding chopped by every portal bounding the node.
fn make_node_portal(tree: &mut Tree, node: NodeId, planes: &PlaneTable) -> Result<(), CompileError> {
    let (plane_id, children) = match tree.nodes[node].kind {
        NodeKind::Internal { plane, children } => (plane, children),
        NodeKind::Leaf(_) => unreachable!(),
    };
    let plane = *planes.plane(plane_id);

    let mut winding = Some(Winding::base_for_plane(plane.normal, plane.dist));
    let portal_ids: Vec<PortalId> = tree.nodes[node].portals.clone();
    for pid in portal_ids {
        let clip = tree.portals[pid].plane;
        let w = match winding.take() {
            Some(w) => w,
            None => break,
        };
        winding = if portal_side(tree, pid, node) == 0 {
            w.chop(clip.normal, clip.dist, SPLIT_WINDING_EPSILON)?
        } else {
            let flipped = clip.flipped();
            w.chop(flipped.normal, flipped.dist, SPLIT_WINDING_EPSILON)?
        };
    }

    let winding = match winding {
        Some(w) if !w.is_tiny() => w,
        _ => {
            warn!("node portal clipped away at node {}", node);
            return Ok(());
        }
    };

    let id = tree.portals.len();
    tree.portals.push(Portal {
        plane,
        winding,
        nodes: [0, 0],
        on_node: true,
    });
    add_portal_to_nodes(tree, id, children[0], children[1]);
    Ok(())
}

/// Distribute every portal bordering this node to the child (or children)
/// its winding falls in.
fn split_node_portals(tree: &mut Tree, node: NodeId, planes: &PlaneTable) -> Result<(), CompileError> {
    let (plane_id, children) = match tree.nodes[node].kind {
        NodeKind::Internal { plane, children } => (plane, children),
        NodeKind::Leaf(_) => unreachable!(),
    };
    let plane = *planes.plane(plane_id);

    let portal_ids = std::mem::take(&mut tree.nodes[node].portals);
    for pid in portal_ids {
        let side = portal_side(tree, pid, node);
        let other = tree.portals[pid].nodes[1 - side];
        remove_portal_from_node(tree, pid, other);

        let winding = tree.portals[pid].winding.clone();
        let (front_w, back_w) =
            winding.clip(plane.normal, plane.dist, SPLIT_WINDING_EPSILON, false)?;

        match (front_w, back_w) {
            (Some(fw), Some(bw)) => {
                // Straddles the plane: the back half becomes a new portal.
                let back_id = tree.portals.len();
                let mut back_portal = tree.portals[pid].clone();
                back_portal.winding = bw;
                tree.portals.push(back_portal);

                tree.portals[pid].winding = fw;
                if side == 0 {
                    add_portal_to_nodes(tree, pid, children[0], other);
                    add_portal_to_nodes(tree, back_id, children[1], other);
                } else {
                    add_portal_to_nodes(tree, pid, other, children[0]);
                    add_portal_to_nodes(tree, back_id, other, children[1]);
                }
            }
            (Some(fw), None) => {
                tree.portals[pid].winding = fw;
                if side == 0 {
                    add_portal_to_nodes(tree, pid, children[0], other);
                } else {
                    add_portal_to_nodes(tree, pid, other, children[0]);
                }
            }
            (None, Some(bw)) => {
                tree.portals[pid].winding = bw;
                if side == 0 {
                    add_portal_to_nodes(tree, pid, children[1], other);
                } else {
                    add_portal_to_nodes(tree, pid, other, children[1]);
                }
            }
            (None, None) => {
                // Clipped away entirely; the portal dies here.
            }
        }
    }
    Ok(())
}

fn make_tree_portals_r(
    tree: &mut Tree,
    node: NodeId,
    planes: &PlaneTable,
) -> Result<(), CompileError> {
    calc_node_bounds(tree, node);
    if !tree.nodes[node].bounds.is_valid {
        warn!("node {} without any portals", node);
    }

    let children = match tree.nodes[node].kind {
        NodeKind::Leaf(_) => return Ok(()),
        NodeKind::Internal { children, .. } => children,
    };

    make_node_portal(tree, node, planes)?;
    split_node_portals(tree, node, planes)?;

    make_tree_portals_r(tree, children[0], planes)?;
    make_tree_portals_r(tree, children[1], planes)?;
    Ok(())
}

/// Derive the portal separating every pair of adjacent leaves (and the
/// outside) from the tree's node planes.
pub fn make_tree_portals(tree: &mut Tree, planes: &PlaneTable) -> Result<(), CompileError> {
    info!("--- MakeTreePortals ---");
    make_headnode_portals(tree);
    make_tree_portals_r(tree, tree.head, planes)?;
    debug!("{:9} portals", tree.portals.len());
    Ok(())
}
