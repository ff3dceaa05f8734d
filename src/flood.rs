use std::collections::{HashMap, VecDeque};

use log::{debug, info, warn};

use crate::entity::Entity;
use crate::math::Vec3;
use crate::plane::PlaneTable;
use crate::tree::{NodeId, NodeKind, PortalId, Tree};

/// Walkable polyline from an entity origin out through the enclosure gap,
/// handed to the (external) leak-file writer.
#[derive(Clone, Debug)]
pub struct LeakTrace {
    pub points: Vec<Vec3>,
    /// Origin of the entity whose flood escaped.
    pub entity_origin: Vec3,
}

/// Outcome of the enclosure flood.
#[derive(Clone, Debug)]
pub enum FloodStatus {
    /// Every occupied leaf is sealed away from the outside.
    Enclosed,
    /// Some entity's leaf connects to the outside.
    Leaked(LeakTrace),
    /// No entity had a usable origin; nothing was flooded and no claim is
    /// made about the tree.
    Empty,
}

/// Flood one entity's reachable space breadth-first through non-opaque
/// portals. Returns the leak trace if the outside leaf was reached.
fn flood_from(
    tree: &mut Tree,
    seed: NodeId,
    origin: Vec3,
) -> Option<LeakTrace> {
    let mut queue: VecDeque<NodeId> = VecDeque::new();
    let mut parent: HashMap<NodeId, (NodeId, PortalId)> = HashMap::new();

    tree.leaf_mut(seed).visited = true;
    queue.push_back(seed);

    while let Some(node) = queue.pop_front() {
        if node == tree.outside {
            return Some(build_leak_trace(tree, &parent, seed, origin));
        }
        let portal_ids = tree.nodes[node].portals.clone();
        for pid in portal_ids {
            let portal = &tree.portals[pid];
            let other = if portal.nodes[0] == node {
                portal.nodes[1]
            } else {
                portal.nodes[0]
            };
            let leaf = tree.leaf_mut(other);
            if leaf.opaque || leaf.visited {
                continue;
            }
            leaf.visited = true;
            parent.insert(other, (node, pid));
            queue.push_back(other);
        }
    }
    None
}

fn build_leak_trace(
    tree: &Tree,
    parent: &HashMap<NodeId, (NodeId, PortalId)>,
    seed: NodeId,
    origin: Vec3,
) -> LeakTrace {
    // Walk the parent chain from the outside leaf back to the seed, then
    // flip it so the line leads from the entity out through the gap.
    let mut crossings = Vec::new();
    let mut node = tree.outside;
    while node != seed {
        let (prev, portal) = parent[&node];
        crossings.push(tree.portals[portal].winding.center());
        node = prev;
    }
    crossings.reverse();

    let mut points = vec![origin];
    points.extend(crossings);
    LeakTrace {
        points,
        entity_origin: origin,
    }
}

/// Seed the enclosure flood from every entity origin and verify the tree
/// is sealed. Visited marks are left on every reachable leaf for
/// `fill_outside` and the area flood.
pub fn flood_entities(
    tree: &mut Tree,
    entities: &[Entity],
    planes: &PlaneTable,
) -> FloodStatus {
    info!("--- FloodEntities ---");

    let mut flooded_any = false;
    for (i, entity) in entities.iter().enumerate().skip(1) {
        if entity.value_for_key("origin").is_empty() {
            continue;
        }
        // Lift the origin off the floor so an entity resting exactly on a
        // brush face still lands in the open leaf above it.
        let mut origin = entity.origin();
        origin.z += 1.0;

        let leaf = tree.leaf_for_point(origin, planes);
        if tree.leaf(leaf).opaque {
            warn!(
                "entity {} ({}) is inside solid geometry",
                i,
                entity.classname()
            );
            continue;
        }
        tree.leaf_mut(leaf).occupied = true;
        flooded_any = true;

        if tree.leaf(leaf).visited {
            // Someone else's flood already covered this region.
            continue;
        }
        if let Some(trace) = flood_from(tree, leaf, origin) {
            warn!(
                "leak found from entity {} ({}) at ({:.0} {:.0} {:.0})",
                i,
                entity.classname(),
                origin.x,
                origin.y,
                origin.z
            );
            return FloodStatus::Leaked(trace);
        }
    }

    if !flooded_any {
        debug!("no entities with origins to flood from");
        return FloodStatus::Empty;
    }
    FloodStatus::Enclosed
}

/// Mark every leaf the flood never reached as solid, so later clipping
/// treats unreachable space like the inside of a brush.
pub fn fill_outside(tree: &mut Tree) {
    info!("--- FillOutside ---");
    let mut inside = 0;
    let mut outside = 0;
    let mut solid = 0;
    for id in tree.leaf_ids() {
        match &mut tree.nodes[id].kind {
            NodeKind::Leaf(leaf) => {
                if leaf.opaque {
                    solid += 1;
                } else if leaf.visited {
                    inside += 1;
                } else {
                    leaf.opaque = true;
                    outside += 1;
                }
            }
            NodeKind::Internal { .. } => {}
        }
    }
    debug!("{:9} solid leaves", solid);
    debug!("{:9} leaves filled", outside);
    debug!("{:9} inside leaves", inside);
}
