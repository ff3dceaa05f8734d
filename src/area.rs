use log::{debug, info};

use crate::tree::{NodeId, Tree};

/// Does a leaf hold any area-portal brush fragment.
fn holds_areaportal(tree: &Tree, leaf: NodeId) -> bool {
    tree.leaf(leaf).brushes.iter().any(|b| b.areaportal)
}

/// Flood one connected component of open leaves, assigning `area`.
/// Area-portal leaves take the index of whichever side reaches them first
/// but are never flooded through, so the far side keeps its own area.
fn flood_area(tree: &mut Tree, seed: NodeId, area: i32, recognize_areaportals: bool) {
    let mut stack = vec![seed];
    while let Some(node) = stack.pop() {
        if tree.leaf(node).area != -1 {
            continue;
        }
        tree.leaf_mut(node).area = area;

        if recognize_areaportals && holds_areaportal(tree, node) {
            continue;
        }

        let portal_ids = tree.nodes[node].portals.clone();
        for pid in portal_ids {
            let portal = &tree.portals[pid];
            let other = if portal.nodes[0] == node {
                portal.nodes[1]
            } else {
                portal.nodes[0]
            };
            if other == tree.outside {
                continue;
            }
            let leaf = tree.leaf(other);
            if !leaf.opaque && leaf.area == -1 {
                stack.push(other);
            }
        }
    }
}

/// Partition occupied space into connected areas for runtime portal
/// culling. Leaves the flood never reaches keep area -1 and stay out of
/// the runtime area graph. Annotation only; the tree's structure is not
/// touched.
pub fn flood_areas(tree: &mut Tree, recognize_areaportals: bool) -> usize {
    info!("--- FloodAreas ---");

    let mut areas = 0i32;
    for leaf_id in tree.leaf_ids() {
        let leaf = tree.leaf(leaf_id);
        if leaf.opaque || !leaf.occupied || leaf.area != -1 {
            continue;
        }
        if recognize_areaportals && holds_areaportal(tree, leaf_id) {
            // An entity buried in an area-portal brush does not open an
            // area of its own.
            continue;
        }
        flood_area(tree, leaf_id, areas, recognize_areaportals);
        areas += 1;
    }

    debug!("{:9} areas", areas);
    areas as usize
}
