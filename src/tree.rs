use log::debug;

use crate::bounds::Bounds;
use crate::math::Vec3;
use crate::plane::{PlaneId, PlaneSide, PlaneTable};
use crate::winding::Winding;

pub type NodeId = usize;
pub type PortalId = usize;

/// A brush fragment's residue in a leaf: enough to answer the questions
/// later passes ask (opacity, area blocking, emission) without keeping the
/// split solid around.
#[derive(Clone, Copy, Debug)]
pub struct LeafBrush {
    pub entity_num: usize,
    pub brush_num: usize,
    pub opaque: bool,
    pub areaportal: bool,
}

/// Data carried only by leaves.
#[derive(Clone, Debug, Default)]
pub struct LeafData {
    /// Leaf is solid space; floods never enter it.
    pub opaque: bool,
    /// An entity origin sits inside this leaf.
    pub occupied: bool,
    /// Reached by the enclosure flood from some occupied leaf.
    pub visited: bool,
    /// Visibility cluster index; -1 for opaque leaves.
    pub cluster: i32,
    /// Runtime area index; -1 until area flooding reaches the leaf.
    pub area: i32,
    pub brushes: Vec<LeafBrush>,
    /// Draw surfaces assigned to this leaf, as indices into the compile
    /// context's surface list.
    pub surfaces: Vec<usize>,
}

/// A node is either a splitter or a leaf, never both.
#[derive(Clone, Debug)]
pub enum NodeKind {
    Internal {
        plane: PlaneId,
        /// children[0] is in front of the plane, children[1] behind.
        children: [NodeId; 2],
    },
    Leaf(LeafData),
}

#[derive(Clone, Debug)]
pub struct Node {
    pub kind: NodeKind,
    pub bounds: Bounds,
    /// Portals bordering this node. Interior nodes only hold these while
    /// the portalizer pushes them down; they end up on leaves.
    pub portals: Vec<PortalId>,
}

/// A planar polygon on the boundary between two nodes. `nodes[0]` is on the
/// front side of the portal plane.
#[derive(Clone, Debug)]
pub struct Portal {
    pub plane: crate::plane::Plane,
    pub winding: Winding,
    pub nodes: [NodeId; 2],
    /// Portal lies on a tree splitting plane; the six portals sealing the
    /// tree against the outside leaf do not.
    pub on_node: bool,
}

/// The whole BSP structure for one model. Nodes and portals live in arenas
/// and reference each other by index; the tree is dropped wholesale when
/// its model is finished.
#[derive(Debug, Default)]
pub struct Tree {
    pub nodes: Vec<Node>,
    pub portals: Vec<Portal>,
    pub head: NodeId,
    /// The synthetic leaf representing unbounded space around the tree.
    pub outside: NodeId,
    pub bounds: Bounds,
}

impl Tree {
    pub fn new() -> Tree {
        Tree {
            nodes: Vec::new(),
            portals: Vec::new(),
            head: 0,
            outside: usize::MAX,
            bounds: Bounds::new(),
        }
    }

    /// A tree that is one open leaf over all space, for brush-model
    /// entities with no structural geometry.
    pub fn single_leaf() -> Tree {
        let mut tree = Tree::new();
        tree.head = tree.alloc_leaf();
        tree
    }

    pub fn alloc_leaf(&mut self) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Node {
            kind: NodeKind::Leaf(LeafData {
                cluster: -1,
                area: -1,
                ..Default::default()
            }),
            bounds: Bounds::new(),
            portals: Vec::new(),
        });
        id
    }

    pub fn alloc_internal(&mut self, plane: PlaneId, children: [NodeId; 2]) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Node {
            kind: NodeKind::Internal { plane, children },
            bounds: Bounds::new(),
            portals: Vec::new(),
        });
        id
    }

    pub fn is_leaf(&self, id: NodeId) -> bool {
        matches!(self.nodes[id].kind, NodeKind::Leaf(_))
    }

    pub fn leaf(&self, id: NodeId) -> &LeafData {
        match &self.nodes[id].kind {
            NodeKind::Leaf(leaf) => leaf,
            NodeKind::Internal { .. } => unreachable!("node {} is not a leaf", id),
        }
    }

    pub fn leaf_mut(&mut self, id: NodeId) -> &mut LeafData {
        match &mut self.nodes[id].kind {
            NodeKind::Leaf(leaf) => leaf,
            NodeKind::Internal { .. } => unreachable!("node {} is not a leaf", id),
        }
    }

    /// Ids of all leaves, outside leaf excluded.
    pub fn leaf_ids(&self) -> Vec<NodeId> {
        (0..self.nodes.len())
            .filter(|&id| id != self.outside && self.is_leaf(id))
            .collect()
    }

    /// Descend from the root by plane side tests; points on a plane go to
    /// the front child.
    pub fn leaf_for_point(&self, point: Vec3, planes: &PlaneTable) -> NodeId {
        let mut id = self.head;
        loop {
            match &self.nodes[id].kind {
                NodeKind::Leaf(_) => return id,
                NodeKind::Internal { plane, children } => {
                    let plane = planes.plane(*plane);
                    id = match plane.side_of(point, 0.0) {
                        PlaneSide::Back => children[1],
                        _ => children[0],
                    };
                }
            }
        }
    }

    /// Assign consecutive cluster numbers to non-opaque leaves for the
    /// downstream visibility stage. Opaque leaves stay at -1.
    pub fn number_clusters(&mut self) -> usize {
        let mut clusters = 0;
        for id in 0..self.nodes.len() {
            if id == self.outside {
                continue;
            }
            if let NodeKind::Leaf(leaf) = &mut self.nodes[id].kind {
                if leaf.opaque {
                    leaf.cluster = -1;
                } else {
                    leaf.cluster = clusters as i32;
                    clusters += 1;
                }
            }
        }
        debug!("{:9} visibility clusters", clusters);
        clusters
    }

    /// Node and leaf totals, for the progress log.
    pub fn stats(&self) -> (usize, usize) {
        let mut internal = 0;
        let mut leaves = 0;
        for (id, node) in self.nodes.iter().enumerate() {
            if id == self.outside {
                continue;
            }
            match node.kind {
                NodeKind::Internal { .. } => internal += 1,
                NodeKind::Leaf(_) => leaves += 1,
            }
        }
        (internal, leaves)
    }
}
