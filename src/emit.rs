use log::{debug, info};

use crate::bounds::Bounds;
use crate::brush::Brush;
use crate::plane::PlaneId;
use crate::shader::ContentFlags;
use crate::surface::SurfaceList;
use crate::tree::{NodeId, NodeKind, Tree};

/// A brush as the serializer sees it: provenance plus contents.
#[derive(Clone, Debug)]
pub struct EmittedBrush {
    pub entity_num: usize,
    pub brush_num: usize,
    pub contents: ContentFlags,
}

/// An internal tree node flattened for the serializer. Children are node
/// indices when non-negative, otherwise `-(leaf_index + 1)`.
#[derive(Clone, Debug)]
pub struct EmittedNode {
    pub plane: PlaneId,
    pub children: [i32; 2],
}

/// A leaf flattened for the serializer, carrying the annotations the
/// visibility and runtime stages consume.
#[derive(Clone, Debug)]
pub struct EmittedLeaf {
    pub cluster: i32,
    pub area: i32,
    /// Output numbers of the surfaces visible in this leaf.
    pub surfaces: Vec<usize>,
    /// Brush numbers of the fragments that landed in this leaf.
    pub brushes: Vec<usize>,
}

/// Per-entity ranges into the flattened output, the emitter's contract
/// with the serializer.
#[derive(Clone, Debug)]
pub struct BspModel {
    pub bounds: Bounds,
    pub first_brush: usize,
    pub brush_count: usize,
    pub first_surface: usize,
    pub surface_count: usize,
    /// Encoded root of this model's emitted tree.
    pub head_node: i32,
}

/// Everything the compiler hands downstream, in serializer order.
#[derive(Debug, Default)]
pub struct CompileOutput {
    pub models: Vec<BspModel>,
    pub brushes: Vec<EmittedBrush>,
    pub nodes: Vec<EmittedNode>,
    pub leaves: Vec<EmittedLeaf>,
    /// Surface indices (into the compile's surface list) in emission
    /// order; a surface's position here is its output number.
    pub surface_order: Vec<usize>,
}

/// Emit the tree pre-order: node, front subtree, back subtree. Leaf
/// surfaces get output numbers in first-touch order, which fixes the
/// "surfaces in tree-traversal order" contract.
fn emit_tree_r(
    output: &mut CompileOutput,
    surfaces: &mut SurfaceList,
    tree: &Tree,
    node: NodeId,
) -> i32 {
    match &tree.nodes[node].kind {
        NodeKind::Leaf(leaf) => {
            let mut emitted = EmittedLeaf {
                cluster: leaf.cluster,
                area: leaf.area,
                surfaces: Vec::with_capacity(leaf.surfaces.len()),
                brushes: leaf.brushes.iter().map(|b| b.brush_num).collect(),
            };
            for &surf in &leaf.surfaces {
                let output_num = match surfaces.surfaces[surf].output_num {
                    Some(n) => n,
                    None => {
                        let n = output.surface_order.len();
                        surfaces.surfaces[surf].output_num = Some(n);
                        output.surface_order.push(surf);
                        n
                    }
                };
                emitted.surfaces.push(output_num);
            }
            let index = output.leaves.len();
            output.leaves.push(emitted);
            -(index as i32 + 1)
        }
        NodeKind::Internal { plane, children } => {
            let index = output.nodes.len();
            output.nodes.push(EmittedNode {
                plane: *plane,
                children: [0, 0],
            });
            let front = emit_tree_r(output, surfaces, tree, children[0]);
            let back = emit_tree_r(output, surfaces, tree, children[1]);
            output.nodes[index].children = [front, back];
            index as i32
        }
    }
}

/// Convert a finished model into its emitted ranges: brushes first, in
/// entity order, then surfaces in tree-traversal order.
pub fn emit_model(
    output: &mut CompileOutput,
    surfaces: &mut SurfaceList,
    brushes: &[Brush],
    tree: &Tree,
) -> BspModel {
    info!("--- EmitModel ---");

    let first_brush = output.brushes.len();
    for brush in brushes {
        output.brushes.push(EmittedBrush {
            entity_num: brush.entity_num,
            brush_num: brush.brush_num,
            contents: brush.contents,
        });
    }

    let first_surface = output.surface_order.len();
    let head_node = emit_tree_r(output, surfaces, tree, tree.head);
    let surface_count = output.surface_order.len() - first_surface;

    let mut bounds = tree.bounds;
    for brush in brushes {
        bounds.add_bounds(&brush.bounds);
    }

    let model = BspModel {
        bounds,
        first_brush,
        brush_count: brushes.len(),
        first_surface,
        surface_count,
        head_node,
    };
    debug!(
        "model: {} brushes, {} surfaces",
        model.brush_count, model.surface_count
    );
    output.models.push(model.clone());
    model
}
