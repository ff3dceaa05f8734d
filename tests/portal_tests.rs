use brushbsp::brush::{Brush, BrushSide};
use brushbsp::facebsp::{face_bsp, structural_face_list};
use brushbsp::math::Vec3;
use brushbsp::options::CompileOptions;
use brushbsp::plane::PlaneTable;
use brushbsp::portal::make_tree_portals;
use brushbsp::shader::ShaderTable;
use brushbsp::tree::Tree;
use cgmath::InnerSpace;

fn box_brush(
    planes: &mut PlaneTable,
    brush_num: usize,
    min: Vec3,
    max: Vec3,
) -> Brush {
    let shader = ShaderTable::info_for("textures/base_wall/concrete");
    let mut sides = Vec::new();
    for axis in 0..3 {
        let mut normal = Vec3::new(0.0, 0.0, 0.0);
        normal[axis] = 1.0;
        let id = planes.find_or_insert(normal, max[axis]).unwrap();
        sides.push(BrushSide::new(id, shader.clone()));
        let id = planes.find_or_insert(-normal, -min[axis]).unwrap();
        sides.push(BrushSide::new(id, shader.clone()));
    }
    let mut brush = Brush::from_sides(0, brush_num, sides);
    assert!(brush.create_windings(planes).unwrap());
    brush
}

fn portalized_box_tree(planes: &mut PlaneTable) -> Tree {
    let options = CompileOptions::default();
    let brush = box_brush(
        planes,
        0,
        Vec3::new(-32.0, -32.0, -32.0),
        Vec3::new(32.0, 32.0, 32.0),
    );
    let faces = structural_face_list(&[brush], &options);
    let mut tree = face_bsp(faces, planes, &options).unwrap();
    make_tree_portals(&mut tree, planes).unwrap();
    tree
}

#[test]
fn every_portal_joins_two_distinct_nodes() {
    let mut planes = PlaneTable::new(0.00001, 0.01, 65536);
    let tree = portalized_box_tree(&mut planes);

    for leaf_id in tree.leaf_ids() {
        for &pid in &tree.nodes[leaf_id].portals {
            let portal = &tree.portals[pid];
            assert_ne!(portal.nodes[0], portal.nodes[1]);
            assert!(
                portal.nodes[0] == leaf_id || portal.nodes[1] == leaf_id,
                "portal list and portal node links disagree"
            );
        }
    }
}

#[test]
fn portal_windings_lie_on_their_planes() {
    let mut planes = PlaneTable::new(0.00001, 0.01, 65536);
    let tree = portalized_box_tree(&mut planes);

    let mut checked = 0;
    for leaf_id in tree.leaf_ids() {
        for &pid in &tree.nodes[leaf_id].portals {
            let portal = &tree.portals[pid];
            for point in &portal.winding.points {
                let d = portal.plane.distance_to(*point);
                assert!(
                    d.abs() < 0.05,
                    "portal point {} units off its plane",
                    d.abs()
                );
            }
            checked += 1;
        }
    }
    assert!(checked > 0);
}

/// Portal closure: the portals bordering a leaf must seal its convex
/// volume, so the area-weighted outward normals cancel out.
#[test]
fn leaf_portals_close_the_leaf_volume() {
    let mut planes = PlaneTable::new(0.00001, 0.01, 65536);
    let tree = portalized_box_tree(&mut planes);

    let mut closed_leaves = 0;
    for leaf_id in tree.leaf_ids() {
        if tree.nodes[leaf_id].portals.is_empty() {
            continue;
        }
        let mut sum = Vec3::new(0.0, 0.0, 0.0);
        let mut total_area = 0.0;
        for &pid in &tree.nodes[leaf_id].portals {
            let portal = &tree.portals[pid];
            let area = portal.winding.area();
            // The leaf's region sits on the front side when it is
            // nodes[0], so the outward normal points the other way.
            let outward = if portal.nodes[0] == leaf_id {
                -portal.plane.normal
            } else {
                portal.plane.normal
            };
            sum += outward * area;
            total_area += area;
        }
        assert!(total_area > 0.0);
        assert!(
            sum.magnitude() < total_area * 1e-3,
            "leaf {} boundary does not close: residual {:?}",
            leaf_id,
            sum
        );
        closed_leaves += 1;
    }
    assert!(closed_leaves > 1);
}

/// The outside leaf's portals together must seal the whole tree volume.
#[test]
fn outside_leaf_is_sealed_by_headnode_portals() {
    let mut planes = PlaneTable::new(0.00001, 0.01, 65536);
    let tree = portalized_box_tree(&mut planes);

    let portals = &tree.nodes[tree.outside].portals;
    assert!(!portals.is_empty());
    let mut sum = Vec3::new(0.0, 0.0, 0.0);
    for &pid in portals {
        let portal = &tree.portals[pid];
        let outward = if portal.nodes[0] == tree.outside {
            -portal.plane.normal
        } else {
            portal.plane.normal
        };
        sum += outward * portal.winding.area();
    }
    assert!(sum.magnitude() < 1.0);
}
