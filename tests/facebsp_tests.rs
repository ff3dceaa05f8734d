use brushbsp::brush::{Brush, BrushSide};
use brushbsp::facebsp::{face_bsp, structural_face_list};
use brushbsp::filter::filter_brushes_into_tree;
use brushbsp::math::Vec3;
use brushbsp::options::CompileOptions;
use brushbsp::plane::PlaneTable;
use brushbsp::shader::ShaderTable;
use brushbsp::tree::NodeKind;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn box_brush(
    planes: &mut PlaneTable,
    entity_num: usize,
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
    let mut brush = Brush::from_sides(entity_num, brush_num, sides);
    assert!(brush.create_windings(planes).unwrap());
    brush
}

/// Six wall brushes of thickness `t` enclosing the cavity from `min` to
/// `max`.
fn box_room(planes: &mut PlaneTable, min: Vec3, max: Vec3, t: f32) -> Vec<Brush> {
    let walls = [
        // Floor and ceiling span the full footprint.
        (
            Vec3::new(min.x - t, min.y - t, min.z - t),
            Vec3::new(max.x + t, max.y + t, min.z),
        ),
        (
            Vec3::new(min.x - t, min.y - t, max.z),
            Vec3::new(max.x + t, max.y + t, max.z + t),
        ),
        (
            Vec3::new(min.x - t, min.y - t, min.z),
            Vec3::new(min.x, max.y + t, max.z),
        ),
        (
            Vec3::new(max.x, min.y - t, min.z),
            Vec3::new(max.x + t, max.y + t, max.z),
        ),
        (
            Vec3::new(min.x, min.y - t, min.z),
            Vec3::new(max.x, min.y, max.z),
        ),
        (
            Vec3::new(min.x, max.y, min.z),
            Vec3::new(max.x, max.y + t, max.z),
        ),
    ];
    walls
        .iter()
        .enumerate()
        .map(|(i, (lo, hi))| box_brush(planes, 0, i, *lo, *hi))
        .collect()
}

#[test]
fn empty_face_list_yields_single_leaf() {
    let mut planes = PlaneTable::new(0.00001, 0.01, 1024);
    let options = CompileOptions::default();
    let tree = face_bsp(Vec::new(), &mut planes, &options).unwrap();

    let (internal, leaves) = tree.stats();
    assert_eq!(internal, 0);
    assert_eq!(leaves, 1);
    assert!(matches!(tree.nodes[tree.head].kind, NodeKind::Leaf(_)));
}

#[test]
fn box_room_builds_a_tree_with_open_interior() {
    let mut planes = PlaneTable::new(0.00001, 0.01, 65536);
    let options = CompileOptions::default();
    let brushes = box_room(
        &mut planes,
        Vec3::new(-5.0, -5.0, -5.0),
        Vec3::new(5.0, 5.0, 5.0),
        8.0,
    );

    let faces = structural_face_list(&brushes, &options);
    assert!(!faces.is_empty());
    let mut tree = face_bsp(faces, &mut planes, &options).unwrap();
    filter_brushes_into_tree(&mut tree, &brushes, &planes, true).unwrap();

    let (internal, leaves) = tree.stats();
    assert!(internal > 0);
    assert!(leaves > 1);

    // The cavity center must land in an open leaf.
    let leaf = tree.leaf_for_point(Vec3::new(0.0, 0.0, 0.0), &planes);
    assert!(!tree.leaf(leaf).opaque);
}

/// Partition completeness: every sampled point lands in exactly one leaf
/// (tree descent is a function), and the leaf's opacity matches the
/// brute-force point-in-brush answer.
#[test]
fn tree_classification_matches_brute_force() {
    let mut planes = PlaneTable::new(0.00001, 0.01, 65536);
    let options = CompileOptions::default();
    let brushes = box_room(
        &mut planes,
        Vec3::new(-64.0, -64.0, -64.0),
        Vec3::new(64.0, 64.0, 64.0),
        16.0,
    );

    let faces = structural_face_list(&brushes, &options);
    let mut tree = face_bsp(faces, &mut planes, &options).unwrap();
    filter_brushes_into_tree(&mut tree, &brushes, &planes, true).unwrap();

    let mut rng = StdRng::seed_from_u64(0x5eed);
    for _ in 0..512 {
        let point = Vec3::new(
            rng.random_range(-70.0..70.0),
            rng.random_range(-70.0..70.0),
            rng.random_range(-70.0..70.0),
        );
        // Stay away from brush faces so epsilon rounding cannot flip the
        // brute-force answer.
        if [point.x, point.y, point.z]
            .iter()
            .any(|v| (v.abs() - 64.0).abs() < 1.0)
        {
            continue;
        }

        let leaf = tree.leaf_for_point(point, &planes);
        let in_wall = brushes
            .iter()
            .any(|b| brushbsp::brush::brush_contains_point(b, &planes, point));
        assert_eq!(
            tree.leaf(leaf).opaque,
            in_wall,
            "mismatch at ({}, {}, {})",
            point.x,
            point.y,
            point.z
        );
    }
}

/// Deterministic build: identical input must give an identical tree.
#[test]
fn rebuilding_identical_faces_gives_identical_tree() {
    let mut planes = PlaneTable::new(0.00001, 0.01, 65536);
    let options = CompileOptions::default();
    let brushes = box_room(
        &mut planes,
        Vec3::new(-5.0, -5.0, -5.0),
        Vec3::new(5.0, 5.0, 5.0),
        8.0,
    );

    let first = face_bsp(
        structural_face_list(&brushes, &options),
        &mut planes,
        &options,
    )
    .unwrap();
    let second = face_bsp(
        structural_face_list(&brushes, &options),
        &mut planes,
        &options,
    )
    .unwrap();

    assert_eq!(first.nodes.len(), second.nodes.len());
    for (a, b) in first.nodes.iter().zip(second.nodes.iter()) {
        match (&a.kind, &b.kind) {
            (
                NodeKind::Internal { plane: pa, children: ca },
                NodeKind::Internal { plane: pb, children: cb },
            ) => {
                assert_eq!(pa, pb);
                assert_eq!(ca, cb);
            }
            (NodeKind::Leaf(_), NodeKind::Leaf(_)) => {}
            _ => panic!("tree shapes diverged"),
        }
    }
}

/// Detail brushes never contribute faces to the structural pass.
#[test]
fn detail_brushes_stay_out_of_structural_face_list() {
    let mut planes = PlaneTable::new(0.00001, 0.01, 65536);
    let options = CompileOptions::default();

    let mut brushes = box_room(
        &mut planes,
        Vec3::new(-5.0, -5.0, -5.0),
        Vec3::new(5.0, 5.0, 5.0),
        8.0,
    );
    let baseline = structural_face_list(&brushes, &options).len();

    // A detail crate inside the room.
    let mut detail = box_brush(
        &mut planes,
        0,
        brushes.len(),
        Vec3::new(-1.0, -1.0, -5.0),
        Vec3::new(1.0, 1.0, -3.0),
    );
    for side in &mut detail.sides {
        side.shader.contents |= brushbsp::shader::ContentFlags::Detail;
    }
    detail.contents |= brushbsp::shader::ContentFlags::Detail;
    brushes.push(detail);

    assert_eq!(structural_face_list(&brushes, &options).len(), baseline);
}
