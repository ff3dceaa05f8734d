use brushbsp::area::flood_areas;
use brushbsp::brush::{Brush, BrushSide};
use brushbsp::entity::Entity;
use brushbsp::facebsp::{face_bsp, structural_face_list};
use brushbsp::filter::filter_brushes_into_tree;
use brushbsp::flood::{fill_outside, flood_entities, FloodStatus};
use brushbsp::math::Vec3;
use brushbsp::options::CompileOptions;
use brushbsp::plane::PlaneTable;
use brushbsp::portal::make_tree_portals;
use brushbsp::shader::ShaderTable;
use brushbsp::tree::Tree;

fn box_brush(
    planes: &mut PlaneTable,
    brush_num: usize,
    min: Vec3,
    max: Vec3,
    shader_name: &str,
) -> Brush {
    let shader = ShaderTable::info_for(shader_name);
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

const WALL: &str = "textures/base_wall/concrete";

/// Two rooms split by a middle wall with a doorway. The doorway is filled
/// with an area-portal brush when `portal_brush` is set.
fn two_rooms(planes: &mut PlaneTable, portal_brush: bool) -> Vec<Brush> {
    let t = 8.0;
    let (min, max) = (Vec3::new(-24.0, -10.0, -10.0), Vec3::new(24.0, 10.0, 10.0));

    let mut walls = vec![
        // Outer shell.
        (
            Vec3::new(min.x - t, min.y - t, min.z - t),
            Vec3::new(max.x + t, max.y + t, min.z),
            WALL,
        ),
        (
            Vec3::new(min.x - t, min.y - t, max.z),
            Vec3::new(max.x + t, max.y + t, max.z + t),
            WALL,
        ),
        (
            Vec3::new(min.x - t, min.y - t, min.z),
            Vec3::new(min.x, max.y + t, max.z),
            WALL,
        ),
        (
            Vec3::new(max.x, min.y - t, min.z),
            Vec3::new(max.x + t, max.y + t, max.z),
            WALL,
        ),
        (
            Vec3::new(min.x, min.y - t, min.z),
            Vec3::new(max.x, min.y, max.z),
            WALL,
        ),
        (
            Vec3::new(min.x, max.y, min.z),
            Vec3::new(max.x, max.y + t, max.z),
            WALL,
        ),
        // Middle wall at x in -2..2, with a doorway at y in -3..3,
        // z below 0.
        (
            Vec3::new(-2.0, min.y, min.z),
            Vec3::new(2.0, -3.0, max.z),
            WALL,
        ),
        (
            Vec3::new(-2.0, 3.0, min.z),
            Vec3::new(2.0, max.y, max.z),
            WALL,
        ),
        (
            Vec3::new(-2.0, -3.0, 0.0),
            Vec3::new(2.0, 3.0, max.z),
            WALL,
        ),
    ];
    if portal_brush {
        walls.push((
            Vec3::new(-2.0, -3.0, min.z),
            Vec3::new(2.0, 3.0, 0.0),
            "textures/common/areaportal",
        ));
    }

    walls
        .iter()
        .enumerate()
        .map(|(i, (lo, hi, shader))| box_brush(planes, i, *lo, *hi, shader))
        .collect()
}

fn flooded_tree(planes: &mut PlaneTable, brushes: &[Brush], entities: &[Entity]) -> Tree {
    let options = CompileOptions::default();
    let faces = structural_face_list(brushes, &options);
    let mut tree = face_bsp(faces, planes, &options).unwrap();
    make_tree_portals(&mut tree, planes).unwrap();
    filter_brushes_into_tree(&mut tree, brushes, planes, true).unwrap();

    let status = flood_entities(&mut tree, entities, planes);
    assert!(matches!(status, FloodStatus::Enclosed));
    fill_outside(&mut tree);
    tree
}

fn player_at(origin: &str) -> Entity {
    Entity::new(vec![
        ("classname".to_string(), "info_player_start".to_string()),
        ("origin".to_string(), origin.to_string()),
    ])
}

const ROOM_A: Vec3 = Vec3::new(-13.0, 0.0, -5.0);
const ROOM_B: Vec3 = Vec3::new(13.0, 0.0, -5.0);

#[test]
fn open_doorway_joins_rooms_into_one_area() {
    let mut planes = PlaneTable::new(0.00001, 0.01, 65536);
    let brushes = two_rooms(&mut planes, false);
    let entities = vec![Entity::default(), player_at("-13 0 -5")];
    let mut tree = flooded_tree(&mut planes, &brushes, &entities);

    let areas = flood_areas(&mut tree, true);
    assert_eq!(areas, 1);

    let a = tree.leaf(tree.leaf_for_point(ROOM_A, &planes)).area;
    let b = tree.leaf(tree.leaf_for_point(ROOM_B, &planes)).area;
    assert_eq!(a, 0);
    assert_eq!(a, b);
}

#[test]
fn closed_areaportal_separates_areas() {
    let mut planes = PlaneTable::new(0.00001, 0.01, 65536);
    let brushes = two_rooms(&mut planes, true);
    let entities = vec![
        Entity::default(),
        player_at("-13 0 -5"),
        player_at("13 0 -5"),
    ];
    let mut tree = flooded_tree(&mut planes, &brushes, &entities);

    let areas = flood_areas(&mut tree, true);
    assert_eq!(areas, 2);

    let a = tree.leaf(tree.leaf_for_point(ROOM_A, &planes)).area;
    let b = tree.leaf(tree.leaf_for_point(ROOM_B, &planes)).area;
    assert_ne!(a, -1);
    assert_ne!(b, -1);
    assert_ne!(a, b);
}

#[test]
fn unrecognized_areaportals_do_not_block() {
    let mut planes = PlaneTable::new(0.00001, 0.01, 65536);
    let brushes = two_rooms(&mut planes, true);
    let entities = vec![
        Entity::default(),
        player_at("-13 0 -5"),
        player_at("13 0 -5"),
    ];
    let mut tree = flooded_tree(&mut planes, &brushes, &entities);

    let areas = flood_areas(&mut tree, false);
    assert_eq!(areas, 1);

    let a = tree.leaf(tree.leaf_for_point(ROOM_A, &planes)).area;
    let b = tree.leaf(tree.leaf_for_point(ROOM_B, &planes)).area;
    assert_eq!(a, b);
}

#[test]
fn unreachable_leaves_stay_unassigned() {
    let mut planes = PlaneTable::new(0.00001, 0.01, 65536);
    let brushes = two_rooms(&mut planes, false);
    let entities = vec![Entity::default(), player_at("-13 0 -5")];
    let mut tree = flooded_tree(&mut planes, &brushes, &entities);

    flood_areas(&mut tree, true);

    // Leaves filled by fill_outside are opaque and keep area -1.
    let beyond = tree.leaf_for_point(Vec3::new(0.0, 0.0, 40.0), &planes);
    assert_eq!(tree.leaf(beyond).area, -1);
}
