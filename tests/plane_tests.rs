use assert_approx_eq::assert_approx_eq;
use brushbsp::error::CompileError;
use brushbsp::math::{Vec3, DIST_EPSILON, NORMAL_EPSILON, ON_EPSILON};
use brushbsp::plane::{opposite, PlaneKind, PlaneSide, PlaneTable};

fn table() -> PlaneTable {
    PlaneTable::new(NORMAL_EPSILON, DIST_EPSILON, 1024)
}

#[test]
fn insert_returns_same_id_for_matching_plane() {
    let mut planes = table();
    let a = planes
        .find_or_insert(Vec3::new(0.0, 0.0, 1.0), 64.0)
        .unwrap();
    let b = planes
        .find_or_insert(Vec3::new(0.0, 0.0, 1.0), 64.0)
        .unwrap();
    assert_eq!(a, b);
    assert_eq!(planes.len(), 2); // the pair
}

#[test]
fn opposite_orientation_is_the_paired_id() {
    let mut planes = table();
    let a = planes
        .find_or_insert(Vec3::new(0.0, 0.0, 1.0), 64.0)
        .unwrap();
    let b = planes
        .find_or_insert(Vec3::new(0.0, 0.0, -1.0), -64.0)
        .unwrap();
    assert_eq!(b, opposite(a));
    assert_eq!(planes.len(), 2);
}

#[test]
fn near_match_within_epsilon_is_deduplicated() {
    let mut planes = table();
    let a = planes
        .find_or_insert(Vec3::new(0.0, 0.0, 1.0), 64.0)
        .unwrap();
    let b = planes
        .find_or_insert(Vec3::new(0.0, 0.000001, 1.0), 64.004)
        .unwrap();
    assert_eq!(a, b);
}

#[test]
fn near_axial_normals_snap_onto_the_axis() {
    let mut planes = table();
    let id = planes
        .find_or_insert(Vec3::new(0.0000001, 0.0, 0.9999999), 16.0000001)
        .unwrap();
    let plane = planes.plane(id);
    assert_eq!(plane.normal, Vec3::new(0.0, 0.0, 1.0));
    assert_eq!(plane.dist, 16.0);
    assert_eq!(plane.kind, PlaneKind::AxialZ);
}

#[test]
fn non_axial_planes_are_classified_as_such() {
    let mut planes = table();
    let id = planes
        .find_or_insert(Vec3::new(1.0, 1.0, 0.0), 10.0)
        .unwrap();
    let plane = planes.plane(id);
    assert_eq!(plane.kind, PlaneKind::NonAxial);
    // Normal comes back unit length.
    assert_approx_eq!(
        plane.normal.x * plane.normal.x
            + plane.normal.y * plane.normal.y
            + plane.normal.z * plane.normal.z,
        1.0,
        1e-5
    );
}

#[test]
fn side_classification_with_epsilon() {
    let mut planes = table();
    let id = planes
        .find_or_insert(Vec3::new(0.0, 0.0, 1.0), 0.0)
        .unwrap();
    let plane = *planes.plane(id);

    assert_eq!(plane.side_of(Vec3::new(0.0, 0.0, 5.0), ON_EPSILON), PlaneSide::Front);
    assert_eq!(plane.side_of(Vec3::new(0.0, 0.0, -5.0), ON_EPSILON), PlaneSide::Back);
    assert_eq!(plane.side_of(Vec3::new(0.0, 0.0, 0.05), ON_EPSILON), PlaneSide::On);
}

#[test]
fn distinct_planes_get_distinct_ids() {
    let mut planes = table();
    let a = planes
        .find_or_insert(Vec3::new(0.0, 0.0, 1.0), 0.0)
        .unwrap();
    let b = planes
        .find_or_insert(Vec3::new(0.0, 0.0, 1.0), 128.0)
        .unwrap();
    let c = planes
        .find_or_insert(Vec3::new(1.0, 0.0, 0.0), 0.0)
        .unwrap();
    assert_ne!(a, b);
    assert_ne!(a, c);
    assert_ne!(b, c);
}

#[test]
fn exceeding_capacity_is_fatal() {
    let mut planes = PlaneTable::new(NORMAL_EPSILON, DIST_EPSILON, 4);
    planes.find_or_insert(Vec3::new(0.0, 0.0, 1.0), 0.0).unwrap();
    planes.find_or_insert(Vec3::new(0.0, 0.0, 1.0), 8.0).unwrap();
    let err = planes.find_or_insert(Vec3::new(0.0, 0.0, 1.0), 16.0);
    assert!(matches!(err, Err(CompileError::TooManyPlanes(4))));
}
