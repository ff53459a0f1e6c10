use glam::I64Vec3;
use world_core::{Aabb, Plane, Volume, World, Zone, KILOMETER, METER};

fn wedge_world() -> World {
    // zone 7: a box plus a wedge (box cut by a diagonal plane)
    let a = Aabb::new(I64Vec3::ZERO, I64Vec3::splat(METER));
    let b = Aabb::new(I64Vec3::new(METER, 0, 0), I64Vec3::new(2 * METER, METER, METER));
    let mut wedge = Volume::axis_box(b);
    wedge.planes.push(Plane::new(I64Vec3::new(-707_107, -707_107, 0), -2 * 707_107));
    let z7 = Zone {
        id: 7,
        origin: a.center(),
        bounds: Aabb::new(a.min, b.max),
        volumes: vec![Volume::axis_box(a), wedge],
    };
    let c = Aabb::new(I64Vec3::new(0, METER, 0), I64Vec3::new(2 * METER, 2 * METER, METER));
    let z3 = Zone { id: 3, origin: c.center(), bounds: c, volumes: vec![Volume::axis_box(c)] };
    World::new(Aabb::new(I64Vec3::ZERO, I64Vec3::new(2 * METER, 2 * METER, METER)), vec![z7, z3])
        .unwrap()
}

#[test]
fn multi_volume_world_reencodes_bit_identical() {
    let w = wedge_world();
    let bytes = w.to_bytes();
    let back = World::from_bytes(&bytes).expect("decode");
    assert_eq!(back, w);
    assert_eq!(back.to_bytes(), bytes);
    assert_eq!(back.zone(7).unwrap().volumes.len(), 2);
}

#[test]
fn grid_world_reencodes_bit_identical() {
    let w = world_core::generate_grid_world(3, 2, 2, KILOMETER);
    let bytes = w.to_bytes();
    assert_eq!(World::from_bytes(&bytes).unwrap().to_bytes(), bytes);
}

#[test]
fn trailing_bytes_are_ignored() {
    let w = wedge_world();
    let mut bytes = w.to_bytes();
    bytes.extend_from_slice(&[0xAA; 5]);
    assert_eq!(World::from_bytes(&bytes).unwrap(), w);
}
