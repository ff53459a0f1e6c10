//! The world: a bounded, ordered list of zones plus an id lookup.
//!
//! Built once (usually by [`generate_grid_world`]) and then shared read-only
//! with every process.

use std::collections::HashMap;
use std::fmt::Write as _;

use glam::I64Vec3;

use crate::shape::{Aabb, Vector, Volume, Zone};
use crate::METER;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum GeometryError {
    #[error("zone id 0 is reserved")]
    InvalidZoneId,
    #[error("duplicate zone id {0}")]
    DuplicateZoneId(u32),
    #[error("zone {0} has a volume outside its bounds")]
    VolumeOutsideZone(u32),
    #[error("grid cell size must be positive, got {0}")]
    InvalidCellSize(i64),
    #[error("grid would need {0} cells")]
    GridTooLarge(u128),
}

#[derive(Debug, Clone)]
pub struct World {
    bounds: Aabb,
    zones: Vec<Zone>,
    // derived, never serialized
    by_id: HashMap<u32, usize>,
}

impl PartialEq for World {
    fn eq(&self, other: &Self) -> bool {
        self.bounds == other.bounds && self.zones == other.zones
    }
}

impl Eq for World {}

impl World {
    /// Validates that zone ids are nonzero and unique and that every volume's
    /// bounds lie inside its zone's bounds, then builds the id map.
    ///
    /// [`WorldGrid`](crate::WorldGrid) files zones by their bounds, so a volume
    /// reaching past them would be invisible to grid lookups.
    pub fn new(bounds: Aabb, zones: Vec<Zone>) -> Result<Self, GeometryError> {
        let mut by_id = HashMap::with_capacity(zones.len());
        for (i, z) in zones.iter().enumerate() {
            if z.id == 0 {
                return Err(GeometryError::InvalidZoneId);
            }
            if !z.volumes.iter().all(|v| z.bounds.encloses(&v.bounds)) {
                return Err(GeometryError::VolumeOutsideZone(z.id));
            }
            if by_id.insert(z.id, i).is_some() {
                return Err(GeometryError::DuplicateZoneId(z.id));
            }
        }
        Ok(Self { bounds, zones, by_id })
    }

    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    pub fn zone(&self, id: u32) -> Option<&Zone> {
        self.by_id.get(&id).map(|&i| &self.zones[i])
    }

    pub fn contains_zone(&self, id: u32) -> bool {
        self.by_id.contains_key(&id)
    }

    /// All zone ids, ascending.
    pub fn zone_ids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.zones.iter().map(|z| z.id).collect();
        ids.sort_unstable();
        ids
    }

    /// Linear scan; the first zone (in world order) containing `p` wins when
    /// zones overlap.
    pub fn find_zone_id(&self, p: Vector) -> Option<u32> {
        self.zones.iter().find(|z| z.inside(p)).map(|z| z.id)
    }

    /// Human-readable listing of bounds and zone boxes.
    pub fn summary(&self) -> String {
        let b = self.bounds;
        let mut s = format!(
            "world bounds are ({},{},{}) -> ({},{},{})\nworld has {} zones:\n",
            b.min.x,
            b.min.y,
            b.min.z,
            b.max.x,
            b.max.y,
            b.max.z,
            self.zones.len()
        );
        for z in &self.zones {
            let _ = writeln!(
                s,
                " + 0x{:08x}: ({},{},{}) -> ({},{},{})",
                z.id,
                z.bounds.min.x,
                z.bounds.min.y,
                z.bounds.min.z,
                z.bounds.max.x,
                z.bounds.max.y,
                z.bounds.max.z
            );
        }
        s
    }
}

/// Tile `[0, nx*cell] x [0, ny*cell] x [0, nz*cell]` with box zones.
///
/// Ids run `1..=nx*ny*nz` with x varying fastest, then z, then y. Each zone is
/// one six-plane box volume and its origin is the box center.
pub fn generate_grid_world(nx: u32, ny: u32, nz: u32, cell_size: i64) -> World {
    tracing::debug!(nx, ny, nz, cell_size_m = cell_size / METER, "generating grid world");
    let size = |n: u32| i64::from(n) * cell_size;
    let bounds = Aabb::new(I64Vec3::ZERO, I64Vec3::new(size(nx), size(ny), size(nz)));
    let mut zones = Vec::with_capacity((nx as usize) * (ny as usize) * (nz as usize));
    let mut id = 1u32;
    for y in 0..i64::from(ny) {
        for z in 0..i64::from(nz) {
            for x in 0..i64::from(nx) {
                let min = I64Vec3::new(x, y, z) * cell_size;
                let max = I64Vec3::new(x + 1, y + 1, z + 1) * cell_size;
                let zb = Aabb::new(min, max);
                zones.push(Zone {
                    id,
                    origin: zb.center(),
                    bounds: zb,
                    volumes: vec![Volume::axis_box(zb)],
                });
                id += 1;
            }
        }
    }
    // ids are 1..=n by construction
    World::from_parts_unchecked(bounds, zones)
}

impl World {
    fn from_parts_unchecked(bounds: Aabb, zones: Vec<Zone>) -> Self {
        let by_id = zones.iter().enumerate().map(|(i, z)| (z.id, i)).collect();
        Self { bounds, zones, by_id }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::KILOMETER;

    #[test]
    fn grid_ids_are_x_fastest_then_z_then_y() {
        let w = generate_grid_world(2, 2, 2, METER);
        assert_eq!(w.zone_ids(), (1..=8).collect::<Vec<_>>());
        let min_of = |id| w.zone(id).unwrap().bounds.min;
        assert_eq!(min_of(1), I64Vec3::new(0, 0, 0));
        assert_eq!(min_of(2), I64Vec3::new(METER, 0, 0));
        assert_eq!(min_of(3), I64Vec3::new(0, 0, METER));
        assert_eq!(min_of(5), I64Vec3::new(0, METER, 0));
        assert_eq!(w.bounds().max, I64Vec3::splat(2 * METER));
    }

    #[test]
    fn interior_points_of_each_cell_map_to_that_zone() {
        let cell = KILOMETER;
        let w = generate_grid_world(3, 2, 2, cell);
        for z in w.zones() {
            assert_eq!(z.volumes[0].planes.len(), 6);
            let p = z.bounds.min + I64Vec3::new(1, 1, 1);
            assert!(z.inside(p));
            assert!(z.inside(z.origin));
            assert_eq!(w.find_zone_id(z.origin), Some(z.id));
        }
    }

    #[test]
    fn points_outside_the_world_are_not_found() {
        let w = generate_grid_world(2, 1, 2, KILOMETER);
        let max = w.bounds().max;
        assert_eq!(w.find_zone_id(I64Vec3::new(-1, 0, 0)), None);
        assert_eq!(w.find_zone_id(max + I64Vec3::new(0, 1, 0)), None);
        assert_eq!(w.find_zone_id(I64Vec3::new(0, 0, max.z + METER)), None);
    }

    #[test]
    fn shared_faces_resolve_to_first_zone_in_order() {
        let w = generate_grid_world(2, 1, 1, METER);
        // x == 1m is on both boxes; zone 1 comes first
        assert_eq!(w.find_zone_id(I64Vec3::new(METER, METER / 2, METER / 2)), Some(1));
    }

    #[test]
    fn new_rejects_reserved_and_duplicate_ids() {
        let z = |id| Zone {
            id,
            origin: I64Vec3::ZERO,
            bounds: Aabb::default(),
            volumes: vec![],
        };
        assert_eq!(World::new(Aabb::default(), vec![z(0)]), Err(GeometryError::InvalidZoneId));
        assert_eq!(
            World::new(Aabb::default(), vec![z(4), z(4)]),
            Err(GeometryError::DuplicateZoneId(4))
        );
        let w = World::new(Aabb::default(), vec![z(9), z(3)]).unwrap();
        assert_eq!(w.zone_ids(), vec![3, 9]);
        assert!(w.contains_zone(9));
        assert!(w.zone(0).is_none());
    }

    #[test]
    fn new_rejects_volume_past_zone_bounds() {
        let zb = Aabb::new(I64Vec3::ZERO, I64Vec3::splat(METER));
        let long = Aabb::new(I64Vec3::ZERO, I64Vec3::new(4 * METER, METER, METER));
        let zone = |vb| Zone { id: 1, origin: zb.center(), bounds: zb, volumes: vec![Volume::axis_box(vb)] };
        assert_eq!(World::new(long, vec![zone(long)]), Err(GeometryError::VolumeOutsideZone(1)));
        let inner = Aabb::new(I64Vec3::splat(METER / 4), I64Vec3::splat(METER / 2));
        assert!(World::new(zb, vec![zone(zb), Zone { id: 2, ..zone(inner) }]).is_ok());
    }

    #[test]
    fn summary_lists_every_zone() {
        let w = generate_grid_world(2, 1, 1, METER);
        let s = w.summary();
        assert!(s.contains("world has 2 zones"));
        assert!(s.contains("0x00000002"));
    }
}
