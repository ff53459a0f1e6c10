//! Uniform bucket grid over the world bounds for faster zone lookup.
//!
//! Each cell lists, in world order, the zones whose bounds touch it. Lookup
//! tests only those candidates, so it returns exactly what the linear scan
//! returns for the same point.

use glam::I64Vec3;

use crate::shape::{Aabb, Vector};
use crate::world::{GeometryError, World};

/// Upper bound on total cells; a tiny cell over a huge world is a config error.
pub const MAX_GRID_CELLS: u128 = 1 << 22;

#[derive(Debug, Clone)]
pub struct WorldGrid {
    bounds: Aabb,
    cell_size: i64,
    dims: [usize; 3],
    cells: Vec<Vec<usize>>,
}

impl WorldGrid {
    pub fn build(world: &World, cell_size: i64) -> Result<Self, GeometryError> {
        if cell_size <= 0 {
            return Err(GeometryError::InvalidCellSize(cell_size));
        }
        let bounds = world.bounds();
        let axis = |lo: i64, hi: i64| -> u128 {
            let extent = (i128::from(hi) - i128::from(lo)).max(0) as u128;
            extent.div_ceil(cell_size as u128).max(1)
        };
        let d = [
            axis(bounds.min.x, bounds.max.x),
            axis(bounds.min.y, bounds.max.y),
            axis(bounds.min.z, bounds.max.z),
        ];
        let total = d[0].saturating_mul(d[1]).saturating_mul(d[2]);
        if total > MAX_GRID_CELLS {
            return Err(GeometryError::GridTooLarge(total));
        }
        // bounded by MAX_GRID_CELLS above
        let dims = [d[0] as usize, d[1] as usize, d[2] as usize];
        let mut grid = Self { bounds, cell_size, dims, cells: vec![Vec::new(); total as usize] };

        for (i, zone) in world.zones().iter().enumerate() {
            let lo = grid.cell_coords(zone.bounds.min);
            let hi = grid.cell_coords(zone.bounds.max);
            if (0..3).any(|a| lo[a] > hi[a]) {
                continue;
            }
            for y in lo[1]..=hi[1] {
                for z in lo[2]..=hi[2] {
                    for x in lo[0]..=hi[0] {
                        let c = grid.flat([x, y, z]);
                        grid.cells[c].push(i);
                    }
                }
            }
        }
        tracing::debug!(
            cells = grid.cells.len(),
            max_candidates = grid.cells.iter().map(Vec::len).max().unwrap_or(0),
            "built world grid"
        );
        Ok(grid)
    }

    pub fn cell_size(&self) -> i64 {
        self.cell_size
    }

    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    /// Candidate zone indices (into `World::zones`) for the cell holding `p`.
    pub fn candidates(&self, p: Vector) -> Option<&[usize]> {
        if !self.bounds.contains(p) {
            return None;
        }
        let c = self.flat(self.cell_coords(p));
        self.cells.get(c).map(Vec::as_slice)
    }

    /// Same result as [`World::find_zone_id`]; points outside the grid use it
    /// directly.
    pub fn find_zone_id(&self, world: &World, p: Vector) -> Option<u32> {
        let Some(candidates) = self.candidates(p) else {
            return world.find_zone_id(p);
        };
        let zones = world.zones();
        candidates
            .iter()
            .filter_map(|&i| zones.get(i))
            .find(|z| z.inside(p))
            .map(|z| z.id)
    }

    // floor((p - min) / cell), clamped into the grid
    fn cell_coords(&self, p: Vector) -> [usize; 3] {
        let rel = |v: i64, lo: i64, n: usize| -> usize {
            let k = (i128::from(v) - i128::from(lo)).div_euclid(i128::from(self.cell_size));
            k.clamp(0, n as i128 - 1) as usize
        };
        let min: I64Vec3 = self.bounds.min;
        [
            rel(p.x, min.x, self.dims[0]),
            rel(p.y, min.y, self.dims[1]),
            rel(p.z, min.z, self.dims[2]),
        ]
    }

    fn flat(&self, [x, y, z]: [usize; 3]) -> usize {
        (y * self.dims[2] + z) * self.dims[0] + x
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{generate_grid_world, KILOMETER, METER};

    #[test]
    fn rejects_bad_cell_sizes() {
        let w = generate_grid_world(2, 1, 2, KILOMETER);
        assert_eq!(WorldGrid::build(&w, 0).unwrap_err(), GeometryError::InvalidCellSize(0));
        assert!(matches!(WorldGrid::build(&w, 1), Err(GeometryError::GridTooLarge(_))));
    }

    #[test]
    fn cells_list_touching_zones_in_world_order() {
        let w = generate_grid_world(2, 1, 1, METER);
        let g = WorldGrid::build(&w, METER).unwrap();
        assert_eq!(g.dims(), [2, 1, 1]);
        assert_eq!(g.candidates(I64Vec3::new(1, 1, 1)), Some(&[0usize][..]));
        // zone 0's max face sits on the cell 1 boundary
        assert_eq!(g.candidates(I64Vec3::new(METER, 1, 1)), Some(&[0usize, 1][..]));
        assert_eq!(g.find_zone_id(&w, I64Vec3::new(METER, 1, 1)), Some(1));
        assert_eq!(g.candidates(I64Vec3::new(-1, 0, 0)), None);
    }

    #[test]
    fn world_max_corner_is_found() {
        let w = generate_grid_world(2, 2, 2, METER);
        let g = WorldGrid::build(&w, METER).unwrap();
        let max = w.bounds().max;
        assert_eq!(g.find_zone_id(&w, max), w.find_zone_id(max));
        assert_eq!(g.find_zone_id(&w, max), Some(8));
    }
}
