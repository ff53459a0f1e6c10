//! world_core: fixed-point spatial model of the sharded world.
//!
//! Scope
//! - `shape`: `Vector`, `Plane`, `Aabb`, `Volume`, `Zone` and the containment math.
//! - `world`: `World` (ordered zones + id lookup) and grid-world generation.
//! - `grid`: `WorldGrid`, a bucket index giving the same answers as the linear scan.
//! - `codec`: deterministic little-endian encoding so a world ships wire-exact.
//!
//! Units: one meter is `METER` (1_000_000) units; the micrometer is the
//! smallest representable length.

pub mod codec;
pub mod grid;
pub mod shape;
pub mod world;

pub use codec::grid_world_encoded_len;
pub use grid::WorldGrid;
pub use shape::{dot, Aabb, Plane, Vector, Volume, Zone};
pub use world::{generate_grid_world, GeometryError, World};

pub const MICROMETER: i64 = 1;
pub const MILLIMETER: i64 = 1_000;
pub const CENTIMETER: i64 = 10_000;
pub const METER: i64 = 1_000_000;
pub const KILOMETER: i64 = 1_000 * METER;
