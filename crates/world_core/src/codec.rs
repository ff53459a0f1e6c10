//! Deterministic wire encoding for the geometry types.
//!
//! Layout (little-endian, no padding):
//! - Vector: i64 x, y, z
//! - Plane: Vector normal, i64 d
//! - Aabb: Vector min, Vector max
//! - Volume: Aabb, u64 count, Plane * count
//! - Zone: u32 id, Vector origin, Aabb, u64 count, Volume * count
//! - World: Aabb, u64 count, Zone * count
//!
//! Decoding never reads past the input: short buffers fail with
//! `WireError::Truncated`. World decode rebuilds the id lookup.

use glam::I64Vec3;
use net_core::codec::{read_i64, read_len, read_u32, write_len, WireDecode, WireEncode};
use net_core::WireError;

use crate::shape::{Aabb, Plane, Vector, Volume, Zone};
use crate::world::World;

const VECTOR_BYTES: usize = 24;
const PLANE_BYTES: usize = VECTOR_BYTES + 8;
const AABB_BYTES: usize = 2 * VECTOR_BYTES;
const VOLUME_MIN_BYTES: usize = AABB_BYTES + 8;
const ZONE_MIN_BYTES: usize = 4 + VECTOR_BYTES + AABB_BYTES + 8;

fn encode_vector(v: Vector, out: &mut Vec<u8>) {
    out.extend_from_slice(&v.x.to_le_bytes());
    out.extend_from_slice(&v.y.to_le_bytes());
    out.extend_from_slice(&v.z.to_le_bytes());
}

fn decode_vector(inp: &mut &[u8]) -> Result<Vector, WireError> {
    Ok(I64Vec3::new(read_i64(inp)?, read_i64(inp)?, read_i64(inp)?))
}

impl WireEncode for Plane {
    fn encode(&self, out: &mut Vec<u8>) {
        encode_vector(self.normal, out);
        out.extend_from_slice(&self.d.to_le_bytes());
    }
}

impl WireDecode for Plane {
    fn decode(inp: &mut &[u8]) -> Result<Self, WireError> {
        let normal = decode_vector(inp)?;
        let d = read_i64(inp)?;
        Ok(Plane { normal, d })
    }
}

impl WireEncode for Aabb {
    fn encode(&self, out: &mut Vec<u8>) {
        encode_vector(self.min, out);
        encode_vector(self.max, out);
    }
}

impl WireDecode for Aabb {
    fn decode(inp: &mut &[u8]) -> Result<Self, WireError> {
        let min = decode_vector(inp)?;
        let max = decode_vector(inp)?;
        Ok(Aabb { min, max })
    }
}

impl WireEncode for Volume {
    fn encode(&self, out: &mut Vec<u8>) {
        self.bounds.encode(out);
        write_len(out, self.planes.len());
        for p in &self.planes {
            p.encode(out);
        }
    }
}

impl WireDecode for Volume {
    fn decode(inp: &mut &[u8]) -> Result<Self, WireError> {
        let bounds = Aabb::decode(inp)?;
        let n = read_len(inp, PLANE_BYTES)?;
        let mut planes = Vec::with_capacity(n);
        for _ in 0..n {
            planes.push(Plane::decode(inp)?);
        }
        Ok(Volume { bounds, planes })
    }
}

impl WireEncode for Zone {
    fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.id.to_le_bytes());
        encode_vector(self.origin, out);
        self.bounds.encode(out);
        write_len(out, self.volumes.len());
        for v in &self.volumes {
            v.encode(out);
        }
    }
}

impl WireDecode for Zone {
    fn decode(inp: &mut &[u8]) -> Result<Self, WireError> {
        let id = read_u32(inp)?;
        let origin = decode_vector(inp)?;
        let bounds = Aabb::decode(inp)?;
        let n = read_len(inp, VOLUME_MIN_BYTES)?;
        let mut volumes = Vec::with_capacity(n);
        for _ in 0..n {
            volumes.push(Volume::decode(inp)?);
        }
        Ok(Zone { id, origin, bounds, volumes })
    }
}

impl WireEncode for World {
    fn encode(&self, out: &mut Vec<u8>) {
        self.bounds().encode(out);
        write_len(out, self.zones().len());
        for z in self.zones() {
            z.encode(out);
        }
    }
}

impl WireDecode for World {
    fn decode(inp: &mut &[u8]) -> Result<Self, WireError> {
        let bounds = Aabb::decode(inp)?;
        let n = read_len(inp, ZONE_MIN_BYTES)?;
        let mut zones = Vec::with_capacity(n);
        for _ in 0..n {
            zones.push(Zone::decode(inp)?);
        }
        World::new(bounds, zones).map_err(|e| WireError::Invalid(e.to_string()))
    }
}

/// Encoded length of `generate_grid_world(nx, ny, nz, _)` without building
/// it. `None` when the size does not fit in `usize`.
pub fn grid_world_encoded_len(nx: u32, ny: u32, nz: u32) -> Option<usize> {
    const BOX_ZONE_BYTES: usize = ZONE_MIN_BYTES + VOLUME_MIN_BYTES + 6 * PLANE_BYTES;
    let zones = u64::from(nx).checked_mul(u64::from(ny))?.checked_mul(u64::from(nz))?;
    usize::try_from(zones).ok()?.checked_mul(BOX_ZONE_BYTES)?.checked_add(AABB_BYTES + 8)
}

impl World {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode(&mut out);
        out
    }

    /// Decode a whole buffer; trailing bytes are ignored.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, WireError> {
        let mut inp = bytes;
        World::decode(&mut inp)
    }
}
