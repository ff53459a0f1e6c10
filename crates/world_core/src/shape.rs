//! Fixed-point shapes: half-space planes, boxes, convex volumes and zones.

use glam::I64Vec3;

use crate::METER;

/// A point or direction in fixed-point world units (`METER` units per meter).
pub type Vector = I64Vec3;

/// Fixed-point dot product: each term is divided by `METER` before summing.
///
/// Terms are computed in `i128` so world extents of thousands of kilometers at
/// micrometer precision cannot overflow; the sum saturates into `i64`.
#[inline]
pub fn dot(p: Vector, n: Vector) -> i64 {
    let m = i128::from(METER);
    let dx = i128::from(p.x) * i128::from(n.x) / m;
    let dy = i128::from(p.y) * i128::from(n.y) / m;
    let dz = i128::from(p.z) * i128::from(n.z) / m;
    let sum = dx + dy + dz;
    i64::try_from(sum).unwrap_or(if sum < 0 { i64::MIN } else { i64::MAX })
}

/// Half-space `{ p : dot(p, normal) >= d }`. The normal is a unit vector
/// scaled by `METER`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Plane {
    pub normal: Vector,
    pub d: i64,
}

impl Plane {
    pub const fn new(normal: Vector, d: i64) -> Self {
        Self { normal, d }
    }

    #[inline]
    pub fn contains(&self, p: Vector) -> bool {
        dot(p, self.normal) >= self.d
    }
}

/// Axis-aligned box. A coarse bound only; containment authority is the planes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Aabb {
    pub min: Vector,
    pub max: Vector,
}

impl Aabb {
    pub const fn new(min: Vector, max: Vector) -> Self {
        Self { min, max }
    }

    /// Inclusive on every face.
    #[inline]
    pub fn contains(&self, p: Vector) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }

    /// Inclusive overlap test (touching boxes overlap).
    #[inline]
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.cmple(other.max).all() && other.min.cmple(self.max).all()
    }

    /// `other` lies entirely inside `self` (shared faces allowed).
    #[inline]
    pub fn encloses(&self, other: &Aabb) -> bool {
        self.contains(other.min) && self.contains(other.max)
    }

    pub fn center(&self) -> Vector {
        (self.min + self.max) / 2
    }
}

/// Convex polytope: the intersection of its planes' half-spaces. `bounds`
/// must enclose the polytope.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Volume {
    pub bounds: Aabb,
    pub planes: Vec<Plane>,
}

impl Volume {
    pub fn new(bounds: Aabb, planes: Vec<Plane>) -> Self {
        Self { bounds, planes }
    }

    /// Six-plane closed box covering exactly `bounds`.
    pub fn axis_box(bounds: Aabb) -> Self {
        let (min, max) = (bounds.min, bounds.max);
        let planes = vec![
            Plane::new(I64Vec3::new(METER, 0, 0), min.x),
            Plane::new(I64Vec3::new(-METER, 0, 0), -max.x),
            Plane::new(I64Vec3::new(0, METER, 0), min.y),
            Plane::new(I64Vec3::new(0, -METER, 0), -max.y),
            Plane::new(I64Vec3::new(0, 0, METER), min.z),
            Plane::new(I64Vec3::new(0, 0, -METER), -max.z),
        ];
        Self { bounds, planes }
    }

    /// Stops at the first plane that rejects `p`.
    #[inline]
    pub fn inside(&self, p: Vector) -> bool {
        self.planes.iter().all(|plane| plane.contains(p))
    }
}

/// A spatial region: the union of its volumes. Id 0 is reserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Zone {
    pub id: u32,
    pub origin: Vector,
    pub bounds: Aabb,
    pub volumes: Vec<Volume>,
}

impl Zone {
    /// Stops at the first volume that contains `p`.
    #[inline]
    pub fn inside(&self, p: Vector) -> bool {
        self.volumes.iter().any(|v| v.inside(p))
    }
}
