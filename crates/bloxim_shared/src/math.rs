//! Mathematical types shared by every simulation layer.
//!
//! `Vec3` doubles as position, velocity, force and half-extent. `Bounds3` is
//! the only volume type: entities, voxels, zones and queries are all boxes.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// 3D Vector - position, velocity, force, extent
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct Vec3 {
    /// X component
    pub x: f32,
    /// Y component
    pub y: f32,
    /// Z component
    pub z: f32,
}

impl Vec3 {
    /// Creates a new Vec3
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Zero vector
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    /// All ones
    pub const ONE: Self = Self::new(1.0, 1.0, 1.0);

    /// Unit X vector
    pub const X: Self = Self::new(1.0, 0.0, 0.0);

    /// Unit Y vector
    pub const Y: Self = Self::new(0.0, 1.0, 0.0);

    /// Unit Z vector
    pub const Z: Self = Self::new(0.0, 0.0, 1.0);

    /// Vector with every component set to `v`.
    #[must_use]
    pub const fn splat(v: f32) -> Self {
        Self::new(v, v, v)
    }

    /// Component on `axis` (0 = x, 1 = y, anything else = z).
    #[inline]
    #[must_use]
    pub const fn axis(self, axis: usize) -> f32 {
        match axis {
            0 => self.x,
            1 => self.y,
            _ => self.z,
        }
    }

    /// Sets the component on `axis`.
    #[inline]
    pub fn set_axis(&mut self, axis: usize, value: f32) {
        match axis {
            0 => self.x = value,
            1 => self.y = value,
            _ => self.z = value,
        }
    }

    /// Unit vector along `axis` with the given sign.
    #[must_use]
    pub fn unit(axis: usize, sign: f32) -> Self {
        let mut v = Self::ZERO;
        v.set_axis(axis, sign.signum());
        v
    }

    /// Dot product
    #[must_use]
    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Length squared (avoids sqrt)
    #[must_use]
    pub fn length_squared(self) -> f32 {
        self.dot(self)
    }

    /// Length
    #[must_use]
    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    /// Unit vector in the same direction, or zero for a zero vector.
    #[must_use]
    pub fn normalize_or_zero(self) -> Self {
        let len = self.length();
        if len <= f32::EPSILON {
            Self::ZERO
        } else {
            self * (1.0 / len)
        }
    }

    /// Distance to another point
    #[must_use]
    pub fn distance(self, other: Self) -> f32 {
        (self - other).length()
    }

    /// Component-wise minimum.
    #[must_use]
    pub fn min(self, other: Self) -> Self {
        Self::new(self.x.min(other.x), self.y.min(other.y), self.z.min(other.z))
    }

    /// Component-wise maximum.
    #[must_use]
    pub fn max(self, other: Self) -> Self {
        Self::new(self.x.max(other.x), self.y.max(other.y), self.z.max(other.z))
    }

    /// Linear interpolation towards `other`.
    #[must_use]
    pub fn lerp(self, other: Self, t: f32) -> Self {
        self + (other - self) * t
    }

    /// True if every component is exactly zero.
    #[must_use]
    pub fn is_zero(self) -> bool {
        self.x == 0.0 && self.y == 0.0 && self.z == 0.0
    }

    /// True if every component is finite.
    #[must_use]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl std::ops::Add for Vec3 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl std::ops::AddAssign for Vec3 {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl std::ops::Sub for Vec3 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl std::ops::SubAssign for Vec3 {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl std::ops::Mul<f32> for Vec3 {
    type Output = Self;
    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl std::ops::Neg for Vec3 {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

/// Axis-aligned box in world space.
///
/// `lo` is the minimum corner and `hi` the maximum. Boxes whose faces merely
/// touch do not intersect.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct Bounds3 {
    /// Minimum corner.
    pub lo: Vec3,
    /// Maximum corner.
    pub hi: Vec3,
}

impl Bounds3 {
    /// Creates a box from its corners.
    #[must_use]
    pub const fn new(lo: Vec3, hi: Vec3) -> Self {
        Self { lo, hi }
    }

    /// Creates a box centered at `center` with the given half-extents.
    #[must_use]
    pub fn from_center(center: Vec3, half: Vec3) -> Self {
        Self {
            lo: center - half,
            hi: center + half,
        }
    }

    /// The unit box occupied by the voxel at integer coordinates.
    #[must_use]
    pub fn from_voxel(x: i32, y: i32, z: i32) -> Self {
        let lo = Vec3::new(x as f32, y as f32, z as f32);
        Self { lo, hi: lo + Vec3::ONE }
    }

    /// Center point.
    #[must_use]
    pub fn center(&self) -> Vec3 {
        (self.lo + self.hi) * 0.5
    }

    /// Half of the size on each axis.
    #[must_use]
    pub fn half_extents(&self) -> Vec3 {
        (self.hi - self.lo) * 0.5
    }

    /// Size on each axis.
    #[must_use]
    pub fn size(&self) -> Vec3 {
        self.hi - self.lo
    }

    /// Enclosed volume (zero for degenerate boxes).
    #[must_use]
    pub fn volume(&self) -> f32 {
        let s = self.size().max(Vec3::ZERO);
        s.x * s.y * s.z
    }

    /// Checks if this box overlaps another with positive volume.
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        self.lo.x < other.hi.x
            && self.hi.x > other.lo.x
            && self.lo.y < other.hi.y
            && self.hi.y > other.lo.y
            && self.lo.z < other.hi.z
            && self.hi.z > other.lo.z
    }

    /// Overlap on each axis. Positive = overlap, negative = gap.
    #[must_use]
    pub fn overlap(&self, other: &Self) -> Vec3 {
        self.hi.min(other.hi) - self.lo.max(other.lo)
    }

    /// Volume shared with another box.
    #[must_use]
    pub fn intersection_volume(&self, other: &Self) -> f32 {
        let o = self.overlap(other).max(Vec3::ZERO);
        o.x * o.y * o.z
    }

    /// Checks if a point lies inside (inclusive of faces).
    #[must_use]
    pub fn contains(&self, p: Vec3) -> bool {
        p.x >= self.lo.x
            && p.x <= self.hi.x
            && p.y >= self.lo.y
            && p.y <= self.hi.y
            && p.z >= self.lo.z
            && p.z <= self.hi.z
    }

    /// Grows the box by `margin` on every side.
    #[must_use]
    pub fn expand(&self, margin: f32) -> Self {
        let m = Vec3::splat(margin);
        Self {
            lo: self.lo - m,
            hi: self.hi + m,
        }
    }

    /// Smallest box containing both.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self {
            lo: self.lo.min(other.lo),
            hi: self.hi.max(other.hi),
        }
    }

    /// Inclusive integer voxel range covered by this box.
    ///
    /// A face lying exactly on a voxel boundary does not pull the next voxel
    /// into the range.
    #[must_use]
    pub fn voxel_range(&self) -> ([i32; 3], [i32; 3]) {
        let lo = [
            self.lo.x.floor() as i32,
            self.lo.y.floor() as i32,
            self.lo.z.floor() as i32,
        ];
        let hi = [
            (self.hi.x.ceil() as i32 - 1).max(lo[0]),
            (self.hi.y.ceil() as i32 - 1).max(lo[1]),
            (self.hi.z.ceil() as i32 - 1).max(lo[2]),
        ];
        (lo, hi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec3_operations() {
        let a = Vec3::new(1.0, 2.0, 3.0);
        let b = Vec3::new(4.0, 5.0, 6.0);

        let sum = a + b;
        assert_eq!(sum, Vec3::new(5.0, 7.0, 9.0));

        let dot = a.dot(b);
        assert_eq!(dot, 32.0); // 1*4 + 2*5 + 3*6
    }

    #[test]
    fn test_vec3_axis_access() {
        let mut v = Vec3::ZERO;
        v.set_axis(1, 4.0);
        assert_eq!(v.axis(1), 4.0);
        assert_eq!(Vec3::unit(2, -3.0), Vec3::new(0.0, 0.0, -1.0));
    }

    #[test]
    fn test_vec3_bytemuck() {
        let v = Vec3::new(1.0, 2.0, 3.0);
        let bytes: &[u8] = bytemuck::bytes_of(&v);
        assert_eq!(bytes.len(), 12);
    }

    #[test]
    fn test_bounds_touching_faces_do_not_intersect() {
        let a = Bounds3::from_voxel(0, 0, 0);
        let b = Bounds3::from_voxel(1, 0, 0);
        assert!(!a.intersects(&b));
        assert!(a.expand(0.01).intersects(&b));
    }

    #[test]
    fn test_bounds_intersection_volume() {
        let a = Bounds3::new(Vec3::ZERO, Vec3::splat(2.0));
        let b = Bounds3::new(Vec3::ONE, Vec3::splat(3.0));
        assert!((a.intersection_volume(&b) - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_voxel_range_excludes_boundary_voxel() {
        let b = Bounds3::from_center(Vec3::new(0.5, 1.5, 0.5), Vec3::splat(0.5));
        assert_eq!(b.voxel_range(), ([0, 1, 0], [0, 1, 0]));

        let c = Bounds3::from_center(Vec3::new(0.0, 1.5, 0.0), Vec3::splat(0.5));
        assert_eq!(c.voxel_range(), ([-1, 1, -1], [0, 1, 0]));
    }
}
