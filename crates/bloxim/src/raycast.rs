//! # Raycasts
//!
//! Voxels are walked with a DDA (Digital Differential Analyzer): the ray
//! steps from voxel to voxel across whichever boundary it reaches first.
//! Entities are tested with the slab method against their boxes.

use bloxim_core::EntityId;
use bloxim_shared::{Bounds3, Vec3};
use bloxim_voxel::VoxelCell;

/// What a ray hit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RaycastTarget {
    /// A solid voxel.
    Voxel {
        /// Voxel coordinates.
        coord: [i32; 3],
        /// Its cell.
        cell: VoxelCell,
    },
    /// An entity.
    Entity(EntityId),
}

/// Result of a raycast.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RaycastHit {
    /// What was hit.
    pub target: RaycastTarget,
    /// Face normal of the hit (-1, 0 or 1 on each axis).
    pub normal: [i32; 3],
    /// Distance from the origin.
    pub distance: f32,
    /// Hit position in world space.
    pub point: Vec3,
}

/// Which targets a world raycast considers.
#[derive(Clone, Debug, PartialEq)]
pub struct RaycastOptions {
    /// Test voxels.
    pub voxels: bool,
    /// Test entities.
    pub entities: bool,
    /// Entities never hit (usually the caster).
    pub ignore: Vec<EntityId>,
    /// Only entities matching this selector are hit.
    pub selector: Option<String>,
}

impl Default for RaycastOptions {
    fn default() -> Self {
        Self {
            voxels: true,
            entities: true,
            ignore: Vec::new(),
            selector: None,
        }
    }
}

/// Voxel hit found by [`raycast_voxels`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VoxelHit {
    /// Voxel coordinates.
    pub voxel: [i32; 3],
    /// Face normal.
    pub normal: [i32; 3],
    /// Distance from the origin.
    pub distance: f32,
}

/// Walks the voxels along a ray until `is_solid` accepts one.
///
/// `direction` need not be normalized. A zero direction, or a non-finite
/// origin or distance, hits nothing.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub fn raycast_voxels(
    origin: Vec3,
    direction: Vec3,
    max_distance: f32,
    is_solid: impl Fn([i32; 3]) -> bool,
) -> Option<VoxelHit> {
    let dir = direction.normalize_or_zero();
    if dir.is_zero() || !origin.is_finite() || !max_distance.is_finite() {
        return None;
    }

    let mut voxel = [
        origin.x.floor() as i32,
        origin.y.floor() as i32,
        origin.z.floor() as i32,
    ];
    let mut step = [0i32; 3];
    let mut t_delta = [f32::MAX; 3];
    let mut t_max = [f32::MAX; 3];
    for axis in 0..3 {
        let d = dir.axis(axis);
        step[axis] = if d >= 0.0 { 1 } else { -1 };
        if d.abs() > 1e-4 {
            t_delta[axis] = (1.0 / d).abs();
            let boundary = if d > 0.0 {
                (voxel[axis] + 1) as f32
            } else {
                voxel[axis] as f32
            };
            t_max[axis] = (boundary - origin.axis(axis)) / d;
        }
    }

    let mut distance = 0.0;
    let mut normal = [0; 3];
    while distance <= max_distance {
        if is_solid(voxel) {
            return Some(VoxelHit {
                voxel,
                normal,
                distance,
            });
        }

        let axis = if t_max[0] < t_max[1] && t_max[0] < t_max[2] {
            0
        } else if t_max[1] < t_max[2] {
            1
        } else {
            2
        };
        if t_max[axis] == f32::MAX {
            return None;
        }
        distance = t_max[axis];
        t_max[axis] += t_delta[axis];
        voxel[axis] += step[axis];
        normal = [0; 3];
        normal[axis] = -step[axis];
    }
    None
}

/// Slab test of a ray against a box.
///
/// Returns the entry distance and face normal. A ray starting inside the
/// box hits at distance zero with a zero normal.
#[must_use]
pub fn ray_box(origin: Vec3, dir: Vec3, bounds: &Bounds3, max_distance: f32) -> Option<(f32, [i32; 3])> {
    let mut t_enter = 0.0f32;
    let mut t_exit = max_distance;
    let mut normal = [0; 3];

    for axis in 0..3 {
        let o = origin.axis(axis);
        let d = dir.axis(axis);
        let (lo, hi) = (bounds.lo.axis(axis), bounds.hi.axis(axis));
        if d.abs() < 1e-8 {
            if o < lo || o > hi {
                return None;
            }
            continue;
        }
        let (mut near, mut far) = ((lo - o) / d, (hi - o) / d);
        let mut face = -1;
        if near > far {
            std::mem::swap(&mut near, &mut far);
            face = 1;
        }
        if near > t_enter {
            t_enter = near;
            normal = [0; 3];
            normal[axis] = face;
        }
        t_exit = t_exit.min(far);
        if t_enter > t_exit {
            return None;
        }
    }
    Some((t_enter, normal))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn floor(v: [i32; 3]) -> bool {
        v[1] <= 0
    }

    #[test]
    fn test_raycast_hits_ground() {
        let hit = raycast_voxels(Vec3::new(0.5, 10.0, 0.5), Vec3::new(0.0, -1.0, 0.0), 100.0, floor)
            .unwrap();
        assert_eq!(hit.voxel, [0, 0, 0]);
        assert_eq!(hit.normal, [0, 1, 0]);
        assert!((hit.distance - 9.0).abs() < 1e-5);
    }

    #[test]
    fn test_raycast_respects_max_distance() {
        assert!(
            raycast_voxels(Vec3::new(0.5, 10.0, 0.5), Vec3::new(0.0, -1.0, 0.0), 5.0, floor).is_none()
        );
        assert!(raycast_voxels(Vec3::new(0.5, 10.0, 0.5), Vec3::ZERO, 50.0, floor).is_none());
    }

    #[test]
    fn test_diagonal_ray() {
        let wall = |v: [i32; 3]| v[0] >= 3;
        let hit = raycast_voxels(Vec3::new(0.5, 0.5, 0.5), Vec3::new(1.0, 1.0, 0.0), 20.0, wall)
            .unwrap();
        assert_eq!(hit.voxel[0], 3);
        assert_eq!(hit.normal, [-1, 0, 0]);
    }

    #[test]
    fn test_ray_box() {
        let bounds = Bounds3::new(Vec3::new(4.0, -1.0, -1.0), Vec3::new(6.0, 1.0, 1.0));
        let (t, normal) = ray_box(Vec3::ZERO, Vec3::X, &bounds, 100.0).unwrap();
        assert!((t - 4.0).abs() < 1e-6);
        assert_eq!(normal, [-1, 0, 0]);

        assert!(ray_box(Vec3::ZERO, Vec3::X, &bounds, 3.0).is_none());
        assert!(ray_box(Vec3::ZERO, Vec3::Y, &bounds, 100.0).is_none());
        assert_eq!(ray_box(Vec3::new(5.0, 0.0, 0.0), Vec3::X, &bounds, 1.0), Some((0.0, [0; 3])));
    }
}
