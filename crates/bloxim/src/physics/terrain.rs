//! # Terrain Collision
//!
//! Bodies move one axis at a time. After each axis step, any solid voxel the
//! body now overlaps pushes it back out along that axis, and the body's
//! velocity on that axis is bounced or zeroed. Long moves are split into
//! sub-steps shorter than a voxel so fast bodies cannot tunnel.

use std::collections::BTreeMap;

use bloxim_core::{EntityId, EntityRecord};
use bloxim_shared::constants::OVERLAP_EPSILON;
use bloxim_shared::{Bounds3, Vec3, REST_VELOCITY};
use bloxim_voxel::{VoxelCell, VoxelGrid, VoxelRegistry};

use super::contacts::{Contact, ContactKey, FluidContact};

/// Longest distance moved between two collision checks.
const MAX_STEP: f32 = 0.45;

/// Read-only view of the voxel world used by the resolver.
#[derive(Clone, Copy)]
pub struct Terrain<'a> {
    grid: &'a VoxelGrid,
    registry: &'a VoxelRegistry,
}

/// Surface parameters of the voxel a body ran into.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Surface {
    friction: f32,
    restitution: f32,
}

impl<'a> Terrain<'a> {
    /// Wraps a grid and the registry describing its materials.
    #[must_use]
    pub fn new(grid: &'a VoxelGrid, registry: &'a VoxelRegistry) -> Self {
        Self { grid, registry }
    }

    /// True if the voxel blocks movement.
    #[must_use]
    pub fn is_solid(&self, x: i32, y: i32, z: i32) -> bool {
        self.registry.is_solid(self.grid.get(x, y, z))
    }

    /// Solid voxels whose unit boxes overlap `bounds` with positive volume.
    fn solid_overlaps(&self, bounds: &Bounds3) -> impl Iterator<Item = ([i32; 3], VoxelCell)> + '_ {
        let (lo, hi) = bounds.voxel_range();
        let bounds = *bounds;
        self.grid.iter_range(lo, hi).filter(move |(c, cell)| {
            self.registry.is_solid(*cell) && Bounds3::from_voxel(c[0], c[1], c[2]).intersects(&bounds)
        })
    }

    fn surface(&self, cell: VoxelCell) -> Surface {
        self.registry.info(cell.material()).map_or(
            Surface {
                friction: 0.6,
                restitution: 0.0,
            },
            |info| Surface {
                friction: info.friction,
                restitution: info.restitution,
            },
        )
    }

    /// Pushes the record out of every solid voxel it overlaps, along `axis`
    /// against the direction of travel. Returns the surface it hit.
    fn push_out(&self, record: &mut EntityRecord, axis: usize, direction: f32) -> Option<Surface> {
        let bounds = record.bounds();
        let mut limit: Option<(f32, VoxelCell)> = None;
        for (c, cell) in self.solid_overlaps(&bounds) {
            let voxel = Bounds3::from_voxel(c[0], c[1], c[2]);
            let face = if direction > 0.0 {
                voxel.lo.axis(axis)
            } else {
                voxel.hi.axis(axis)
            };
            let closer = match limit {
                None => true,
                Some((current, _)) if direction > 0.0 => face < current,
                Some((current, _)) => face > current,
            };
            if closer {
                limit = Some((face, cell));
            }
        }

        let (face, cell) = limit?;
        let half = record.half_extents.axis(axis);
        let resolved = if direction > 0.0 { face - half } else { face + half };
        record.position.set_axis(axis, resolved);
        Some(self.surface(cell))
    }
}

/// Normal speed after an impact: bounced when fast enough, else zero.
#[must_use]
pub fn bounce(normal_speed: f32, restitution: f32) -> f32 {
    if normal_speed.abs() >= REST_VELOCITY {
        -normal_speed * restitution
    } else {
        0.0
    }
}

/// Friction coefficient of two touching surfaces.
#[must_use]
pub fn combine_friction(a: f32, b: f32) -> f32 {
    (a * b).max(0.0).sqrt()
}

/// Removes up to `mu * normal_impulse` of tangential speed (per unit mass).
fn apply_friction(velocity: &mut Vec3, axis: usize, normal_dv: f32, mu: f32) {
    let mut tangent = *velocity;
    tangent.set_axis(axis, 0.0);
    let speed = tangent.length();
    if speed <= f32::EPSILON {
        return;
    }
    let reduced = (speed - mu * normal_dv).max(0.0);
    let scaled = tangent * (reduced / speed);
    for t in (0..3).filter(|&t| t != axis) {
        velocity.set_axis(t, scaled.axis(t));
    }
}

/// Moves a record by `velocity * dt`, resolving voxel penetration per axis.
///
/// Returns the velocity change the terrain applied on each axis. Bodies that
/// do not collide move freely.
pub fn move_through_terrain(record: &mut EntityRecord, terrain: &Terrain<'_>, dt: f32) -> Vec3 {
    let mut delta_v = Vec3::ZERO;
    if !record.collides {
        record.position += record.velocity * dt;
        return delta_v;
    }

    for axis in 0..3 {
        let travel = record.velocity.axis(axis) * dt;
        if travel.abs() <= f32::EPSILON {
            continue;
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let steps = (travel.abs() / MAX_STEP).ceil().max(1.0) as u32;
        #[allow(clippy::cast_precision_loss)]
        let step = travel / steps as f32;

        for _ in 0..steps {
            let moved = record.position.axis(axis) + step;
            record.position.set_axis(axis, moved);
            let Some(surface) = terrain.push_out(record, axis, step.signum()) else {
                continue;
            };
            let before = record.velocity.axis(axis);
            let after = bounce(before, record.restitution.max(surface.restitution));
            let change = after - before;
            record.velocity.set_axis(axis, after);
            apply_friction(
                &mut record.velocity,
                axis,
                change.abs(),
                combine_friction(record.friction, surface.friction),
            );
            delta_v.set_axis(axis, delta_v.axis(axis) + change);
            break;
        }
    }
    delta_v
}

/// Records the voxel contacts of one body.
///
/// A voxel touches a body when their boxes overlap on at least two axes and
/// the body's box grown by `skin` overlaps it on all three. The separation
/// axis is the one with the least overlap.
pub fn detect_voxel_contacts(
    record: &EntityRecord,
    terrain: &Terrain<'_>,
    skin: f32,
    delta_v: Vec3,
    dt: f32,
    out: &mut BTreeMap<ContactKey, Contact>,
) {
    let bounds = record.bounds();
    let grown = bounds.expand(skin);
    let (lo, hi) = grown.voxel_range();
    for (c, cell) in terrain.grid.iter_range(lo, hi) {
        if !terrain.registry.is_solid(cell) {
            continue;
        }
        let voxel = Bounds3::from_voxel(c[0], c[1], c[2]);
        let raw = bounds.overlap(&voxel);
        let padded = grown.overlap(&voxel);
        let positive = (0..3).filter(|&a| raw.axis(a) > OVERLAP_EPSILON).count();
        if positive < 2 || (0..3).any(|a| padded.axis(a) <= 0.0) {
            continue;
        }

        let axis = (0..3)
            .min_by(|&a, &b| raw.axis(a).total_cmp(&raw.axis(b)))
            .unwrap_or(1);
        let sign = if record.position.axis(axis) >= voxel.center().axis(axis) {
            1.0
        } else {
            -1.0
        };
        let force = if record.fixed || dt <= 0.0 {
            0.0
        } else {
            record.mass * delta_v.axis(axis).abs() / dt
        };
        let key = ContactKey::Voxel {
            entity: record.id,
            coord: c,
        };
        out.insert(
            key,
            Contact {
                key,
                axis,
                normal: Vec3::unit(axis, sign),
                force: [force, 0.0],
                material: Some(cell.material()),
            },
        );
    }
}

/// Records the share of a body's volume inside each fluid material.
pub fn sample_fluids(
    record: &EntityRecord,
    terrain: &Terrain<'_>,
    out: &mut BTreeMap<(EntityId, u16), FluidContact>,
) {
    let bounds = record.bounds();
    let volume = bounds.volume();
    if volume <= 0.0 {
        return;
    }

    let mut submerged: BTreeMap<u16, f32> = BTreeMap::new();
    let (lo, hi) = bounds.voxel_range();
    for (c, cell) in terrain.grid.iter_range(lo, hi) {
        if terrain.registry.fluid(cell).is_none() {
            continue;
        }
        let shared = bounds.intersection_volume(&Bounds3::from_voxel(c[0], c[1], c[2]));
        if shared > 0.0 {
            *submerged.entry(cell.material()).or_default() += shared;
        }
    }

    for (material, shared) in submerged {
        let fraction = (shared / volume).min(1.0);
        if fraction > OVERLAP_EPSILON {
            out.insert(
                (record.id, material),
                FluidContact {
                    entity: record.id,
                    material,
                    fraction,
                },
            );
        }
    }
}
