//! Velocity integration: gravity, zone forces, script forces and impulses,
//! fluid buoyancy and drag.

use bloxim_core::EntityRecord;
use bloxim_shared::constants::TERMINAL_VELOCITY;
use bloxim_shared::Vec3;

/// Fluid exposure summed over the fluids an entity touched last tick.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FluidExposure {
    /// Σ fluid density × submerged fraction.
    pub buoyancy: f32,
    /// Σ fluid viscosity × submerged fraction, per second.
    pub drag: f32,
}

/// Applies one tick of accelerations to a record's velocity and clears its
/// pending force and impulse.
///
/// Fixed bodies are held at zero velocity.
pub fn apply_forces(
    record: &mut EntityRecord,
    gravity: f32,
    zone_force: Vec3,
    fluid: FluidExposure,
    dt: f32,
) {
    let force = std::mem::take(&mut record.pending_force);
    let impulse = std::mem::take(&mut record.pending_impulse);
    if record.fixed {
        record.velocity = Vec3::ZERO;
        return;
    }

    let inv_mass = record.inverse_mass();
    let mut accel = (force + zone_force) * inv_mass;
    if record.gravity {
        // Displaced fluid weighs density × submerged volume.
        let displaced = fluid.buoyancy * record.bounds().volume();
        accel.y += (displaced * inv_mass - 1.0) * gravity;
    }

    let mut velocity = record.velocity + accel * dt + impulse * inv_mass;
    if fluid.drag > 0.0 {
        velocity = velocity * (1.0 - fluid.drag * dt).max(0.0);
    }
    record.velocity = clamp_speed(velocity);
}

fn clamp_speed(v: Vec3) -> Vec3 {
    Vec3::new(
        v.x.clamp(-TERMINAL_VELOCITY, TERMINAL_VELOCITY),
        v.y.clamp(-TERMINAL_VELOCITY, TERMINAL_VELOCITY),
        v.z.clamp(-TERMINAL_VELOCITY, TERMINAL_VELOCITY),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use bloxim_core::{EntityConfig, EntityStore};

    fn body(config: EntityConfig) -> EntityRecord {
        let mut store = EntityStore::new(4);
        let id = store.create(config).unwrap();
        store.get(id).unwrap().clone()
    }

    #[test]
    fn test_gravity_and_impulse() {
        let mut record = body(EntityConfig::default());
        record.mass = 2.0;
        record.pending_impulse = Vec3::new(4.0, 0.0, 0.0);
        apply_forces(&mut record, 10.0, Vec3::ZERO, FluidExposure::default(), 0.1);

        assert!((record.velocity.x - 2.0).abs() < 1e-6);
        assert!((record.velocity.y + 1.0).abs() < 1e-6);
        assert!(record.pending_impulse.is_zero());
    }

    #[test]
    fn test_neutral_buoyancy() {
        // Unit cube of mass 1 fully inside density-1 fluid floats in place.
        let mut record = body(EntityConfig::default());
        let fluid = FluidExposure {
            buoyancy: 1.0,
            drag: 0.0,
        };
        apply_forces(&mut record, 9.8, Vec3::ZERO, fluid, 0.05);
        assert!(record.velocity.y.abs() < 1e-6);
    }

    #[test]
    fn test_fixed_never_moves() {
        let mut record = body(EntityConfig::default().fixed());
        record.velocity = Vec3::ONE;
        record.pending_force = Vec3::splat(100.0);
        apply_forces(&mut record, 9.8, Vec3::new(0.0, 50.0, 0.0), FluidExposure::default(), 0.05);
        assert!(record.velocity.is_zero());
        assert!(record.pending_force.is_zero());
    }

    #[test]
    fn test_terminal_velocity() {
        let mut record = body(EntityConfig::default());
        record.velocity = Vec3::new(0.0, -TERMINAL_VELOCITY, 0.0);
        apply_forces(&mut record, 9.8, Vec3::ZERO, FluidExposure::default(), 0.1);
        assert_eq!(record.velocity.y, -TERMINAL_VELOCITY);
    }
}
