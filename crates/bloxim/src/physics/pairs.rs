//! Entity-vs-entity contact resolution.

use bloxim_core::EntityRecord;
use bloxim_shared::constants::OVERLAP_EPSILON;
use bloxim_shared::{Bounds3, Vec3, REST_VELOCITY};

use super::contacts::{Contact, ContactKey};
use super::terrain::combine_friction;

/// The parts of a record the pair solver reads and writes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Body {
    /// Center.
    pub position: Vec3,
    /// Velocity.
    pub velocity: Vec3,
    /// Half-extents.
    pub half_extents: Vec3,
    /// Inverse mass, zero when fixed.
    pub inv_mass: f32,
    /// Friction coefficient.
    pub friction: f32,
    /// Restitution coefficient.
    pub restitution: f32,
}

impl Body {
    /// Copies the solver state out of a record.
    #[must_use]
    pub fn of(record: &EntityRecord) -> Self {
        Self {
            position: record.position,
            velocity: record.velocity,
            half_extents: record.half_extents,
            inv_mass: record.inverse_mass(),
            friction: record.friction,
            restitution: record.restitution,
        }
    }

    /// Writes the solved transform back.
    pub fn store(&self, record: &mut EntityRecord) {
        record.position = self.position;
        record.velocity = self.velocity;
    }

    fn bounds(&self) -> Bounds3 {
        Bounds3::from_center(self.position, self.half_extents)
    }
}

/// Resolves one candidate pair and returns its contact, if they touch.
///
/// `a` must be the lower handle of `key`. Penetration is removed along the
/// axis of least overlap, split by inverse mass. Approaching bodies exchange
/// an impulse `j = -(1 + e) v_rel / (1/m_a + 1/m_b)` with the larger of the
/// two restitutions (zero below the resting speed), followed by Coulomb
/// friction capped at `mu * j`. The reported force on each side is
/// `m |dv| / dt`, which is zero for a fixed body.
pub fn resolve_pair(key: ContactKey, a: &mut Body, b: &mut Body, skin: f32, dt: f32) -> Option<Contact> {
    let overlap = a.bounds().overlap(&b.bounds());
    let positive = (0..3).filter(|&i| overlap.axis(i) > OVERLAP_EPSILON).count();
    if positive < 2 || (0..3).any(|i| overlap.axis(i) + skin <= 0.0) {
        return None;
    }

    let axis = (0..3)
        .min_by(|&i, &j| overlap.axis(i).total_cmp(&overlap.axis(j)))
        .unwrap_or(1);
    let sign = if a.position.axis(axis) >= b.position.axis(axis) {
        1.0
    } else {
        -1.0
    };
    let normal = Vec3::unit(axis, sign);
    let inv_sum = a.inv_mass + b.inv_mass;

    let depth = overlap.axis(axis);
    if depth > OVERLAP_EPSILON && inv_sum > 0.0 {
        a.position += normal * (depth * a.inv_mass / inv_sum);
        b.position -= normal * (depth * b.inv_mass / inv_sum);
    }

    let mut impulse = 0.0;
    let closing = (a.velocity - b.velocity).dot(normal);
    if closing < 0.0 && inv_sum > 0.0 {
        let restitution = if -closing >= REST_VELOCITY {
            a.restitution.max(b.restitution)
        } else {
            0.0
        };
        impulse = -(1.0 + restitution) * closing / inv_sum;
        a.velocity += normal * (impulse * a.inv_mass);
        b.velocity -= normal * (impulse * b.inv_mass);

        let relative = a.velocity - b.velocity;
        let tangent = relative - normal * relative.dot(normal);
        let speed = tangent.length();
        if speed > f32::EPSILON {
            let mu = combine_friction(a.friction, b.friction);
            let friction = (speed / inv_sum).min(mu * impulse);
            let direction = tangent * (1.0 / speed);
            a.velocity -= direction * (friction * a.inv_mass);
            b.velocity += direction * (friction * b.inv_mass);
        }
    }

    let side_force = |body: &Body| {
        if body.inv_mass > 0.0 && dt > 0.0 {
            impulse / dt
        } else {
            0.0
        }
    };
    Some(Contact {
        key,
        axis,
        normal,
        force: [side_force(a), side_force(b)],
        material: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bloxim_core::EntityId;

    fn body(position: Vec3, velocity: Vec3, inv_mass: f32) -> Body {
        Body {
            position,
            velocity,
            half_extents: Vec3::splat(0.5),
            inv_mass,
            friction: 0.0,
            restitution: 0.0,
        }
    }

    fn key() -> ContactKey {
        ContactKey::pair(EntityId::new(0, 0), EntityId::new(1, 0))
    }

    #[test]
    fn test_penetration_split_by_mass() {
        let mut a = body(Vec3::ZERO, Vec3::ZERO, 1.0);
        let mut b = body(Vec3::new(0.8, 0.0, 0.0), Vec3::ZERO, 1.0);
        let contact = resolve_pair(key(), &mut a, &mut b, 0.01, 0.05).unwrap();

        assert_eq!(contact.axis, 0);
        assert_eq!(contact.normal, Vec3::new(-1.0, 0.0, 0.0));
        assert!((a.position.x + 0.1).abs() < 1e-5);
        assert!((b.position.x - 0.9).abs() < 1e-5);
    }

    #[test]
    fn test_head_on_inelastic() {
        let mut a = body(Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0), 1.0);
        let mut b = body(Vec3::new(1.0, 0.0, 0.0), Vec3::new(-2.0, 0.0, 0.0), 1.0);
        let contact = resolve_pair(key(), &mut a, &mut b, 0.01, 0.05).unwrap();

        assert!(a.velocity.x.abs() < 1e-5);
        assert!(b.velocity.x.abs() < 1e-5);
        assert!((contact.force[0] - 40.0).abs() < 1e-3);
    }

    #[test]
    fn test_fixed_side_reports_zero_force() {
        let mut floor = body(Vec3::ZERO, Vec3::ZERO, 0.0);
        let mut falling = body(Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.0, -3.0, 0.0), 1.0);
        falling.restitution = 0.5;
        let contact = resolve_pair(key(), &mut floor, &mut falling, 0.01, 0.05).unwrap();

        assert!(floor.velocity.is_zero());
        assert!((falling.velocity.y - 1.5).abs() < 1e-5);
        assert_eq!(contact.force[0], 0.0);
        assert!(contact.force[1] > 0.0);
    }

    #[test]
    fn test_apart_beyond_skin() {
        let mut a = body(Vec3::ZERO, Vec3::ZERO, 1.0);
        let mut b = body(Vec3::new(1.05, 0.0, 0.0), Vec3::ZERO, 1.0);
        assert!(resolve_pair(key(), &mut a, &mut b, 0.01, 0.05).is_none());
    }
}
