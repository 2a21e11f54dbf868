//! # Contact Records
//!
//! A contact exists exactly while its overlap persists. The tracker diffs
//! each tick's detected set against the previous one: new keys raise a begin
//! (or fluid enter), vanished keys raise a separate (or fluid leave).
//! Persisting records are refreshed in place without events.

use std::collections::BTreeMap;

use bloxim_core::EntityId;
use bloxim_shared::Vec3;

use crate::events::GameEvent;

/// Identity of a solid contact.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ContactKey {
    /// Two entities, lower handle first.
    Entities(EntityId, EntityId),
    /// An entity touching one solid voxel.
    Voxel {
        /// The entity.
        entity: EntityId,
        /// Voxel coordinates.
        coord: [i32; 3],
    },
}

impl ContactKey {
    /// Key for an entity pair in canonical order.
    #[must_use]
    pub fn pair(a: EntityId, b: EntityId) -> Self {
        if a <= b {
            Self::Entities(a, b)
        } else {
            Self::Entities(b, a)
        }
    }

    /// Entities taking part.
    #[must_use]
    pub fn entities(&self) -> [Option<EntityId>; 2] {
        match *self {
            Self::Entities(a, b) => [Some(a), Some(b)],
            Self::Voxel { entity, .. } => [Some(entity), None],
        }
    }

    /// True if `id` takes part.
    #[must_use]
    pub fn involves(&self, id: EntityId) -> bool {
        self.entities().contains(&Some(id))
    }
}

/// A solid contact.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Contact {
    /// Identity.
    pub key: ContactKey,
    /// Separation axis (0 = x, 1 = y, 2 = z).
    pub axis: usize,
    /// Unit normal pushing the first side away from the second.
    pub normal: Vec3,
    /// Force resolved this tick on each side. A voxel, and any fixed body,
    /// reports zero.
    pub force: [f32; 2],
    /// Material of the voxel side, for voxel contacts.
    pub material: Option<u16>,
}

impl Contact {
    /// Force on `id`, if it takes part.
    #[must_use]
    pub fn force_on(&self, id: EntityId) -> Option<f32> {
        match self.key {
            ContactKey::Entities(a, _) if a == id => Some(self.force[0]),
            ContactKey::Entities(_, b) if b == id => Some(self.force[1]),
            ContactKey::Voxel { entity, .. } if entity == id => Some(self.force[0]),
            _ => None,
        }
    }
}

/// An entity partly submerged in one fluid material.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FluidContact {
    /// The entity.
    pub entity: EntityId,
    /// Fluid material code.
    pub material: u16,
    /// Share of the entity's volume inside that fluid, in `(0, 1]`.
    pub fraction: f32,
}

/// Live contact records.
#[derive(Debug, Default)]
pub struct ContactTracker {
    solid: BTreeMap<ContactKey, Contact>,
    fluid: BTreeMap<(EntityId, u16), FluidContact>,
}

impl ContactTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the solid set, raising begin/separate events for the
    /// differences.
    pub fn commit_solid(
        &mut self,
        current: BTreeMap<ContactKey, Contact>,
        events: &mut Vec<GameEvent>,
    ) {
        for key in self.solid.keys() {
            if !current.contains_key(key) {
                events.push(GameEvent::ContactSeparate(*key));
            }
        }
        for (key, contact) in &current {
            if !self.solid.contains_key(key) {
                events.push(GameEvent::ContactBegin(*contact));
            }
        }
        self.solid = current;
    }

    /// Replaces the fluid set, raising enter/leave events for the
    /// differences.
    pub fn commit_fluid(
        &mut self,
        current: BTreeMap<(EntityId, u16), FluidContact>,
        events: &mut Vec<GameEvent>,
    ) {
        for (entity, material) in self.fluid.keys() {
            if !current.contains_key(&(*entity, *material)) {
                events.push(GameEvent::FluidLeave {
                    entity: *entity,
                    material: *material,
                });
            }
        }
        for (key, contact) in &current {
            if !self.fluid.contains_key(key) {
                events.push(GameEvent::FluidEnter(*contact));
            }
        }
        self.fluid = current;
    }

    /// Drops every record involving `id` without raising events.
    pub fn forget(&mut self, id: EntityId) -> usize {
        let before = self.solid.len() + self.fluid.len();
        self.solid.retain(|key, _| !key.involves(id));
        self.fluid.retain(|(entity, _), _| *entity != id);
        before - self.solid.len() - self.fluid.len()
    }

    /// Looks up a solid contact.
    #[must_use]
    pub fn get(&self, key: &ContactKey) -> Option<&Contact> {
        self.solid.get(key)
    }

    /// All solid contacts in key order.
    pub fn contacts(&self) -> impl Iterator<Item = &Contact> + '_ {
        self.solid.values()
    }

    /// Solid contacts involving `id`.
    #[must_use]
    pub fn contacts_of(&self, id: EntityId) -> Vec<Contact> {
        self.solid
            .values()
            .filter(|c| c.key.involves(id))
            .copied()
            .collect()
    }

    /// Fluid contacts of `id`.
    pub fn fluids_of(&self, id: EntityId) -> impl Iterator<Item = &FluidContact> + '_ {
        self.fluid
            .range((id, 0)..=(id, u16::MAX))
            .map(|(_, contact)| contact)
    }

    /// All fluid contacts.
    pub fn fluid_contacts(&self) -> impl Iterator<Item = &FluidContact> + '_ {
        self.fluid.values()
    }

    /// Number of solid contacts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.solid.len()
    }

    /// True if no solid contact exists.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.solid.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact(key: ContactKey) -> Contact {
        Contact {
            key,
            axis: 1,
            normal: Vec3::Y,
            force: [1.0, 0.0],
            material: None,
        }
    }

    #[test]
    fn test_begin_and_separate_only_on_transitions() {
        let a = EntityId::new(1, 0);
        let b = EntityId::new(2, 0);
        let key = ContactKey::pair(b, a);
        assert_eq!(key, ContactKey::Entities(a, b));

        let mut tracker = ContactTracker::new();
        let mut events = Vec::new();
        let set = BTreeMap::from([(key, contact(key))]);

        tracker.commit_solid(set.clone(), &mut events);
        tracker.commit_solid(set, &mut events);
        tracker.commit_solid(BTreeMap::new(), &mut events);

        assert_eq!(
            events,
            vec![
                GameEvent::ContactBegin(contact(key)),
                GameEvent::ContactSeparate(key)
            ]
        );
    }

    #[test]
    fn test_forget_is_silent() {
        let a = EntityId::new(1, 0);
        let key = ContactKey::Voxel {
            entity: a,
            coord: [0, 0, 0],
        };
        let mut tracker = ContactTracker::new();
        let mut events = Vec::new();
        tracker.commit_solid(BTreeMap::from([(key, contact(key))]), &mut events);
        tracker.commit_fluid(
            BTreeMap::from([(
                (a, 8),
                FluidContact {
                    entity: a,
                    material: 8,
                    fraction: 0.5,
                },
            )]),
            &mut events,
        );
        events.clear();

        assert_eq!(tracker.forget(a), 2);
        tracker.commit_solid(BTreeMap::new(), &mut events);
        tracker.commit_fluid(BTreeMap::new(), &mut events);
        assert!(events.is_empty());
    }

    #[test]
    fn test_force_on_sides() {
        let a = EntityId::new(1, 0);
        let b = EntityId::new(2, 0);
        let mut c = contact(ContactKey::pair(a, b));
        c.force = [3.0, 0.0];
        assert_eq!(c.force_on(a), Some(3.0));
        assert_eq!(c.force_on(b), Some(0.0));
        assert_eq!(c.force_on(EntityId::new(9, 0)), None);
    }
}
