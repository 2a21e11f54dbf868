//! # Physics & Contact Resolver
//!
//! One [`Physics::step`] per tick, in this order:
//!
//! 1. Forces: gravity, zones, queued script forces and impulses, plus
//!    buoyancy and drag from last tick's fluid contacts.
//! 2. Integration, one axis at a time, resolving voxel penetration.
//! 3. Broad phase through the spatial index, skipping non-colliding bodies
//!    and filtered pairs.
//! 4. Impulse resolution and contact bookkeeping (entity, voxel, fluid).
//! 5. Queued damage.
//!
//! Events are appended to the caller's buffer; nothing is dispatched here.

mod contacts;
mod damage;
mod forces;
mod pairs;
mod terrain;

use std::collections::{BTreeMap, HashMap};

use bloxim_core::{EntityId, EntityStore, SpatialIndex};
use bloxim_shared::Vec3;
use bloxim_voxel::{VoxelCell, VoxelGrid, VoxelRegistry};

pub use contacts::{Contact, ContactKey, ContactTracker, FluidContact};
pub use damage::{DamageQueue, DamageRequest};
pub use forces::{apply_forces, FluidExposure};
pub use pairs::{resolve_pair, Body};
pub use terrain::{bounce, combine_friction, Terrain};

use crate::events::GameEvent;
use crate::filter::CollisionFilters;
use crate::zone::ZoneSet;

/// Tunables of the resolver.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PhysicsSettings {
    /// Downward acceleration.
    pub gravity: f32,
    /// Distance within which touching bodies keep their contact.
    pub contact_skin: f32,
}

impl Default for PhysicsSettings {
    fn default() -> Self {
        Self {
            gravity: bloxim_shared::DEFAULT_GRAVITY,
            contact_skin: bloxim_shared::CONTACT_SKIN,
        }
    }
}

/// World state the resolver reads but never writes.
#[derive(Clone, Copy)]
pub struct StepInputs<'a> {
    /// Terrain.
    pub grid: &'a VoxelGrid,
    /// Materials of the terrain.
    pub registry: &'a VoxelRegistry,
    /// Force zones.
    pub zones: &'a ZoneSet,
    /// Pair exclusions.
    pub filters: &'a CollisionFilters,
}

/// Counters from one step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StepStats {
    /// Bodies integrated.
    pub bodies: usize,
    /// Broad-phase pairs considered.
    pub candidate_pairs: usize,
    /// Solid contacts after the step.
    pub contacts: usize,
    /// Fluid contacts after the step.
    pub fluid_contacts: usize,
    /// Damage requests that took effect.
    pub damage_applied: usize,
}

/// Contact resolver and its per-world state.
#[derive(Debug, Default)]
pub struct Physics {
    settings: PhysicsSettings,
    contacts: ContactTracker,
    damage: DamageQueue,
}

impl Physics {
    /// Creates a resolver.
    #[must_use]
    pub fn new(settings: PhysicsSettings) -> Self {
        Self {
            settings,
            contacts: ContactTracker::new(),
            damage: DamageQueue::new(),
        }
    }

    /// Live contacts.
    #[must_use]
    pub fn contacts(&self) -> &ContactTracker {
        &self.contacts
    }

    /// Queues damage for the next step.
    pub fn queue_damage(&mut self, request: DamageRequest) {
        self.damage.push(request);
    }

    /// Drops every contact of a destroyed entity without raising events.
    pub fn forget(&mut self, id: EntityId) -> usize {
        self.contacts.forget(id)
    }

    fn fluid_exposure(&self, id: EntityId, registry: &VoxelRegistry) -> FluidExposure {
        self.contacts
            .fluids_of(id)
            .filter_map(|contact| {
                registry
                    .fluid(VoxelCell::material_only(contact.material))
                    .map(|props| (props, contact.fraction))
            })
            .fold(FluidExposure::default(), |sum, (props, fraction)| FluidExposure {
                buoyancy: sum.buoyancy + props.density * fraction,
                drag: sum.drag + props.viscosity * fraction,
            })
    }

    /// Runs one tick of physics.
    pub fn step(
        &mut self,
        store: &mut EntityStore,
        spatial: &mut SpatialIndex,
        inputs: &StepInputs<'_>,
        dt: f32,
        events: &mut Vec<GameEvent>,
    ) -> StepStats {
        let terrain = Terrain::new(inputs.grid, inputs.registry);
        let skin = self.settings.contact_skin;
        let ids = store.ids();
        let mut stats = StepStats {
            bodies: ids.len(),
            ..StepStats::default()
        };

        // Forces and integration.
        let mut terrain_dv: HashMap<EntityId, Vec3> = HashMap::with_capacity(ids.len());
        for &id in &ids {
            let Some(record) = store.get(id) else {
                continue;
            };
            let zone_force = inputs.zones.force_on(record, store.interner());
            let exposure = self.fluid_exposure(id, inputs.registry);
            let Some(record) = store.get_mut(id) else {
                continue;
            };
            apply_forces(record, self.settings.gravity, zone_force, exposure, dt);
            if !record.fixed {
                let dv = terrain::move_through_terrain(record, &terrain, dt);
                terrain_dv.insert(id, dv);
            }
            spatial.update(id, record.bounds());
        }

        // Entity pairs.
        let mut solid = BTreeMap::new();
        let pairs = spatial.candidate_pairs(skin);
        stats.candidate_pairs = pairs.len();
        for (a, b) in pairs {
            let (Some(ra), Some(rb)) = (store.get(a), store.get(b)) else {
                continue;
            };
            if !ra.collides || !rb.collides || inputs.filters.excludes(ra, rb, store.interner()) {
                continue;
            }
            let (mut body_a, mut body_b) = (Body::of(ra), Body::of(rb));
            let Some(contact) = resolve_pair(ContactKey::pair(a, b), &mut body_a, &mut body_b, skin, dt)
            else {
                continue;
            };
            solid.insert(contact.key, contact);
            for (id, body) in [(a, body_a), (b, body_b)] {
                if let Some(record) = store.get_mut(id) {
                    body.store(record);
                    spatial.update(id, record.bounds());
                }
            }
        }

        // Voxel and fluid contacts, against final positions.
        let mut fluids = BTreeMap::new();
        for &id in &ids {
            let Some(record) = store.get(id).filter(|r| r.collides) else {
                continue;
            };
            let dv = terrain_dv.get(&id).copied().unwrap_or_default();
            terrain::detect_voxel_contacts(record, &terrain, skin, dv, dt, &mut solid);
            terrain::sample_fluids(record, &terrain, &mut fluids);
        }
        self.contacts.commit_solid(solid, events);
        self.contacts.commit_fluid(fluids, events);
        stats.contacts = self.contacts.len();
        stats.fluid_contacts = self.contacts.fluid_contacts().count();

        stats.damage_applied = self.damage.apply(store, events);
        stats
    }
}
