//! # World
//!
//! Owns every subsystem and runs the tick:
//!
//! ```text
//! Tick N:
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │ 1. STORAGE                                                          │
//! │    └─ Resolve responses that arrived since tick N-1                 │
//! │                                                                     │
//! │ 2. PHYSICS                                                          │
//! │    ├─ Forces, integration, voxel penetration                        │
//! │    ├─ Entity pairs, voxel and fluid contacts                        │
//! │    └─ Queued damage                                                 │
//! │                                                                     │
//! │ 3. ANIMATION                                                        │
//! │    ├─ Advance instances, write sampled properties                   │
//! │    └─ Queue ready / finish / cancel                                 │
//! │                                                                     │
//! │ 4. FLUSH                                                            │
//! │    └─ Deliver queued events category by category                    │
//! │                                                                     │
//! │ 5. REAP                                                             │
//! │    └─ Free destroyed slots, compact and heal the spatial index      │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything runs on the caller's thread. Storage is the only collaborator
//! that lives elsewhere, and it is reached through channels.

use std::collections::BTreeMap;
use std::sync::Arc;

use bloxim_anim::{
    AnimError, AnimResult, AnimationId, AnimationSample, AnimationScheduler, AnimationTarget,
    Keyframe, PlayState, PlaybackOptions, PropertyValue,
};
use bloxim_core::{
    EntityConfig, EntityId, EntityRecord, EntityStore, PlayerId, Selector, SelectorCache,
    SelectorError, SpatialIndex, StoreError, StoreResult,
};
use bloxim_shared::{Bounds3, Vec3};
use bloxim_voxel::{VoxelCell, VoxelGrid, VoxelRegistry, VoxelResult};
use serde::Serialize;
use serde_json::Value;

use crate::config::WorldConfig;
use crate::error::{ConfigError, HandlerError, HostError};
use crate::events::{
    EventBus, EventCategory, EventFilter, EventFuture, GameEvent, HandlerCx, HandlerToken,
    Recipient, SubscriptionId,
};
use crate::filter::{CollisionFilters, FilterId};
use crate::physics::{ContactTracker, DamageRequest, Physics, PhysicsSettings, StepInputs, StepStats};
use crate::players::{PlayerInfo, PlayerTable};
use crate::presentation::{PresentationChange, PresentationFeed};
use crate::raycast::{ray_box, raycast_voxels, RaycastHit, RaycastOptions, RaycastTarget};
use crate::storage::{StorageClient, StorageEndpoint};
use crate::zone::{Ambient, ZoneId, ZoneSet};

/// What one call to [`World::tick`] did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickSummary {
    /// Number of the tick that ran.
    pub tick: u64,
    /// Physics counters.
    pub physics: StepStats,
    /// Animation instances that produced values.
    pub animations: usize,
    /// Handler calls and futures resolved during the flush.
    pub events_delivered: usize,
    /// Storage requests resolved.
    pub storage_resolved: usize,
    /// Entity slots freed.
    pub reaped: usize,
}

/// Owned copy of the script-visible state of one entity.
///
/// Code resuming after an await takes a snapshot instead of holding a
/// reference across ticks.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EntitySnapshot {
    /// Handle.
    pub id: EntityId,
    /// Script name.
    pub name: Option<String>,
    /// Center.
    pub position: Vec3,
    /// Velocity.
    pub velocity: Vec3,
    /// Hit points.
    pub hp: f32,
    /// Maximum hit points.
    pub max_hp: f32,
    /// Whether hit points reached zero.
    pub dead: bool,
    /// Controlling player.
    pub player: Option<PlayerId>,
    /// Tag names.
    pub tags: Vec<String>,
}

/// The simulation.
pub struct World {
    config: WorldConfig,
    dt: f32,
    tick: u64,
    skipped: u64,
    flushing: bool,

    store: EntityStore,
    spatial: SpatialIndex,
    grid: VoxelGrid,
    registry: VoxelRegistry,
    physics: Physics,
    zones: ZoneSet,
    filters: CollisionFilters,
    selectors: SelectorCache,
    players: PlayerTable,
    animations: AnimationScheduler,
    bus: EventBus,

    storage: StorageClient,
    storage_endpoint: Option<StorageEndpoint>,
    presentation: PresentationFeed,
    world_cosmetics: BTreeMap<String, Value>,
    player_cosmetics: BTreeMap<PlayerId, BTreeMap<String, Value>>,
    host_errors: Vec<HostError>,
}

impl Default for World {
    fn default() -> Self {
        Self::bare(WorldConfig::default())
    }
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("tick", &self.tick)
            .field("entities", &self.store.len())
            .field("players", &self.players.len())
            .field("contacts", &self.physics.contacts().len())
            .field("subscriptions", &self.bus.len())
            .field("queued_events", &self.bus.queued())
            .finish_non_exhaustive()
    }
}

impl World {
    /// Builds a world from a validated config, registering its materials,
    /// zones and collision filters.
    ///
    /// # Errors
    ///
    /// Fails on invalid values, a bad material or an unparsable selector.
    pub fn new(config: WorldConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut world = Self::bare(config.clone());

        for material in &config.materials {
            world.registry.register(&material.name, material.info.clone())?;
        }
        for zone in &config.zones {
            world.add_zone(zone.bounds(), &zone.selector, zone.force, zone.ambient.clone())?;
        }
        for filter in &config.collision_filters {
            world.add_collision_filter(&filter.first, &filter.second)?;
        }

        tracing::debug!(
            tick_rate = config.tick_rate,
            materials = config.materials.len(),
            zones = config.zones.len(),
            filters = config.collision_filters.len(),
            "world created"
        );
        Ok(world)
    }

    fn bare(config: WorldConfig) -> Self {
        let (storage, endpoint) = StorageClient::new(config.storage_capacity);
        Self {
            dt: config.tick_dt(),
            tick: 0,
            skipped: 0,
            flushing: false,
            store: EntityStore::new(config.entity_quota),
            spatial: SpatialIndex::new(config.cell_size, config.contact_skin),
            grid: VoxelGrid::new(config.grid_shape),
            registry: VoxelRegistry::default(),
            physics: Physics::new(PhysicsSettings {
                gravity: config.gravity,
                contact_skin: config.contact_skin,
            }),
            zones: ZoneSet::new(),
            filters: CollisionFilters::new(),
            selectors: SelectorCache::new(),
            players: PlayerTable::new(),
            animations: AnimationScheduler::new(),
            bus: EventBus::new(),
            storage,
            storage_endpoint: Some(endpoint),
            presentation: PresentationFeed::new(),
            world_cosmetics: BTreeMap::new(),
            player_cosmetics: BTreeMap::new(),
            host_errors: Vec::new(),
            config,
        }
    }

    /// The config the world was built from.
    #[must_use]
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Seconds simulated per tick.
    #[must_use]
    pub fn dt(&self) -> f32 {
        self.dt
    }

    /// Number of the next tick to run. Skipped ticks count.
    #[must_use]
    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    // =========================================================================
    // TICK
    // =========================================================================

    /// Runs one tick.
    ///
    /// Calling this from inside a handler does nothing; the running flush
    /// has to finish first.
    pub fn tick(&mut self) -> TickSummary {
        if self.flushing {
            tracing::warn!(tick = self.tick, "tick requested during event flush, ignored");
            return TickSummary {
                tick: self.tick,
                ..TickSummary::default()
            };
        }

        let tick = self.tick;
        let dt = self.dt;
        let storage_resolved = self.storage.drain_responses();

        let mut raised = Vec::new();
        let inputs = StepInputs {
            grid: &self.grid,
            registry: &self.registry,
            zones: &self.zones,
            filters: &self.filters,
        };
        let physics = self
            .physics
            .step(&mut self.store, &mut self.spatial, &inputs, dt, &mut raised);
        self.bus.emit_all(raised);

        let samples = self.animations.advance(dt);
        let animations = samples.len();
        for sample in samples {
            self.apply_sample(sample);
        }
        for event in self.animations.drain_events() {
            self.bus.emit(GameEvent::Animation(event));
        }

        for record in self.store.iter() {
            self.presentation
                .transform(record.id, record.position, record.velocity);
        }

        let skipped = std::mem::take(&mut self.skipped);
        self.bus.emit(GameEvent::TickEnd { tick, skipped });
        let events_delivered = self.flush();

        let reaped = self.store.reap().len();
        self.spatial.compact();
        let store = &self.store;
        let stale = self.spatial.heal(|id| store.is_live(id));
        if stale > 0 {
            tracing::warn!(tick, stale, "dropped stale spatial index entries");
        }

        self.tick += 1;

        tracing::debug!(
            tick,
            entities = self.store.len(),
            contacts = physics.contacts,
            fluid_contacts = physics.fluid_contacts,
            events = events_delivered,
            "tick complete"
        );

        TickSummary {
            tick,
            physics,
            animations,
            events_delivered,
            storage_resolved,
            reaped,
        }
    }

    /// Jumps the tick counter forward without simulating. The next
    /// tick-end event reports the gap.
    pub fn skip_ticks(&mut self, count: u64) {
        self.tick += count;
        self.skipped += count;
    }

    fn flush(&mut self) -> usize {
        self.flushing = true;
        let mut delivered = 0;
        for category in EventCategory::ORDER {
            for event in self.bus.take_category(category) {
                if category != EventCategory::Lifecycle
                    && event
                        .subjects()
                        .iter()
                        .flatten()
                        .any(|&id| !self.store.is_live(id))
                {
                    continue;
                }
                delivered += self.deliver(&event);
            }
        }
        self.flushing = false;
        delivered
    }

    fn deliver(&mut self, event: &GameEvent) -> usize {
        let mut delivered = 0;
        for (id, recipient) in self.bus.recipients(event) {
            match recipient {
                Recipient::Once => {
                    if self.bus.resolve_once(id, event) {
                        delivered += 1;
                    }
                }
                Recipient::Channel => {
                    // Checked out so the handler may touch the bus itself.
                    let Some((mut handler, token)) = self.bus.checkout(id) else {
                        continue;
                    };
                    let result = handler(
                        &mut HandlerCx {
                            world: self,
                            token: &token,
                        },
                        event,
                    );
                    self.bus.checkin(id, handler);
                    delivered += 1;

                    if let Err(err) = result {
                        tracing::error!(
                            tick = self.tick,
                            subscription = %id,
                            category = ?event.category(),
                            error = %err,
                            "event handler failed"
                        );
                        self.host_errors.push(HostError {
                            tick: self.tick,
                            subscription: id,
                            category: event.category(),
                            message: err.0,
                        });
                    }
                }
            }
        }
        delivered
    }

    fn apply_sample(&mut self, sample: AnimationSample) {
        for (name, value) in sample.values {
            match (sample.target, name.as_str(), value) {
                (AnimationTarget::Entity(id), "position", PropertyValue::Vector(position)) => {
                    if let Some(record) = self.store.get_mut(id) {
                        record.position = position;
                        self.spatial.update(id, record.bounds());
                    }
                }
                (AnimationTarget::Entity(id), "velocity", PropertyValue::Vector(velocity)) => {
                    if let Some(record) = self.store.get_mut(id) {
                        record.velocity = velocity;
                    }
                }
                (target, _, value) => match serde_json::to_value(value) {
                    Ok(json) => {
                        self.write_cosmetic(target, &name, json);
                    }
                    Err(err) => {
                        tracing::warn!(animation = %sample.id, property = %name, error = %err, "unserializable sample");
                    }
                },
            }
        }
    }

    // =========================================================================
    // ENTITIES
    // =========================================================================

    /// Creates an entity. Its creation event is delivered in the next flush.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::QuotaExceeded`] when the world is full.
    pub fn spawn(&mut self, config: EntityConfig) -> StoreResult<EntityId> {
        let id = match self.store.create(config) {
            Ok(id) => id,
            Err(err) => {
                if let StoreError::QuotaExceeded { quota } = err {
                    tracing::warn!(quota, "entity quota exhausted");
                }
                return Err(err);
            }
        };
        if let Some(record) = self.store.get(id) {
            self.spatial.update(id, record.bounds());
        }
        self.bus.emit(GameEvent::EntityCreated { entity: id });
        Ok(id)
    }

    /// Destroys an entity.
    ///
    /// Its contacts vanish without separate events, its animations stop
    /// without cancel events and queued events naming it are dropped. A
    /// player's body taking this path makes the player leave. Returns
    /// `false` if the entity was already gone.
    pub fn destroy(&mut self, id: EntityId) -> bool {
        if !self.store.destroy(id) {
            return false;
        }

        self.spatial.remove(id);
        self.physics.forget(id);
        self.animations.remove_target(AnimationTarget::Entity(id));
        self.bus.discard_queued(|event| {
            event.category() != EventCategory::Lifecycle && event.involves(id)
        });
        self.presentation.removed(id);

        if let Some(player) = self.players.by_entity(id) {
            self.players.remove(player);
            self.animations.remove_target(AnimationTarget::Player(player));
            self.player_cosmetics.remove(&player);
            self.bus.emit(GameEvent::PlayerLeft { player, entity: id });
            tracing::info!(%player, entity = %id, "player left");
        }
        self.bus.emit(GameEvent::EntityDestroyed { entity: id });
        true
    }

    /// True if the handle names a live entity.
    #[must_use]
    pub fn is_live(&self, id: EntityId) -> bool {
        self.store.is_live(id)
    }

    /// A live entity.
    #[must_use]
    pub fn entity(&self, id: EntityId) -> Option<&EntityRecord> {
        self.store.get(id)
    }

    /// A live entity, mutably. Position changes reach the spatial index on
    /// the next tick; use [`World::teleport`] to move one immediately.
    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut EntityRecord> {
        self.store.get_mut(id)
    }

    /// Live entities in creation order.
    pub fn entities(&self) -> impl Iterator<Item = &EntityRecord> + '_ {
        self.store.iter()
    }

    /// Number of live entities.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.store.len()
    }

    /// Owned copy of a live entity.
    #[must_use]
    pub fn snapshot(&self, id: EntityId) -> Option<EntitySnapshot> {
        let record = self.store.get(id)?;
        Some(EntitySnapshot {
            id,
            name: record.name.clone(),
            position: record.position,
            velocity: record.velocity,
            hp: record.health.hp,
            max_hp: record.health.max_hp,
            dead: record.health.dead,
            player: record.player,
            tags: self
                .store
                .tag_names(id)
                .into_iter()
                .map(str::to_owned)
                .collect(),
        })
    }

    /// Moves an entity now, keeping its velocity.
    pub fn teleport(&mut self, id: EntityId, position: Vec3) -> bool {
        let Some(record) = self.store.get_mut(id) else {
            return false;
        };
        record.position = position;
        self.spatial.update(id, record.bounds());
        true
    }

    /// Replaces an entity's velocity.
    pub fn set_velocity(&mut self, id: EntityId, velocity: Vec3) -> bool {
        let Some(record) = self.store.get_mut(id) else {
            return false;
        };
        record.velocity = velocity;
        true
    }

    /// Adds a force for the next physics step.
    pub fn apply_force(&mut self, id: EntityId, force: Vec3) -> bool {
        let Some(record) = self.store.get_mut(id) else {
            return false;
        };
        record.pending_force += force;
        true
    }

    /// Adds an instantaneous velocity change for the next physics step.
    pub fn apply_impulse(&mut self, id: EntityId, impulse: Vec3) -> bool {
        let Some(record) = self.store.get_mut(id) else {
            return false;
        };
        record.pending_impulse += impulse;
        true
    }

    /// Queues damage for the next physics step.
    ///
    /// Returns `false`, doing nothing, for destroyed or dead entities and
    /// those with damage disabled.
    pub fn hurt(&mut self, target: EntityId, amount: f32, source: Option<EntityId>) -> bool {
        let Some(record) = self.store.get(target) else {
            return false;
        };
        if !record.health.enable_damage || record.health.dead {
            return false;
        }
        self.physics.queue_damage(DamageRequest {
            target,
            amount,
            source,
        });
        true
    }

    /// Restores hit points, clamped to the maximum, and clears death.
    pub fn revive(&mut self, id: EntityId, hp: f32) -> bool {
        let Some(record) = self.store.get_mut(id) else {
            return false;
        };
        record.health.hp = hp.clamp(0.0, record.health.max_hp);
        record.health.dead = record.health.hp <= 0.0;
        !record.health.dead
    }

    /// Adds a tag.
    pub fn add_tag(&mut self, id: EntityId, tag: &str) -> bool {
        self.store.add_tag(id, tag)
    }

    /// Removes a tag.
    pub fn remove_tag(&mut self, id: EntityId, tag: &str) -> bool {
        self.store.remove_tag(id, tag)
    }

    /// Sets a user property, visible to `[prop=value]` selectors.
    pub fn set_prop(&mut self, id: EntityId, key: &str, value: &str) -> bool {
        let Some(record) = self.store.get_mut(id) else {
            return false;
        };
        record.props.insert(key.to_owned(), value.to_owned());
        true
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// First live entity, in creation order, matching `selector`.
    ///
    /// # Errors
    ///
    /// Returns the parse error of a malformed selector.
    pub fn query_selector(&mut self, selector: &str) -> Result<Option<EntityId>, SelectorError> {
        let selector = self.selectors.get_or_parse(selector)?;
        let interner = self.store.interner();
        Ok(self
            .store
            .iter()
            .find(|record| selector.matches(record, interner))
            .map(|record| record.id))
    }

    /// Every live entity, in creation order, matching `selector`.
    ///
    /// # Errors
    ///
    /// Returns the parse error of a malformed selector.
    pub fn query_selector_all(&mut self, selector: &str) -> Result<Vec<EntityId>, SelectorError> {
        let selector = self.selectors.get_or_parse(selector)?;
        let interner = self.store.interner();
        Ok(self
            .store
            .iter()
            .filter(|record| selector.matches(record, interner))
            .map(|record| record.id)
            .collect())
    }

    /// Live entities overlapping `bounds`, in creation order.
    #[must_use]
    pub fn search_box(&self, bounds: &Bounds3) -> Vec<EntityId> {
        let mut found: Vec<&EntityRecord> = self
            .spatial
            .query(bounds)
            .into_iter()
            .filter_map(|id| self.store.get(id))
            .filter(|record| record.bounds().intersects(bounds))
            .collect();
        found.sort_by_key(|record| record.spawn_seq());
        found.into_iter().map(|record| record.id).collect()
    }

    /// Casts a ray against voxels and entities and returns the nearest hit.
    ///
    /// # Errors
    ///
    /// Returns the parse error of a malformed `options.selector`.
    pub fn raycast(
        &mut self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        options: &RaycastOptions,
    ) -> Result<Option<RaycastHit>, SelectorError> {
        let selector: Option<Arc<Selector>> = options
            .selector
            .as_deref()
            .map(|source| self.selectors.get_or_parse(source))
            .transpose()?;
        let dir = direction.normalize_or_zero();
        if dir.is_zero() || !origin.is_finite() || !max_distance.is_finite() || max_distance < 0.0 {
            return Ok(None);
        }

        let mut best: Option<RaycastHit> = None;
        if options.voxels {
            let (grid, registry) = (&self.grid, &self.registry);
            best = raycast_voxels(origin, dir, max_distance, |[x, y, z]| {
                registry.is_solid(grid.get(x, y, z))
            })
            .map(|hit| RaycastHit {
                target: RaycastTarget::Voxel {
                    coord: hit.voxel,
                    cell: grid.get(hit.voxel[0], hit.voxel[1], hit.voxel[2]),
                },
                normal: hit.normal,
                distance: hit.distance,
                point: origin + dir * hit.distance,
            });
        }

        if options.entities {
            let reach = best.map_or(max_distance, |hit| hit.distance);
            let end = origin + dir * reach;
            let swept = Bounds3::new(origin.min(end), origin.max(end));
            let interner = self.store.interner();
            for id in self.spatial.query(&swept) {
                if options.ignore.contains(&id) {
                    continue;
                }
                let Some(record) = self.store.get(id) else {
                    continue;
                };
                if selector
                    .as_ref()
                    .is_some_and(|selector| !selector.matches(record, interner))
                {
                    continue;
                }
                let Some((distance, normal)) = ray_box(origin, dir, &record.bounds(), reach) else {
                    continue;
                };
                if best.map_or(true, |hit| distance < hit.distance) {
                    best = Some(RaycastHit {
                        target: RaycastTarget::Entity(id),
                        normal,
                        distance,
                        point: origin + dir * distance,
                    });
                }
            }
        }
        Ok(best)
    }

    /// Current contacts.
    #[must_use]
    pub fn contacts(&self) -> &ContactTracker {
        self.physics.contacts()
    }

    // =========================================================================
    // VOXELS
    // =========================================================================

    /// The terrain.
    #[must_use]
    pub fn voxels(&self) -> &VoxelGrid {
        &self.grid
    }

    /// The terrain, mutably (bulk edits, snapshot restore).
    pub fn voxels_mut(&mut self) -> &mut VoxelGrid {
        &mut self.grid
    }

    /// Materials.
    #[must_use]
    pub fn registry(&self) -> &VoxelRegistry {
        &self.registry
    }

    /// Materials, mutably.
    pub fn registry_mut(&mut self) -> &mut VoxelRegistry {
        &mut self.registry
    }

    /// Reads one voxel; air outside the grid.
    #[must_use]
    pub fn voxel(&self, x: i32, y: i32, z: i32) -> VoxelCell {
        self.grid.get(x, y, z)
    }

    /// Writes one voxel and returns the cell stored; air outside the grid.
    pub fn set_voxel(&mut self, x: i32, y: i32, z: i32, cell: VoxelCell) -> VoxelCell {
        self.grid.set(x, y, z, cell)
    }

    /// Writes one voxel by material name.
    ///
    /// # Errors
    ///
    /// Fails for an unregistered material.
    pub fn set_voxel_material(&mut self, x: i32, y: i32, z: i32, material: &str) -> VoxelResult<VoxelCell> {
        let cell = self.registry.cell(material)?;
        Ok(self.grid.set(x, y, z, cell))
    }

    /// Fills the inclusive box `lo..=hi`. Returns the number of cells written.
    pub fn fill_voxels(&mut self, lo: [i32; 3], hi: [i32; 3], cell: VoxelCell) -> usize {
        self.grid.fill(lo, hi, cell)
    }

    // =========================================================================
    // ZONES & FILTERS
    // =========================================================================

    /// Adds a zone pushing entities that match `selector`.
    ///
    /// # Errors
    ///
    /// Returns the parse error of a malformed selector.
    pub fn add_zone(
        &mut self,
        bounds: Bounds3,
        selector: &str,
        force: Vec3,
        ambient: Ambient,
    ) -> Result<ZoneId, SelectorError> {
        let selector = self.selectors.get_or_parse(selector)?;
        Ok(self.zones.add(bounds, selector, force, ambient))
    }

    /// Removes a zone.
    pub fn remove_zone(&mut self, id: ZoneId) -> bool {
        self.zones.remove(id).is_some()
    }

    /// The zones.
    #[must_use]
    pub fn zones(&self) -> &ZoneSet {
        &self.zones
    }

    /// Renderer parameters at `point`.
    #[must_use]
    pub fn ambient_at(&self, point: Vec3) -> Option<&Ambient> {
        self.zones.ambient_at(point)
    }

    /// Stops entities matching `first` from touching those matching
    /// `second`.
    ///
    /// # Errors
    ///
    /// Returns the parse error of a malformed selector.
    pub fn add_collision_filter(&mut self, first: &str, second: &str) -> Result<FilterId, SelectorError> {
        let first = self.selectors.get_or_parse(first)?;
        let second = self.selectors.get_or_parse(second)?;
        Ok(self.filters.add(first, second))
    }

    /// Removes a collision filter.
    pub fn remove_collision_filter(&mut self, id: FilterId) -> bool {
        self.filters.remove(id)
    }

    // =========================================================================
    // PLAYERS
    // =========================================================================

    /// Spawns a body for a connecting player and links the two.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::QuotaExceeded`] when the world is full.
    pub fn join_player(&mut self, name: &str, body: EntityConfig) -> StoreResult<(PlayerId, EntityId)> {
        let entity = self.spawn(body)?;
        let player = self.players.allocate();
        self.players.insert(player, name, entity);
        self.store.set_player(entity, Some(player));
        self.bus.emit(GameEvent::PlayerJoined { player, entity });
        tracing::info!(%player, name, %entity, "player joined");
        Ok((player, entity))
    }

    /// Disconnects a player and destroys their body.
    pub fn leave_player(&mut self, player: PlayerId) -> bool {
        match self.players.get(player) {
            Some(info) => {
                let entity = info.entity;
                self.destroy(entity)
            }
            None => false,
        }
    }

    /// A connected player.
    #[must_use]
    pub fn player(&self, player: PlayerId) -> Option<&PlayerInfo> {
        self.players.get(player)
    }

    /// Connected players.
    pub fn players(&self) -> impl Iterator<Item = &PlayerInfo> + '_ {
        self.players.iter()
    }

    /// Records a key press or release. Only edges raise events; returns
    /// whether this call was one.
    pub fn push_input(&mut self, player: PlayerId, key: &str, pressed: bool) -> bool {
        let changed = if pressed {
            self.players.press(player, key)
        } else {
            self.players.release(player, key)
        };
        if changed {
            let key = key.to_owned();
            self.bus.emit(if pressed {
                GameEvent::InputPress { player, key }
            } else {
                GameEvent::InputRelease { player, key }
            });
        }
        changed
    }

    /// Records a chat line from a connected player.
    pub fn push_chat(&mut self, player: PlayerId, message: &str) -> bool {
        if self.players.get(player).is_none() {
            return false;
        }
        self.bus.emit(GameEvent::Chat {
            player,
            message: message.to_owned(),
        });
        true
    }

    // =========================================================================
    // EVENTS
    // =========================================================================

    /// Subscribes a persistent handler.
    pub fn on<F>(&mut self, filter: EventFilter, handler: F) -> HandlerToken
    where
        F: FnMut(&mut HandlerCx<'_>, &GameEvent) -> Result<(), HandlerError> + 'static,
    {
        self.bus.subscribe(filter, Box::new(handler))
    }

    /// Waits for the next event matching `filter`.
    pub fn once(&mut self, filter: EventFilter) -> (HandlerToken, EventFuture) {
        self.bus.once(filter, None)
    }

    /// Waits for the next event matching `filter` and `predicate`.
    pub fn once_where<P>(&mut self, filter: EventFilter, predicate: P) -> (HandlerToken, EventFuture)
    where
        P: Fn(&GameEvent) -> bool + 'static,
    {
        self.bus.once(filter, Some(Box::new(predicate)))
    }

    /// Removes a subscription for good.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.bus.unsubscribe(id)
    }

    /// Handler failures recorded since the last call.
    pub fn take_host_errors(&mut self) -> Vec<HostError> {
        std::mem::take(&mut self.host_errors)
    }

    // =========================================================================
    // ANIMATION
    // =========================================================================

    fn target_exists(&self, target: AnimationTarget) -> bool {
        match target {
            AnimationTarget::World => true,
            AnimationTarget::Entity(id) => self.store.is_live(id),
            AnimationTarget::Player(player) => self.players.get(player).is_some(),
        }
    }

    /// Starts a keyframe animation. `position` and `velocity` vectors drive
    /// an entity's body; every other property is written as a cosmetic.
    ///
    /// # Errors
    ///
    /// Fails for a missing target or an invalid timeline.
    pub fn animate(
        &mut self,
        target: AnimationTarget,
        keyframes: Vec<Keyframe>,
        options: PlaybackOptions,
    ) -> AnimResult<AnimationId> {
        if !self.target_exists(target) {
            return Err(AnimError::MissingTarget(format!("{target:?}")));
        }
        self.animations.animate(target, keyframes, options)
    }

    /// Plays a registered motion clip.
    ///
    /// # Errors
    ///
    /// Fails for a missing target or an unknown motion.
    pub fn play_motion(
        &mut self,
        target: AnimationTarget,
        name: &str,
        options: PlaybackOptions,
    ) -> AnimResult<AnimationId> {
        if !self.target_exists(target) {
            return Err(AnimError::MissingTarget(format!("{target:?}")));
        }
        self.animations.play_motion(target, name, options)
    }

    /// Registers a motion clip.
    ///
    /// # Errors
    ///
    /// Fails for a negative or non-finite duration.
    pub fn register_motion(&mut self, name: &str, duration: f32) -> AnimResult<()> {
        self.animations.register_motion(name, duration)
    }

    /// Cancels an animation; its cancel event is delivered next flush.
    pub fn cancel_animation(&mut self, id: AnimationId) -> bool {
        self.animations.cancel(id)
    }

    /// State of an animation, `None` once it is gone.
    #[must_use]
    pub fn animation_state(&self, id: AnimationId) -> Option<PlayState> {
        self.animations.state(id)
    }

    /// Changes an animation's speed.
    pub fn set_playback_rate(&mut self, id: AnimationId, rate: f32) -> bool {
        self.animations.set_playback_rate(id, rate)
    }

    /// The scheduler.
    #[must_use]
    pub fn animations(&self) -> &AnimationScheduler {
        &self.animations
    }

    // =========================================================================
    // PRESENTATION & STORAGE
    // =========================================================================

    fn write_cosmetic(&mut self, owner: AnimationTarget, key: &str, value: Value) -> bool {
        let slot = match owner {
            AnimationTarget::World => &mut self.world_cosmetics,
            AnimationTarget::Entity(id) => match self.store.get_mut(id) {
                Some(record) => &mut record.cosmetics,
                None => return false,
            },
            AnimationTarget::Player(player) => {
                if self.players.get(player).is_none() {
                    return false;
                }
                self.player_cosmetics.entry(player).or_default()
            }
        };
        slot.insert(key.to_owned(), value.clone());
        self.presentation.cosmetic(owner, key, value);
        true
    }

    /// Stores an opaque presentation value (color, mesh, sound...). Returns
    /// `false` if the owner is gone.
    pub fn set_cosmetic(&mut self, owner: AnimationTarget, key: &str, value: Value) -> bool {
        self.write_cosmetic(owner, key, value)
    }

    /// A stored presentation value.
    #[must_use]
    pub fn cosmetic(&self, owner: AnimationTarget, key: &str) -> Option<&Value> {
        match owner {
            AnimationTarget::World => self.world_cosmetics.get(key),
            AnimationTarget::Entity(id) => self.store.get(id)?.cosmetics.get(key),
            AnimationTarget::Player(player) => self.player_cosmetics.get(&player)?.get(key),
        }
    }

    /// Takes every presentation change since the last drain.
    pub fn drain_presentation(&mut self) -> Vec<PresentationChange> {
        self.presentation.drain()
    }

    /// The storage client. Requests resolve at the start of a later tick.
    pub fn storage(&mut self) -> &mut StorageClient {
        &mut self.storage
    }

    /// Hands out the backend side of the storage channel, once.
    pub fn take_storage_endpoint(&mut self) -> Option<StorageEndpoint> {
        self.storage_endpoint.take()
    }
}
