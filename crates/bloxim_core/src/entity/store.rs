//! # Entity Store
//!
//! The central container for all entity records.
//!
//! Slots are recycled through a free list; a slot's generation is bumped
//! when its record is reaped, so handles to the previous occupant go stale.
//! Destruction is two-phase: [`EntityStore::destroy`] marks the record and
//! releases its quota immediately, [`EntityStore::reap`] frees the slot at
//! the end of the tick.

use super::id::{EntityId, PlayerId};
use super::record::{EntityConfig, EntityRecord};
use super::tags::{TagInterner, TagSet};
use crate::error::{StoreError, StoreResult};

/// One slot of the store.
#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    record: Option<EntityRecord>,
}

/// Owner of every entity record.
///
/// # Example
///
/// ```rust
/// use bloxim_core::{EntityConfig, EntityStore, StoreError};
///
/// let mut store = EntityStore::new(1);
/// let a = store.create(EntityConfig::default()).unwrap();
/// assert_eq!(
///     store.create(EntityConfig::default()),
///     Err(StoreError::QuotaExceeded { quota: 1 })
/// );
/// store.destroy(a);
/// assert!(store.create(EntityConfig::default()).is_ok());
/// ```
#[derive(Debug)]
pub struct EntityStore {
    slots: Vec<Slot>,
    /// Free list of slot indices for reuse.
    free_indices: Vec<u32>,
    /// Handles in creation order; destroyed ones are pruned by `reap`.
    order: Vec<EntityId>,
    /// Destroyed this tick, waiting for `reap`.
    graveyard: Vec<EntityId>,
    /// Number of live (not destroyed) entities.
    live_count: usize,
    quota: usize,
    next_seq: u64,
    tags: TagInterner,
}

impl EntityStore {
    /// Creates a store admitting at most `quota` live entities.
    #[must_use]
    pub fn new(quota: usize) -> Self {
        Self {
            slots: Vec::new(),
            free_indices: Vec::new(),
            order: Vec::new(),
            graveyard: Vec::new(),
            live_count: 0,
            quota,
            next_seq: 0,
            tags: TagInterner::new(),
        }
    }

    /// Number of live entities.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.live_count
    }

    /// True if no entity is alive.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.live_count == 0
    }

    /// Creates an entity.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::QuotaExceeded`] when the store already holds
    /// `quota` live entities. Nothing is clamped or evicted.
    pub fn create(&mut self, config: EntityConfig) -> StoreResult<EntityId> {
        if self.live_count >= self.quota {
            return Err(StoreError::QuotaExceeded { quota: self.quota });
        }

        let index = match self.free_indices.pop() {
            Some(index) => index,
            None => {
                let index =
                    u32::try_from(self.slots.len()).map_err(|_| StoreError::IndexSpaceExhausted)?;
                if index == u32::MAX {
                    return Err(StoreError::IndexSpaceExhausted);
                }
                self.slots.push(Slot::default());
                index
            }
        };

        let mut tag_set = TagSet::new();
        for tag in &config.tags {
            tag_set.insert(self.tags.intern(tag));
        }

        let slot = &mut self.slots[index as usize];
        let id = EntityId::new(index, slot.generation);
        slot.record = Some(EntityRecord::from_config(id, config, tag_set, self.next_seq));

        self.next_seq += 1;
        self.live_count += 1;
        self.order.push(id);

        Ok(id)
    }

    /// Marks an entity destroyed.
    ///
    /// Returns `true` if this call destroyed it, `false` if it was already
    /// destroyed or the handle is stale. Calling twice is harmless.
    pub fn destroy(&mut self, id: EntityId) -> bool {
        let Some(record) = self.slot_record_mut(id) else {
            return false;
        };
        if record.destroyed {
            return false;
        }

        record.destroyed = true;
        self.live_count -= 1;
        self.graveyard.push(id);
        true
    }

    /// Frees the slots of everything destroyed since the last reap.
    ///
    /// Returns the handles that were released.
    pub fn reap(&mut self) -> Vec<EntityId> {
        if self.graveyard.is_empty() {
            return Vec::new();
        }

        let released = std::mem::take(&mut self.graveyard);
        for id in &released {
            let slot = &mut self.slots[id.index() as usize];
            slot.record = None;
            // Increment generation to invalidate old references
            slot.generation = slot.generation.wrapping_add(1);
            self.free_indices.push(id.index());
        }

        let slots = &self.slots;
        self.order.retain(|id| {
            slots[id.index() as usize]
                .record
                .as_ref()
                .is_some_and(|r| r.id == *id && !r.destroyed)
        });

        released
    }

    /// Checks if an entity is alive.
    #[inline]
    #[must_use]
    pub fn is_live(&self, id: EntityId) -> bool {
        self.get(id).is_some()
    }

    /// Gets a live entity.
    #[inline]
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&EntityRecord> {
        self.slot_record(id).filter(|r| !r.destroyed)
    }

    /// Gets a live entity mutably.
    #[inline]
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut EntityRecord> {
        self.slot_record_mut(id).filter(|r| !r.destroyed)
    }

    /// Iterates live entities in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &EntityRecord> + '_ {
        self.order.iter().filter_map(move |id| self.get(*id))
    }

    /// Live handles in creation order.
    #[must_use]
    pub fn ids(&self) -> Vec<EntityId> {
        self.iter().map(|r| r.id).collect()
    }

    /// Links an entity to the player it represents.
    pub fn set_player(&mut self, id: EntityId, player: Option<PlayerId>) -> bool {
        match self.get_mut(id) {
            Some(record) => {
                record.player = player;
                true
            }
            None => false,
        }
    }

    /// Adds a tag. Returns `false` for stale handles or duplicate tags.
    pub fn add_tag(&mut self, id: EntityId, tag: &str) -> bool {
        if !self.is_live(id) {
            return false;
        }
        let tag_id = self.tags.intern(tag);
        self.get_mut(id).is_some_and(|r| r.tags.insert(tag_id))
    }

    /// Removes a tag. Returns `false` if it was absent or the handle is stale.
    pub fn remove_tag(&mut self, id: EntityId, tag: &str) -> bool {
        let Some(tag_id) = self.tags.lookup(tag) else {
            return false;
        };
        self.get_mut(id).is_some_and(|r| r.tags.remove(tag_id))
    }

    /// Tag membership test; `false` for stale handles.
    #[must_use]
    pub fn has_tag(&self, id: EntityId, tag: &str) -> bool {
        match (self.tags.lookup(tag), self.get(id)) {
            (Some(tag_id), Some(record)) => record.tags.contains(tag_id),
            _ => false,
        }
    }

    /// Tag names of an entity, in interning order.
    #[must_use]
    pub fn tag_names(&self, id: EntityId) -> Vec<&str> {
        self.get(id)
            .map(|r| r.tags.iter().filter_map(|t| self.tags.name(t)).collect())
            .unwrap_or_default()
    }

    /// The tag interner shared by all entities of this store.
    #[must_use]
    pub fn interner(&self) -> &TagInterner {
        &self.tags
    }

    fn slot_record(&self, id: EntityId) -> Option<&EntityRecord> {
        if id.is_null() {
            return None;
        }
        let slot = self.slots.get(id.index() as usize)?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.record.as_ref()
    }

    fn slot_record_mut(&mut self, id: EntityId) -> Option<&mut EntityRecord> {
        if id.is_null() {
            return None;
        }
        let slot = self.slots.get_mut(id.index() as usize)?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.record.as_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bloxim_shared::Vec3;

    #[test]
    fn test_create_and_get() {
        let mut store = EntityStore::new(10);
        let id = store
            .create(EntityConfig::at(Vec3::new(1.0, 2.0, 3.0)).named("crate"))
            .unwrap();

        let record = store.get(id).unwrap();
        assert_eq!(record.position, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(record.name.as_deref(), Some("crate"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_quota_is_typed_failure() {
        let mut store = EntityStore::new(2);
        store.create(EntityConfig::default()).unwrap();
        let b = store.create(EntityConfig::default()).unwrap();
        assert_eq!(
            store.create(EntityConfig::default()),
            Err(StoreError::QuotaExceeded { quota: 2 })
        );

        // Quota is released immediately on destroy, before the reap.
        store.destroy(b);
        assert!(store.create(EntityConfig::default()).is_ok());
    }

    #[test]
    fn test_destroy_is_idempotent() {
        let mut store = EntityStore::new(10);
        let id = store.create(EntityConfig::default()).unwrap();

        assert!(store.destroy(id));
        assert!(!store.destroy(id));
        assert_eq!(store.len(), 0);
        assert!(store.get(id).is_none());
        assert!(!store.is_live(id));

        store.reap();
        assert!(!store.destroy(id));
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_reaped_slot_gets_new_generation() {
        let mut store = EntityStore::new(10);
        let id1 = store.create(EntityConfig::default()).unwrap();
        store.destroy(id1);
        assert_eq!(store.reap(), vec![id1]);

        let id2 = store.create(EntityConfig::default()).unwrap();
        assert_eq!(id2.index(), id1.index()); // Same slot
        assert_ne!(id2.generation(), id1.generation()); // Different generation
        assert!(store.get(id1).is_none());
        assert!(store.get(id2).is_some());
    }

    #[test]
    fn test_iteration_in_creation_order() {
        let mut store = EntityStore::new(10);
        let a = store.create(EntityConfig::default()).unwrap();
        let b = store.create(EntityConfig::default()).unwrap();
        let c = store.create(EntityConfig::default()).unwrap();

        store.destroy(a);
        store.reap();
        // d reuses a's slot but must still iterate last.
        let d = store.create(EntityConfig::default()).unwrap();
        assert_eq!(d.index(), a.index());
        assert_eq!(store.ids(), vec![b, c, d]);
    }

    #[test]
    fn test_tags() {
        let mut store = EntityStore::new(10);
        let id = store
            .create(EntityConfig::default().with_tag("enemy"))
            .unwrap();

        assert!(store.has_tag(id, "enemy"));
        assert!(store.add_tag(id, "boss"));
        assert!(!store.add_tag(id, "boss"));
        assert_eq!(store.tag_names(id), vec!["enemy", "boss"]);
        assert!(store.remove_tag(id, "enemy"));
        assert!(!store.has_tag(id, "enemy"));

        store.destroy(id);
        assert!(!store.has_tag(id, "boss"));
        assert!(!store.add_tag(id, "late"));
    }
}
