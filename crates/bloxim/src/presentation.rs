//! Presentation feed for renderers, audio and GUI.
//!
//! The simulation never interprets cosmetic values; it only stores them and
//! republishes what changed since the last drain.
//!
//! Pending changes are merged per entity and per cosmetic key, so a host
//! that never drains holds at most one record for each of them.

use std::collections::{BTreeMap, HashMap, HashSet};

use bloxim_anim::AnimationTarget;
use bloxim_core::EntityId;
use bloxim_shared::Vec3;
use serde_json::Value;

/// One change a presentation layer should apply.
#[derive(Clone, Debug, PartialEq)]
pub enum PresentationChange {
    /// An entity moved.
    Transform {
        /// The entity.
        entity: EntityId,
        /// New center.
        position: Vec3,
        /// Current velocity, for interpolation.
        velocity: Vec3,
    },
    /// A cosmetic value was written.
    Cosmetic {
        /// Owner of the value.
        owner: AnimationTarget,
        /// Value name (color, mesh, sound...).
        key: String,
        /// Opaque value.
        value: Value,
    },
    /// An entity is gone and should be removed from the scene.
    Removed {
        /// The entity.
        entity: EntityId,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Slot {
    Entity(EntityId),
    Cosmetic(AnimationTarget, String),
}

/// Accumulates changes between drains.
#[derive(Debug, Default)]
pub struct PresentationFeed {
    pending: BTreeMap<Slot, PresentationChange>,
    /// Last position recorded per entity.
    positions: HashMap<EntityId, Vec3>,
    /// Entities a drain has already handed out.
    shown: HashSet<EntityId>,
}

impl PresentationFeed {
    /// Creates an empty feed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a cosmetic write, replacing an undrained one for the same
    /// owner and key.
    pub fn cosmetic(&mut self, owner: AnimationTarget, key: &str, value: Value) {
        self.pending.insert(
            Slot::Cosmetic(owner, key.to_owned()),
            PresentationChange::Cosmetic {
                owner,
                key: key.to_owned(),
                value,
            },
        );
    }

    /// Records a transform if the position differs from the last one
    /// recorded for this entity. An undrained transform is overwritten.
    pub fn transform(&mut self, entity: EntityId, position: Vec3, velocity: Vec3) {
        if self.positions.get(&entity) == Some(&position) {
            return;
        }
        self.positions.insert(entity, position);
        self.pending.insert(
            Slot::Entity(entity),
            PresentationChange::Transform {
                entity,
                position,
                velocity,
            },
        );
    }

    /// Records a removal. It replaces the entity's pending transform and
    /// cosmetics; an entity no drain ever handed out just disappears.
    pub fn removed(&mut self, entity: EntityId) {
        self.positions.remove(&entity);
        self.pending.retain(|slot, _| {
            !matches!(slot, Slot::Cosmetic(AnimationTarget::Entity(owner), _) if *owner == entity)
        });
        if self.shown.remove(&entity) {
            self.pending
                .insert(Slot::Entity(entity), PresentationChange::Removed { entity });
        } else {
            self.pending.remove(&Slot::Entity(entity));
        }
    }

    /// Number of undrained changes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// True if nothing changed since the last drain.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Takes every change recorded since the last drain: entity records
    /// in handle order, then cosmetics by owner and key.
    pub fn drain(&mut self) -> Vec<PresentationChange> {
        let changes: Vec<PresentationChange> =
            std::mem::take(&mut self.pending).into_values().collect();
        for change in &changes {
            match change {
                PresentationChange::Transform { entity, .. }
                | PresentationChange::Cosmetic {
                    owner: AnimationTarget::Entity(entity),
                    ..
                } => {
                    self.shown.insert(*entity);
                }
                PresentationChange::Removed { entity } => {
                    self.shown.remove(entity);
                }
                PresentationChange::Cosmetic { .. } => {}
            }
        }
        changes
    }
}
