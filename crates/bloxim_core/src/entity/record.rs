//! # Entity Records
//!
//! An entity is one box-shaped body: transform, physical properties, health,
//! tags and whatever opaque presentation values scripts attach to it.

use std::collections::BTreeMap;

use bloxim_shared::{Bounds3, Vec3};
use serde::{Deserialize, Serialize};

use super::id::{EntityId, PlayerId};
use super::tags::TagSet;

/// Smallest mass a non-fixed body may have.
pub const MIN_MASS: f32 = 1e-3;

/// Health state of an entity.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Health {
    /// Current hit points, never below zero.
    pub hp: f32,
    /// Maximum hit points.
    pub max_hp: f32,
    /// Whether `hurt` affects this entity at all.
    pub enable_damage: bool,
    /// Set once hp has crossed to zero; cleared by a revive.
    pub dead: bool,
}

impl Default for Health {
    fn default() -> Self {
        Self {
            hp: 100.0,
            max_hp: 100.0,
            enable_damage: false,
            dead: false,
        }
    }
}

/// Spawn parameters for a new entity.
///
/// Every field has a default, so configs and scripts name only what they
/// change.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityConfig {
    /// Script-visible name, matched by `#name` selectors.
    pub name: Option<String>,
    /// Center of the body.
    pub position: Vec3,
    /// Initial velocity (blocks per second).
    pub velocity: Vec3,
    /// Half of the body's size on each axis.
    pub half_extents: Vec3,
    /// Mass used to scale forces and split impulses.
    pub mass: f32,
    /// Friction coefficient, 0 = ice.
    pub friction: f32,
    /// Bounciness, 0 = no bounce, 1 = perfectly elastic.
    pub restitution: f32,
    /// Whether the body takes part in collision at all.
    pub collides: bool,
    /// Fixed bodies never move but still report contacts.
    pub fixed: bool,
    /// Whether world gravity applies.
    pub gravity: bool,
    /// Initial tags.
    pub tags: Vec<String>,
    /// User properties, matched by `[key=value]` selectors.
    pub props: BTreeMap<String, String>,
    /// Initial health.
    pub health: Health,
}

impl Default for EntityConfig {
    fn default() -> Self {
        Self {
            name: None,
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            half_extents: Vec3::splat(0.5),
            mass: 1.0,
            friction: 0.3,
            restitution: 0.0,
            collides: true,
            fixed: false,
            gravity: true,
            tags: Vec::new(),
            props: BTreeMap::new(),
            health: Health::default(),
        }
    }
}

impl EntityConfig {
    /// Config for a body at `position`, everything else default.
    #[must_use]
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    /// Sets the name.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the half-extents.
    #[must_use]
    pub fn with_half_extents(mut self, half: Vec3) -> Self {
        self.half_extents = half;
        self
    }

    /// Adds a tag.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Makes the body immovable.
    #[must_use]
    pub fn fixed(mut self) -> Self {
        self.fixed = true;
        self
    }

    /// Turns gravity off.
    #[must_use]
    pub fn without_gravity(mut self) -> Self {
        self.gravity = false;
        self
    }

    /// Enables damage with the given hit points.
    #[must_use]
    pub fn with_damage(mut self, hp: f32) -> Self {
        self.health = Health {
            hp,
            max_hp: hp,
            enable_damage: true,
            dead: false,
        };
        self
    }
}

/// A live (or destroyed-this-tick) entity.
#[derive(Clone, Debug, PartialEq)]
pub struct EntityRecord {
    /// Handle of this entity.
    pub id: EntityId,
    /// Script-visible name.
    pub name: Option<String>,
    /// Set by destroy; the record is freed at the end of the tick.
    pub destroyed: bool,
    /// Center of the body.
    pub position: Vec3,
    /// Velocity (blocks per second).
    pub velocity: Vec3,
    /// Half-extents of the body's box.
    pub half_extents: Vec3,
    /// Mass.
    pub mass: f32,
    /// Friction coefficient.
    pub friction: f32,
    /// Restitution coefficient.
    pub restitution: f32,
    /// Takes part in collision.
    pub collides: bool,
    /// Immovable.
    pub fixed: bool,
    /// Gravity applies.
    pub gravity: bool,
    /// Back-link to the player this entity represents.
    pub player: Option<PlayerId>,
    /// Tag membership.
    pub tags: TagSet,
    /// Health.
    pub health: Health,
    /// User properties.
    pub props: BTreeMap<String, String>,
    /// Opaque presentation values (mesh, color, sound...).
    pub cosmetics: BTreeMap<String, serde_json::Value>,
    /// Force accumulated by scripts for the next tick.
    pub pending_force: Vec3,
    /// Impulse accumulated by scripts for the next tick.
    pub pending_impulse: Vec3,
    pub(crate) spawn_seq: u64,
}

impl EntityRecord {
    pub(crate) fn from_config(id: EntityId, config: EntityConfig, tags: TagSet, seq: u64) -> Self {
        Self {
            id,
            name: config.name,
            destroyed: false,
            position: config.position,
            velocity: config.velocity,
            half_extents: config.half_extents.max(Vec3::ZERO),
            mass: config.mass.max(MIN_MASS),
            friction: config.friction.max(0.0),
            restitution: config.restitution.clamp(0.0, 1.0),
            collides: config.collides,
            fixed: config.fixed,
            gravity: config.gravity,
            player: None,
            tags,
            health: config.health,
            props: config.props,
            cosmetics: BTreeMap::new(),
            pending_force: Vec3::ZERO,
            pending_impulse: Vec3::ZERO,
            spawn_seq: seq,
        }
    }

    /// World-space box of the body.
    #[inline]
    #[must_use]
    pub fn bounds(&self) -> Bounds3 {
        Bounds3::from_center(self.position, self.half_extents)
    }

    /// Inverse mass; zero for fixed bodies.
    #[inline]
    #[must_use]
    pub fn inverse_mass(&self) -> f32 {
        if self.fixed {
            0.0
        } else {
            1.0 / self.mass.max(MIN_MASS)
        }
    }

    /// Creation sequence number; lower means spawned earlier.
    #[inline]
    #[must_use]
    pub fn spawn_seq(&self) -> u64 {
        self.spawn_seq
    }

    /// True if this entity represents a connected player.
    #[inline]
    #[must_use]
    pub fn is_player(&self) -> bool {
        self.player.is_some()
    }
}
