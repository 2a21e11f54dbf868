//! Script-visible events and the categories that order them.

use bloxim_anim::{AnimationEvent, AnimationId, AnimationTarget};
use bloxim_core::{EntityId, PlayerId};

use crate::physics::{Contact, ContactKey, FluidContact};

/// Dispatch category. A flush delivers categories in declaration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventCategory {
    /// Entity create/destroy, player join/leave.
    Lifecycle,
    /// Hit points lost.
    Damage,
    /// Hit points reached zero.
    Die,
    /// A solid contact started.
    ContactBegin,
    /// A solid contact ended.
    ContactSeparate,
    /// Fluid enter/leave.
    Fluid,
    /// Input press/release.
    Input,
    /// Chat messages.
    Chat,
    /// Animation ready/finish/cancel.
    Animation,
    /// Always last in a flush.
    TickEnd,
}

impl EventCategory {
    /// Every category in flush order.
    pub const ORDER: [Self; 10] = [
        Self::Lifecycle,
        Self::Damage,
        Self::Die,
        Self::ContactBegin,
        Self::ContactSeparate,
        Self::Fluid,
        Self::Input,
        Self::Chat,
        Self::Animation,
        Self::TickEnd,
    ];
}

/// An event delivered to subscribers.
#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    /// An entity was spawned.
    EntityCreated {
        /// The new entity.
        entity: EntityId,
    },
    /// An entity was destroyed.
    EntityDestroyed {
        /// The destroyed entity.
        entity: EntityId,
    },
    /// A player connected and received a body.
    PlayerJoined {
        /// The player.
        player: PlayerId,
        /// The player's body.
        entity: EntityId,
    },
    /// A player disconnected; their body is destroyed with them.
    PlayerLeft {
        /// The player.
        player: PlayerId,
        /// The body they had.
        entity: EntityId,
    },
    /// An entity lost hit points.
    Damage {
        /// Entity hurt.
        entity: EntityId,
        /// Hit points removed.
        amount: f32,
        /// Hit points left.
        hp: f32,
        /// Entity credited with the damage.
        source: Option<EntityId>,
    },
    /// An entity's hit points reached zero.
    Die {
        /// Entity that died.
        entity: EntityId,
        /// Entity credited with the killing blow.
        source: Option<EntityId>,
    },
    /// Two bodies, or a body and a voxel, started touching.
    ContactBegin(Contact),
    /// A contact ended.
    ContactSeparate(ContactKey),
    /// An entity became partly submerged in a fluid.
    FluidEnter(FluidContact),
    /// An entity left a fluid.
    FluidLeave {
        /// The entity.
        entity: EntityId,
        /// Fluid material code.
        material: u16,
    },
    /// A player pressed a key or button.
    InputPress {
        /// The player.
        player: PlayerId,
        /// Input name.
        key: String,
    },
    /// A player released a key or button.
    InputRelease {
        /// The player.
        player: PlayerId,
        /// Input name.
        key: String,
    },
    /// A player sent a chat message.
    Chat {
        /// The sender.
        player: PlayerId,
        /// Message text.
        message: String,
    },
    /// Animation lifecycle transition.
    Animation(AnimationEvent),
    /// The tick finished. `skipped` counts ticks jumped since the previous
    /// tick end.
    TickEnd {
        /// Tick number.
        tick: u64,
        /// Ticks skipped by `skip_ticks` before this one.
        skipped: u64,
    },
}

impl GameEvent {
    /// Category used for flush ordering.
    #[must_use]
    pub fn category(&self) -> EventCategory {
        match self {
            Self::EntityCreated { .. }
            | Self::EntityDestroyed { .. }
            | Self::PlayerJoined { .. }
            | Self::PlayerLeft { .. } => EventCategory::Lifecycle,
            Self::Damage { .. } => EventCategory::Damage,
            Self::Die { .. } => EventCategory::Die,
            Self::ContactBegin(_) => EventCategory::ContactBegin,
            Self::ContactSeparate(_) => EventCategory::ContactSeparate,
            Self::FluidEnter(_) | Self::FluidLeave { .. } => EventCategory::Fluid,
            Self::InputPress { .. } | Self::InputRelease { .. } => EventCategory::Input,
            Self::Chat { .. } => EventCategory::Chat,
            Self::Animation(_) => EventCategory::Animation,
            Self::TickEnd { .. } => EventCategory::TickEnd,
        }
    }

    /// Entities this event is about.
    ///
    /// A non-lifecycle event whose subject is no longer live is dropped at
    /// delivery time. Damage sources are not subjects.
    #[must_use]
    pub fn subjects(&self) -> [Option<EntityId>; 2] {
        match self {
            Self::EntityCreated { entity }
            | Self::EntityDestroyed { entity }
            | Self::PlayerJoined { entity, .. }
            | Self::PlayerLeft { entity, .. }
            | Self::Damage { entity, .. }
            | Self::Die { entity, .. }
            | Self::FluidLeave { entity, .. } => [Some(*entity), None],
            Self::FluidEnter(fluid) => [Some(fluid.entity), None],
            Self::ContactBegin(contact) => contact.key.entities(),
            Self::ContactSeparate(key) => key.entities(),
            Self::Animation(event) => match event.target {
                AnimationTarget::Entity(entity) => [Some(entity), None],
                AnimationTarget::World | AnimationTarget::Player(_) => [None, None],
            },
            Self::InputPress { .. }
            | Self::InputRelease { .. }
            | Self::Chat { .. }
            | Self::TickEnd { .. } => [None, None],
        }
    }

    /// True if `entity` is one of this event's subjects.
    #[must_use]
    pub fn involves(&self, entity: EntityId) -> bool {
        self.subjects().contains(&Some(entity))
    }

    /// Player this event is about, if any.
    #[must_use]
    pub fn player(&self) -> Option<PlayerId> {
        match self {
            Self::PlayerJoined { player, .. }
            | Self::PlayerLeft { player, .. }
            | Self::InputPress { player, .. }
            | Self::InputRelease { player, .. }
            | Self::Chat { player, .. } => Some(*player),
            Self::Animation(event) => match event.target {
                AnimationTarget::Player(player) => Some(player),
                _ => None,
            },
            _ => None,
        }
    }

    /// Animation instance this event is about, if any.
    #[must_use]
    pub fn animation(&self) -> Option<AnimationId> {
        match self {
            Self::Animation(event) => Some(event.id),
            _ => None,
        }
    }
}

/// Selects which events a subscription receives.
///
/// Unset fields match everything.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EventFilter {
    /// Only this category.
    pub category: Option<EventCategory>,
    /// Only events whose subjects include this entity.
    pub entity: Option<EntityId>,
    /// Only events about this player.
    pub player: Option<PlayerId>,
    /// Only events about this animation.
    pub animation: Option<AnimationId>,
}

impl EventFilter {
    /// Matches every event.
    #[must_use]
    pub fn any() -> Self {
        Self::default()
    }

    /// Matches one category.
    #[must_use]
    pub fn category(category: EventCategory) -> Self {
        Self {
            category: Some(category),
            ..Self::default()
        }
    }

    /// Narrows to events about `entity`.
    #[must_use]
    pub fn entity(mut self, entity: EntityId) -> Self {
        self.entity = Some(entity);
        self
    }

    /// Narrows to events about `player`.
    #[must_use]
    pub fn player(mut self, player: PlayerId) -> Self {
        self.player = Some(player);
        self
    }

    /// Narrows to events about one animation.
    #[must_use]
    pub fn animation(mut self, animation: AnimationId) -> Self {
        self.animation = Some(animation);
        self
    }

    /// True if `event` passes every set field.
    #[must_use]
    pub fn matches(&self, event: &GameEvent) -> bool {
        self.category.map_or(true, |c| c == event.category())
            && self.entity.map_or(true, |e| event.involves(e))
            && self.player.map_or(true, |p| event.player() == Some(p))
            && self.animation.map_or(true, |a| event.animation() == Some(a))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_order_is_contract() {
        let mut sorted = EventCategory::ORDER;
        sorted.sort();
        assert_eq!(sorted, EventCategory::ORDER);
        assert!(EventCategory::Damage < EventCategory::Die);
        assert_eq!(EventCategory::ORDER.last(), Some(&EventCategory::TickEnd));
    }

    #[test]
    fn test_filter_matching() {
        let a = EntityId::new(1, 0);
        let b = EntityId::new(2, 0);
        let event = GameEvent::Damage {
            entity: a,
            amount: 5.0,
            hp: 95.0,
            source: Some(b),
        };

        assert!(EventFilter::any().matches(&event));
        assert!(EventFilter::category(EventCategory::Damage).entity(a).matches(&event));
        assert!(!EventFilter::category(EventCategory::Die).matches(&event));
        // The source is not a subject.
        assert!(!EventFilter::any().entity(b).matches(&event));
        assert!(!EventFilter::any().player(PlayerId(1)).matches(&event));
    }

    #[test]
    fn test_contact_subjects() {
        let a = EntityId::new(1, 0);
        let b = EntityId::new(2, 0);
        let event = GameEvent::ContactSeparate(ContactKey::Entities(a, b));
        assert!(event.involves(a));
        assert!(event.involves(b));
        assert_eq!(event.category(), EventCategory::ContactSeparate);
    }
}
