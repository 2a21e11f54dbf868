//! Queued damage, applied once per tick after contacts.
//!
//! Requests apply in the order they were queued. The first request that
//! brings an entity to zero raises its single `Die`; anything after that in
//! the same tick hits a dead entity and is ignored.

use bloxim_core::{EntityId, EntityStore};

use crate::events::GameEvent;

/// One `hurt` call.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DamageRequest {
    /// Entity to hurt.
    pub target: EntityId,
    /// Hit points to remove.
    pub amount: f32,
    /// Entity credited with the damage.
    pub source: Option<EntityId>,
}

/// Damage waiting for the next tick.
#[derive(Debug, Default)]
pub struct DamageQueue {
    queued: Vec<DamageRequest>,
}

impl DamageQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a request.
    pub fn push(&mut self, request: DamageRequest) {
        self.queued.push(request);
    }

    /// Number of queued requests.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queued.len()
    }

    /// True if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queued.is_empty()
    }

    /// Applies every queued request. Returns how many took effect.
    pub fn apply(&mut self, store: &mut EntityStore, events: &mut Vec<GameEvent>) -> usize {
        let mut applied = 0;
        for request in std::mem::take(&mut self.queued) {
            if !request.amount.is_finite() || request.amount <= 0.0 {
                continue;
            }
            let Some(record) = store.get_mut(request.target) else {
                continue;
            };
            let health = &mut record.health;
            if !health.enable_damage || health.dead {
                continue;
            }

            health.hp = (health.hp - request.amount).max(0.0);
            applied += 1;
            events.push(GameEvent::Damage {
                entity: request.target,
                amount: request.amount,
                hp: health.hp,
                source: request.source,
            });
            if health.hp <= 0.0 {
                health.dead = true;
                events.push(GameEvent::Die {
                    entity: request.target,
                    source: request.source,
                });
            }
        }
        applied
    }
}
