//! # Subscription Table
//!
//! Channels (persistent handlers) and futures (one-shot slots) share one
//! table keyed by [`SubscriptionId`], so delivery order is registration order
//! regardless of kind. The table also holds the queue of events waiting for
//! the next flush.
//!
//! Handlers are checked out of the table while they run, which lets a
//! handler subscribe, unsubscribe or cancel through the world it was given.

use std::collections::BTreeMap;

use super::event::{EventCategory, EventFilter, GameEvent};
use super::future::{self, Completer, Pending};
use super::token::{HandlerToken, SubscriptionId};
use super::Handler;

/// Predicate narrowing a one-shot subscription.
pub type EventPredicate = Box<dyn Fn(&GameEvent) -> bool>;

/// Consumer side of a one-shot subscription.
pub type EventFuture = Pending<GameEvent>;

enum Delivery {
    /// `None` while the handler is checked out.
    Channel(Option<Handler>),
    Once {
        completer: Completer<GameEvent>,
        predicate: Option<EventPredicate>,
    },
}

struct Subscription {
    filter: EventFilter,
    token: HandlerToken,
    delivery: Delivery,
}

/// What a recipient is, decided before delivery.
pub(crate) enum Recipient {
    Channel,
    Once,
}

/// Subscription table plus the queue of undelivered events.
#[derive(Default)]
pub struct EventBus {
    subscriptions: BTreeMap<SubscriptionId, Subscription>,
    queue: Vec<GameEvent>,
    next_id: u64,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriptions", &self.subscriptions.len())
            .field("queued", &self.queue.len())
            .finish()
    }
}

impl EventBus {
    /// Creates an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&mut self) -> HandlerToken {
        self.next_id += 1;
        HandlerToken::new(SubscriptionId(self.next_id))
    }

    /// Registers a persistent handler.
    pub fn subscribe(&mut self, filter: EventFilter, handler: Handler) -> HandlerToken {
        let token = self.allocate();
        self.subscriptions.insert(
            token.id(),
            Subscription {
                filter,
                token: token.clone(),
                delivery: Delivery::Channel(Some(handler)),
            },
        );
        token
    }

    /// Registers a one-shot subscription. The future resolves with the first
    /// matching event and stays pending forever if none arrives.
    pub fn once(
        &mut self,
        filter: EventFilter,
        predicate: Option<EventPredicate>,
    ) -> (HandlerToken, EventFuture) {
        let token = self.allocate();
        let (completer, pending) = future::channel();
        self.subscriptions.insert(
            token.id(),
            Subscription {
                filter,
                token: token.clone(),
                delivery: Delivery::Once {
                    completer,
                    predicate,
                },
            },
        );
        (token, pending)
    }

    /// Removes a subscription for good. Returns `false` if it was unknown.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscriptions.remove(&id).is_some()
    }

    /// Number of subscriptions, cancelled ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    /// True if nothing is subscribed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Queues an event for the next flush.
    pub fn emit(&mut self, event: GameEvent) {
        self.queue.push(event);
    }

    /// Queues several events, keeping their order.
    pub fn emit_all(&mut self, events: impl IntoIterator<Item = GameEvent>) {
        self.queue.extend(events);
    }

    /// Number of undelivered events.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Removes the queued events of one category, keeping their order.
    pub(crate) fn take_category(&mut self, category: EventCategory) -> Vec<GameEvent> {
        let (taken, kept) = std::mem::take(&mut self.queue)
            .into_iter()
            .partition(|event| event.category() == category);
        self.queue = kept;
        taken
    }

    /// Drops queued events matching `predicate`.
    pub(crate) fn discard_queued(&mut self, predicate: impl Fn(&GameEvent) -> bool) -> usize {
        let before = self.queue.len();
        self.queue.retain(|event| !predicate(event));
        before - self.queue.len()
    }

    /// Active subscriptions whose filter matches, in registration order.
    pub(crate) fn recipients(&self, event: &GameEvent) -> Vec<(SubscriptionId, Recipient)> {
        self.subscriptions
            .iter()
            .filter(|(_, sub)| sub.token.active() && sub.filter.matches(event))
            .map(|(id, sub)| {
                let kind = match sub.delivery {
                    Delivery::Channel(_) => Recipient::Channel,
                    Delivery::Once { .. } => Recipient::Once,
                };
                (*id, kind)
            })
            .collect()
    }

    /// Resolves a one-shot subscription if it is still active and its
    /// predicate accepts the event. Returns `true` if it resolved.
    pub(crate) fn resolve_once(&mut self, id: SubscriptionId, event: &GameEvent) -> bool {
        let accepts = match self.subscriptions.get(&id) {
            Some(Subscription {
                token,
                delivery: Delivery::Once { predicate, .. },
                ..
            }) => token.active() && predicate.as_ref().map_or(true, |p| p(event)),
            _ => false,
        };
        if !accepts {
            return false;
        }
        if let Some(Subscription {
            delivery: Delivery::Once { completer, .. },
            ..
        }) = self.subscriptions.remove(&id)
        {
            completer.complete(event.clone());
        }
        true
    }

    /// Takes a channel handler out of the table for one invocation.
    ///
    /// Returns `None` if the subscription is gone, cancelled or already
    /// checked out.
    pub(crate) fn checkout(&mut self, id: SubscriptionId) -> Option<(Handler, HandlerToken)> {
        let sub = self.subscriptions.get_mut(&id)?;
        if !sub.token.active() {
            return None;
        }
        match &mut sub.delivery {
            Delivery::Channel(slot) => slot.take().map(|handler| (handler, sub.token.clone())),
            Delivery::Once { .. } => None,
        }
    }

    /// Puts a handler back. It is dropped if the subscription was removed
    /// while the handler ran.
    pub(crate) fn checkin(&mut self, id: SubscriptionId, handler: Handler) {
        if let Some(Subscription {
            delivery: Delivery::Channel(slot),
            ..
        }) = self.subscriptions.get_mut(&id)
        {
            *slot = Some(handler);
        }
    }
}
