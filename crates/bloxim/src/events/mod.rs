//! # Event Dispatch
//!
//! Turns simulation state changes into script-visible events.
//!
//! ## Delivery Rules
//!
//! - Events accumulate during a tick and are flushed once, after physics and
//!   animation have committed, category by category in
//!   [`EventCategory::ORDER`].
//! - Within a category, events keep the order they were raised in, and each
//!   event reaches its subscribers in registration order.
//! - An event raised by a handler is delivered in the same flush only if its
//!   category comes later than the one being dispatched; otherwise it waits
//!   for the next tick's flush.
//! - Non-lifecycle events whose subject entity is no longer live are dropped.
//! - A handler returning an error is logged and recorded as a host error;
//!   dispatch continues with the next subscriber.

mod bus;
mod event;
mod future;
mod token;

pub use bus::{EventBus, EventFuture, EventPredicate};
pub(crate) use bus::Recipient;
pub use event::{EventCategory, EventFilter, GameEvent};
pub use future::{channel as pending_channel, Completer, Pending};
pub use token::{HandlerToken, SubscriptionId};

use crate::error::HandlerError;
use crate::world::World;

/// What a handler can reach while it runs.
pub struct HandlerCx<'a> {
    /// The world, fully mutable; the running handler is checked out of it.
    pub world: &'a mut World,
    /// The running subscription's own token.
    pub token: &'a HandlerToken,
}

/// A persistent event handler.
pub type Handler = Box<dyn FnMut(&mut HandlerCx<'_>, &GameEvent) -> Result<(), HandlerError>>;
