//! # BLOXIM Anim
//!
//! Keyframe and motion-clip playback for entities, players and the world.
//!
//! Every instance runs the same state machine:
//! `Pending → Running → Finished`, or `Cancelled`. The scheduler advances
//! instances once per tick, returns the interpolated property values for the
//! host to apply, and queues `Ready` / `Finish` / `Cancel` events for the
//! host's dispatcher.
//!
//! ## Example
//!
//! ```rust
//! use bloxim_anim::{
//!     AnimationScheduler, AnimationTarget, Direction, Keyframe, PlaybackOptions,
//! };
//!
//! let mut scheduler = AnimationScheduler::new();
//! let options = PlaybackOptions::default()
//!     .iterations(2.0)
//!     .direction(Direction::Alternate);
//! let keyframes = vec![
//!     Keyframe::after(0.0).scalar("opacity", 0.0),
//!     Keyframe::after(1.0).scalar("opacity", 1.0),
//! ];
//! let id = scheduler.animate(AnimationTarget::World, keyframes, options).unwrap();
//! scheduler.advance(0.05);
//! assert!(scheduler.get(id).is_some());
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod easing;
pub mod error;
pub mod instance;
pub mod scheduler;
pub mod timeline;

pub use easing::Easing;
pub use error::{AnimError, AnimResult};
pub use instance::{
    AnimationId, AnimationInstance, AnimationSource, AnimationTarget, Direction, PlayState,
    PlaybackOptions,
};
pub use scheduler::{AnimationEvent, AnimationEventKind, AnimationSample, AnimationScheduler};
pub use timeline::{Keyframe, PropertyValue, Timeline};
