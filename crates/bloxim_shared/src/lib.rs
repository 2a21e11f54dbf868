//! # BLOXIM Shared
//!
//! Common types used by every layer of the simulation core.
//!
//! ## Contents
//!
//! - [`Vec3`]: positions, velocities, forces, half-extents
//! - [`Bounds3`]: axis-aligned boxes for entities, zones and queries
//! - [`constants`]: default tick rate, gravity, quota and tolerances

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod constants;
pub mod math;

pub use constants::{
    CONTACT_SKIN, DEFAULT_ENTITY_QUOTA, DEFAULT_GRAVITY, DEFAULT_TICK_RATE, REST_VELOCITY,
};
pub use math::{Bounds3, Vec3};
