//! # Simulation Constants
//!
//! Defaults for values that a world config may override. Units are world
//! blocks and seconds.

/// Ticks per second when no config overrides it.
pub const DEFAULT_TICK_RATE: u32 = 20;

/// Downward gravitational acceleration (blocks per second squared).
pub const DEFAULT_GRAVITY: f32 = 9.8;

/// Maximum number of live entities a world admits by default.
pub const DEFAULT_ENTITY_QUOTA: usize = 10_000;

/// Side length of one spatial-index cell (blocks).
pub const DEFAULT_CELL_SIZE: f32 = 4.0;

/// Distance within which two touching boxes still count as in contact.
///
/// Resolution leaves bodies exactly touching; without the skin a resting
/// body would flicker between contact and separation every tick.
pub const CONTACT_SKIN: f32 = 0.01;

/// Overlap below this is treated as touching rather than penetrating.
pub const OVERLAP_EPSILON: f32 = 1e-4;

/// Normal speeds below this do not bounce, regardless of restitution.
pub const REST_VELOCITY: f32 = 1.0;

/// Terminal falling speed (blocks per second).
pub const TERMINAL_VELOCITY: f32 = 60.0;

/// Largest delta time a single tick integrates (seconds).
pub const MAX_TICK_DT: f32 = 0.1;
