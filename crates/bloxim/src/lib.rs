//! # BLOXIM
//!
//! The simulation world, integrating all subsystems.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              BLOXIM WORLD                               │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────┐     ┌─────────────────┐     ┌─────────────────┐   │
//! │  │  bloxim_core    │     │  bloxim_voxel   │     │  bloxim_anim    │   │
//! │  │                 │     │                 │     │                 │   │
//! │  │  • Entities     │     │  • Grid         │     │  • Keyframes    │   │
//! │  │  • Selectors    │     │  • Materials    │     │  • Motions      │   │
//! │  │  • Spatial index│     │  • Snapshots    │     │  • Lifecycle    │   │
//! │  └────────┬────────┘     └────────┬────────┘     └────────┬────────┘   │
//! │           │                       │                       │            │
//! │           │              ┌────────▼────────┐              │            │
//! │           └─────────────>│   bloxim        │<─────────────┘            │
//! │                          │                 │                           │
//! │                          │  • Physics      │     ┌─────────────────┐   │
//! │                          │  • Events       │────>│  Storage worker │   │
//! │                          │  • Players      │<────│  (any thread)   │   │
//! │                          │  • Zones        │     └─────────────────┘   │
//! │                          └─────────────────┘                           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `world`: the tick pipeline and the script-facing API
//! - `physics`: forces, integration, contacts, damage
//! - `events`: channels, one-shot futures and handler tokens
//! - `storage`: asynchronous key-value persistence
//! - `config`: TOML world configuration

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod filter;
pub mod physics;
pub mod players;
pub mod presentation;
pub mod raycast;
pub mod storage;
pub mod world;
pub mod zone;

// Re-export the subsystem crates
pub use {bloxim_anim, bloxim_core, bloxim_shared, bloxim_voxel};

// Re-export commonly used types
pub use clock::{Pace, TickClock, TickStats};
pub use config::WorldConfig;
pub use error::{ConfigError, HandlerError, HostError, StorageError};
pub use events::{
    EventCategory, EventFilter, EventFuture, GameEvent, HandlerCx, HandlerToken, Pending,
    SubscriptionId,
};
pub use physics::{Contact, ContactKey, FluidContact};
pub use raycast::{RaycastHit, RaycastOptions, RaycastTarget};
pub use storage::{KeyValueStore, MemoryStore, StorageClient, StorageEndpoint};
pub use world::{EntitySnapshot, TickSummary, World};
pub use zone::{Ambient, ZoneId};
