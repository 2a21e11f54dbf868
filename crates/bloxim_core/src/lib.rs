//! # BLOXIM Core
//!
//! Owns every entity record and the index used to find them in space.
//!
//! ## Architecture Rules
//!
//! 1. **Handles, not pointers** - [`EntityId`] is an index plus generation;
//!    a stale handle resolves to `None`, never to someone else's entity.
//! 2. **Destroy is idempotent** - same-tick double destruction is expected.
//! 3. **Tombstones before compaction** - the spatial index skips destroyed
//!    entries at query time and purges them at the end of the tick.
//!
//! ## Example
//!
//! ```rust
//! use bloxim_core::{EntityConfig, EntityStore};
//!
//! let mut store = EntityStore::new(16);
//! let id = store.create(EntityConfig::default()).unwrap();
//! assert!(store.destroy(id));
//! assert!(!store.destroy(id));
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod entity;
pub mod error;
pub mod selector;
pub mod spatial;

pub use entity::{
    EntityConfig, EntityId, EntityRecord, EntityStore, Health, PlayerId, TagId, TagInterner,
    TagSet,
};
pub use error::{SelectorError, StoreError, StoreResult};
pub use selector::{Selector, SelectorCache};
pub use spatial::SpatialIndex;
