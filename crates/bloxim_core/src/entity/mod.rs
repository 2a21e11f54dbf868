//! # Entity Management
//!
//! Entities are arena-allocated records addressed by generational handles.
//! Players link to entities (and back) by id only, so destroying either side
//! cannot leave the other holding a dangling owner.

mod id;
mod record;
mod store;
mod tags;

pub use id::{EntityId, PlayerId};
pub use record::{EntityConfig, EntityRecord, Health, MIN_MASS};
pub use store::EntityStore;
pub use tags::{TagId, TagInterner, TagSet};
