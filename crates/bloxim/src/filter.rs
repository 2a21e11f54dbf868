//! Collision filters: selector pairs whose matching entities never collide.

use std::sync::Arc;

use bloxim_core::{EntityRecord, Selector, TagInterner};

/// Handle of a collision filter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FilterId(pub u64);

/// Entities matching `first` never touch entities matching `second`, in
/// either order.
#[derive(Clone, Debug)]
pub struct CollisionFilter {
    /// Handle.
    pub id: FilterId,
    /// One side.
    pub first: Arc<Selector>,
    /// The other side.
    pub second: Arc<Selector>,
}

impl CollisionFilter {
    /// True if the pair is excluded by this filter.
    #[must_use]
    pub fn excludes(&self, a: &EntityRecord, b: &EntityRecord, interner: &TagInterner) -> bool {
        let ab = self.first.matches(a, interner) && self.second.matches(b, interner);
        ab || (self.first.matches(b, interner) && self.second.matches(a, interner))
    }
}

/// World-level list of collision filters.
#[derive(Debug, Default)]
pub struct CollisionFilters {
    filters: Vec<CollisionFilter>,
    next_id: u64,
}

impl CollisionFilters {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a filter.
    pub fn add(&mut self, first: Arc<Selector>, second: Arc<Selector>) -> FilterId {
        self.next_id += 1;
        let id = FilterId(self.next_id);
        self.filters.push(CollisionFilter { id, first, second });
        id
    }

    /// Removes a filter. Returns `false` if it was unknown.
    pub fn remove(&mut self, id: FilterId) -> bool {
        let before = self.filters.len();
        self.filters.retain(|f| f.id != id);
        before != self.filters.len()
    }

    /// Filters in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &CollisionFilter> + '_ {
        self.filters.iter()
    }

    /// Number of filters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// True if there are no filters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// True if any filter excludes the pair.
    #[must_use]
    pub fn excludes(&self, a: &EntityRecord, b: &EntityRecord, interner: &TagInterner) -> bool {
        self.filters.iter().any(|f| f.excludes(a, b, interner))
    }
}
