//! # Spatial Index
//!
//! Uniform hash grid over entity boxes.
//!
//! Each entry remembers the cell range it was bucketed into; `update` only
//! touches the buckets when that range changes, so an entity that moves
//! inside its cells costs one hash lookup per tick. Removal tombstones the
//! entry: queries skip it immediately, `compact` purges it at the end of the
//! tick.

use std::collections::{BTreeSet, HashMap};

use bloxim_shared::Bounds3;

use crate::entity::EntityId;

type Cell = [i32; 3];

#[derive(Clone, Copy, Debug)]
struct Entry {
    bounds: Bounds3,
    lo: Cell,
    hi: Cell,
    tombstoned: bool,
}

/// Broad-phase index for entity overlap queries.
#[derive(Debug)]
pub struct SpatialIndex {
    cell_size: f32,
    /// Entries are bucketed by their bounds grown by this much, so pairs
    /// closer than `margin` always share a cell.
    margin: f32,
    cells: HashMap<Cell, Vec<EntityId>>,
    entries: HashMap<EntityId, Entry>,
    tombstones: Vec<EntityId>,
}

impl SpatialIndex {
    /// Creates an index with the given cell size and bucketing margin.
    #[must_use]
    pub fn new(cell_size: f32, margin: f32) -> Self {
        Self {
            cell_size: if cell_size > 0.0 { cell_size } else { 1.0 },
            margin: margin.max(0.0),
            cells: HashMap::new(),
            entries: HashMap::new(),
            tombstones: Vec::new(),
        }
    }

    /// Side length of one cell.
    #[must_use]
    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Number of live (non-tombstoned) entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len() - self.tombstones.len()
    }

    /// True if no live entry exists.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True if the entity has a live entry.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.entries.get(&id).is_some_and(|e| !e.tombstoned)
    }

    /// Last bounds recorded for the entity.
    #[must_use]
    pub fn bounds_of(&self, id: EntityId) -> Option<Bounds3> {
        self.entries
            .get(&id)
            .filter(|e| !e.tombstoned)
            .map(|e| e.bounds)
    }

    fn cell_of(&self, v: f32) -> i32 {
        (v / self.cell_size).floor() as i32
    }

    fn cell_range(&self, bounds: &Bounds3) -> (Cell, Cell) {
        (
            [
                self.cell_of(bounds.lo.x),
                self.cell_of(bounds.lo.y),
                self.cell_of(bounds.lo.z),
            ],
            [
                self.cell_of(bounds.hi.x),
                self.cell_of(bounds.hi.y),
                self.cell_of(bounds.hi.z),
            ],
        )
    }

    /// Inserts or moves an entry.
    ///
    /// Returns `true` if the entry was (re-)bucketed, `false` if its covered
    /// cell range did not change.
    pub fn update(&mut self, id: EntityId, bounds: Bounds3) -> bool {
        let (lo, hi) = self.cell_range(&bounds.expand(self.margin));

        if let Some(entry) = self.entries.get_mut(&id) {
            if !entry.tombstoned && entry.lo == lo && entry.hi == hi {
                entry.bounds = bounds;
                return false;
            }
        }

        if let Some(old) = self.entries.remove(&id) {
            if old.tombstoned {
                self.tombstones.retain(|t| *t != id);
            }
            self.unbucket(id, old.lo, old.hi);
        }

        for_each_cell(lo, hi, |cell| self.cells.entry(cell).or_default().push(id));
        self.entries.insert(
            id,
            Entry {
                bounds,
                lo,
                hi,
                tombstoned: false,
            },
        );
        true
    }

    /// Tombstones an entry. Returns `false` if it was absent or already removed.
    pub fn remove(&mut self, id: EntityId) -> bool {
        match self.entries.get_mut(&id) {
            Some(entry) if !entry.tombstoned => {
                entry.tombstoned = true;
                self.tombstones.push(id);
                true
            }
            _ => false,
        }
    }

    /// Purges tombstoned entries from the buckets.
    pub fn compact(&mut self) -> usize {
        let tombstones = std::mem::take(&mut self.tombstones);
        for id in &tombstones {
            if let Some(entry) = self.entries.remove(id) {
                self.unbucket(*id, entry.lo, entry.hi);
            }
        }
        tombstones.len()
    }

    fn unbucket(&mut self, id: EntityId, lo: Cell, hi: Cell) {
        for_each_cell(lo, hi, |cell| {
            if let Some(bucket) = self.cells.get_mut(&cell) {
                bucket.retain(|other| *other != id);
                if bucket.is_empty() {
                    self.cells.remove(&cell);
                }
            }
        });
    }

    /// Live entries whose bounds overlap `bounds`, sorted by handle.
    ///
    /// Visits the cells covered by `bounds`, or only the occupied cells when
    /// that is fewer.
    #[must_use]
    pub fn query(&self, bounds: &Bounds3) -> Vec<EntityId> {
        let (lo, hi) = self.cell_range(bounds);
        let span = (0..3)
            .map(|axis| i64::from(hi[axis]) - i64::from(lo[axis]) + 1)
            .fold(1i64, i64::saturating_mul);

        let mut found = Vec::new();
        let mut visit = |bucket: &Vec<EntityId>| {
            for id in bucket {
                if let Some(entry) = self.entries.get(id) {
                    if !entry.tombstoned && entry.bounds.intersects(bounds) {
                        found.push(*id);
                    }
                }
            }
        };

        if usize::try_from(span).map_or(true, |span| span > self.cells.len()) {
            for (cell, bucket) in &self.cells {
                if (0..3).all(|axis| cell[axis] >= lo[axis] && cell[axis] <= hi[axis]) {
                    visit(bucket);
                }
            }
        } else {
            for_each_cell(lo, hi, |cell| {
                if let Some(bucket) = self.cells.get(&cell) {
                    visit(bucket);
                }
            });
        }

        found.sort_unstable();
        found.dedup();
        found
    }

    /// Pairs of live entries within `margin` of each other, each pair ordered
    /// `(lower, higher)` and the list sorted.
    ///
    /// `margin` must not exceed the margin the index was built with.
    #[must_use]
    pub fn candidate_pairs(&self, margin: f32) -> Vec<(EntityId, EntityId)> {
        let mut pairs = BTreeSet::new();
        for bucket in self.cells.values() {
            for (i, a) in bucket.iter().enumerate() {
                let Some(ea) = self.entries.get(a).filter(|e| !e.tombstoned) else {
                    continue;
                };
                let grown = ea.bounds.expand(margin);
                for b in &bucket[i + 1..] {
                    let Some(eb) = self.entries.get(b).filter(|e| !e.tombstoned) else {
                        continue;
                    };
                    if grown.intersects(&eb.bounds) {
                        pairs.insert(if a < b { (*a, *b) } else { (*b, *a) });
                    }
                }
            }
        }
        pairs.into_iter().collect()
    }

    /// Drops entries whose entity no longer exists.
    ///
    /// An entry for a missing entity is a bookkeeping bug: debug builds panic,
    /// release builds log it and drop the entry. Returns the number dropped.
    pub fn heal(&mut self, is_live: impl Fn(EntityId) -> bool) -> usize {
        let mut stale: Vec<EntityId> = self
            .entries
            .iter()
            .filter(|(id, e)| !e.tombstoned && !is_live(**id))
            .map(|(id, _)| *id)
            .collect();
        stale.sort_unstable();
        debug_assert!(
            stale.is_empty(),
            "spatial index holds {stale:?} which is not in the entity store"
        );

        for id in &stale {
            tracing::warn!(entity = %id, "dropping stale spatial index entry");
            if let Some(entry) = self.entries.remove(id) {
                self.unbucket(*id, entry.lo, entry.hi);
            }
        }
        stale.len()
    }
}

fn for_each_cell(lo: Cell, hi: Cell, mut f: impl FnMut(Cell)) {
    for y in lo[1]..=hi[1] {
        for z in lo[2]..=hi[2] {
            for x in lo[0]..=hi[0] {
                f([x, y, z]);
            }
        }
    }
}
