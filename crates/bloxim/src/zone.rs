//! # Zones
//!
//! A zone is a box plus a selector. Every tick it pushes each matching
//! entity whose center lies inside it, and it carries ambient parameters
//! (weather, fog) that renderers read. Physics never reads the ambient part.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use bloxim_core::{EntityRecord, Selector, TagInterner};
use bloxim_shared::{Bounds3, Vec3};
use serde::{Deserialize, Serialize};

/// Handle of a zone.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ZoneId(pub u64);

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "zone#{}", self.0)
    }
}

/// Presentation parameters of a zone. Opaque to the simulation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Ambient {
    /// Weather preset name (rain, snow...).
    pub weather: Option<String>,
    /// Fog density, 0 = clear.
    pub fog_density: f32,
    /// Fog color as linear RGB.
    pub fog_color: Option<[f32; 3]>,
    /// Sky preset name.
    pub sky: Option<String>,
}

/// One zone.
#[derive(Clone, Debug)]
pub struct Zone {
    /// Handle.
    pub id: ZoneId,
    /// Region.
    pub bounds: Bounds3,
    /// Which entities the force applies to.
    pub selector: Arc<Selector>,
    /// Force applied each tick to matching entities inside.
    pub force: Vec3,
    /// Renderer parameters.
    pub ambient: Ambient,
}

/// All zones of a world, in creation order.
#[derive(Debug, Default)]
pub struct ZoneSet {
    zones: BTreeMap<ZoneId, Zone>,
    next_id: u64,
}

impl ZoneSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a zone.
    pub fn add(
        &mut self,
        bounds: Bounds3,
        selector: Arc<Selector>,
        force: Vec3,
        ambient: Ambient,
    ) -> ZoneId {
        self.next_id += 1;
        let id = ZoneId(self.next_id);
        self.zones.insert(
            id,
            Zone {
                id,
                bounds,
                selector,
                force,
                ambient,
            },
        );
        id
    }

    /// Removes a zone.
    pub fn remove(&mut self, id: ZoneId) -> Option<Zone> {
        self.zones.remove(&id)
    }

    /// Looks up a zone.
    #[must_use]
    pub fn get(&self, id: ZoneId) -> Option<&Zone> {
        self.zones.get(&id)
    }

    /// Zones in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &Zone> + '_ {
        self.zones.values()
    }

    /// Number of zones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.zones.len()
    }

    /// True if there are no zones.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    /// Sum of the forces of every zone containing the record's center whose
    /// selector matches it.
    #[must_use]
    pub fn force_on(&self, record: &EntityRecord, interner: &TagInterner) -> Vec3 {
        self.zones
            .values()
            .filter(|zone| !zone.force.is_zero() && zone.bounds.contains(record.position))
            .filter(|zone| zone.selector.matches(record, interner))
            .fold(Vec3::ZERO, |sum, zone| sum + zone.force)
    }

    /// Ambient of the most recently added zone containing `point`.
    #[must_use]
    pub fn ambient_at(&self, point: Vec3) -> Option<&Ambient> {
        self.zones
            .values()
            .rev()
            .find(|zone| zone.bounds.contains(point))
            .map(|zone| &zone.ambient)
    }
}
