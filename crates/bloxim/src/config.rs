//! # World Configuration
//!
//! Loaded once at startup from TOML. Every field has a default, so a config
//! file names only what it changes:
//!
//! ```toml
//! tick_rate = 30
//! grid_shape = [64, 32, 64]
//!
//! [[materials]]
//! name = "bouncy"
//! friction = 0.4
//! restitution = 0.9
//!
//! [[zones]]
//! lo = { x = 0.0, y = 0.0, z = 0.0 }
//! hi = { x = 8.0, y = 8.0, z = 8.0 }
//! selector = ".balloon"
//! force = { x = 0.0, y = 15.0, z = 0.0 }
//!
//! [[collision_filters]]
//! first = ".ghost"
//! second = "*"
//! ```

use std::path::Path;

use bloxim_shared::constants::{DEFAULT_CELL_SIZE, MAX_TICK_DT};
use bloxim_shared::{
    Bounds3, Vec3, CONTACT_SKIN, DEFAULT_ENTITY_QUOTA, DEFAULT_GRAVITY, DEFAULT_TICK_RATE,
};
use bloxim_voxel::{MaterialInfo, MAX_AXIS};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::zone::Ambient;

/// A material added to (or overriding) the default registry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MaterialConfig {
    /// Registry name.
    pub name: String,
    /// Physical description.
    #[serde(flatten)]
    pub info: MaterialInfo,
}

/// A zone created when the world starts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ZoneConfig {
    /// Minimum corner.
    pub lo: Vec3,
    /// Maximum corner.
    pub hi: Vec3,
    /// Entities the force applies to.
    #[serde(default = "any_selector")]
    pub selector: String,
    /// Force applied each tick.
    #[serde(default)]
    pub force: Vec3,
    /// Renderer parameters.
    #[serde(default)]
    pub ambient: Ambient,
}

impl ZoneConfig {
    /// Region of the zone.
    #[must_use]
    pub fn bounds(&self) -> Bounds3 {
        Bounds3::new(self.lo.min(self.hi), self.lo.max(self.hi))
    }
}

fn any_selector() -> String {
    "*".to_owned()
}

/// A collision filter created when the world starts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Selector of one side.
    pub first: String,
    /// Selector of the other side.
    pub second: String,
}

/// World configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Ticks per second.
    pub tick_rate: u32,
    /// Voxel grid size `[x, y, z]`.
    pub grid_shape: [u32; 3],
    /// Maximum live entities.
    pub entity_quota: usize,
    /// Downward acceleration.
    pub gravity: f32,
    /// Side of one spatial index cell.
    pub cell_size: f32,
    /// Contact skin distance.
    pub contact_skin: f32,
    /// Storage requests allowed in flight.
    pub storage_capacity: usize,
    /// Extra materials.
    pub materials: Vec<MaterialConfig>,
    /// Initial zones.
    pub zones: Vec<ZoneConfig>,
    /// Initial collision filters.
    pub collision_filters: Vec<FilterConfig>,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            tick_rate: DEFAULT_TICK_RATE,
            grid_shape: [64, 64, 64],
            entity_quota: DEFAULT_ENTITY_QUOTA,
            gravity: DEFAULT_GRAVITY,
            cell_size: DEFAULT_CELL_SIZE,
            contact_skin: CONTACT_SKIN,
            storage_capacity: 256,
            materials: Vec::new(),
            zones: Vec::new(),
            collision_filters: Vec::new(),
        }
    }
}

impl WorldConfig {
    /// Parses and validates a TOML config.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on bad syntax and
    /// [`ConfigError::Invalid`] on out-of-range values.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML config file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise as
    /// [`WorldConfig::from_toml_str`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field, reason: &str| {
            Err(ConfigError::Invalid {
                field,
                reason: reason.to_owned(),
            })
        };
        if self.tick_rate == 0 || self.tick_rate > 1000 {
            return invalid("tick_rate", "must be within 1..=1000");
        }
        if self.grid_shape.iter().any(|&s| s == 0 || s > MAX_AXIS) {
            return invalid("grid_shape", "each axis must be within 1..=4096");
        }
        if !self.gravity.is_finite() {
            return invalid("gravity", "must be finite");
        }
        if !(self.cell_size.is_finite() && self.cell_size > 0.0) {
            return invalid("cell_size", "must be positive");
        }
        if !(self.contact_skin.is_finite() && self.contact_skin >= 0.0 && self.contact_skin < 0.5) {
            return invalid("contact_skin", "must be within 0..0.5");
        }
        if self.storage_capacity == 0 {
            return invalid("storage_capacity", "must be positive");
        }
        if self.materials.iter().any(|m| m.name.is_empty() || m.name == "air") {
            return invalid("materials", "names must be non-empty and not `air`");
        }
        Ok(())
    }

    /// Seconds simulated per tick, capped at the largest stable step.
    #[must_use]
    pub fn tick_dt(&self) -> f32 {
        #[allow(clippy::cast_precision_loss)]
        let dt = 1.0 / self.tick_rate.max(1) as f32;
        dt.min(MAX_TICK_DT)
    }
}
