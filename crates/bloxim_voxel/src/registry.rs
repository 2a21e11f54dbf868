//! Material registry.
//!
//! A pure bidirectional name ↔ code table. Each code also carries the
//! physical info the contact resolver needs; nothing here runs physics.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::cell::{VoxelCell, MAX_MATERIAL};
use crate::error::{VoxelError, VoxelResult};

/// Fluid parameters of a material.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FluidProps {
    /// Density relative to a body of density 1 (mass / volume).
    pub density: f32,
    /// Linear drag per second applied to submerged velocity.
    pub viscosity: f32,
}

/// Physical description of one material.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialInfo {
    /// Solid materials block entities and produce voxel contacts.
    pub solid: bool,
    /// Friction coefficient of the surface.
    pub friction: f32,
    /// Restitution of the surface.
    pub restitution: f32,
    /// Present for fluids; fluids are never solid.
    pub fluid: Option<FluidProps>,
}

impl Default for MaterialInfo {
    fn default() -> Self {
        Self::solid(0.6, 0.0)
    }
}

impl MaterialInfo {
    /// A solid material.
    #[must_use]
    pub const fn solid(friction: f32, restitution: f32) -> Self {
        Self {
            solid: true,
            friction,
            restitution,
            fluid: None,
        }
    }

    /// A fluid material.
    #[must_use]
    pub const fn fluid(density: f32, viscosity: f32) -> Self {
        Self {
            solid: false,
            friction: 0.0,
            restitution: 0.0,
            fluid: Some(FluidProps { density, viscosity }),
        }
    }

    const fn air() -> Self {
        Self {
            solid: false,
            friction: 0.0,
            restitution: 0.0,
            fluid: None,
        }
    }
}

/// Name ↔ code table. Code 0 is always `air`.
#[derive(Clone, Debug)]
pub struct VoxelRegistry {
    names: Vec<String>,
    infos: Vec<MaterialInfo>,
    codes: HashMap<String, u16>,
}

impl Default for VoxelRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        let builtin = [
            ("stone", MaterialInfo::solid(0.6, 0.0)),
            ("grass", MaterialInfo::solid(0.6, 0.0)),
            ("dirt", MaterialInfo::solid(0.6, 0.0)),
            ("sand", MaterialInfo::solid(0.5, 0.0)),
            ("wood", MaterialInfo::solid(0.5, 0.0)),
            ("ice", MaterialInfo::solid(0.02, 0.0)),
            ("rubber", MaterialInfo::solid(0.9, 0.8)),
            ("water", MaterialInfo::fluid(1.0, 0.8)),
            ("lava", MaterialInfo::fluid(3.0, 2.5)),
        ];
        for (name, info) in builtin {
            // Nine builtins cannot fill a 14-bit table.
            let _ = registry.register(name, info);
        }
        registry
    }
}

impl VoxelRegistry {
    /// Registry holding only `air`.
    #[must_use]
    pub fn empty() -> Self {
        let mut codes = HashMap::new();
        codes.insert("air".to_owned(), 0);
        Self {
            names: vec!["air".to_owned()],
            infos: vec![MaterialInfo::air()],
            codes,
        }
    }

    /// Registers a material, or updates the info of an existing name.
    ///
    /// # Errors
    ///
    /// Returns [`VoxelError::RegistryFull`] when every code is taken.
    pub fn register(&mut self, name: &str, info: MaterialInfo) -> VoxelResult<u16> {
        if let Some(&code) = self.codes.get(name) {
            if code != 0 {
                self.infos[code as usize] = info;
            }
            return Ok(code);
        }
        let code = u16::try_from(self.names.len())
            .ok()
            .filter(|&c| c <= MAX_MATERIAL)
            .ok_or(VoxelError::RegistryFull)?;
        self.names.push(name.to_owned());
        self.infos.push(info);
        self.codes.insert(name.to_owned(), code);
        Ok(code)
    }

    /// Code registered for `name`.
    #[must_use]
    pub fn code_of(&self, name: &str) -> Option<u16> {
        self.codes.get(name).copied()
    }

    /// Name registered for `code`.
    #[must_use]
    pub fn name_of(&self, code: u16) -> Option<&str> {
        self.names.get(code as usize).map(String::as_str)
    }

    /// Unrotated cell for a material name.
    ///
    /// # Errors
    ///
    /// Returns [`VoxelError::UnknownMaterial`] for unregistered names.
    pub fn cell(&self, name: &str) -> VoxelResult<VoxelCell> {
        self.code_of(name)
            .map(VoxelCell::material_only)
            .ok_or_else(|| VoxelError::UnknownMaterial(name.to_owned()))
    }

    /// Physical info of a code.
    #[must_use]
    pub fn info(&self, code: u16) -> Option<&MaterialInfo> {
        self.infos.get(code as usize)
    }

    /// True if the cell's material blocks movement. Unknown codes are solid.
    #[must_use]
    pub fn is_solid(&self, cell: VoxelCell) -> bool {
        if cell.is_air() {
            return false;
        }
        self.info(cell.material()).map_or(true, |i| i.solid)
    }

    /// Fluid parameters of the cell's material, if it is a fluid.
    #[must_use]
    pub fn fluid(&self, cell: VoxelCell) -> Option<FluidProps> {
        self.info(cell.material()).and_then(|i| i.fluid)
    }

    /// Number of registered materials, air included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Always false: air is always registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bidirectional_lookup() {
        let registry = VoxelRegistry::default();
        let code = registry.code_of("stone").unwrap();
        assert_eq!(registry.name_of(code), Some("stone"));
        assert_eq!(registry.code_of("air"), Some(0));
        assert_eq!(registry.name_of(9999), None);
    }

    #[test]
    fn test_solid_and_fluid() {
        let registry = VoxelRegistry::default();
        let stone = registry.cell("stone").unwrap();
        let water = registry.cell("water").unwrap();

        assert!(registry.is_solid(stone));
        assert!(registry.is_solid(stone.with_rotation(2)));
        assert!(!registry.is_solid(water));
        assert!(!registry.is_solid(VoxelCell::AIR));
        assert_eq!(registry.fluid(water).map(|f| f.density), Some(1.0));
        assert!(registry.fluid(stone).is_none());
    }

    #[test]
    fn test_register_updates_existing() {
        let mut registry = VoxelRegistry::empty();
        let a = registry.register("glass", MaterialInfo::solid(0.1, 0.0)).unwrap();
        let b = registry.register("glass", MaterialInfo::solid(0.3, 0.0)).unwrap();
        assert_eq!(a, b);
        assert_eq!(registry.info(a).map(|i| i.friction), Some(0.3));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_unknown_material() {
        let registry = VoxelRegistry::empty();
        assert!(matches!(
            registry.cell("unobtainium"),
            Err(VoxelError::UnknownMaterial(_))
        ));
    }
}
