//! Packed voxel cells.
//!
//! ```text
//! bit 15 14 | 13 ............ 0
//!  rotation | material code
//! ```

use bytemuck::{Pod, Zeroable};

/// Number of bits holding the material code.
pub const MATERIAL_BITS: u32 = 14;

/// Largest material code a cell can hold.
pub const MAX_MATERIAL: u16 = (1 << MATERIAL_BITS) - 1;

const ROTATION_SHIFT: u32 = MATERIAL_BITS;

/// One voxel: material code plus quarter-turn rotation about the Y axis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
#[repr(transparent)]
pub struct VoxelCell(u16);

impl VoxelCell {
    /// Empty cell.
    pub const AIR: Self = Self(0);

    /// Creates a cell. Material codes above [`MAX_MATERIAL`] are masked and
    /// rotation is taken modulo 4.
    #[inline]
    #[must_use]
    pub const fn new(material: u16, rotation: u8) -> Self {
        Self((material & MAX_MATERIAL) | (((rotation & 0b11) as u16) << ROTATION_SHIFT))
    }

    /// Unrotated cell of a material.
    #[inline]
    #[must_use]
    pub const fn material_only(material: u16) -> Self {
        Self::new(material, 0)
    }

    /// Reinterprets a packed code.
    #[inline]
    #[must_use]
    pub const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    /// The packed code.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u16 {
        self.0
    }

    /// Material code.
    #[inline]
    #[must_use]
    pub const fn material(self) -> u16 {
        self.0 & MAX_MATERIAL
    }

    /// Rotation in quarter turns (0-3).
    #[inline]
    #[must_use]
    pub const fn rotation(self) -> u8 {
        (self.0 >> ROTATION_SHIFT) as u8
    }

    /// Same material, different rotation.
    #[inline]
    #[must_use]
    pub const fn with_rotation(self, rotation: u8) -> Self {
        Self::new(self.material(), rotation)
    }

    /// Returns true if this is an air cell. Rotation is ignored.
    #[inline]
    #[must_use]
    pub const fn is_air(self) -> bool {
        self.material() == 0
    }
}
