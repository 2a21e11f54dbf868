//! # BLOXIM Voxel
//!
//! Static terrain for the simulation core.
//!
//! ## Architecture Rules
//!
//! 1. **Bounded, never failing** - reads outside the grid are air, writes
//!    outside it are dropped.
//! 2. **Data only** - writing a cell runs no physics; contacts re-evaluate
//!    on the next tick.
//! 3. **Names are a lookup table** - [`VoxelRegistry`] maps names to codes
//!    and carries material info, nothing more.
//!
//! ## Example
//!
//! ```rust
//! use bloxim_voxel::{VoxelGrid, VoxelRegistry};
//!
//! let registry = VoxelRegistry::default();
//! let stone = registry.cell("stone").unwrap();
//!
//! let mut grid = VoxelGrid::new([16, 16, 16]);
//! assert_eq!(grid.set(1, 0, 1, stone), stone);
//! assert_eq!(grid.get(1, 0, 1), stone);
//! assert!(grid.get(-1, 0, 0).is_air());
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod cell;
pub mod error;
pub mod grid;
pub mod registry;

pub use cell::{VoxelCell, MAX_MATERIAL};
pub use error::{VoxelError, VoxelResult};
pub use grid::{VoxelGrid, MAX_AXIS};
pub use registry::{FluidProps, MaterialInfo, VoxelRegistry};
