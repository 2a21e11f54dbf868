//! # Voxel Error Types

use thiserror::Error;

/// Errors from the voxel grid, its snapshots and the material registry.
#[derive(Error, Debug)]
pub enum VoxelError {
    /// Reading or writing a snapshot file failed.
    #[error("snapshot I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The LZ4 payload could not be decompressed.
    #[error("snapshot decompression failed: {0}")]
    Decompress(#[from] lz4_flex::block::DecompressError),

    /// The snapshot is not a grid snapshot or is truncated.
    #[error("corrupt snapshot: {0}")]
    Corrupt(&'static str),

    /// The snapshot was written by an unknown format version.
    #[error("unsupported snapshot version {found} (expected {expected})")]
    UnsupportedVersion {
        /// Version this build writes.
        expected: u32,
        /// Version found in the file.
        found: u32,
    },

    /// A snapshot was loaded into a grid of a different shape.
    #[error("shape mismatch: grid is {expected:?}, snapshot is {found:?}")]
    ShapeMismatch {
        /// Shape of the target grid.
        expected: [u32; 3],
        /// Shape stored in the snapshot.
        found: [u32; 3],
    },

    /// A shape with an axis above the grid limit.
    #[error("grid shape {0:?} exceeds the per-axis limit")]
    ShapeTooLarge([u32; 3]),

    /// A material name with no registered code.
    #[error("unknown material {0:?}")]
    UnknownMaterial(String),

    /// Every material code is in use.
    #[error("material registry full")]
    RegistryFull,
}

/// Result type for voxel operations.
pub type VoxelResult<T> = Result<T, VoxelError>;
