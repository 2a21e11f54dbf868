//! # Voxel Grid
//!
//! A dense, bounded 3D array of [`VoxelCell`]s, stored `[y][z][x]`.
//!
//! Coordinates outside the configured shape read as air and ignore writes,
//! so physics can sample past the world edge without bounds checks of its own.
//!
//! ## Storage
//!
//! Grids are saved as binary snapshots: a plain fixed header (magic,
//! version, shape) followed by the LZ4-compressed cell array. The header is
//! validated, and the body's declared size checked against the shape,
//! before anything is decompressed or allocated.

use std::io::{Read, Write};
use std::path::Path;

use bytemuck::{Pod, Zeroable};
use lz4_flex::{compress_prepend_size, decompress_size_prepended};

use crate::cell::VoxelCell;
use crate::error::{VoxelError, VoxelResult};

/// Largest grid extent on any axis.
pub const MAX_AXIS: u32 = 4096;

const SNAPSHOT_MAGIC: [u8; 4] = *b"BXVG";
const SNAPSHOT_VERSION: u32 = 2;
const SIZE_PREFIX_LEN: usize = 4;

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct SnapshotHeader {
    magic: [u8; 4],
    version: u32,
    shape: [u32; 3],
}

/// Dense voxel terrain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoxelGrid {
    shape: [u32; 3],
    cells: Vec<VoxelCell>,
    /// Bumped by every write that changed a cell.
    revision: u64,
    /// Whether the grid changed since it was created, loaded or last saved.
    pub modified: bool,
}

impl VoxelGrid {
    /// Creates an all-air grid of `shape` = `[x, y, z]` cells.
    ///
    /// # Panics
    ///
    /// Panics if an axis exceeds [`MAX_AXIS`]. Use [`VoxelGrid::try_new`]
    /// for shapes that come from outside the program.
    #[must_use]
    pub fn new(shape: [u32; 3]) -> Self {
        match Self::try_new(shape) {
            Ok(grid) => grid,
            Err(err) => panic!("{err}"),
        }
    }

    /// Creates an all-air grid, rejecting oversized shapes.
    ///
    /// # Errors
    ///
    /// Returns [`VoxelError::ShapeTooLarge`] if an axis exceeds
    /// [`MAX_AXIS`].
    pub fn try_new(shape: [u32; 3]) -> VoxelResult<Self> {
        let len = Self::cell_count(shape).ok_or(VoxelError::ShapeTooLarge(shape))?;
        Ok(Self {
            shape,
            cells: vec![VoxelCell::AIR; len],
            revision: 0,
            modified: false,
        })
    }

    /// Number of cells in `shape`, or `None` if an axis exceeds
    /// [`MAX_AXIS`].
    #[must_use]
    pub fn cell_count(shape: [u32; 3]) -> Option<usize> {
        if shape.iter().any(|&s| s > MAX_AXIS) {
            return None;
        }
        shape
            .iter()
            .try_fold(1usize, |acc, &s| acc.checked_mul(usize::try_from(s).ok()?))
    }

    /// Grid size in cells on each axis.
    #[inline]
    #[must_use]
    pub const fn shape(&self) -> [u32; 3] {
        self.shape
    }

    /// Number of changing writes since creation.
    #[inline]
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// True if `(x, y, z)` lies inside the shape.
    #[inline]
    #[must_use]
    pub fn in_bounds(&self, x: i32, y: i32, z: i32) -> bool {
        self.index(x, y, z).is_some()
    }

    #[inline]
    fn index(&self, x: i32, y: i32, z: i32) -> Option<usize> {
        let [sx, sy, sz] = self.shape;
        let x = u32::try_from(x).ok().filter(|&x| x < sx)?;
        let y = u32::try_from(y).ok().filter(|&y| y < sy)?;
        let z = u32::try_from(z).ok().filter(|&z| z < sz)?;
        Some((y as usize * sz as usize + z as usize) * sx as usize + x as usize)
    }

    /// Gets a cell. Out-of-range coordinates read as air.
    #[inline]
    #[must_use]
    pub fn get(&self, x: i32, y: i32, z: i32) -> VoxelCell {
        self.index(x, y, z)
            .map_or(VoxelCell::AIR, |i| self.cells[i])
    }

    /// Sets a cell and returns the value actually stored.
    ///
    /// Out-of-range writes are ignored and return air.
    #[inline]
    pub fn set(&mut self, x: i32, y: i32, z: i32, cell: VoxelCell) -> VoxelCell {
        let Some(i) = self.index(x, y, z) else {
            return VoxelCell::AIR;
        };
        if self.cells[i] != cell {
            self.cells[i] = cell;
            self.revision += 1;
            self.modified = true;
        }
        cell
    }

    fn clamp_range(&self, lo: [i32; 3], hi: [i32; 3]) -> Option<([u32; 3], [u32; 3])> {
        let mut out_lo = [0u32; 3];
        let mut out_hi = [0u32; 3];
        for axis in 0..3 {
            let max = i64::from(self.shape[axis]) - 1;
            let a = i64::from(lo[axis].min(hi[axis])).max(0);
            let b = i64::from(lo[axis].max(hi[axis])).min(max);
            if a > b {
                return None;
            }
            // Both are within 0..shape, which fits u32.
            out_lo[axis] = u32::try_from(a).ok()?;
            out_hi[axis] = u32::try_from(b).ok()?;
        }
        Some((out_lo, out_hi))
    }

    /// Writes `cell` to every in-range coordinate of the inclusive box
    /// `lo..=hi`. Returns how many cells changed.
    pub fn fill(&mut self, lo: [i32; 3], hi: [i32; 3], cell: VoxelCell) -> usize {
        let Some((lo, hi)) = self.clamp_range(lo, hi) else {
            return 0;
        };
        let [sx, _, sz] = self.shape;
        let mut changed = 0;
        for y in lo[1]..=hi[1] {
            for z in lo[2]..=hi[2] {
                let row = (y as usize * sz as usize + z as usize) * sx as usize;
                for slot in &mut self.cells[row + lo[0] as usize..=row + hi[0] as usize] {
                    if *slot != cell {
                        *slot = cell;
                        changed += 1;
                    }
                }
            }
        }
        if changed > 0 {
            self.revision += changed as u64;
            self.modified = true;
        }
        changed
    }

    /// Iterates the in-range cells of the inclusive box `lo..=hi`, in
    /// `y`, `z`, `x` order.
    pub fn iter_range(
        &self,
        lo: [i32; 3],
        hi: [i32; 3],
    ) -> impl Iterator<Item = ([i32; 3], VoxelCell)> + '_ {
        let range = self.clamp_range(lo, hi);
        range.into_iter().flat_map(move |(lo, hi)| {
            (lo[1]..=hi[1]).flat_map(move |y| {
                (lo[2]..=hi[2]).flat_map(move |z| {
                    (lo[0]..=hi[0]).map(move |x| {
                        // Clamped to the shape, which is at most u32 but
                        // addressed through i32 coordinates.
                        let pos = [x as i32, y as i32, z as i32];
                        (pos, self.get(pos[0], pos[1], pos[2]))
                    })
                })
            })
        })
    }

    /// Number of non-air cells.
    #[must_use]
    pub fn count_non_air(&self) -> usize {
        self.cells.iter().filter(|c| !c.is_air()).count()
    }

    /// Serializes the grid to a compressed snapshot.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let header = SnapshotHeader {
            magic: SNAPSHOT_MAGIC,
            version: SNAPSHOT_VERSION,
            shape: self.shape,
        };
        let body = compress_prepend_size(bytemuck::cast_slice(&self.cells));
        let mut out = Vec::with_capacity(std::mem::size_of::<SnapshotHeader>() + body.len());
        out.extend_from_slice(bytemuck::bytes_of(&header));
        out.extend_from_slice(&body);
        out
    }

    /// Restores a grid from a snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the header carries the wrong magic or version,
    /// its shape is oversized, the body's size disagrees with the shape, or
    /// the body does not decompress.
    pub fn from_bytes(bytes: &[u8]) -> VoxelResult<Self> {
        let header_len = std::mem::size_of::<SnapshotHeader>();
        if bytes.len() < header_len + SIZE_PREFIX_LEN {
            return Err(VoxelError::Corrupt("truncated header"));
        }
        let header: SnapshotHeader = bytemuck::pod_read_unaligned(&bytes[..header_len]);
        if header.magic != SNAPSHOT_MAGIC {
            return Err(VoxelError::Corrupt("bad magic"));
        }
        if header.version != SNAPSHOT_VERSION {
            return Err(VoxelError::UnsupportedVersion {
                expected: SNAPSHOT_VERSION,
                found: header.version,
            });
        }

        let cell_size = std::mem::size_of::<VoxelCell>();
        let expected = Self::cell_count(header.shape)
            .and_then(|count| count.checked_mul(cell_size))
            .ok_or(VoxelError::ShapeTooLarge(header.shape))?;
        let body = &bytes[header_len..];
        let mut prefix = [0u8; SIZE_PREFIX_LEN];
        prefix.copy_from_slice(&body[..SIZE_PREFIX_LEN]);
        let declared = u32::from_le_bytes(prefix);
        if usize::try_from(declared).map_or(true, |declared| declared != expected) {
            return Err(VoxelError::Corrupt("cell data size does not match shape"));
        }

        let raw = decompress_size_prepended(body)?;
        if raw.len() != expected {
            return Err(VoxelError::Corrupt("cell data size does not match shape"));
        }
        let mut grid = Self::try_new(header.shape)?;
        for (slot, chunk) in grid.cells.iter_mut().zip(raw.chunks_exact(cell_size)) {
            *slot = bytemuck::pod_read_unaligned(chunk);
        }

        tracing::debug!(shape = ?header.shape, "voxel snapshot decoded");
        Ok(grid)
    }

    /// Replaces this grid's cells with a snapshot of the same shape.
    ///
    /// # Errors
    ///
    /// Fails like [`VoxelGrid::from_bytes`], or with
    /// [`VoxelError::ShapeMismatch`] if the shapes differ.
    pub fn restore(&mut self, bytes: &[u8]) -> VoxelResult<()> {
        let loaded = Self::from_bytes(bytes)?;
        if loaded.shape != self.shape {
            return Err(VoxelError::ShapeMismatch {
                expected: self.shape,
                found: loaded.shape,
            });
        }
        self.cells = loaded.cells;
        self.revision += 1;
        self.modified = false;
        Ok(())
    }

    /// Saves the grid to a compressed binary file.
    ///
    /// # Errors
    ///
    /// Returns error if file operations fail.
    pub fn save(&mut self, path: &Path) -> VoxelResult<usize> {
        let compressed = self.to_bytes();
        let mut file = std::fs::File::create(path)?;
        file.write_all(&compressed)?;
        self.modified = false;
        Ok(compressed.len())
    }

    /// Loads a grid from a compressed binary file.
    ///
    /// # Errors
    ///
    /// Returns error if file operations or decoding fail.
    pub fn load(path: &Path) -> VoxelResult<Self> {
        let mut file = std::fs::File::open(path)?;
        let mut compressed = Vec::new();
        file.read_to_end(&mut compressed)?;
        Self::from_bytes(&compressed)
    }
}
