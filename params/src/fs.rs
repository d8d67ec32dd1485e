//! On-disk file-system geometry derived from the registry.
//!
//! The file-system layer checks its own layout at mount time; this module
//! gives it the arithmetic so the sizes it trusts come from the same
//! registry as the log and buffer cache.
//!
//! Layout: `[ boot | super | log | inode blocks | free bitmap | data ]`.

use crate::error::{ConsistencyError, Relation};

/// Block size in bytes.
pub const BSIZE: usize = 512;

/// Size of an on-disk inode in bytes.
pub const DINODE_SIZE: usize = 64;

/// Inodes per block.
pub const IPB: usize = BSIZE / DINODE_SIZE;

/// Bitmap bits per block.
pub const BPB: usize = BSIZE * 8;

/// Inode count used when building a fresh file-system image.
pub const DEFAULT_NINODES: usize = 200;

/// Block counts for each region of the on-disk layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FsGeometry {
    size: usize,
    nlog: usize,
    ninodeblocks: usize,
    nbitmap: usize,
}

impl FsGeometry {
    /// Compute the layout of a `size`-block file system with a
    /// `log_size`-block log and room for `ninodes` inodes.
    pub fn compute(size: usize, log_size: usize, ninodes: usize) -> Result<Self, ConsistencyError> {
        let geometry = Self {
            size,
            nlog: log_size,
            ninodeblocks: ninodes / IPB + 1,
            nbitmap: size / BPB + 1,
        };

        let nmeta = 2usize
            .checked_add(geometry.nlog)
            .and_then(|n| n.checked_add(geometry.ninodeblocks))
            .and_then(|n| n.checked_add(geometry.nbitmap));
        match nmeta {
            Some(nmeta) if nmeta < size => Ok(geometry),
            _ => Err(ConsistencyError::new(
                Relation::FsHoldsMetadata,
                size,
                nmeta.unwrap_or(usize::MAX),
            )),
        }
    }

    /// Total blocks.
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Blocks in the log region, header included.
    pub const fn nlog(&self) -> usize {
        self.nlog
    }

    pub const fn ninodeblocks(&self) -> usize {
        self.ninodeblocks
    }

    pub const fn nbitmap(&self) -> usize {
        self.nbitmap
    }

    /// Boot block, superblock, log, inodes and bitmap.
    pub const fn nmeta(&self) -> usize {
        2 + self.nlog + self.ninodeblocks + self.nbitmap
    }

    /// Blocks left for file data.
    pub const fn ndata(&self) -> usize {
        self.size - self.nmeta()
    }

    pub const fn log_start(&self) -> usize {
        2
    }

    pub const fn inode_start(&self) -> usize {
        self.log_start() + self.nlog
    }

    pub const fn bitmap_start(&self) -> usize {
        self.inode_start() + self.ninodeblocks
    }

    /// First data block.
    pub const fn data_start(&self) -> usize {
        self.nmeta()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CapacityTable, FsVariant, Limit};

    #[test]
    fn test_default_layout() {
        let caps = CapacityTable::for_variant(FsVariant::Default).validate().unwrap();
        let geometry = caps.fs_geometry(DEFAULT_NINODES).unwrap();

        assert_eq!(geometry.nlog(), 30);
        assert_eq!(geometry.ninodeblocks(), 26);
        assert_eq!(geometry.nbitmap(), 1);
        assert_eq!(geometry.nmeta(), 59);
        assert_eq!(geometry.ndata(), 941);

        assert_eq!(geometry.log_start(), 2);
        assert_eq!(geometry.inode_start(), 32);
        assert_eq!(geometry.bitmap_start(), 58);
        assert_eq!(geometry.data_start(), 59);
    }

    #[test]
    fn test_extended_layout_gains_data_blocks() {
        let caps = CapacityTable::for_variant(FsVariant::Extended).validate().unwrap();
        let geometry = caps.fs_geometry(DEFAULT_NINODES).unwrap();
        assert_eq!(geometry.nmeta(), 59);
        assert_eq!(geometry.ndata(), 1941);
    }

    #[test]
    fn test_metadata_overflow() {
        let caps = CapacityTable::for_variant(FsVariant::Default).validate().unwrap();
        let err = caps.fs_geometry(8000).unwrap_err();
        assert_eq!(err.relation(), Relation::FsHoldsMetadata);
        assert_eq!(err.observed(), (1000, 2 + 30 + 1001 + 1));
    }

    #[test]
    fn test_metadata_sum_wraps() {
        let op_blocks = (usize::MAX - 10) / 3;
        let log_size = 3 * op_blocks;
        let table = CapacityTable::build()
            .with(Limit::FsSize, usize::MAX)
            .with(Limit::MaxOpBlocks, op_blocks)
            .with(Limit::LogSize, log_size)
            .with(Limit::Nbuf, log_size);
        assert_eq!(table.validate().unwrap_err().relation(), Relation::FsSizeMatchesVariant);

        let err = FsGeometry::compute(usize::MAX, log_size, 100).unwrap_err();
        assert_eq!(err.relation(), Relation::FsHoldsMetadata);
        assert_eq!(err.observed(), (usize::MAX, usize::MAX));
    }
}
