//! The capacity table and its validated handle.

use crate::error::{ConsistencyError, Relation, UnknownLimit};
use crate::fs::FsGeometry;
use crate::limit::Limit;
use crate::param;

/// Build configuration variant.
///
/// The variants differ only in file-system size. Selected by the
/// `extended-fs` feature before anything runs; the registry never holds
/// more than one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FsVariant {
    /// 1000-block file system.
    Default,
    /// 2000-block file system.
    Extended,
}

impl FsVariant {
    /// The variant this crate was built with.
    #[cfg(feature = "extended-fs")]
    pub const BUILD: FsVariant = FsVariant::Extended;

    /// The variant this crate was built with.
    #[cfg(not(feature = "extended-fs"))]
    pub const BUILD: FsVariant = FsVariant::Default;

    /// File-system size in blocks.
    pub const fn fs_size(self) -> usize {
        match self {
            FsVariant::Default => param::FSSIZE_DEFAULT,
            FsVariant::Extended => param::FSSIZE_EXTENDED,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            FsVariant::Default => "default",
            FsVariant::Extended => "extended",
        }
    }
}

/// An unvalidated capacity table.
///
/// Holds one value per [`Limit`]. Nothing outside this crate can read limits
/// from it; it has to pass [`CapacityTable::validate`] first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapacityTable {
    values: [usize; Limit::COUNT],
    variant: FsVariant,
}

impl CapacityTable {
    /// Table populated from the build-time constants for `variant`.
    pub const fn for_variant(variant: FsVariant) -> Self {
        Self {
            values: [
                param::NPROC,
                param::KERNEL_STACK_SIZE,
                param::NCPU,
                param::NOFILE,
                param::NFILE,
                param::NINODE,
                param::NDEV,
                param::ROOTDEV,
                param::MAXARG,
                param::MAXOPBLOCKS,
                param::LOGSIZE,
                param::NBUF,
                variant.fs_size(),
            ],
            variant,
        }
    }

    /// Table for the variant selected at build time.
    pub const fn build() -> Self {
        Self::for_variant(FsVariant::BUILD)
    }

    /// Override one value before validation.
    ///
    /// Board configurations use this to shrink tables; tests use it to feed
    /// deliberately broken tables into [`validate`](Self::validate).
    ///
    /// `FSSIZE` belongs to the variant: a table whose `FSSIZE` no longer
    /// matches [`variant`](Self::variant) fails validation. Pick another
    /// variant with [`for_variant`](Self::for_variant) instead.
    pub fn with(mut self, limit: Limit, value: usize) -> Self {
        self.values[limit.index()] = value;
        self
    }

    pub const fn variant(&self) -> FsVariant {
        self.variant
    }

    fn raw(&self, limit: Limit) -> usize {
        self.values[limit.index()]
    }

    /// Check every derivation relationship.
    ///
    /// Relations are checked in a fixed order and the first one that fails
    /// is returned. A failure means the build is misconfigured; callers must
    /// not start any subsystem without a [`Capacities`] from this call.
    pub fn validate(&self) -> Result<Capacities, ConsistencyError> {
        match self.check() {
            Ok(()) => {
                log::info!(
                    "[params] capacity table validated ({} file system, {} blocks)",
                    self.variant.name(),
                    self.raw(Limit::FsSize)
                );
                Ok(Capacities { table: *self })
            }
            Err(err) => {
                log::error!("[params] {}", err);
                Err(err)
            }
        }
    }

    fn check(&self) -> Result<(), ConsistencyError> {
        for limit in Limit::ALL {
            let value = self.raw(limit);
            require(Relation::Positive(limit), value > 0, value, 0)?;
        }

        // `None` when 3 * MAXOPBLOCKS does not fit; nothing can equal it then.
        let op_blocks = self.raw(Limit::MaxOpBlocks).checked_mul(3);
        let shown = op_blocks.unwrap_or(usize::MAX);
        let log_size = self.raw(Limit::LogSize);
        require(Relation::LogHoldsThreeOps, op_blocks == Some(log_size), log_size, shown)?;

        let nbuf = self.raw(Limit::Nbuf);
        require(Relation::CacheHoldsThreeOps, op_blocks == Some(nbuf), nbuf, shown)?;

        let nofile = self.raw(Limit::Nofile);
        let nfile = self.raw(Limit::Nfile);
        require(Relation::ProcessFilesFitSystem, nofile <= nfile, nofile, nfile)?;

        let rootdev = self.raw(Limit::RootDev);
        let ndev = self.raw(Limit::Ndev);
        require(Relation::RootDeviceInRange, rootdev < ndev, rootdev, ndev)?;

        let fs_size = self.raw(Limit::FsSize);
        let expected = self.variant.fs_size();
        require(Relation::FsSizeMatchesVariant, fs_size == expected, fs_size, expected)?;
        require(Relation::FsLargerThanLog, fs_size > log_size, fs_size, log_size)
    }
}

fn require(relation: Relation, holds: bool, left: usize, right: usize) -> Result<(), ConsistencyError> {
    if holds {
        Ok(())
    } else {
        Err(ConsistencyError::new(relation, left, right))
    }
}

/// A validated, read-only capacity table.
///
/// Only [`CapacityTable::validate`] creates one. It is `Copy` so each
/// subsystem can hold its own; there is no way to change a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capacities {
    table: CapacityTable,
}

impl Capacities {
    /// Value of `limit`.
    pub fn get(&self, limit: Limit) -> usize {
        self.table.raw(limit)
    }

    /// Value of the limit called `name`.
    pub fn lookup(&self, name: &str) -> Result<usize, UnknownLimit> {
        name.parse::<Limit>().map(|limit| self.get(limit))
    }

    pub fn variant(&self) -> FsVariant {
        self.table.variant
    }

    /// Iterate `(limit, value)` pairs in table order.
    pub fn iter(&self) -> impl Iterator<Item = (Limit, usize)> + '_ {
        Limit::ALL.iter().map(move |&limit| (limit, self.get(limit)))
    }

    /// Check the stack limits against a memory model.
    ///
    /// `usable_bytes` is the physical memory available for kernel
    /// allocations.
    pub fn check_memory_model(&self, page_size: usize, usable_bytes: usize) -> Result<(), ConsistencyError> {
        let stack = self.get(Limit::KernelStackSize);
        let remainder = stack % page_size.max(1);
        require(Relation::StackPageMultiple, remainder == 0, stack, page_size)?;

        let stacks = self.get(Limit::Nproc).saturating_mul(stack);
        require(Relation::StacksFitMemory, stacks <= usable_bytes, stacks, usable_bytes)
    }

    /// On-disk layout for a file system of this table's size holding
    /// `ninodes` inodes.
    pub fn fs_geometry(&self, ninodes: usize) -> Result<FsGeometry, ConsistencyError> {
        FsGeometry::compute(self.get(Limit::FsSize), self.get(Limit::LogSize), ninodes)
    }
}
