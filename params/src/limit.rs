//! Names of the registry's limits.

use core::fmt;
use core::str::FromStr;

use crate::error::UnknownLimit;

/// A named capacity limit.
///
/// The set is closed: the table is never extended at runtime, so a lookup by
/// `Limit` cannot miss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Limit {
    /// Process slots (`NPROC`).
    Nproc,
    /// Per-process kernel stack size in bytes (`KERNEL_STACK_SIZE`).
    KernelStackSize,
    /// CPU count (`NCPU`).
    Ncpu,
    /// Open files per process (`NOFILE`).
    Nofile,
    /// Open files per system (`NFILE`).
    Nfile,
    /// Inode cache size (`NINODE`).
    Ninode,
    /// Major device numbers (`NDEV`).
    Ndev,
    /// Root disk device number (`ROOTDEV`).
    RootDev,
    /// Exec argument limit (`MAXARG`).
    MaxArg,
    /// Blocks written by one file-system operation (`MAXOPBLOCKS`).
    MaxOpBlocks,
    /// Data blocks in the on-disk log (`LOGSIZE`).
    LogSize,
    /// Block cache size (`NBUF`).
    Nbuf,
    /// File-system size in blocks (`FSSIZE`).
    FsSize,
}

impl Limit {
    /// Number of limits in the registry.
    pub const COUNT: usize = 13;

    /// Every limit, in table order.
    pub const ALL: [Limit; Limit::COUNT] = [
        Limit::Nproc,
        Limit::KernelStackSize,
        Limit::Ncpu,
        Limit::Nofile,
        Limit::Nfile,
        Limit::Ninode,
        Limit::Ndev,
        Limit::RootDev,
        Limit::MaxArg,
        Limit::MaxOpBlocks,
        Limit::LogSize,
        Limit::Nbuf,
        Limit::FsSize,
    ];

    /// The limit's conventional upper-case name.
    pub const fn name(self) -> &'static str {
        match self {
            Limit::Nproc => "NPROC",
            Limit::KernelStackSize => "KERNEL_STACK_SIZE",
            Limit::Ncpu => "NCPU",
            Limit::Nofile => "NOFILE",
            Limit::Nfile => "NFILE",
            Limit::Ninode => "NINODE",
            Limit::Ndev => "NDEV",
            Limit::RootDev => "ROOTDEV",
            Limit::MaxArg => "MAXARG",
            Limit::MaxOpBlocks => "MAXOPBLOCKS",
            Limit::LogSize => "LOGSIZE",
            Limit::Nbuf => "NBUF",
            Limit::FsSize => "FSSIZE",
        }
    }

    /// Slot of this limit in a capacity table.
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Look up a limit by name.
    pub fn from_name(name: &str) -> Option<Limit> {
        Self::ALL.iter().copied().find(|limit| limit.name() == name)
    }
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Limit {
    type Err = UnknownLimit;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Limit::from_name(s).ok_or(UnknownLimit)
    }
}
