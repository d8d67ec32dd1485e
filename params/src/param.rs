//! Build-time capacity constants.
//!
//! The registry is populated from these values. Subsystems should read
//! limits through a validated [`Capacities`](crate::Capacities) instead of
//! importing the constants directly.

/// Maximum number of processes.
pub const NPROC: usize = 64;

/// Size of each per-process kernel stack in bytes.
pub const KERNEL_STACK_SIZE: usize = 16384;

/// Maximum number of CPUs.
pub const NCPU: usize = 8;

/// Open files per process.
pub const NOFILE: usize = 16;

/// Open files per system.
pub const NFILE: usize = 100;

/// Maximum number of active in-memory inodes.
pub const NINODE: usize = 50;

/// Maximum major device number.
pub const NDEV: usize = 10;

/// Device number of the file-system root disk.
pub const ROOTDEV: usize = 1;

/// Maximum exec arguments.
pub const MAXARG: usize = 32;

/// Maximum number of blocks any single file-system operation writes.
pub const MAXOPBLOCKS: usize = 10;

/// Maximum data blocks in the on-disk log.
pub const LOGSIZE: usize = MAXOPBLOCKS * 3;

/// Size of the disk block cache.
pub const NBUF: usize = MAXOPBLOCKS * 3;

/// File-system size in blocks for the default build.
pub const FSSIZE_DEFAULT: usize = 1000;

/// File-system size in blocks for the extended build.
pub const FSSIZE_EXTENDED: usize = 2000;

/// File-system size in blocks for this build.
#[cfg(feature = "extended-fs")]
pub const FSSIZE: usize = FSSIZE_EXTENDED;

/// File-system size in blocks for this build.
#[cfg(not(feature = "extended-fs"))]
pub const FSSIZE: usize = FSSIZE_DEFAULT;

const _: () = assert!(LOGSIZE == 3 * MAXOPBLOCKS);
const _: () = assert!(NBUF == 3 * MAXOPBLOCKS);
const _: () = assert!(NOFILE <= NFILE);
const _: () = assert!(ROOTDEV < NDEV);
const _: () = assert!(FSSIZE_DEFAULT > LOGSIZE && FSSIZE_EXTENDED > LOGSIZE);
