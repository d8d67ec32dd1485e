//! Registry error types.

use core::fmt;

use crate::limit::Limit;

/// A capacity relationship the registry checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    /// The limit must be non-zero.
    Positive(Limit),
    /// `LOGSIZE == 3 * MAXOPBLOCKS`.
    LogHoldsThreeOps,
    /// `NBUF == 3 * MAXOPBLOCKS`.
    CacheHoldsThreeOps,
    /// `NOFILE <= NFILE`.
    ProcessFilesFitSystem,
    /// `ROOTDEV < NDEV`.
    RootDeviceInRange,
    /// `FSSIZE` is the size of the table's build variant.
    FsSizeMatchesVariant,
    /// `FSSIZE > LOGSIZE`.
    FsLargerThanLog,
    /// Kernel stacks are a whole number of pages.
    StackPageMultiple,
    /// `NPROC` kernel stacks fit in usable physical memory.
    StacksFitMemory,
    /// The file system keeps at least one data block after its metadata.
    FsHoldsMetadata,
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Relation::Positive(limit) => write!(f, "{} > 0", limit),
            Relation::LogHoldsThreeOps => write!(f, "LOGSIZE == 3 * MAXOPBLOCKS"),
            Relation::CacheHoldsThreeOps => write!(f, "NBUF == 3 * MAXOPBLOCKS"),
            Relation::ProcessFilesFitSystem => write!(f, "NOFILE <= NFILE"),
            Relation::RootDeviceInRange => write!(f, "ROOTDEV < NDEV"),
            Relation::FsSizeMatchesVariant => write!(f, "FSSIZE == variant size"),
            Relation::FsLargerThanLog => write!(f, "FSSIZE > LOGSIZE"),
            Relation::StackPageMultiple => write!(f, "KERNEL_STACK_SIZE % PAGE_SIZE == 0"),
            Relation::StacksFitMemory => {
                write!(f, "NPROC * KERNEL_STACK_SIZE <= usable memory")
            }
            Relation::FsHoldsMetadata => write!(f, "FSSIZE > metadata blocks"),
        }
    }
}

/// A declared capacity relationship does not hold.
///
/// Carries the violated [`Relation`] and the two sides as observed. Always
/// fatal: it means the build configuration is wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsistencyError {
    relation: Relation,
    left: usize,
    right: usize,
}

impl ConsistencyError {
    /// Create an error for `relation` with the observed left and right sides.
    pub const fn new(relation: Relation, left: usize, right: usize) -> Self {
        Self {
            relation,
            left,
            right,
        }
    }

    /// The relationship that failed.
    pub const fn relation(&self) -> Relation {
        self.relation
    }

    /// The observed `(left, right)` values.
    pub const fn observed(&self) -> (usize, usize) {
        (self.left, self.right)
    }
}

impl fmt::Display for ConsistencyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "capacity relation `{}` violated (observed {} vs {})",
            self.relation, self.left, self.right
        )
    }
}

/// A limit was requested by a name the registry does not define.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownLimit;

impl fmt::Display for UnknownLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown capacity limit")
    }
}
