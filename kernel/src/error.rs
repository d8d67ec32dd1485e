//! Boot error types.
//!
//! Both kinds are fatal: the boot path logs them and halts the processor.

use core::fmt;

use params::ConsistencyError;

use crate::arch::bringup::Mode;
use crate::arch::gdt::SegmentSelector;
use crate::memory::layout::{PhysAddr, VirtAddr};

/// A bring-up precondition was violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HardwareSequenceViolation {
    /// A step ran with interrupts enabled.
    InterruptsEnabled,
    /// A step was attempted from the wrong mode.
    OutOfOrder { current: Mode, expected: Mode },
    /// A kernel segment descriptor is not flat ring 0.
    NonFlatKernelSegment { selector: SegmentSelector },
    /// Paging was requested before a page-table root was installed.
    NoPageTableRoot,
    /// The page-table root is zero, unaligned, or outside physical memory.
    InvalidRoot(PhysAddr),
    /// The page tables use 4 MB pages but CR4.PSE is clear.
    LargePagesWithoutPse,
    /// The executing code would not be mapped at the same address.
    ExecutingCodeUnmapped(VirtAddr),
    /// A page declared read-only is not mapped.
    ReadOnlyPageUnmapped(VirtAddr),
    /// A page declared read-only is mapped writable.
    WritableReadOnlyPage(VirtAddr),
    /// A secondary processor started before the boot processor finished.
    BarrierNotReleased,
    /// The boot processor published its mode twice.
    AlreadyPublished,
    /// More processors tried to come online than the registry allows.
    TooManyCpus { limit: usize },
}

impl fmt::Display for HardwareSequenceViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InterruptsEnabled => write!(f, "bring-up step ran with interrupts enabled"),
            Self::OutOfOrder { current, expected } => {
                write!(f, "out of order: current={}, expected={}", current, expected)
            }
            Self::NonFlatKernelSegment { selector } => {
                write!(f, "kernel segment {:#x} is not flat ring 0", selector.bits())
            }
            Self::NoPageTableRoot => write!(f, "paging enabled with no page-table root"),
            Self::InvalidRoot(root) => write!(f, "invalid page-table root {}", root),
            Self::LargePagesWithoutPse => write!(f, "4 MB pages with CR4.PSE clear"),
            Self::ExecutingCodeUnmapped(ip) => write!(f, "executing code at {} not mapped in place", ip),
            Self::ReadOnlyPageUnmapped(va) => write!(f, "read-only page {} not mapped", va),
            Self::WritableReadOnlyPage(va) => write!(f, "read-only page {} mapped writable", va),
            Self::BarrierNotReleased => write!(f, "boot processor has not finished bring-up"),
            Self::AlreadyPublished => write!(f, "boot processor mode already published"),
            Self::TooManyCpus { limit } => write!(f, "more than {} processors", limit),
        }
    }
}

/// Any fatal boot failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootError {
    Sequence(HardwareSequenceViolation),
    Consistency(ConsistencyError),
}

impl From<HardwareSequenceViolation> for BootError {
    fn from(err: HardwareSequenceViolation) -> Self {
        BootError::Sequence(err)
    }
}

impl From<ConsistencyError> for BootError {
    fn from(err: ConsistencyError) -> Self {
        BootError::Consistency(err)
    }
}

impl fmt::Display for BootError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BootError::Sequence(err) => write!(f, "hardware sequence violation: {}", err),
            BootError::Consistency(err) => write!(f, "{}", err),
        }
    }
}
