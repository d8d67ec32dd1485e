//! Physical and virtual memory layout.
//!
//! The kernel is linked at [`KERNEL_LINK`] and runs in the upper half of the
//! 32-bit address space once paging is on; physical memory below
//! [`PHYSICAL_TOP`] is mapped at `KERNEL_BASE + pa`.

use core::fmt;
use core::ops::Range;

/// Start of extended memory.
pub const EXTENDED_MEMORY: u32 = 0x0010_0000;

/// Top of usable physical memory.
pub const PHYSICAL_TOP: u32 = 0x0E00_0000;

/// Memory-mapped devices live above this address.
pub const DEVICE_SPACE: u32 = 0xFE00_0000;

/// First kernel virtual address.
pub const KERNEL_BASE: u32 = 0x8000_0000;

/// Address the kernel is linked at.
pub const KERNEL_LINK: u32 = KERNEL_BASE + EXTENDED_MEMORY;

/// Page size (4 KB).
pub const PAGE_SIZE: u32 = 4096;

/// Large page size (4 MB, needs PSE).
pub const LARGE_PAGE_SIZE: u32 = 4 * 1024 * 1024;

/// Offset of the page directory index in a linear address.
pub const PAGE_DIRECTORY_INDEX_SHIFT: u32 = 22;

/// Offset of the page table index in a linear address.
pub const PAGE_TABLE_INDEX_SHIFT: u32 = 12;

/// A physical address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct PhysAddr(u32);

/// A virtual (linear) address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct VirtAddr(u32);

impl PhysAddr {
    pub const fn new(addr: u32) -> Self {
        Self(addr)
    }

    pub const fn zero() -> Self {
        Self(0)
    }

    pub const fn as_u32(self) -> u32 {
        self.0
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub const fn is_aligned(self, align: u32) -> bool {
        self.0 & (align - 1) == 0
    }

    /// Kernel virtual address this physical address is mapped at.
    pub const fn to_virt(self) -> VirtAddr {
        VirtAddr(self.0.wrapping_add(KERNEL_BASE))
    }
}

impl VirtAddr {
    pub const fn new(addr: u32) -> Self {
        Self(addr)
    }

    pub const fn as_u32(self) -> u32 {
        self.0
    }

    pub const fn is_aligned(self, align: u32) -> bool {
        self.0 & (align - 1) == 0
    }

    /// Physical address behind a kernel virtual address.
    pub const fn to_phys(self) -> PhysAddr {
        PhysAddr(self.0.wrapping_sub(KERNEL_BASE))
    }

    /// Index of this address's entry in a page directory.
    pub const fn page_directory_index(self) -> usize {
        ((self.0 >> PAGE_DIRECTORY_INDEX_SHIFT) & 0x3FF) as usize
    }

    /// Index of this address's entry in a page table.
    pub const fn page_table_index(self) -> usize {
        ((self.0 >> PAGE_TABLE_INDEX_SHIFT) & 0x3FF) as usize
    }
}

impl fmt::Display for PhysAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

impl fmt::Display for VirtAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

/// Physical address of a kernel object at `va`.
///
/// Before paging the kernel still runs at its load address, where virtual
/// and physical addresses coincide; afterwards it runs above `KERNEL_BASE`.
pub const fn kernel_phys(va: VirtAddr) -> PhysAddr {
    if va.0 >= KERNEL_BASE {
        va.to_phys()
    } else {
        PhysAddr(va.0)
    }
}

/// Rounds up to the nearest page.
pub const fn page_round_up(addr: u32) -> u32 {
    addr.wrapping_add(PAGE_SIZE - 1) & !(PAGE_SIZE - 1)
}

/// Rounds down to the nearest page.
pub const fn page_round_down(addr: u32) -> u32 {
    addr & !(PAGE_SIZE - 1)
}

/// A half-open range of virtual addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirtRange {
    start: VirtAddr,
    end: VirtAddr,
}

impl VirtRange {
    pub const fn new(start: VirtAddr, end: VirtAddr) -> Self {
        Self { start, end }
    }

    pub const fn start(&self) -> VirtAddr {
        self.start
    }

    pub const fn end(&self) -> VirtAddr {
        self.end
    }

    pub const fn is_empty(&self) -> bool {
        self.end.0 <= self.start.0
    }

    /// Start address of every page the range touches.
    pub fn pages(&self) -> impl Iterator<Item = VirtAddr> {
        let pages: Range<u32> = page_round_down(self.start.0)..self.end.0;
        pages.step_by(PAGE_SIZE as usize).map(VirtAddr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_rounding() {
        assert_eq!(page_round_up(0), 0);
        assert_eq!(page_round_up(1), PAGE_SIZE);
        assert_eq!(page_round_up(PAGE_SIZE), PAGE_SIZE);
        assert_eq!(page_round_down(PAGE_SIZE + 7), PAGE_SIZE);
    }

    #[test]
    fn test_kernel_mapping() {
        let link = VirtAddr::new(KERNEL_LINK);
        assert_eq!(link.to_phys(), PhysAddr::new(EXTENDED_MEMORY));
        assert_eq!(PhysAddr::new(EXTENDED_MEMORY).to_virt(), link);
    }

    #[test]
    fn test_kernel_phys() {
        assert_eq!(kernel_phys(VirtAddr::new(KERNEL_LINK + 0x3000)), PhysAddr::new(EXTENDED_MEMORY + 0x3000));
        assert_eq!(kernel_phys(VirtAddr::new(EXTENDED_MEMORY + 0x3000)), PhysAddr::new(EXTENDED_MEMORY + 0x3000));
    }

    #[test]
    fn test_indices() {
        let va = VirtAddr::new(KERNEL_BASE + 0x0040_3000);
        assert_eq!(va.page_directory_index(), 513);
        assert_eq!(va.page_table_index(), 3);
    }

    #[test]
    fn test_range_pages() {
        let range = VirtRange::new(VirtAddr::new(0x1800), VirtAddr::new(0x4000));
        let mut pages = range.pages();
        assert_eq!(pages.next(), Some(VirtAddr::new(0x1000)));
        assert_eq!(pages.next(), Some(VirtAddr::new(0x2000)));
        assert_eq!(pages.next(), Some(VirtAddr::new(0x3000)));
        assert_eq!(pages.next(), None);

        let empty = VirtRange::new(VirtAddr::new(0x4000), VirtAddr::new(0x4000));
        assert!(empty.is_empty());
        assert_eq!(empty.pages().count(), 0);
    }
}
