//! Boot page directory.
//!
//! 32-bit two-level paging, but the boot directory only ever holds 4 MB
//! (PSE) entries so it needs no second-level tables and no allocator. The
//! virtual-memory manager builds its fine-grained tables later and installs
//! them through the same [`AddressSpace`] contract.

use core::fmt;

pub use x86::bits32::paging::{PDEntry, PDFlags};
use x86::bits32::paging::PAddr;

use super::layout::{PhysAddr, VirtAddr, KERNEL_BASE, LARGE_PAGE_SIZE};

/// Number of entries in a page directory.
pub const ENTRY_COUNT: usize = 1024;

const LARGE_FRAME_MASK: u32 = !(LARGE_PAGE_SIZE - 1);

/// Result of translating a virtual address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Translation {
    pub phys: PhysAddr,
    pub writable: bool,
}

/// A page-table hierarchy the processor can be pointed at.
///
/// The bring-up controller checks its preconditions (the executing code is
/// mapped, read-only ranges are read-only) through this trait rather than by
/// walking tables itself.
pub trait AddressSpace {
    /// Where `addr` lands once this space is active, if anywhere.
    fn translate(&self, addr: VirtAddr) -> Option<Translation>;

    /// Whether any mapping needs CR4.PSE.
    fn uses_large_pages(&self) -> bool;
}

/// Mapping errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapError {
    /// Address not aligned to a 4 MB boundary.
    Misaligned(u32),
    /// The slot already holds a present entry.
    AlreadyMapped(VirtAddr),
    /// The range runs past the end of the address space.
    Overflow,
}

impl fmt::Display for MapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapError::Misaligned(addr) => write!(f, "address {:#010x} not 4 MB aligned", addr),
            MapError::AlreadyMapped(va) => write!(f, "remap of {}", va),
            MapError::Overflow => write!(f, "range wraps the address space"),
        }
    }
}

/// Present, writable 4 MB mapping of physical frame 0.
const LOW_IDENTITY: PDEntry = PDEntry(PDFlags::P.bits() | PDFlags::RW.bits() | PDFlags::PS.bits());

/// Present and mapping a 4 MB page rather than a page table.
fn is_large(entry: &PDEntry) -> bool {
    entry.flags().contains(PDFlags::P | PDFlags::PS)
}

/// Physical frame a large entry maps.
fn large_frame(entry: PDEntry) -> Option<PhysAddr> {
    is_large(&entry).then(|| PhysAddr::new(entry.address().as_u32()))
}

/// A page directory holding 4 MB mappings only.
#[repr(C, align(4096))]
#[derive(Clone)]
pub struct BootPageDirectory {
    entries: [PDEntry; ENTRY_COUNT],
}

impl BootPageDirectory {
    /// Create an empty directory.
    pub const fn new() -> Self {
        Self {
            entries: [PDEntry(0); ENTRY_COUNT],
        }
    }

    /// The directory paging is first enabled with.
    ///
    /// Maps virtual `[0, 4 MB)` and `[KERNEL_BASE, KERNEL_BASE + 4 MB)` to
    /// physical `[0, 4 MB)`. The low mapping keeps the code that turns
    /// paging on addressable at the same place afterwards.
    pub const fn entry() -> Self {
        let mut dir = Self::new();
        dir.entries[0] = LOW_IDENTITY;
        dir.entries[(KERNEL_BASE >> 22) as usize] = LOW_IDENTITY;
        dir
    }

    /// Map the 4 MB page at `va` to `pa`.
    pub fn map_large(&mut self, va: VirtAddr, pa: PhysAddr, flags: PDFlags) -> Result<(), MapError> {
        if !va.is_aligned(LARGE_PAGE_SIZE) {
            return Err(MapError::Misaligned(va.as_u32()));
        }
        if !pa.is_aligned(LARGE_PAGE_SIZE) {
            return Err(MapError::Misaligned(pa.as_u32()));
        }

        let slot = &mut self.entries[va.page_directory_index()];
        if slot.is_present() {
            return Err(MapError::AlreadyMapped(va));
        }
        *slot = PDEntry::new(PAddr(pa.as_u32()), flags | PDFlags::P | PDFlags::PS);
        Ok(())
    }

    /// Map `len` bytes starting at `va` to `pa`, rounded up to 4 MB pages.
    ///
    /// On error, entries mapped by this call are left in place.
    pub fn map_range(&mut self, va: VirtAddr, pa: PhysAddr, len: u32, flags: PDFlags) -> Result<(), MapError> {
        let pages = len.div_ceil(LARGE_PAGE_SIZE);
        for page in 0..pages {
            let offset = page.checked_mul(LARGE_PAGE_SIZE).ok_or(MapError::Overflow)?;
            let va = va.as_u32().checked_add(offset).ok_or(MapError::Overflow)?;
            let pa = pa.as_u32().checked_add(offset).ok_or(MapError::Overflow)?;
            self.map_large(VirtAddr::new(va), PhysAddr::new(pa), flags)?;
        }
        Ok(())
    }

    /// Remove the mapping covering `va`, returning the old entry.
    pub fn unmap(&mut self, va: VirtAddr) -> Option<PDEntry> {
        let slot = &mut self.entries[va.page_directory_index()];
        if !slot.is_present() {
            return None;
        }
        Some(core::mem::replace(slot, PDEntry(0)))
    }

    /// Remove every mapping.
    pub fn clear(&mut self) {
        self.entries.fill(PDEntry(0));
    }

    /// Entry covering `va`.
    pub fn entry_for(&self, va: VirtAddr) -> PDEntry {
        self.entries[va.page_directory_index()]
    }

    /// Number of present entries.
    pub fn mapped_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_present()).count()
    }
}

impl Default for BootPageDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for BootPageDirectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_map();
        for (index, entry) in self.entries.iter().enumerate().filter(|(_, e)| e.is_present()) {
            list.entry(&(index << 22), entry);
        }
        list.finish()
    }
}

impl AddressSpace for BootPageDirectory {
    fn translate(&self, addr: VirtAddr) -> Option<Translation> {
        let entry = self.entry_for(addr);
        let frame = large_frame(entry)?;
        Some(Translation {
            phys: PhysAddr::new(frame.as_u32() | (addr.as_u32() & !LARGE_FRAME_MASK)),
            writable: entry.is_writeable(),
        })
    }

    fn uses_large_pages(&self) -> bool {
        self.entries.iter().any(is_large)
    }
}
