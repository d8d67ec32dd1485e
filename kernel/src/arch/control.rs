//! Control-register flags.
//!
//! Bits are only ever combined as these typed sets and written with
//! [`Cr0::apply`] / [`Cr4::apply`], which read the register first so bits
//! this module does not name keep whatever value the processor gave them.

use bitflags::bitflags;

use super::machine::Machine;

bitflags! {
    /// CR0 bits driven during bring-up.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Cr0: u32 {
        /// Protection Enable: segment-based protection checking.
        const PROTECTION_ENABLE = 0x0000_0001;
        /// Write Protect: ring 0 honours read-only pages.
        const WRITE_PROTECT = 0x0001_0000;
        /// Paging: translate through the page directory in CR3.
        const PAGING = 0x8000_0000;
    }
}

bitflags! {
    /// CR4 bits driven during bring-up.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Cr4: u32 {
        /// Page Size Extension: 4 MB pages.
        const PAGE_SIZE_EXTENSION = 0x0000_0010;
    }
}

impl Cr0 {
    /// Set these bits in CR0.
    ///
    /// # Safety
    ///
    /// The caller must satisfy the processor's preconditions for every bit
    /// being set (a loaded GDT for PE, a valid CR3 for PG).
    pub unsafe fn apply<M: Machine + ?Sized>(self, machine: &mut M) {
        let current = machine.read_cr0();
        unsafe { machine.write_cr0(current | self) }
    }

    /// Clear these bits in CR0.
    ///
    /// # Safety
    ///
    /// Clearing PE or PG changes how the next instruction is fetched; the
    /// caller must be executing from identity-mapped memory.
    pub unsafe fn clear_from<M: Machine + ?Sized>(self, machine: &mut M) {
        let current = machine.read_cr0();
        unsafe { machine.write_cr0(current.difference(self)) }
    }

    /// Whether every bit in `self` is currently set.
    pub fn is_set_in<M: Machine + ?Sized>(self, machine: &M) -> bool {
        machine.read_cr0().contains(self)
    }
}

impl Cr4 {
    /// Set these bits in CR4.
    ///
    /// # Safety
    ///
    /// See [`Cr0::apply`].
    pub unsafe fn apply<M: Machine + ?Sized>(self, machine: &mut M) {
        let current = machine.read_cr4();
        unsafe { machine.write_cr4(current | self) }
    }

    /// Clear these bits in CR4.
    ///
    /// # Safety
    ///
    /// Must not clear PSE while an active page directory holds 4 MB entries.
    pub unsafe fn clear_from<M: Machine + ?Sized>(self, machine: &mut M) {
        let current = machine.read_cr4();
        unsafe { machine.write_cr4(current.difference(self)) }
    }

    pub fn is_set_in<M: Machine + ?Sized>(self, machine: &M) -> bool {
        machine.read_cr4().contains(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::mock::MockMachine;

    #[test]
    fn test_masks_do_not_overlap() {
        let named = [Cr0::PROTECTION_ENABLE, Cr0::WRITE_PROTECT, Cr0::PAGING];
        let combined = named.iter().fold(0u32, |acc, f| acc | f.bits());
        assert_eq!(combined.count_ones(), 3);
        assert_eq!(Cr0::all().bits(), 0x8001_0001);
        assert_eq!(Cr4::PAGE_SIZE_EXTENSION.bits(), 0x10);
    }

    #[test]
    fn test_apply_preserves_unnamed_bits() {
        let mut machine = MockMachine::new();
        let before = machine.cr0.bits();

        unsafe { Cr0::PROTECTION_ENABLE.apply(&mut machine) };
        assert_eq!(machine.cr0.bits(), before | 0x1);
        assert!(Cr0::PROTECTION_ENABLE.is_set_in(&machine));
        assert!(!Cr0::PAGING.is_set_in(&machine));

        unsafe { Cr0::PROTECTION_ENABLE.clear_from(&mut machine) };
        assert_eq!(machine.cr0.bits(), before);
    }

    #[test]
    fn test_cr4_apply_and_clear() {
        let mut machine = MockMachine::new();
        unsafe { Cr4::PAGE_SIZE_EXTENSION.apply(&mut machine) };
        assert!(Cr4::PAGE_SIZE_EXTENSION.is_set_in(&machine));
        unsafe { Cr4::PAGE_SIZE_EXTENSION.clear_from(&mut machine) };
        assert!(!Cr4::PAGE_SIZE_EXTENSION.is_set_in(&machine));
    }
}
