//! The hardware seam.
//!
//! Everything bring-up does to the processor goes through [`Machine`]. The
//! x86 backend issues the real instructions; tests drive a recording model.

use super::control::{Cr0, Cr4};
use super::gdt::{Gdt, SegmentSelector};
use crate::memory::layout::{PhysAddr, VirtAddr};

/// Privileged processor state touched during bring-up.
pub trait Machine {
    /// Whether maskable interrupts are enabled.
    fn interrupts_enabled(&self) -> bool;

    /// Mask interrupts on this processor.
    fn disable_interrupts(&mut self);

    fn read_cr0(&self) -> Cr0;

    /// # Safety
    ///
    /// Changing PE, PG or WP changes how every following instruction is
    /// fetched and checked.
    unsafe fn write_cr0(&mut self, value: Cr0);

    fn read_cr4(&self) -> Cr4;

    /// # Safety
    ///
    /// See [`write_cr0`](Self::write_cr0).
    unsafe fn write_cr4(&mut self, value: Cr4);

    fn read_cr3(&self) -> PhysAddr;

    /// Point the processor at a page directory.
    ///
    /// # Safety
    ///
    /// `root` must be the physical address of a page directory that stays
    /// live while it is installed.
    unsafe fn write_cr3(&mut self, root: PhysAddr);

    /// Load `gdt` into GDTR.
    ///
    /// # Safety
    ///
    /// `gdt` must not move or be dropped while the processor uses it.
    unsafe fn load_gdt(&mut self, gdt: &Gdt);

    /// Reload CS with `code` and DS, ES, SS with `data`.
    ///
    /// # Safety
    ///
    /// Both selectors must reference descriptors in the loaded GDT that
    /// cover the executing code and stack.
    unsafe fn load_segments(&mut self, code: SegmentSelector, data: SegmentSelector);

    /// Address of the instruction currently executing.
    fn instruction_pointer(&self) -> VirtAddr;

    /// Stop this processor for good.
    fn halt(&mut self) -> !;
}
