//! Processor bring-up.
//!
//! Moves a processor from its flat, unprotected boot state to protected,
//! paged, write-protected mode:
//!
//! ```text
//! Unprotected -> ProtectedFlat -> ProtectedPaged -> ProtectedPagedWriteProtected
//! ```
//!
//! Each step checks its preconditions and refuses to run out of order.
//! There is no partial rollback; [`BringUp::restart`] resets the whole
//! sequence to `Unprotected`.
//!
//! The boot processor runs the sequence with [`BringUp::run`] and takes a
//! [`ModeSnapshot`]; every other processor copies that snapshot with
//! [`BringUp::replicate`] instead of deriving its own.

use core::fmt;

use super::control::{Cr0, Cr4};
use super::gdt::{Gdt, KERNEL_CODE_SELECTOR, KERNEL_DATA_SELECTOR};
use super::machine::Machine;
use crate::error::HardwareSequenceViolation;
use crate::memory::layout::{PhysAddr, VirtRange, PAGE_SIZE, PHYSICAL_TOP};
use crate::memory::paging::AddressSpace;

/// Processor addressing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Mode {
    Unprotected,
    ProtectedFlat,
    ProtectedPaged,
    ProtectedPagedWriteProtected,
}

impl Mode {
    /// The mode bring-up ends in.
    pub const TERMINAL: Mode = Mode::ProtectedPagedWriteProtected;

    pub const fn name(self) -> &'static str {
        match self {
            Mode::Unprotected => "unprotected",
            Mode::ProtectedFlat => "protected-flat",
            Mode::ProtectedPaged => "protected-paged",
            Mode::ProtectedPagedWriteProtected => "protected-paged-wp",
        }
    }

    /// The mode the next bring-up step leads to.
    pub const fn next(self) -> Option<Mode> {
        match self {
            Mode::Unprotected => Some(Mode::ProtectedFlat),
            Mode::ProtectedFlat => Some(Mode::ProtectedPaged),
            Mode::ProtectedPaged => Some(Mode::ProtectedPagedWriteProtected),
            Mode::ProtectedPagedWriteProtected => None,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What a processor's bring-up established.
///
/// Only [`BringUp`] hands these out. Subsystems read them; none of them
/// sets protection, paging or write-protect itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeFact {
    mode: Mode,
}

impl ModeFact {
    pub const fn mode(&self) -> Mode {
        self.mode
    }

    pub fn protection_enabled(&self) -> bool {
        self.mode >= Mode::ProtectedFlat
    }

    pub fn paging_enabled(&self) -> bool {
        self.mode >= Mode::ProtectedPaged
    }

    pub fn write_protect_enabled(&self) -> bool {
        self.mode >= Mode::ProtectedPagedWriteProtected
    }

    /// All three hold.
    pub fn is_complete(&self) -> bool {
        self.mode == Mode::TERMINAL
    }
}

/// The boot processor's final register state, copied onto every other
/// processor.
#[derive(Debug, Clone, Copy)]
pub struct ModeSnapshot<'a> {
    gdt: &'a Gdt,
    root: PhysAddr,
    cr0: Cr0,
    cr4: Cr4,
}

impl<'a> ModeSnapshot<'a> {
    pub fn gdt(&self) -> &'a Gdt {
        self.gdt
    }

    pub fn root(&self) -> PhysAddr {
        self.root
    }

    pub fn cr0(&self) -> Cr0 {
        self.cr0
    }

    pub fn cr4(&self) -> Cr4 {
        self.cr4
    }
}

/// Inputs for a full bring-up run.
#[derive(Clone, Copy)]
pub struct BootPlan<'a> {
    /// Table holding the flat kernel segments.
    pub gdt: &'a Gdt,
    /// Page tables to enable paging with.
    pub space: &'a dyn AddressSpace,
    /// Physical address of `space`'s root.
    pub root: PhysAddr,
    /// Ranges that must be read-only before write-protect goes on.
    pub read_only: &'a [VirtRange],
}

/// Drives one processor through bring-up.
pub struct BringUp<'m, 'a, M: Machine> {
    machine: &'m mut M,
    mode: Mode,
    gdt: Option<&'a Gdt>,
    space: Option<&'a dyn AddressSpace>,
    root: Option<PhysAddr>,
    read_only: &'a [VirtRange],
}

impl<'m, 'a, M: Machine> BringUp<'m, 'a, M> {
    /// Start in `Unprotected` mode.
    pub fn new(machine: &'m mut M) -> Self {
        Self {
            machine,
            mode: Mode::Unprotected,
            gdt: None,
            space: None,
            root: None,
            read_only: &[],
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn mode_fact(&self) -> ModeFact {
        ModeFact { mode: self.mode }
    }

    pub fn machine(&self) -> &M {
        &*self.machine
    }

    /// The installed page tables, if bring-up derived them itself.
    pub fn address_space(&self) -> Option<&'a dyn AddressSpace> {
        self.space
    }

    /// The installed page-table root.
    pub fn root(&self) -> Option<PhysAddr> {
        self.root
    }

    fn check_step(&self, expected: Mode) -> Result<(), HardwareSequenceViolation> {
        if self.machine.interrupts_enabled() {
            return Err(HardwareSequenceViolation::InterruptsEnabled);
        }
        if self.mode != expected {
            return Err(HardwareSequenceViolation::OutOfOrder {
                current: self.mode,
                expected,
            });
        }
        Ok(())
    }

    fn advance(&mut self, next: Mode) {
        log::debug!("[bringup] {} -> {}", self.mode, next);
        self.mode = next;
    }

    /// `Unprotected -> ProtectedFlat`.
    ///
    /// Loads `gdt`, sets PE, and reloads the segment registers with the
    /// kernel selectors.
    pub fn enter_protected_mode(&mut self, gdt: &'a Gdt) -> Result<(), HardwareSequenceViolation> {
        self.check_step(Mode::Unprotected)?;
        let selectors = gdt.kernel_selectors()?;

        // SAFETY: interrupts are masked and both kernel descriptors were
        // checked flat, so the reload keeps addressing unchanged.
        unsafe {
            self.machine.load_gdt(gdt);
            Cr0::PROTECTION_ENABLE.apply(&mut *self.machine);
            self.machine.load_segments(selectors.kernel_code, selectors.kernel_data);
        }

        self.gdt = Some(gdt);
        self.advance(Mode::ProtectedFlat);
        Ok(())
    }

    /// Point CR3 at `space` ahead of [`enable_paging`](Self::enable_paging).
    ///
    /// Sets CR4.PSE first when `space` has 4 MB entries. May be repeated
    /// while still in `ProtectedFlat`; the last call wins.
    pub fn install_page_table(&mut self, space: &'a dyn AddressSpace, root: PhysAddr) -> Result<(), HardwareSequenceViolation> {
        self.check_step(Mode::ProtectedFlat)?;
        check_root(root)?;

        // SAFETY: paging is still off, so neither write changes translation.
        unsafe {
            if space.uses_large_pages() {
                Cr4::PAGE_SIZE_EXTENSION.apply(&mut *self.machine);
            }
            self.machine.write_cr3(root);
        }

        self.space = Some(space);
        self.root = Some(root);
        log::debug!("[bringup] page table root {}", root);
        Ok(())
    }

    /// `ProtectedFlat -> ProtectedPaged`.
    ///
    /// The executing code must translate to its own address in the
    /// installed tables: the instruction after the CR0 write is fetched
    /// through them.
    pub fn enable_paging(&mut self) -> Result<(), HardwareSequenceViolation> {
        self.check_step(Mode::ProtectedFlat)?;
        let space = self.space.ok_or(HardwareSequenceViolation::NoPageTableRoot)?;

        if space.uses_large_pages() && !Cr4::PAGE_SIZE_EXTENSION.is_set_in(&*self.machine) {
            return Err(HardwareSequenceViolation::LargePagesWithoutPse);
        }

        let ip = self.machine.instruction_pointer();
        match space.translate(ip) {
            Some(t) if t.phys.as_u32() == ip.as_u32() => {}
            _ => return Err(HardwareSequenceViolation::ExecutingCodeUnmapped(ip)),
        }

        // SAFETY: CR3 holds a checked root that identity-maps the next fetch.
        unsafe { Cr0::PAGING.apply(&mut *self.machine) };

        self.advance(Mode::ProtectedPaged);
        Ok(())
    }

    /// `ProtectedPaged -> ProtectedPagedWriteProtected`.
    ///
    /// Every page of every range in `read_only` must already be mapped
    /// read-only.
    pub fn enable_write_protect(&mut self, read_only: &'a [VirtRange]) -> Result<(), HardwareSequenceViolation> {
        self.check_step(Mode::ProtectedPaged)?;
        let space = self.space.ok_or(HardwareSequenceViolation::NoPageTableRoot)?;
        check_read_only(space, read_only)?;

        // SAFETY: paging is on and the read-only ranges were checked above.
        unsafe { Cr0::WRITE_PROTECT.apply(&mut *self.machine) };

        self.read_only = read_only;
        self.advance(Mode::ProtectedPagedWriteProtected);
        Ok(())
    }

    /// Run the whole sequence.
    pub fn run(&mut self, plan: &BootPlan<'a>) -> Result<ModeFact, HardwareSequenceViolation> {
        self.enter_protected_mode(plan.gdt)?;
        self.install_page_table(plan.space, plan.root)?;
        self.enable_paging()?;
        self.enable_write_protect(plan.read_only)?;

        log::info!("[bringup] processor in {} mode, cr3={}", self.mode, plan.root);
        Ok(self.mode_fact())
    }

    /// Replace the active page tables once paging is on.
    ///
    /// The new space must map the executing code to the same physical
    /// address the current space does. If write-protect is on, the
    /// read-only ranges recorded when it was enabled must stay read-only.
    pub fn switch_address_space(&mut self, space: &'a dyn AddressSpace, root: PhysAddr) -> Result<(), HardwareSequenceViolation> {
        if self.machine.interrupts_enabled() {
            return Err(HardwareSequenceViolation::InterruptsEnabled);
        }
        if self.mode < Mode::ProtectedPaged {
            return Err(HardwareSequenceViolation::OutOfOrder {
                current: self.mode,
                expected: Mode::ProtectedPaged,
            });
        }
        check_root(root)?;

        // The next fetch goes through the new tables and must land on the
        // same physical bytes it would have under the current ones.
        let ip = self.machine.instruction_pointer();
        let current = self.space.and_then(|s| s.translate(ip)).map(|t| t.phys);
        match space.translate(ip) {
            Some(t) if Some(t.phys) == current => {}
            _ => return Err(HardwareSequenceViolation::ExecutingCodeUnmapped(ip)),
        }
        if self.mode == Mode::ProtectedPagedWriteProtected {
            check_read_only(space, self.read_only)?;
        }

        // SAFETY: the new tables map the executing code and keep every
        // protected range read-only.
        unsafe {
            if space.uses_large_pages() {
                Cr4::PAGE_SIZE_EXTENSION.apply(&mut *self.machine);
            }
            self.machine.write_cr3(root);
        }

        self.space = Some(space);
        self.root = Some(root);
        log::debug!("[bringup] switched page table root to {}", root);
        Ok(())
    }

    /// Warm restart: back to `Unprotected` from any mode.
    ///
    /// Clears WP and PG together, then PE and PSE, zeroes CR3 and forgets
    /// the installed tables, so a following run starts from nothing.
    pub fn restart(&mut self) {
        log::warn!("[bringup] warm restart from {}", self.mode);

        // SAFETY: warm restart runs from identity-mapped trampoline code.
        unsafe {
            (Cr0::PAGING | Cr0::WRITE_PROTECT).clear_from(&mut *self.machine);
            Cr0::PROTECTION_ENABLE.clear_from(&mut *self.machine);
            Cr4::PAGE_SIZE_EXTENSION.clear_from(&mut *self.machine);
            self.machine.write_cr3(PhysAddr::zero());
        }

        self.gdt = None;
        self.space = None;
        self.root = None;
        self.read_only = &[];
        self.mode = Mode::Unprotected;
    }

    /// This processor's final state, for [`replicate`](Self::replicate).
    pub fn snapshot(&self) -> Result<ModeSnapshot<'a>, HardwareSequenceViolation> {
        let out_of_order = HardwareSequenceViolation::OutOfOrder {
            current: self.mode,
            expected: Mode::TERMINAL,
        };
        if self.mode != Mode::TERMINAL {
            return Err(out_of_order);
        }

        Ok(ModeSnapshot {
            gdt: self.gdt.ok_or(out_of_order)?,
            root: self.root.ok_or(HardwareSequenceViolation::NoPageTableRoot)?,
            cr0: self.machine.read_cr0() & Cr0::all(),
            cr4: self.machine.read_cr4() & Cr4::all(),
        })
    }

    /// Bring this processor to the snapshot's mode.
    ///
    /// Applies the boot processor's values in the same order it did, and
    /// walks the same modes, but does not re-check the page tables: they are
    /// the boot processor's and were checked there.
    pub fn replicate(&mut self, snapshot: &ModeSnapshot<'a>) -> Result<ModeFact, HardwareSequenceViolation> {
        self.check_step(Mode::Unprotected)?;
        let selectors = snapshot.gdt.kernel_selectors()?;

        // SAFETY: every value comes from a processor that completed the
        // checked sequence with the same tables.
        unsafe {
            self.machine.load_gdt(snapshot.gdt);
            (snapshot.cr0 & Cr0::PROTECTION_ENABLE).apply(&mut *self.machine);
            self.machine.load_segments(selectors.kernel_code, selectors.kernel_data);
        }
        self.gdt = Some(snapshot.gdt);
        self.advance(Mode::ProtectedFlat);

        // SAFETY: the root and CR4 bits are the ones the boot processor
        // enabled paging with, and those tables identity-map the code
        // running here.
        unsafe {
            snapshot.cr4.apply(&mut *self.machine);
            self.machine.write_cr3(snapshot.root);
            (snapshot.cr0 & Cr0::PAGING).apply(&mut *self.machine);
        }
        self.root = Some(snapshot.root);
        self.advance(Mode::ProtectedPaged);

        // SAFETY: paging is on with the boot processor's tables, whose
        // read-only ranges were checked before it set WP.
        unsafe { (snapshot.cr0 & Cr0::WRITE_PROTECT).apply(&mut *self.machine) };
        self.advance(Mode::ProtectedPagedWriteProtected);

        log::info!("[bringup] replicated boot processor mode, cr3={}", snapshot.root);
        Ok(self.mode_fact())
    }
}

fn check_root(root: PhysAddr) -> Result<(), HardwareSequenceViolation> {
    if root.is_zero() || !root.is_aligned(PAGE_SIZE) || root.as_u32() >= PHYSICAL_TOP {
        return Err(HardwareSequenceViolation::InvalidRoot(root));
    }
    Ok(())
}

fn check_read_only(space: &dyn AddressSpace, read_only: &[VirtRange]) -> Result<(), HardwareSequenceViolation> {
    for page in read_only.iter().flat_map(VirtRange::pages) {
        match space.translate(page) {
            None => return Err(HardwareSequenceViolation::ReadOnlyPageUnmapped(page)),
            Some(t) if t.writable => return Err(HardwareSequenceViolation::WritableReadOnlyPage(page)),
            Some(_) => {}
        }
    }
    Ok(())
}

// Kernel selectors are fixed; replication relies on them matching the
// table's own slots.
const _: () = assert!(KERNEL_CODE_SELECTOR.bits() >> 3 == super::gdt::SEG_KCODE);
const _: () = assert!(KERNEL_DATA_SELECTOR.bits() >> 3 == super::gdt::SEG_KDATA);
