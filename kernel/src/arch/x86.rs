//! The real processor.
//!
//! Control registers, descriptor tables, segment reloads and interrupt
//! masking go through the `x86` crate. Only the instruction-pointer read
//! has no wrapper there.

use core::arch::asm;

use x86::bits32::eflags::{self, EFlags};
use x86::bits32::segmentation::load_cs;
use x86::controlregs;
use x86::dtables::lgdt;
use x86::segmentation::{load_ds, load_es, load_fs, load_gs, load_ss};

use super::control::{Cr0, Cr4};
use super::gdt::{Gdt, SegmentSelector};
use super::machine::Machine;
use crate::memory::layout::{PhysAddr, VirtAddr};

/// The executing 32-bit x86 processor.
pub struct X86Machine {
    _private: (),
}

impl X86Machine {
    /// # Safety
    ///
    /// At most one `X86Machine` may exist per processor, and it must be
    /// created by code running in ring 0.
    pub const unsafe fn new() -> Self {
        Self { _private: () }
    }
}

impl Machine for X86Machine {
    fn interrupts_enabled(&self) -> bool {
        // SAFETY: reading EFLAGS has no side effects.
        unsafe { eflags::read() }.contains(EFlags::FLAGS_IF)
    }

    fn disable_interrupts(&mut self) {
        // SAFETY: we run in ring 0.
        unsafe { x86::irq::disable() };
    }

    fn read_cr0(&self) -> Cr0 {
        // SAFETY: ring 0; the read has no side effects.
        let value = unsafe { controlregs::cr0() };
        Cr0::from_bits_retain(value.bits() as u32)
    }

    unsafe fn write_cr0(&mut self, value: Cr0) {
        let value = controlregs::Cr0::from_bits_truncate(value.bits() as usize);
        unsafe { controlregs::cr0_write(value) };
    }

    fn read_cr4(&self) -> Cr4 {
        // SAFETY: ring 0; the read has no side effects.
        let value = unsafe { controlregs::cr4() };
        Cr4::from_bits_retain(value.bits() as u32)
    }

    unsafe fn write_cr4(&mut self, value: Cr4) {
        let value = controlregs::Cr4::from_bits_truncate(value.bits() as usize);
        unsafe { controlregs::cr4_write(value) };
    }

    fn read_cr3(&self) -> PhysAddr {
        // SAFETY: ring 0; the read has no side effects.
        PhysAddr::new(unsafe { controlregs::cr3() } as u32)
    }

    unsafe fn write_cr3(&mut self, root: PhysAddr) {
        unsafe { controlregs::cr3_write(u64::from(root.as_u32())) };
    }

    unsafe fn load_gdt(&mut self, gdt: &Gdt) {
        unsafe { lgdt(&gdt.pointer()) };
    }

    unsafe fn load_segments(&mut self, code: SegmentSelector, data: SegmentSelector) {
        let null = SegmentSelector::from_raw(0);
        unsafe {
            load_ds(data);
            load_es(data);
            load_ss(data);
            load_fs(null);
            load_gs(null);
            load_cs(code);
        }
    }

    fn instruction_pointer(&self) -> VirtAddr {
        let ip: u32;
        // SAFETY: the call pushes the return address, which is popped at once.
        unsafe { asm!("call 55f", "55:", "pop {}", out(reg) ip, options(preserves_flags)) };
        VirtAddr::new(ip)
    }

    fn halt(&mut self) -> ! {
        loop {
            // SAFETY: ring 0; with interrupts masked nothing resumes us.
            unsafe {
                x86::irq::disable();
                x86::halt();
            }
        }
    }
}
