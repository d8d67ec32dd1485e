//! Global Descriptor Table (GDT) setup.
//!
//! The kernel runs with flat segments: every descriptor has base 0 and a
//! 4 GB limit, so segmentation is a no-op and isolation comes from paging.
//! Descriptors are encoded by the `x86` crate; this module only decides
//! which ones go in which slot and checks the kernel slots before use.

use x86::dtables::DescriptorTablePointer;
use x86::segmentation::{
    BuildDescriptor, CodeSegmentType, DataSegmentType, Descriptor, DescriptorBuilder, SegmentDescriptorBuilder,
};
pub use x86::segmentation::SegmentSelector;
pub use x86::Ring;

use crate::error::HardwareSequenceViolation;

/// Kernel code segment index.
pub const SEG_KCODE: u16 = 1;

/// Kernel data and stack segment index.
pub const SEG_KDATA: u16 = 2;

/// User code segment index.
pub const SEG_UCODE: u16 = 3;

/// User data and stack segment index.
pub const SEG_UDATA: u16 = 4;

/// Task state segment index. Filled in by the scheduler.
pub const SEG_TSS: u16 = 5;

/// Number of GDT slots.
pub const NSEGS: usize = 6;

/// Kernel code selector (0x08).
pub const KERNEL_CODE_SELECTOR: SegmentSelector = SegmentSelector::new(SEG_KCODE, Ring::Ring0);

/// Kernel data selector (0x10).
pub const KERNEL_DATA_SELECTOR: SegmentSelector = SegmentSelector::new(SEG_KDATA, Ring::Ring0);

/// Raw 20-bit limit; with 4 KB granularity it spans the whole 4 GB.
const FLAT_LIMIT: u32 = 0x000F_FFFF;

const DESC_CODE: u64 = 1 << 43;
const DESC_S: u64 = 1 << 44;
const DESC_P: u64 = 1 << 47;
const DESC_G: u64 = 1 << 55;

/// A present, 32-bit, page-granular code segment.
pub fn code_segment(base: u32, limit: u32, dpl: Ring) -> Descriptor {
    let builder: DescriptorBuilder = SegmentDescriptorBuilder::code_descriptor(base, limit, CodeSegmentType::ExecuteRead);
    builder.present().dpl(dpl).db().limit_granularity_4kb().finish()
}

/// A present, 32-bit, page-granular read/write data segment.
pub fn data_segment(base: u32, limit: u32, dpl: Ring) -> Descriptor {
    let builder: DescriptorBuilder = SegmentDescriptorBuilder::data_descriptor(base, limit, DataSegmentType::ReadWrite);
    builder.present().dpl(dpl).db().limit_granularity_4kb().finish()
}

pub fn kernel_code() -> Descriptor {
    code_segment(0, FLAT_LIMIT, Ring::Ring0)
}

pub fn kernel_data() -> Descriptor {
    data_segment(0, FLAT_LIMIT, Ring::Ring0)
}

pub fn user_code() -> Descriptor {
    code_segment(0, FLAT_LIMIT, Ring::Ring3)
}

pub fn user_data() -> Descriptor {
    data_segment(0, FLAT_LIMIT, Ring::Ring3)
}

/// Fields of an encoded descriptor the kernel-slot check looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Decoded(u64);

impl Decoded {
    fn base(self) -> u32 {
        ((self.0 >> 16) & 0xFF_FFFF) as u32 | (((self.0 >> 56) & 0xFF) as u32) << 24
    }

    /// Byte limit, accounting for granularity.
    fn limit(self) -> u32 {
        let raw = ((self.0 & 0xFFFF) | ((self.0 >> 48) & 0xF) << 16) as u32;
        if self.0 & DESC_G != 0 {
            (raw << 12) | 0xFFF
        } else {
            raw
        }
    }

    fn dpl(self) -> u8 {
        ((self.0 >> 45) & 0b11) as u8
    }

    fn is_code(self) -> bool {
        self.0 & DESC_CODE != 0
    }

    /// Present code/data segment with base 0 covering the whole 4 GB.
    fn is_flat(self) -> bool {
        (self.0 & (DESC_P | DESC_S)) == (DESC_P | DESC_S) && self.base() == 0 && self.limit() == 0xFFFF_FFFF
    }
}

/// Segment selectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selectors {
    pub kernel_code: SegmentSelector,
    pub kernel_data: SegmentSelector,
}

/// A per-processor GDT.
#[repr(C, align(8))]
#[derive(Debug, Clone, Copy)]
pub struct Gdt {
    entries: [Descriptor; NSEGS],
}

impl Gdt {
    /// A table of null descriptors.
    pub const fn new() -> Self {
        Self {
            entries: [Descriptor::NULL; NSEGS],
        }
    }

    /// Flat kernel and user segments; the TSS slot is left null.
    pub fn flat() -> Self {
        let mut gdt = Self::new();
        gdt.set(SEG_KCODE, kernel_code());
        gdt.set(SEG_KDATA, kernel_data());
        gdt.set(SEG_UCODE, user_code());
        gdt.set(SEG_UDATA, user_data());
        gdt
    }

    /// Replace the descriptor at `index`. Out-of-range indices are ignored.
    pub fn set(&mut self, index: u16, descriptor: Descriptor) {
        if let Some(slot) = self.entries.get_mut(index as usize) {
            *slot = descriptor;
        }
    }

    pub fn get(&self, index: u16) -> Option<Descriptor> {
        self.entries.get(index as usize).copied()
    }

    /// The GDTR image for this table.
    pub fn pointer(&self) -> DescriptorTablePointer<Descriptor> {
        DescriptorTablePointer::new_from_slice(&self.entries)
    }

    /// Check the kernel slots and return their selectors.
    ///
    /// Kernel code must be a flat ring-0 code segment and kernel data a flat
    /// ring-0 data segment.
    pub fn kernel_selectors(&self) -> Result<Selectors, HardwareSequenceViolation> {
        let ring0_flat = |selector: SegmentSelector, code: bool| {
            self.get(selector.index())
                .map(|d| Decoded(d.as_u64()))
                .filter(|d| d.is_flat() && d.dpl() == Ring::Ring0 as u8 && d.is_code() == code)
                .map(|_| ())
                .ok_or(HardwareSequenceViolation::NonFlatKernelSegment { selector })
        };

        ring0_flat(KERNEL_CODE_SELECTOR, true)?;
        ring0_flat(KERNEL_DATA_SELECTOR, false)?;

        Ok(Selectors {
            kernel_code: KERNEL_CODE_SELECTOR,
            kernel_data: KERNEL_DATA_SELECTOR,
        })
    }
}

impl PartialEq for Gdt {
    fn eq(&self, other: &Self) -> bool {
        self.entries.iter().zip(other.entries.iter()).all(|(a, b)| a.as_u64() == b.as_u64())
    }
}

impl Eq for Gdt {}

impl Default for Gdt {
    fn default() -> Self {
        Self::new()
    }
}
