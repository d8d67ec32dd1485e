//! Per-processor kernel context.
//!
//! Everything a subsystem needs to know about the machine it runs on is
//! handed to it here instead of being read from globals.

use params::{Capacities, ConsistencyError, Limit};

use crate::arch::bringup::{Mode, ModeFact};
use crate::error::{BootError, HardwareSequenceViolation};
use crate::memory::layout::{EXTENDED_MEMORY, PAGE_SIZE, PHYSICAL_TOP};
use crate::smp::CpuId;

/// Immutable facts established during boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelContext {
    cpu: CpuId,
    mode: ModeFact,
    capacities: Capacities,
}

impl KernelContext {
    /// Bind a finished bring-up to the validated limits.
    ///
    /// The processor must be fully brought up and the kernel stacks must
    /// fit in physical memory above the first megabyte.
    pub fn new(cpu: CpuId, mode: ModeFact, capacities: Capacities) -> Result<Self, BootError> {
        if !mode.is_complete() {
            return Err(HardwareSequenceViolation::OutOfOrder {
                current: mode.mode(),
                expected: Mode::TERMINAL,
            }
            .into());
        }
        check_memory(&capacities)?;

        Ok(Self { cpu, mode, capacities })
    }

    pub fn cpu(&self) -> CpuId {
        self.cpu
    }

    pub fn mode(&self) -> ModeFact {
        self.mode
    }

    pub fn capacities(&self) -> &Capacities {
        &self.capacities
    }

    /// Shorthand for `capacities().get(limit)`.
    pub fn limit(&self, limit: Limit) -> usize {
        self.capacities.get(limit)
    }

    pub fn is_boot_processor(&self) -> bool {
        self.cpu == 0
    }
}

fn check_memory(capacities: &Capacities) -> Result<(), ConsistencyError> {
    capacities.check_memory_model(PAGE_SIZE as usize, (PHYSICAL_TOP - EXTENDED_MEMORY) as usize)
}
