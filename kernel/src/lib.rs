//! pdx kernel boot library.
//!
//! Brings each processor from its flat boot state into protected, paged,
//! write-protected mode and binds the result to the validated capacity
//! table.
//!
//! # Modules
//!
//! - [`arch`]: control registers, segment tables, the bring-up controller
//! - [`memory`]: memory layout and the boot page directory
//! - [`smp`]: boot processor to application processor hand-off
//! - [`boot`]: the per-processor entry points
//! - `entry`: the symbols the boot stub jumps to (32-bit x86 only)
//!
//! Hardware access goes through [`arch::machine::Machine`]; the unit tests
//! run everything against a recording model on the host.

#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]

#[cfg(test)]
extern crate std;

pub use params;

pub mod arch;
pub mod boot;
pub mod context;
#[cfg(target_arch = "x86")]
pub mod entry;
pub mod error;
pub mod memory;
#[cfg(all(target_arch = "x86", feature = "serial-console"))]
pub mod serial;
pub mod smp;

#[cfg(test)]
mod tests;

pub use arch::bringup::{BootPlan, BringUp, Mode, ModeFact, ModeSnapshot};
pub use context::KernelContext;
pub use error::{BootError, HardwareSequenceViolation};
pub use smp::BringUpBarrier;
