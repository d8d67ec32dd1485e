//! Architecture-specific code for 32-bit x86.

pub mod bringup;
pub mod control;
pub mod gdt;
pub mod machine;
#[cfg(target_arch = "x86")]
pub mod x86;
