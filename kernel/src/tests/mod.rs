//! Kernel unit tests.
//!
//! Everything runs on the host against [`mock::MockMachine`].


mod boot_tests;
mod restart_tests;
mod smp_tests;
