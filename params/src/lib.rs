//! pdx Capacity Registry
//!
//! Fixed capacity limits shared by every kernel subsystem: process slots,
//! stack size, CPU count, file tables, inode cache, devices, exec arguments,
//! and the log/buffer-cache/file-system sizes that bound a file-system
//! transaction.
//!
//! # Lifecycle
//!
//! 1. A [`CapacityTable`] is populated from build-time configuration
//!    ([`CapacityTable::build`]).
//! 2. [`CapacityTable::validate`] checks every derivation relationship and
//!    returns either a [`Capacities`] handle or the first
//!    [`ConsistencyError`].
//! 3. [`Capacities`] is `Copy` and read-only; subsystems receive it by value
//!    and query it with [`Capacities::get`].

#![no_std]

#[cfg(test)]
extern crate std;

pub mod error;
pub mod fs;
pub mod limit;
pub mod param;
pub mod registry;

pub use error::{ConsistencyError, Relation, UnknownLimit};
pub use fs::FsGeometry;
pub use limit::Limit;
pub use registry::{Capacities, CapacityTable, FsVariant};
