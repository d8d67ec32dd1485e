//! Memory layout and boot-time paging.

pub mod layout;
pub mod paging;
