//! Request and response bodies.

pub mod list_offsets;
pub mod offset_for_leader_epoch;

pub use list_offsets::*;
pub use offset_for_leader_epoch::*;
