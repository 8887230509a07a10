//! The consumer core: translates partition assignments into a live set of
//! per-partition cursors and re-shapes that set as assignments, broker
//! leadership, or group membership change.
//!
//! The moving parts:
//! - a [`session::ConsumerSession`] bounds an era of fetching with a
//!   cancellation scope, a worker count, and the pending offset lookups;
//! - the assignment engine ([`AssignHow`]) applies new assignment maps,
//!   stopping and restarting the session when cursors must be invalidated;
//! - offset resolution turns user-requested positions into concrete
//!   offsets through list-offsets and offset-for-leader-epoch lookups;
//! - the fetch drain merges buffered fetches from sources into the user's
//!   blocking [`Consumer::poll_fetches`] call.
//!
//! Record decoding, the per-partition fetch loops, metadata refresh, and
//! the group membership protocol are collaborators behind traits.

pub mod assign;
pub mod broker;
pub mod consumer;
pub mod cursor;
pub mod direct;
mod drain;
pub mod group;
pub mod loads;
pub mod metadata;
mod resolve;
mod session;
pub mod source;

pub use assign::AssignHow;
pub use broker::{Broker, BrokerId};
pub use consumer::Consumer;
pub use cursor::Cursor;
pub use direct::TopicSelector;
pub use group::{Assignments, DirectAssignor, GroupAssignor};
pub use loads::{LoadKind, LoadSet};
pub use metadata::{Cluster, PartitionMetadata, TopicMetadata};
pub use source::FetchSource;
