//! Consumer-kind polymorphism: direct and group assignment drivers.

use crate::metadata::TopicMetadata;
use async_trait::async_trait;
use client_core::{Fetches, Offset};
use std::collections::HashMap;
use std::sync::Arc;

/// A new-assignment map: which partitions to consume and from where.
pub type Assignments = HashMap<String, HashMap<i32, Offset>>;

/// Derives assignments for a consumer that picks its own partitions from
/// metadata, without group coordination.
pub trait DirectAssignor: Send + Sync {
    /// Partitions newly visible in `topics` that this consumer should
    /// begin consuming. Implementations track what they have already
    /// assigned; an empty map means nothing new.
    fn find_new_assignments(&self, topics: &HashMap<String, TopicMetadata>) -> Assignments;
}

/// The group-membership collaborator.
///
/// The rebalance protocol itself lives outside the core; the core hands it
/// metadata updates and polled fetches, and receives assignment maps
/// through [`Consumer::apply_assignments`](crate::Consumer::apply_assignments).
#[async_trait]
pub trait GroupAssignor: Send + Sync {
    /// Notifies the group driver of a metadata update so it can decide
    /// whether the topic set changed and a rejoin is needed.
    fn find_new_assignments(&self, topics: &HashMap<String, TopicMetadata>);

    /// Records the highest polled offsets so the next commit covers the
    /// records just handed to the user.
    fn update_uncommitted(&self, fetches: &Fetches);

    /// Leaves the group.
    async fn leave(&self);
}

/// What drives this consumer's assignments.
#[derive(Clone, Default)]
pub(crate) enum ConsumerKind {
    #[default]
    Unset,
    Direct(Arc<dyn DirectAssignor>),
    Group(Arc<dyn GroupAssignor>),
}

impl ConsumerKind {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            ConsumerKind::Unset => "unset",
            ConsumerKind::Direct(_) => "direct",
            ConsumerKind::Group(_) => "group",
        }
    }
}
