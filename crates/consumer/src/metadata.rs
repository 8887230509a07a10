//! The metadata collaborator.

use crate::broker::{Broker, BrokerId};
use crate::cursor::Cursor;
use std::collections::HashMap;
use std::sync::Arc;

/// One partition's state as reported by the latest metadata refresh.
#[derive(Clone)]
pub struct PartitionMetadata {
    pub partition: i32,

    /// The broker currently leading the partition.
    pub leader: BrokerId,

    /// The epoch of the current leader; `-1` if the cluster does not track
    /// epochs.
    pub leader_epoch: i32,

    /// The partition's cursor, owned by the metadata subsystem and shared
    /// with the core.
    pub cursor: Arc<Cursor>,
}

/// One topic's partitions, ordered by partition index.
#[derive(Clone, Default)]
pub struct TopicMetadata {
    pub partitions: Vec<PartitionMetadata>,
}

impl TopicMetadata {
    pub fn partition(&self, partition: i32) -> Option<&PartitionMetadata> {
        self.partitions.iter().find(|p| p.partition == partition)
    }
}

/// The cluster-state collaborator: topic metadata and broker lookup.
///
/// The metadata subsystem is the sole writer of this state; the core only
/// reads snapshots. Refresh triggers are fire-and-forget, and the
/// subsystem reports completion back through
/// [`Consumer::on_metadata_update`](crate::Consumer::on_metadata_update).
pub trait Cluster: Send + Sync {
    /// A snapshot of the currently known topics.
    fn load_topics(&self) -> HashMap<String, TopicMetadata>;

    /// The connection for a broker id, if the broker is known.
    fn broker(&self, id: BrokerId) -> Option<Arc<dyn Broker>>;

    /// A stable fallback connection used while a partition's leader is
    /// unknown.
    fn seed_broker(&self) -> Arc<dyn Broker>;

    /// Requests a metadata refresh at the subsystem's leisure.
    fn trigger_metadata_update(&self);

    /// Requests a metadata refresh immediately.
    fn trigger_metadata_update_now(&self);
}
