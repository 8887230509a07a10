//! `OffsetForLeaderEpoch` request and response.
//!
//! Reports the end offset of a given leader epoch, which lets a consumer
//! that tracks epochs detect log truncation: if the end offset for the
//! epoch it last consumed in is below its position, records it read were
//! lost to an unclean election.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffsetForLeaderEpochRequestPartition {
    /// The partition index.
    pub partition: i32,

    /// The leader epoch the client currently knows for the partition, used
    /// by the broker to fence requests routed on stale metadata.
    ///
    /// `-1` if the client has no epoch.
    pub current_leader_epoch: i32,

    /// The epoch to look up the end offset for; the epoch the client last
    /// consumed records in.
    pub leader_epoch: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetForLeaderEpochRequestTopic {
    /// The topic name.
    pub topic: String,

    /// Each partition in the request.
    ///
    /// A partition may only appear once within the request.
    pub partitions: Vec<OffsetForLeaderEpochRequestPartition>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetForLeaderEpochRequest {
    /// The broker ID of the requestor, or `-1` when made by a consumer.
    pub replica_id: i32,

    /// Each topic in the request.
    pub topics: Vec<OffsetForLeaderEpochRequestTopic>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffsetForLeaderEpochResponsePartition {
    /// The partition error code, or `0` if there was no error.
    pub error_code: i16,

    /// The partition index.
    pub partition: i32,

    /// The leader epoch of the returned end offset.
    pub leader_epoch: i32,

    /// The end offset of the requested epoch: one past the last record
    /// written in that epoch, or the start of the next epoch.
    pub end_offset: i64,
}

impl Default for OffsetForLeaderEpochResponsePartition {
    fn default() -> Self {
        Self {
            error_code: 0,
            partition: 0,
            leader_epoch: -1,
            end_offset: -1,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OffsetForLeaderEpochResponseTopic {
    /// The topic name.
    pub topic: String,

    /// Each partition in the response.
    pub partitions: Vec<OffsetForLeaderEpochResponsePartition>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OffsetForLeaderEpochResponse {
    /// Quota throttle duration in milliseconds, or zero.
    pub throttle_time_ms: i32,

    /// Each topic in the response.
    pub topics: Vec<OffsetForLeaderEpochResponseTopic>,
}
