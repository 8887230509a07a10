//! `ListOffsets` request and response.
//!
//! Resolves a timestamp (or one of the start/end sentinels) into a concrete
//! log offset for a set of partitions.

use crate::isolation::IsolationLevel;

/// Timestamp sentinel requesting the first offset in the partition.
pub const LIST_EARLIEST: i64 = -2;

/// Timestamp sentinel requesting the offset one past the last record.
pub const LIST_LATEST: i64 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListOffsetsRequestPartition {
    /// The partition index.
    pub partition_index: i32,

    /// The leader epoch the client currently knows for the partition, used
    /// by the broker to fence requests routed on stale metadata.
    ///
    /// `-1` if the client has no epoch.
    pub current_leader_epoch: i32,

    /// The timestamp to look up, or [`LIST_EARLIEST`] / [`LIST_LATEST`].
    pub timestamp: i64,

    /// The maximum number of offsets to report.
    ///
    /// Only consulted by v0 brokers, which reply with the old-style offset
    /// array; later versions always return a single offset.
    pub max_num_offsets: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListOffsetsRequestTopic {
    /// The topic name.
    pub topic: String,

    /// Each partition in the request.
    ///
    /// A partition may only appear once within the request.
    pub partitions: Vec<ListOffsetsRequestPartition>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListOffsetsRequest {
    /// The broker ID of the requestor, or `-1` when made by a consumer.
    pub replica_id: i32,

    /// Visibility of transactional records in the result.
    pub isolation_level: IsolationLevel,

    /// Each topic in the request.
    pub topics: Vec<ListOffsetsRequestTopic>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListOffsetsResponsePartition {
    /// The partition index.
    pub partition_index: i32,

    /// The partition error code, or `0` if there was no error.
    pub error_code: i16,

    /// The result offsets as returned by v0 brokers.
    pub old_style_offsets: Vec<i64>,

    /// The timestamp associated with the returned offset; `-1` if none.
    pub timestamp: i64,

    /// The returned offset; `0` from a v0 broker (see `old_style_offsets`).
    pub offset: i64,

    /// The leader epoch of the returned offset; `-1` when the broker does
    /// not track epochs.
    pub leader_epoch: i32,
}

impl Default for ListOffsetsResponsePartition {
    fn default() -> Self {
        Self {
            partition_index: 0,
            error_code: 0,
            old_style_offsets: Vec::new(),
            timestamp: -1,
            offset: 0,
            leader_epoch: -1,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOffsetsResponseTopic {
    /// The topic name.
    pub topic: String,

    /// Each partition in the response.
    pub partitions: Vec<ListOffsetsResponsePartition>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOffsetsResponse {
    /// Quota throttle duration in milliseconds, or zero.
    pub throttle_time_ms: i32,

    /// Each topic in the response.
    pub topics: Vec<ListOffsetsResponseTopic>,
}
