//! Consumer core for a Kafka-compatible commit-log broker client.
//!
//! Re-exports the user-facing surface: offset construction, the consumer
//! itself, and the collaborator traits a full client wires in (broker
//! connections, metadata, fetch sources, group membership).

pub use client_core::{
    ConsumerConfig, Error, Fetch, FetchError, FetchPartition, FetchTopic, Fetches, Offset,
    OffsetLoad, Record, Result, AT_END, AT_START,
};
pub use consumer::{
    AssignHow, Assignments, Broker, BrokerId, Cluster, Consumer, Cursor, DirectAssignor,
    FetchSource, GroupAssignor, LoadKind, LoadSet, PartitionMetadata, TopicMetadata,
    TopicSelector,
};

pub use broker_protocol as protocol;
