//! The broker connection collaborator.

use async_trait::async_trait;
use broker_protocol::{
    ListOffsetsRequest, ListOffsetsResponse, OffsetForLeaderEpochRequest,
    OffsetForLeaderEpochResponse,
};
use client_core::Result;

/// A broker node id as reported by metadata.
pub type BrokerId = i32;

/// Seed brokers are addressed before their real node ids are known; they
/// are keyed far below any id a cluster will assign.
pub fn seed_broker_id(index: i32) -> BrokerId {
    i32::MIN + index
}

/// A connection to one broker.
///
/// Implementations own framing, correlation, versioning, and retries at
/// the connection level; each method sends one typed request and resolves
/// with the matching correlated response. Dropping the returned future
/// abandons the request, which is how session cancellation aborts
/// in-flight RPCs.
#[async_trait]
pub trait Broker: Send + Sync {
    fn id(&self) -> BrokerId;

    async fn list_offsets(&self, req: ListOffsetsRequest) -> Result<ListOffsetsResponse>;

    async fn offset_for_leader_epoch(
        &self,
        req: OffsetForLeaderEpochRequest,
    ) -> Result<OffsetForLeaderEpochResponse>;
}
