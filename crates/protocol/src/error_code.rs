//! Per-partition error codes returned by brokers.

use thiserror::Error;

/// Error codes a broker attaches to individual partitions in a response.
///
/// Only the codes the consumer core classifies are enumerated; anything
/// else decodes to [`ErrorCode::Unknown`], which is treated as fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum ErrorCode {
    /// The server experienced an unexpected error.
    #[error("unknown server error")]
    Unknown,

    /// The requested offset is outside the range of offsets maintained by
    /// the broker for the partition.
    #[error("offset out of range")]
    OffsetOutOfRange,

    /// This server does not host the topic-partition.
    #[error("unknown topic or partition")]
    UnknownTopicOrPartition,

    /// There is no currently elected leader for the partition.
    #[error("leader not available")]
    LeaderNotAvailable,

    /// This broker is not the leader for the partition.
    #[error("not leader for partition")]
    NotLeaderForPartition,

    /// The request timed out broker-side.
    #[error("request timed out")]
    RequestTimedOut,

    /// The broker is not available.
    #[error("broker not available")]
    BrokerNotAvailable,

    /// The replica is not available for the requested topic-partition.
    #[error("replica not available")]
    ReplicaNotAvailable,

    /// The server disconnected before a response was received.
    #[error("network exception")]
    NetworkException,

    /// Disk error when trying to access the log file on the broker.
    #[error("broker storage error")]
    KafkaStorageError,

    /// The leader epoch in the request is older than the epoch on the broker.
    #[error("fenced leader epoch")]
    FencedLeaderEpoch,

    /// The leader epoch in the request is newer than the epoch on the broker.
    #[error("unknown leader epoch")]
    UnknownLeaderEpoch,

    /// The leader is unable to guarantee that the requested offset is
    /// consistent, typically right after an election.
    #[error("offset not available")]
    OffsetNotAvailable,

    /// The broker does not support the requested version of the message.
    #[error("unsupported version")]
    UnsupportedVersion,
}

impl ErrorCode {
    /// Maps a wire error code to a typed value; `0` means no error and maps
    /// to `None`.
    pub fn from_code(code: i16) -> Option<ErrorCode> {
        match code {
            0 => None,
            1 => Some(ErrorCode::OffsetOutOfRange),
            3 => Some(ErrorCode::UnknownTopicOrPartition),
            5 => Some(ErrorCode::LeaderNotAvailable),
            6 => Some(ErrorCode::NotLeaderForPartition),
            7 => Some(ErrorCode::RequestTimedOut),
            8 => Some(ErrorCode::BrokerNotAvailable),
            9 => Some(ErrorCode::ReplicaNotAvailable),
            13 => Some(ErrorCode::NetworkException),
            35 => Some(ErrorCode::UnsupportedVersion),
            56 => Some(ErrorCode::KafkaStorageError),
            74 => Some(ErrorCode::FencedLeaderEpoch),
            75 => Some(ErrorCode::UnknownLeaderEpoch),
            78 => Some(ErrorCode::OffsetNotAvailable),
            _ => Some(ErrorCode::Unknown),
        }
    }

    /// The wire representation of this code.
    pub fn code(self) -> i16 {
        match self {
            ErrorCode::Unknown => -1,
            ErrorCode::OffsetOutOfRange => 1,
            ErrorCode::UnknownTopicOrPartition => 3,
            ErrorCode::LeaderNotAvailable => 5,
            ErrorCode::NotLeaderForPartition => 6,
            ErrorCode::RequestTimedOut => 7,
            ErrorCode::BrokerNotAvailable => 8,
            ErrorCode::ReplicaNotAvailable => 9,
            ErrorCode::NetworkException => 13,
            ErrorCode::UnsupportedVersion => 35,
            ErrorCode::KafkaStorageError => 56,
            ErrorCode::FencedLeaderEpoch => 74,
            ErrorCode::UnknownLeaderEpoch => 75,
            ErrorCode::OffsetNotAvailable => 78,
        }
    }

    /// Whether a partition that failed with this code may be retried after
    /// the next metadata refresh.
    pub fn is_retriable(self) -> bool {
        matches!(
            self,
            ErrorCode::UnknownTopicOrPartition
                | ErrorCode::LeaderNotAvailable
                | ErrorCode::NotLeaderForPartition
                | ErrorCode::RequestTimedOut
                | ErrorCode::BrokerNotAvailable
                | ErrorCode::ReplicaNotAvailable
                | ErrorCode::NetworkException
                | ErrorCode::KafkaStorageError
                | ErrorCode::FencedLeaderEpoch
                | ErrorCode::UnknownLeaderEpoch
                | ErrorCode::OffsetNotAvailable
        )
    }
}
