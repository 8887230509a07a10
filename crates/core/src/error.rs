//! Unified error type for the consumer client.

use broker_protocol::ErrorCode;
use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for the consumer client.
///
/// Errors are `Clone` so a single failure can be attached to every
/// partition it affects.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A typed error code a broker attached to a partition.
    #[error("broker error: {0}")]
    Code(#[from] ErrorCode),

    /// The request never produced a correlated response: connection reset,
    /// write failure, or broker shutdown mid-request.
    #[error("transport error: {0}")]
    Transport(String),

    /// Log truncation detected: records past `end_offset` in the epoch the
    /// client last consumed in were lost to an unclean election. The fetch
    /// position has been rewound to `end_offset`.
    #[error("data loss detected: fetch position reset to {end_offset}")]
    DataLoss { end_offset: i64 },
}

impl Error {
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Whether the failed operation may be retried after the next metadata
    /// refresh.
    ///
    /// Transport failures are always retriable: the broker may have moved
    /// or restarted, and fresh metadata will re-route the request.
    pub fn is_retriable(&self) -> bool {
        match self {
            Error::Code(code) => code.is_retriable(),
            Error::Transport(_) => true,
            Error::DataLoss { .. } => false,
        }
    }
}
