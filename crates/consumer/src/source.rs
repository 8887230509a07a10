//! The fetch-source collaborator.

use client_core::Fetch;

/// A per-broker fetch loop that buffers completed fetches for the drain.
///
/// Sources read the current session from the consumer on every loop
/// iteration and stop fetching when it is gone; they never hold a session
/// reference across iterations. When a source has a completed fetch in its
/// buffer it reports itself through
/// [`Consumer::source_ready`](crate::Consumer::source_ready).
pub trait FetchSource: Send + Sync {
    /// Pokes the source to re-evaluate whether it can fetch.
    fn maybe_consume(&self);

    /// Clears per-session fetch state (in-flight bookkeeping, backoff),
    /// called while the session is stopped and no fetches are in flight.
    fn session_reset(&self);

    /// Takes the buffered fetch, leaving the buffer empty.
    fn take_buffered(&self) -> Fetch;

    /// Drops the buffered fetch without exposing it.
    fn discard_buffered(&self);
}
