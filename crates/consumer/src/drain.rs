//! The fetch drain: merging buffered fetches into the user's poll.

use crate::consumer::{Consumer, ConsumerInner};
use crate::group::ConsumerKind;
use crate::source::FetchSource;
use client_core::{Error, Fetch, Fetches};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Queues guarded by the drain mutex.
///
/// `ready` holds sources with a completed fetch in their buffer. `fakes`
/// holds synthetic error fetches; unlike buffered real fetches these
/// survive session stops, so fatal conditions reach the user even across
/// a rebalance.
#[derive(Default)]
pub(crate) struct DrainState {
    pub(crate) ready: Vec<Arc<dyn FetchSource>>,
    pub(crate) fakes: Vec<Fetch>,
    pub(crate) quit: bool,
}

impl ConsumerInner {
    /// Queues a synthetic fetch carrying a fatal per-partition error and
    /// wakes the poller.
    pub(crate) fn inject_fake_fetch(&self, topic: &str, partition: i32, err: Error) {
        self.drain
            .lock()
            .fakes
            .push(Fetch::partition_error(topic, partition, err));
        self.drain_wake.notify_one();
    }
}

impl Consumer {
    /// Called by a source when its buffer holds a completed fetch.
    pub fn source_ready(&self, source: Arc<dyn FetchSource>) {
        {
            let mut drain = self.inner.drain.lock();
            if !drain.ready.iter().any(|s| Arc::ptr_eq(s, &source)) {
                drain.ready.push(source);
            }
        }
        self.inner.drain_wake.notify_one();
    }

    /// Returns the buffered fetches, blocking until at least one record or
    /// error is available, the consumer is closed, or `ctx` is cancelled
    /// (which yields an empty batch).
    ///
    /// Single-caller: polling concurrently from two tasks violates the
    /// uncommitted-offset tracking contract.
    pub async fn poll_fetches(&self, ctx: &CancellationToken) -> Fetches {
        loop {
            let mut fetches = Fetches::default();
            let quit;
            {
                // Uncommitted tracking must happen under the consumer
                // mutex before the fetches are exposed: a concurrent
                // revoke could otherwise commit offsets behind records
                // the user is about to process, and a rebalance would
                // redeliver them.
                let state = self.inner.state.lock().await;
                let mut drain = self.inner.drain.lock();
                for source in drain.ready.drain(..) {
                    fetches.push(source.take_buffered());
                }
                if let ConsumerKind::Group(group) = &state.kind {
                    if !fetches.is_empty() {
                        group.update_uncommitted(&fetches);
                    }
                }
                fetches.extend(drain.fakes.drain(..));
                quit = drain.quit;
            }

            if !fetches.is_empty() || quit {
                trace!(records = fetches.record_count(), "poll returning fetches");
                return fetches;
            }

            let notified = self.inner.drain_wake.notified();
            {
                let drain = self.inner.drain.lock();
                if !drain.ready.is_empty() || !drain.fakes.is_empty() || drain.quit {
                    continue;
                }
            }
            tokio::select! {
                _ = ctx.cancelled() => return Fetches::default(),
                _ = notified => {}
            }
        }
    }
}
