//! Consumer sessions: one era of fetching, bounded by assignment reshapes.

use crate::consumer::ConsumerInner;
use crate::loads::LoadSet;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::mem;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::{MutexGuard, Notify};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Offset-resolution state owned by a session.
///
/// `waiting` holds loads queued for the next resolution cycle, `loading`
/// the loads of the cycle currently in flight. `wake` is the one-slot
/// channel a metadata update signals to release the waiting cycle.
#[derive(Default)]
pub(crate) struct SessionLoads {
    pub(crate) waiting: LoadSet,
    pub(crate) loading: LoadSet,
    pub(crate) wake: Option<mpsc::Sender<()>>,
}

/// An era of fetching.
///
/// The session owns the cancellation scope every fetch and
/// offset-resolution task of the era runs under, the count of such
/// workers, and the era's pending offset lookups. Cancelling the scope
/// therefore implicitly discards the era's in-flight work; stopping the
/// session additionally waits for the workers to observe it.
pub(crate) struct ConsumerSession {
    pub(crate) cancel: CancellationToken,
    workers: AtomicUsize,
    workers_idle: Notify,
    pub(crate) loads: Mutex<SessionLoads>,
}

/// Distinguishes "no current session" from any session that is or ever was
/// alive. The cell holding the current session cannot express absence, so
/// this pre-cancelled instance stands in for it; comparisons are by
/// identity, never by contents.
static NO_SESSION: Lazy<Arc<ConsumerSession>> = Lazy::new(|| {
    let session = ConsumerSession::fresh();
    session.cancel.cancel();
    Arc::new(session)
});

impl ConsumerSession {
    fn fresh() -> Self {
        Self {
            cancel: CancellationToken::new(),
            workers: AtomicUsize::new(0),
            workers_idle: Notify::new(),
            loads: Mutex::new(SessionLoads::default()),
        }
    }

    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::fresh())
    }

    /// The process-wide no-session value.
    pub(crate) fn none() -> Arc<Self> {
        NO_SESSION.clone()
    }

    pub(crate) fn is_none(&self) -> bool {
        std::ptr::eq(self, Arc::as_ptr(&*NO_SESSION))
    }

    pub(crate) fn inc_worker(&self) {
        self.workers.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn dec_worker(&self) {
        if self.workers.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.workers_idle.notify_one();
        }
    }

    /// Waits until every worker tied to this session has exited. Only the
    /// session stopper waits, so a stored `notify_one` permit cannot be
    /// stolen by another waiter.
    pub(crate) async fn await_workers(&self) {
        loop {
            if self.workers.load(Ordering::Acquire) == 0 {
                return;
            }
            self.workers_idle.notified().await;
        }
    }

    /// Releases a resolution cycle waiting on a metadata refresh. A no-op
    /// unless loads are queued; the one-slot channel coalesces updates
    /// arriving faster than cycles run.
    pub(crate) fn on_metadata_update(&self) {
        let loads = self.loads.lock();
        if loads.waiting.is_empty() {
            return;
        }
        if let Some(wake) = &loads.wake {
            let _ = wake.try_send(());
        }
    }
}

/// Brackets one fetch or offset-resolution worker of a session. Created
/// before the worker task is spawned, so the count covers the task from
/// the moment it can exist.
pub(crate) struct WorkerGuard {
    session: Arc<ConsumerSession>,
}

impl WorkerGuard {
    pub(crate) fn new(session: Arc<ConsumerSession>) -> Self {
        session.inc_worker();
        Self { session }
    }
}

impl Drop for WorkerGuard {
    fn drop(&mut self) {
        self.session.dec_worker();
    }
}

impl ConsumerInner {
    /// The current session, or the no-session value. Lock-free; sources
    /// call this on every fetch-loop iteration.
    pub(crate) fn load_session(&self) -> Arc<ConsumerSession> {
        self.session.load_full()
    }

    /// Serializes an additive assignment against session swaps, creating a
    /// session on demand. Dropping the returned guard is the unguard.
    pub(crate) async fn guard_session_change(
        &self,
    ) -> (MutexGuard<'_, ()>, Arc<ConsumerSession>) {
        let guard = self.session_change.lock().await;
        let mut session = self.session.load_full();
        if session.is_none() {
            session = ConsumerSession::new();
            self.session.store(session.clone());
            debug!("created consumer session");
        }
        (guard, session)
    }

    /// Stops the current session: cancels its scope, waits for its workers
    /// to drain, resets the sources, discards buffered real fetches (fake
    /// error fetches are retained), and returns the pending loads of the
    /// stopped era.
    ///
    /// The returned guard keeps the session-change mutex held; callers
    /// pass it to [`start_new_session`](Self::start_new_session) so no
    /// concurrent assignment can slip between stop and start.
    pub(crate) async fn stop_session(&self) -> (MutexGuard<'_, ()>, LoadSet) {
        let guard = self.session_change.lock().await;
        let session = self.session.load_full();
        if session.is_none() {
            return (guard, LoadSet::default());
        }

        session.cancel.cancel();
        self.session.store(ConsumerSession::none());
        session.await_workers().await;

        let sources: Vec<_> = self.sources.lock().clone();
        for source in &sources {
            source.session_reset();
        }
        {
            let mut drain = self.drain.lock();
            for source in drain.ready.drain(..) {
                source.discard_buffered();
            }
        }

        let abandoned = {
            let mut loads = session.loads.lock();
            let mut merged = mem::take(&mut loads.loading);
            merged.merge_from(mem::take(&mut loads.waiting));
            loads.wake = None;
            merged
        };
        debug!(pending = abandoned.len(), "stopped consumer session");
        (guard, abandoned)
    }

    /// Publishes a fresh session, releases the session-change mutex, and
    /// pokes every source back into its fetch loop.
    pub(crate) fn start_new_session(&self, guard: MutexGuard<'_, ()>) -> Arc<ConsumerSession> {
        let session = ConsumerSession::new();
        self.session.store(session.clone());
        drop(guard);
        debug!("started consumer session");

        let sources: Vec<_> = self.sources.lock().clone();
        for source in &sources {
            source.maybe_consume();
        }
        session
    }
}
