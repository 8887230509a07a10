//! The consumer facade and its shared state.

use crate::cursor::Cursor;
use crate::drain::DrainState;
use crate::group::{ConsumerKind, DirectAssignor, GroupAssignor};
use crate::metadata::Cluster;
use crate::session::ConsumerSession;
use crate::source::FetchSource;
use arc_swap::ArcSwap;
use client_core::ConsumerConfig;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::{debug, info};

/// Consumer state guarded by the consumer mutex: what drives assignments
/// and which cursors the current assignment epoch is using.
#[derive(Default)]
pub(crate) struct ConsumerState {
    pub(crate) kind: ConsumerKind,
    /// Cursors made usable in the current assignment epoch, keyed by
    /// `(topic, partition)`. Mutated only by the assignment engine and by
    /// resolution result handling, both under the consumer mutex.
    pub(crate) cursors: HashMap<(String, i32), Arc<Cursor>>,
    pub(crate) dead: bool,
}

pub(crate) struct ConsumerInner {
    pub(crate) config: ConsumerConfig,
    pub(crate) cluster: Arc<dyn Cluster>,

    /// The consumer mutex.
    pub(crate) state: tokio::sync::Mutex<ConsumerState>,

    /// The current session; holds the no-session value when none is alive.
    pub(crate) session: ArcSwap<ConsumerSession>,

    /// Held across any session swap and across additive assignment spans.
    pub(crate) session_change: tokio::sync::Mutex<()>,

    /// Every registered fetch source, poked on session start and reset on
    /// session stop.
    pub(crate) sources: parking_lot::Mutex<Vec<Arc<dyn FetchSource>>>,

    /// The drain mutex: ready sources and queued fake error fetches.
    pub(crate) drain: parking_lot::Mutex<DrainState>,
    pub(crate) drain_wake: Notify,
}

/// A client consuming from a partitioned, replicated commit log.
///
/// Cheap to clone; clones share one consumer.
#[derive(Clone)]
pub struct Consumer {
    pub(crate) inner: Arc<ConsumerInner>,
}

impl Consumer {
    pub fn new(config: ConsumerConfig, cluster: Arc<dyn Cluster>) -> Self {
        Self {
            inner: Arc::new(ConsumerInner {
                config,
                cluster,
                state: tokio::sync::Mutex::new(ConsumerState::default()),
                session: ArcSwap::new(ConsumerSession::none()),
                session_change: tokio::sync::Mutex::new(()),
                sources: parking_lot::Mutex::new(Vec::new()),
                drain: parking_lot::Mutex::new(DrainState::default()),
                drain_wake: Notify::new(),
            }),
        }
    }

    /// Drives assignments directly from metadata through `assignor`,
    /// applying whatever it finds in the current topic snapshot right
    /// away. Later metadata updates extend the assignment additively.
    pub async fn assign_direct(&self, assignor: Arc<dyn DirectAssignor>) {
        {
            let mut state = self.inner.state.lock().await;
            if state.dead {
                return;
            }
            state.kind = ConsumerKind::Direct(assignor);
        }
        info!("consumer driving direct assignments");
        self.inner.clone().find_new_assignments().await;
    }

    /// Hands assignment driving to a group-membership collaborator. The
    /// collaborator applies assignment maps through
    /// [`apply_assignments`](Self::apply_assignments) as rebalances
    /// complete.
    pub async fn assign_group(&self, group: Arc<dyn GroupAssignor>) {
        let mut state = self.inner.state.lock().await;
        if state.dead {
            return;
        }
        state.kind = ConsumerKind::Group(group);
        info!("consumer joined to group driver");
    }

    /// Called by the metadata subsystem after each refresh completes.
    ///
    /// Releases any resolution cycle waiting on fresh metadata and lets
    /// the assignment driver react to topic changes.
    pub fn on_metadata_update(&self) {
        self.inner.load_session().on_metadata_update();

        let inner = self.inner.clone();
        tokio::spawn(async move { inner.find_new_assignments().await });
    }

    /// Registers a fetch source so session transitions reach it.
    pub fn register_source(&self, source: Arc<dyn FetchSource>) {
        self.inner.sources.lock().push(source);
    }

    /// Whether a session is currently alive.
    pub fn has_live_session(&self) -> bool {
        !self.inner.load_session().is_none()
    }

    /// The partitions whose cursors are usable in the current assignment
    /// epoch.
    pub async fn assigned_partitions(&self) -> Vec<(String, i32)> {
        let state = self.inner.state.lock().await;
        let mut assigned: Vec<_> = state.cursors.keys().cloned().collect();
        assigned.sort();
        assigned
    }

    /// Stops the session for good, leaves the group if one is joined, and
    /// releases any blocked poll. Queued fake error fetches remain
    /// observable through a final poll.
    pub async fn close(&self) {
        let mut state = self.inner.state.lock().await;
        if state.dead {
            return;
        }
        state.dead = true;

        let (guard, abandoned) = self.inner.stop_session().await;
        drop(guard);
        debug!(abandoned = abandoned.len(), "consumer closing");

        let kind = std::mem::take(&mut state.kind);
        drop(state);
        if let ConsumerKind::Group(group) = kind {
            group.leave().await;
        }

        self.inner.drain.lock().quit = true;
        self.inner.drain_wake.notify_one();
        info!("consumer closed");
    }
}

impl ConsumerInner {
    /// Asks the assignment driver what the latest metadata means for this
    /// consumer: direct consumers extend their assignment, group consumers
    /// get the topic snapshot to decide whether a rejoin is due.
    pub(crate) async fn find_new_assignments(self: Arc<Self>) {
        let kind = {
            let state = self.state.lock().await;
            if state.dead {
                return;
            }
            state.kind.clone()
        };

        match kind {
            ConsumerKind::Unset => {}
            ConsumerKind::Group(group) => {
                group.find_new_assignments(&self.cluster.load_topics());
            }
            ConsumerKind::Direct(direct) => {
                let new = direct.find_new_assignments(&self.cluster.load_topics());
                if !new.is_empty() {
                    let mut state = self.state.lock().await;
                    if state.dead {
                        return;
                    }
                    self.clone()
                        .assign_partitions(&mut state, new, crate::AssignHow::Additive)
                        .await;
                }
            }
        }
    }
}
