//! The assignment engine: applies new assignment maps to the cursor set.

use crate::consumer::{Consumer, ConsumerInner, ConsumerState};
use crate::group::Assignments;
use crate::loads::{LoadKind, LoadSet};
use client_core::OffsetLoad;
use std::sync::Arc;
use tracing::{debug, info};

/// How an assignment map reshapes the existing cursor set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignHow {
    /// Pure extension: every assigned partition is new, nothing existing
    /// is disturbed, and in-flight fetches keep running.
    Additive,

    /// Unassign everything first, then assign the map.
    InvalidateAll,

    /// Unassign exactly the partitions named in the map; the offsets in
    /// the map are ignored. Everything else is kept.
    InvalidateMatching,

    /// Overwrite the positions of exactly the partitions named in the map
    /// that are currently assigned. Everything else is kept.
    SetMatching,
}

impl Consumer {
    /// Applies an assignment map under `how`.
    ///
    /// Invoked by the assignment drivers (direct discovery, the group
    /// collaborator on rebalance) rather than directly by users.
    pub async fn apply_assignments(&self, assignments: Assignments, how: AssignHow) {
        let mut state = self.inner.state.lock().await;
        if state.dead {
            return;
        }
        self.inner
            .clone()
            .assign_partitions(&mut state, assignments, how)
            .await;
    }
}

impl ConsumerInner {
    /// The engine proper. Callers hold the consumer mutex.
    pub(crate) async fn assign_partitions(
        self: Arc<Self>,
        state: &mut ConsumerState,
        assignments: Assignments,
        how: AssignHow,
    ) {
        let partitions: usize = assignments.values().map(|m| m.len()).sum();
        info!(
            how = ?how,
            kind = state.kind.name(),
            topics = assignments.len(),
            partitions,
            "assigning partitions"
        );

        // Additive changes ride alongside the live session; anything that
        // invalidates or overwrites must stop it and reclaim its pending
        // loads first.
        let (guard, mut loads, session) = match how {
            AssignHow::Additive => {
                let (guard, session) = self.guard_session_change().await;
                (guard, LoadSet::default(), Some(session))
            }
            _ => {
                let (guard, loads) = self.stop_session().await;
                (guard, loads, None)
            }
        };

        match how {
            AssignHow::Additive => {}
            AssignHow::InvalidateAll => {
                for cursor in state.cursors.values() {
                    cursor.unset();
                }
                state.cursors.clear();
                loads = LoadSet::default();
            }
            AssignHow::InvalidateMatching => {
                state.cursors.retain(|(topic, partition), cursor| {
                    if contains(&assignments, topic, *partition) {
                        cursor.unset();
                        false
                    } else {
                        true
                    }
                });
                // A load for a partition we no longer own must not resolve.
                loads.filter(|topic, partition| contains(&assignments, topic, partition));
            }
            AssignHow::SetMatching => {
                for ((topic, partition), cursor) in &state.cursors {
                    if let Some(offset) = assignments.get(topic).and_then(|m| m.get(partition)) {
                        cursor.set_offset(offset.at, offset.epoch);
                    }
                }
                // The caller supplied explicit positions; pending lookups
                // for those partitions are stale.
                loads.filter(|topic, partition| !contains(&assignments, topic, partition));
            }
        }

        // The matching modes exist to mutate existing state; they add no
        // loads of their own, and neither does an empty map.
        let reshape_only = matches!(
            how,
            AssignHow::InvalidateMatching | AssignHow::SetMatching
        ) || assignments.is_empty();

        if !reshape_only {
            let topics = self.cluster.load_topics();
            for (topic, partitions) in &assignments {
                for (&partition, offset) in partitions {
                    let mut offset = *offset;
                    offset.collapse_relative();

                    if offset.at >= 0 && offset.epoch >= 0 {
                        // Exact with truncation detection: epoch lookup.
                        loads.add_load(
                            topic,
                            partition,
                            LoadKind::Epoch,
                            OffsetLoad::leader(offset),
                        );
                        continue;
                    }

                    if offset.at >= 0 {
                        if let Some(meta) =
                            topics.get(topic).and_then(|t| t.partition(partition))
                        {
                            // Exact on a partition we already know: no RPC.
                            meta.cursor.set_offset(offset.at, meta.leader_epoch);
                            meta.cursor.allow_usable();
                            state
                                .cursors
                                .insert((topic.clone(), partition), meta.cursor.clone());
                            continue;
                        }
                    }

                    // Start/end sentinel, or exact on a partition the
                    // metadata has not loaded yet.
                    loads.add_load(topic, partition, LoadKind::List, OffsetLoad::leader(offset));
                }
            }
        }

        let session = match session {
            Some(session) => {
                drop(guard);
                session
            }
            None => self.start_new_session(guard),
        };

        debug!(pending = loads.len(), "assignment reshape complete");
        self.clone().load_with_session(session, loads, true);

        let sources: Vec<_> = self.sources.lock().clone();
        for source in &sources {
            source.maybe_consume();
        }
    }
}

fn contains(assignments: &Assignments, topic: &str, partition: i32) -> bool {
    assignments
        .get(topic)
        .is_some_and(|m| m.contains_key(&partition))
}
