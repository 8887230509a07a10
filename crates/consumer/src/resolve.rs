//! Offset resolution: mapping user-requested positions to concrete
//! offsets through list-offsets and offset-for-leader-epoch lookups.

use crate::broker::Broker;
use crate::consumer::{ConsumerInner, ConsumerState};
use crate::loads::{LoadKind, LoadSet};
use crate::metadata::TopicMetadata;
use crate::session::{ConsumerSession, WorkerGuard};
use broker_protocol::{
    ErrorCode, IsolationLevel, ListOffsetsRequest, ListOffsetsRequestPartition,
    ListOffsetsRequestTopic, ListOffsetsResponse, OffsetForLeaderEpochRequest,
    OffsetForLeaderEpochRequestPartition, OffsetForLeaderEpochRequestTopic,
    OffsetForLeaderEpochResponse, LIST_LATEST,
};
use client_core::{Error, OffsetLoad};
use std::collections::HashMap;
use std::mem;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// How one pending load resolved.
enum Outcome {
    /// Apply the offset and make the cursor usable.
    Set { offset: i64, leader_epoch: i32 },
    /// Truncation detected: surface the loss and resume from `reset`.
    DataLoss { reset: i64, leader_epoch: i32 },
    /// Re-enqueue the same load for the next cycle.
    Retry { err: Error },
    /// Fatal: surface through a fake error fetch and drop the load.
    Fail { err: Error },
}

struct LoadResult {
    topic: String,
    partition: i32,
    kind: LoadKind,
    load: OffsetLoad,
    outcome: Outcome,
}

impl ConsumerInner {
    /// Spawns a resolution worker for `loads` against `session`.
    ///
    /// The worker is counted before the task is spawned, so a concurrent
    /// session stop observes it even if the task has not run yet.
    pub(crate) fn load_with_session(
        self: Arc<Self>,
        session: Arc<ConsumerSession>,
        loads: LoadSet,
        immediate: bool,
    ) {
        if loads.is_empty() {
            return;
        }
        let worker = WorkerGuard::new(session.clone());
        tokio::spawn(async move {
            let _worker = worker;
            self.list_or_epoch(session, loads, immediate).await;
        });
    }

    /// One offset-resolution cycle.
    ///
    /// At most one cycle is live per session; concurrent entries coalesce
    /// their loads into the waiting set of the owning cycle and leave.
    async fn list_or_epoch(
        self: Arc<Self>,
        session: Arc<ConsumerSession>,
        waiting: LoadSet,
        immediate: bool,
    ) {
        let mut wake_rx = {
            let mut loads = session.loads.lock();
            if !loads.waiting.is_empty() {
                loads.waiting.merge_from(waiting);
                return;
            }
            loads.waiting = waiting;
            let (tx, rx) = mpsc::channel(1);
            loads.wake = Some(tx);
            rx
        };

        // Lookups route on metadata; wait for a refresh so they route on
        // fresh state rather than whatever triggered the reload.
        if immediate {
            self.cluster.trigger_metadata_update_now();
        } else {
            self.cluster.trigger_metadata_update();
        }
        tokio::select! {
            _ = session.cancel.cancelled() => return,
            _ = wake_rx.recv() => {}
        }

        let loading = {
            let mut loads = session.loads.lock();
            let cycle = mem::take(&mut loads.waiting);
            loads.loading.merge_from(cycle.clone());
            loads.wake = None;
            cycle
        };

        let by_broker = self.group_by_broker(&loading);
        debug!(
            brokers = by_broker.len(),
            loads = loading.len(),
            "dispatching offset lookups"
        );

        let mut rpcs: JoinSet<Vec<LoadResult>> = JoinSet::new();
        for (broker, batch) in by_broker {
            for kind in [LoadKind::List, LoadKind::Epoch] {
                if batch.kind_is_empty(kind) {
                    continue;
                }
                let broker = broker.clone();
                let batch = batch.of_kind(kind);
                let isolation = self.config.isolation_level();
                rpcs.spawn(async move {
                    match kind {
                        LoadKind::List => list_offsets_rpc(broker, batch, isolation).await,
                        LoadKind::Epoch => epoch_load_rpc(broker, batch).await,
                    }
                });
            }
        }

        let mut results = Vec::new();
        loop {
            tokio::select! {
                // Dropping the join set aborts the in-flight lookups; the
                // session stop reclaims `loading`.
                _ = session.cancel.cancelled() => return,
                joined = rpcs.join_next() => match joined {
                    None => break,
                    Some(Ok(mut batch)) => results.append(&mut batch),
                    Some(Err(err)) => warn!(error = %err, "offset lookup task failed"),
                }
            }
        }

        let mut reload = LoadSet::default();
        let mut made_usable = false;
        {
            let mut state = tokio::select! {
                _ = session.cancel.cancelled() => return,
                state = self.state.lock() => state,
            };
            // The stop path owns the pending loads from the moment the
            // session is cancelled; results from a dead era must not touch
            // the reshaped cursor set.
            if session.cancel.is_cancelled() {
                return;
            }

            let topics = self.cluster.load_topics();
            for result in &results {
                self.apply_load_result(&mut state, &topics, result, &mut reload, &mut made_usable);
            }

            let mut loads = session.loads.lock();
            for result in &results {
                loads.loading.remove_load(&result.topic, result.partition);
            }
        }

        if made_usable {
            let sources: Vec<_> = self.sources.lock().clone();
            for source in &sources {
                source.maybe_consume();
            }
        }

        if !reload.is_empty() {
            debug!(pending = reload.len(), "retrying offset lookups");
            self.load_with_session(session, reload, false);
        }
    }

    /// Routes each pending load to the broker that should answer it:
    /// the requested replica, else the partition leader, else the seed
    /// fallback while the leader is unknown. Stamps each load with the
    /// leader epoch metadata currently reports.
    fn group_by_broker(&self, loading: &LoadSet) -> Vec<(Arc<dyn Broker>, LoadSet)> {
        let topics = self.cluster.load_topics();
        let mut grouped: HashMap<i32, (Arc<dyn Broker>, LoadSet)> = HashMap::new();

        for (topic, partition, kind, load) in loading.iter() {
            let mut load = *load;
            let mut broker = None;
            if let Some(meta) = topics.get(topic).and_then(|t| t.partition(partition)) {
                load.offset.current_epoch = meta.leader_epoch;
                let target = if load.replica != -1 {
                    load.replica
                } else {
                    meta.leader
                };
                broker = self.cluster.broker(target);
            }
            let broker = broker.unwrap_or_else(|| self.cluster.seed_broker());

            grouped
                .entry(broker.id())
                .or_insert_with(|| (broker, LoadSet::default()))
                .1
                .add_load(topic, partition, kind, load);
        }

        grouped.into_values().collect()
    }

    fn apply_load_result(
        &self,
        state: &mut ConsumerState,
        topics: &HashMap<String, TopicMetadata>,
        result: &LoadResult,
        reload: &mut LoadSet,
        made_usable: &mut bool,
    ) {
        let meta = topics
            .get(&result.topic)
            .and_then(|t| t.partition(result.partition));

        match &result.outcome {
            Outcome::Retry { err } => {
                debug!(
                    topic = %result.topic,
                    partition = result.partition,
                    error = %err,
                    "offset lookup will retry"
                );
                reload.add_load(&result.topic, result.partition, result.kind, result.load);
            }
            Outcome::Fail { err } => {
                warn!(
                    topic = %result.topic,
                    partition = result.partition,
                    error = %err,
                    "offset lookup failed"
                );
                self.inject_fake_fetch(&result.topic, result.partition, err.clone());
            }
            Outcome::Set {
                offset,
                leader_epoch,
            } => match meta {
                Some(meta) => {
                    meta.cursor.set_offset(*offset, *leader_epoch);
                    meta.cursor.allow_usable();
                    state
                        .cursors
                        .insert((result.topic.clone(), result.partition), meta.cursor.clone());
                    *made_usable = true;
                }
                // The partition fell out of metadata while the lookup was
                // in flight; retry against the next refresh.
                None => reload.add_load(&result.topic, result.partition, result.kind, result.load),
            },
            Outcome::DataLoss {
                reset,
                leader_epoch,
            } => match meta {
                Some(meta) => {
                    warn!(
                        topic = %result.topic,
                        partition = result.partition,
                        requested = result.load.offset.at,
                        reset,
                        "data loss detected, rewinding fetch position"
                    );
                    // The user sees the loss once, then consumption
                    // resumes from the last offset the log still has.
                    self.inject_fake_fetch(
                        &result.topic,
                        result.partition,
                        Error::DataLoss { end_offset: *reset },
                    );
                    meta.cursor
                        .set_offset(result.load.offset.at.min(*reset), *leader_epoch);
                    meta.cursor.allow_usable();
                    state
                        .cursors
                        .insert((result.topic.clone(), result.partition), meta.cursor.clone());
                    *made_usable = true;
                }
                // No cursor to rewind; retry and let the next cycle
                // re-detect and report the truncation.
                None => reload.add_load(&result.topic, result.partition, result.kind, result.load),
            },
        }
    }
}

async fn list_offsets_rpc(
    broker: Arc<dyn Broker>,
    batch: LoadSet,
    isolation: IsolationLevel,
) -> Vec<LoadResult> {
    let req = build_list_offsets(&batch, isolation);
    debug!(broker = broker.id(), partitions = batch.len(), "issuing list-offsets");
    match broker.list_offsets(req).await {
        Ok(resp) => handle_list_offsets(batch, resp),
        Err(err) => fail_all(batch, err),
    }
}

async fn epoch_load_rpc(broker: Arc<dyn Broker>, batch: LoadSet) -> Vec<LoadResult> {
    let req = build_epoch_load(&batch);
    debug!(broker = broker.id(), partitions = batch.len(), "issuing epoch lookup");
    match broker.offset_for_leader_epoch(req).await {
        Ok(resp) => handle_epoch_load(batch, resp),
        Err(err) => fail_all(batch, err),
    }
}

fn build_list_offsets(batch: &LoadSet, isolation: IsolationLevel) -> ListOffsetsRequest {
    let mut topics: HashMap<String, Vec<ListOffsetsRequestPartition>> = HashMap::new();
    for (topic, partition, _, load) in batch.iter() {
        // Exact positions are listed as "end" purely to force the broker
        // to load the partition; the listed offset is discarded in favor
        // of the exact position when the response is handled.
        let timestamp = if load.offset.at >= 0 {
            LIST_LATEST
        } else {
            load.offset.at
        };
        topics
            .entry(topic.to_string())
            .or_default()
            .push(ListOffsetsRequestPartition {
                partition_index: partition,
                current_leader_epoch: load.offset.current_epoch,
                timestamp,
                max_num_offsets: 1,
            });
    }
    ListOffsetsRequest {
        replica_id: -1,
        isolation_level: isolation,
        topics: topics
            .into_iter()
            .map(|(topic, partitions)| ListOffsetsRequestTopic { topic, partitions })
            .collect(),
    }
}

fn build_epoch_load(batch: &LoadSet) -> OffsetForLeaderEpochRequest {
    let mut topics: HashMap<String, Vec<OffsetForLeaderEpochRequestPartition>> = HashMap::new();
    for (topic, partition, _, load) in batch.iter() {
        topics
            .entry(topic.to_string())
            .or_default()
            .push(OffsetForLeaderEpochRequestPartition {
                partition,
                current_leader_epoch: load.offset.current_epoch,
                leader_epoch: load.offset.epoch,
            });
    }
    OffsetForLeaderEpochRequest {
        replica_id: -1,
        topics: topics
            .into_iter()
            .map(|(topic, partitions)| OffsetForLeaderEpochRequestTopic { topic, partitions })
            .collect(),
    }
}

fn handle_list_offsets(mut batch: LoadSet, resp: ListOffsetsResponse) -> Vec<LoadResult> {
    let mut out = Vec::new();
    for topic in resp.topics {
        for partition in topic.partitions {
            let Some((kind, load)) = batch.take_load(&topic.topic, partition.partition_index)
            else {
                continue;
            };
            let outcome = match ErrorCode::from_code(partition.error_code) {
                Some(code) if code.is_retriable() => Outcome::Retry {
                    err: Error::Code(code),
                },
                Some(code) => Outcome::Fail {
                    err: Error::Code(code),
                },
                None => {
                    // v0 brokers answer with the old-style offset array.
                    let listed = if partition.offset != 0 {
                        partition.offset
                    } else {
                        partition.old_style_offsets.first().copied().unwrap_or(0)
                    };
                    let base = if load.offset.at >= 0 {
                        load.offset.at
                    } else {
                        listed
                    };
                    Outcome::Set {
                        offset: (base + load.offset.relative).max(0),
                        leader_epoch: partition.leader_epoch,
                    }
                }
            };
            out.push(LoadResult {
                topic: topic.topic.clone(),
                partition: partition.partition_index,
                kind,
                load,
                outcome,
            });
        }
    }
    out.extend(synthesize_unknown(batch));
    out
}

fn handle_epoch_load(mut batch: LoadSet, resp: OffsetForLeaderEpochResponse) -> Vec<LoadResult> {
    let mut out = Vec::new();
    for topic in resp.topics {
        for partition in topic.partitions {
            let Some((kind, load)) = batch.take_load(&topic.topic, partition.partition) else {
                continue;
            };
            let outcome = match ErrorCode::from_code(partition.error_code) {
                Some(code) if code.is_retriable() => Outcome::Retry {
                    err: Error::Code(code),
                },
                Some(code) => Outcome::Fail {
                    err: Error::Code(code),
                },
                // The epoch's end offset below the requested position
                // means records the client consumed no longer exist.
                None if partition.end_offset < load.offset.at => Outcome::DataLoss {
                    reset: partition.end_offset,
                    leader_epoch: partition.leader_epoch,
                },
                None => Outcome::Set {
                    offset: load.offset.at,
                    leader_epoch: partition.leader_epoch,
                },
            };
            out.push(LoadResult {
                topic: topic.topic.clone(),
                partition: partition.partition,
                kind,
                load,
                outcome,
            });
        }
    }
    out.extend(synthesize_unknown(batch));
    out
}

/// Partitions the broker silently omitted from its response are reported
/// as unknown so they retry on the next cycle.
fn synthesize_unknown(remaining: LoadSet) -> Vec<LoadResult> {
    remaining
        .iter()
        .map(|(topic, partition, kind, load)| LoadResult {
            topic: topic.to_string(),
            partition,
            kind,
            load: *load,
            outcome: Outcome::Retry {
                err: Error::Code(ErrorCode::UnknownTopicOrPartition),
            },
        })
        .collect()
}

fn fail_all(batch: LoadSet, err: Error) -> Vec<LoadResult> {
    let retriable = err.is_retriable();
    batch
        .iter()
        .map(|(topic, partition, kind, load)| LoadResult {
            topic: topic.to_string(),
            partition,
            kind,
            load: *load,
            outcome: if retriable {
                Outcome::Retry { err: err.clone() }
            } else {
                Outcome::Fail { err: err.clone() }
            },
        })
        .collect()
}
