//! Fetched records and the batch types returned to users.

use crate::error::Error;
use bytes::Bytes;

/// A single record fetched from a partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// The record's offset in its partition.
    pub offset: i64,

    /// The broker-assigned timestamp, in milliseconds since the epoch.
    pub timestamp: i64,

    /// The record key, if any.
    pub key: Option<Bytes>,

    /// The record value, if any.
    pub value: Option<Bytes>,

    /// The leader epoch the record was written in; `-1` if unknown.
    pub leader_epoch: i32,
}

/// Records and/or an error fetched from one partition.
#[derive(Debug, Clone, Default)]
pub struct FetchPartition {
    /// The partition index.
    pub partition: i32,

    /// A fatal per-partition condition the user must observe. Set on
    /// synthetic error fetches; real fetches may also carry one alongside
    /// records.
    pub err: Option<Error>,

    /// The offset one past the last record in the partition.
    pub high_watermark: i64,

    /// The records fetched, in broker-supplied order.
    pub records: Vec<Record>,
}

/// Fetched partitions of one topic.
#[derive(Debug, Clone, Default)]
pub struct FetchTopic {
    pub topic: String,
    pub partitions: Vec<FetchPartition>,
}

/// One source's worth of fetched data.
#[derive(Debug, Clone, Default)]
pub struct Fetch {
    pub topics: Vec<FetchTopic>,
}

impl Fetch {
    /// A synthetic fetch carrying only a partition error, used to surface
    /// fatal per-partition conditions even when no records are involved.
    pub fn partition_error(topic: impl Into<String>, partition: i32, err: Error) -> Self {
        Self {
            topics: vec![FetchTopic {
                topic: topic.into(),
                partitions: vec![FetchPartition {
                    partition,
                    err: Some(err),
                    ..FetchPartition::default()
                }],
            }],
        }
    }

    fn record_count(&self) -> usize {
        self.topics
            .iter()
            .flat_map(|t| &t.partitions)
            .map(|p| p.records.len())
            .sum()
    }
}

/// A partition error surfaced through [`Fetches::errors`].
#[derive(Debug, Clone)]
pub struct FetchError {
    pub topic: String,
    pub partition: i32,
    pub err: Error,
}

/// The batch of fetches returned by one poll.
#[derive(Debug, Default)]
pub struct Fetches(Vec<Fetch>);

impl Fetches {
    pub fn push(&mut self, fetch: Fetch) {
        self.0.push(fetch);
    }

    pub fn extend(&mut self, fetches: impl IntoIterator<Item = Fetch>) {
        self.0.extend(fetches);
    }

    /// Whether the batch contains no records and no errors.
    pub fn is_empty(&self) -> bool {
        self.0
            .iter()
            .all(|f| f.topics.iter().all(|t| {
                t.partitions.iter().all(|p| p.records.is_empty() && p.err.is_none())
            }))
    }

    /// The total number of records in the batch.
    pub fn record_count(&self) -> usize {
        self.0.iter().map(Fetch::record_count).sum()
    }

    /// Every per-partition error in the batch.
    ///
    /// Fatal conditions (data loss, non-retriable broker errors) are only
    /// delivered this way; callers that ignore errors silently skip the
    /// affected partitions.
    pub fn errors(&self) -> Vec<FetchError> {
        let mut errs = Vec::new();
        for fetch in &self.0 {
            for topic in &fetch.topics {
                for partition in &topic.partitions {
                    if let Some(err) = &partition.err {
                        errs.push(FetchError {
                            topic: topic.topic.clone(),
                            partition: partition.partition,
                            err: err.clone(),
                        });
                    }
                }
            }
        }
        errs
    }

    /// Iterates every record in the batch, in per-partition order.
    pub fn records(&self) -> impl Iterator<Item = (&str, i32, &Record)> {
        self.0.iter().flat_map(|f| {
            f.topics.iter().flat_map(|t| {
                t.partitions.iter().flat_map(move |p| {
                    p.records.iter().map(move |r| (t.topic.as_str(), p.partition, r))
                })
            })
        })
    }

    /// The raw fetches in the batch.
    pub fn as_slice(&self) -> &[Fetch] {
        &self.0
    }
}
