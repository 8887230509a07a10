//! Pending offset lookups, split by the RPC that resolves them.

use client_core::OffsetLoad;
use std::collections::HashMap;

/// Which RPC resolves a pending load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadKind {
    /// A list-offsets lookup (timestamp or start/end sentinel).
    List,
    /// An offset-for-leader-epoch lookup (truncation-checked exact).
    Epoch,
}

type TopicLoads = HashMap<String, HashMap<i32, OffsetLoad>>;

/// Pending offset lookups keyed by topic and partition.
///
/// A partition appears in at most one of the two sub-maps; inserting under
/// one kind removes any prior entry under the other.
#[derive(Debug, Clone, Default)]
pub struct LoadSet {
    list: TopicLoads,
    epoch: TopicLoads,
}

fn remove_from(map: &mut TopicLoads, topic: &str, partition: i32) -> Option<OffsetLoad> {
    let partitions = map.get_mut(topic)?;
    let removed = partitions.remove(&partition);
    if partitions.is_empty() {
        map.remove(topic);
    }
    removed
}

impl LoadSet {
    /// Inserts a load for `(topic, partition)` under `kind`, replacing any
    /// prior entry for the partition under either kind.
    pub fn add_load(&mut self, topic: &str, partition: i32, kind: LoadKind, load: OffsetLoad) {
        self.remove_load(topic, partition);
        let map = match kind {
            LoadKind::List => &mut self.list,
            LoadKind::Epoch => &mut self.epoch,
        };
        map.entry(topic.to_string())
            .or_default()
            .insert(partition, load);
    }

    /// Removes any pending load for `(topic, partition)`.
    pub fn remove_load(&mut self, topic: &str, partition: i32) {
        remove_from(&mut self.list, topic, partition);
        remove_from(&mut self.epoch, topic, partition);
    }

    /// Removes and returns the pending load for `(topic, partition)`.
    pub fn take_load(&mut self, topic: &str, partition: i32) -> Option<(LoadKind, OffsetLoad)> {
        if let Some(load) = remove_from(&mut self.list, topic, partition) {
            return Some((LoadKind::List, load));
        }
        remove_from(&mut self.epoch, topic, partition).map(|load| (LoadKind::Epoch, load))
    }

    /// Merges every load in `other` into this set, preserving each entry's
    /// kind. Entries from `other` win over existing ones.
    pub fn merge_from(&mut self, other: LoadSet) {
        for (topic, partitions) in other.list {
            for (partition, load) in partitions {
                self.add_load(&topic, partition, LoadKind::List, load);
            }
        }
        for (topic, partitions) in other.epoch {
            for (partition, load) in partitions {
                self.add_load(&topic, partition, LoadKind::Epoch, load);
            }
        }
    }

    /// Retains only the entries for which `pred(topic, partition)` is true.
    pub fn filter(&mut self, pred: impl Fn(&str, i32) -> bool) {
        for map in [&mut self.list, &mut self.epoch] {
            map.retain(|topic, partitions| {
                partitions.retain(|&partition, _| pred(topic, partition));
                !partitions.is_empty()
            });
        }
    }

    pub fn contains(&self, topic: &str, partition: i32) -> bool {
        let has = |map: &TopicLoads| {
            map.get(topic)
                .is_some_and(|partitions| partitions.contains_key(&partition))
        };
        has(&self.list) || has(&self.epoch)
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty() && self.epoch.is_empty()
    }

    pub fn len(&self) -> usize {
        let count = |map: &TopicLoads| map.values().map(HashMap::len).sum::<usize>();
        count(&self.list) + count(&self.epoch)
    }

    /// Iterates every pending load with its kind.
    pub fn iter(&self) -> impl Iterator<Item = (&str, i32, LoadKind, &OffsetLoad)> {
        let list = self.list.iter().flat_map(|(topic, partitions)| {
            partitions
                .iter()
                .map(move |(&partition, load)| (topic.as_str(), partition, LoadKind::List, load))
        });
        let epoch = self.epoch.iter().flat_map(|(topic, partitions)| {
            partitions
                .iter()
                .map(move |(&partition, load)| (topic.as_str(), partition, LoadKind::Epoch, load))
        });
        list.chain(epoch)
    }

    /// The loads of one kind, as their own set.
    pub fn of_kind(&self, kind: LoadKind) -> LoadSet {
        match kind {
            LoadKind::List => LoadSet {
                list: self.list.clone(),
                epoch: TopicLoads::default(),
            },
            LoadKind::Epoch => LoadSet {
                list: TopicLoads::default(),
                epoch: self.epoch.clone(),
            },
        }
    }

    pub(crate) fn kind_is_empty(&self, kind: LoadKind) -> bool {
        match kind {
            LoadKind::List => self.list.is_empty(),
            LoadKind::Epoch => self.epoch.is_empty(),
        }
    }
}
