//! Direct (non-group) assignment driving.

use crate::group::{Assignments, DirectAssignor};
use crate::metadata::TopicMetadata;
use client_core::{ConsumerConfig, Offset};
use parking_lot::Mutex;
use regex::Regex;
use std::collections::{HashMap, HashSet};

/// Matches metadata topics against an explicit list and/or a regex and
/// assigns every partition of a matched topic at a fixed start offset.
///
/// Partitions are assigned once; later metadata updates only yield
/// partitions not seen before, so growing a topic picks up the new
/// partitions without disturbing the old ones.
pub struct TopicSelector {
    topics: HashSet<String>,
    pattern: Option<Regex>,
    start: Offset,
    assigned: Mutex<HashMap<String, HashSet<i32>>>,
}

impl TopicSelector {
    pub fn new(topics: impl IntoIterator<Item = String>, pattern: Option<Regex>, start: Offset) -> Self {
        Self {
            topics: topics.into_iter().collect(),
            pattern,
            start,
            assigned: Mutex::new(HashMap::new()),
        }
    }

    /// Builds a selector from the config's topic list and regex, starting
    /// new partitions at `start`.
    pub fn from_config(config: &ConsumerConfig, start: Offset) -> Result<Self, regex::Error> {
        let pattern = config.topic_regex.as_deref().map(Regex::new).transpose()?;
        Ok(Self::new(config.topics.iter().cloned(), pattern, start))
    }

    fn matches(&self, topic: &str) -> bool {
        self.topics.contains(topic)
            || self.pattern.as_ref().is_some_and(|re| re.is_match(topic))
    }
}

impl DirectAssignor for TopicSelector {
    fn find_new_assignments(&self, topics: &HashMap<String, TopicMetadata>) -> Assignments {
        let mut assigned = self.assigned.lock();
        let mut new: Assignments = Assignments::new();

        for (topic, meta) in topics {
            if !self.matches(topic) {
                continue;
            }
            let seen = assigned.entry(topic.clone()).or_default();
            for partition in &meta.partitions {
                if seen.insert(partition.partition) {
                    new.entry(topic.clone())
                        .or_default()
                        .insert(partition.partition, self.start);
                }
            }
        }

        new
    }
}
