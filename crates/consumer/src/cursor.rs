//! Per-partition fetch positions.

use parking_lot::Mutex;

#[derive(Debug, Clone, Copy)]
struct Position {
    offset: i64,
    last_consumed_epoch: i32,
    usable: bool,
}

/// The mutable fetch position of one partition.
///
/// A cursor is owned by the partition's metadata and shared with the
/// consumer core, which decides when it is eligible for fetching. Sources
/// only fetch through cursors that are currently usable.
#[derive(Debug)]
pub struct Cursor {
    topic: String,
    partition: i32,
    position: Mutex<Position>,
}

impl Cursor {
    pub fn new(topic: impl Into<String>, partition: i32) -> Self {
        Self {
            topic: topic.into(),
            partition,
            position: Mutex::new(Position {
                offset: -1,
                last_consumed_epoch: -1,
                usable: false,
            }),
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn partition(&self) -> i32 {
        self.partition
    }

    /// Overwrites the next-fetch position.
    pub fn set_offset(&self, offset: i64, last_consumed_epoch: i32) {
        let mut pos = self.position.lock();
        pos.offset = offset;
        pos.last_consumed_epoch = last_consumed_epoch;
    }

    /// Marks the cursor eligible for fetching.
    pub fn allow_usable(&self) {
        self.position.lock().usable = true;
    }

    /// Marks the cursor ineligible and drops its position.
    pub fn unset(&self) {
        let mut pos = self.position.lock();
        pos.offset = -1;
        pos.last_consumed_epoch = -1;
        pos.usable = false;
    }

    pub fn is_usable(&self) -> bool {
        self.position.lock().usable
    }

    /// The next offset to fetch and the epoch it was last consumed in.
    pub fn position(&self) -> (i64, i32) {
        let pos = self.position.lock();
        (pos.offset, pos.last_consumed_epoch)
    }
}
