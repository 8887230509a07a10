//! Consumer configuration.

use broker_protocol::IsolationLevel;
use serde::{Deserialize, Serialize};

/// Consumer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsumerConfig {
    /// Transactional record visibility (`read_uncommitted` or
    /// `read_committed`).
    #[serde(default = "default_isolation")]
    pub isolation: String,

    /// Topics to consume when driving assignments directly.
    #[serde(default)]
    pub topics: Vec<String>,

    /// Regex matched against metadata topic names when driving assignments
    /// directly; combined with `topics`.
    #[serde(default)]
    pub topic_regex: Option<String>,
}

fn default_isolation() -> String {
    "read_uncommitted".to_string()
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            isolation: default_isolation(),
            topics: Vec::new(),
            topic_regex: None,
        }
    }
}

impl ConsumerConfig {
    /// The configured isolation level; unrecognized values fall back to
    /// `read_uncommitted`.
    pub fn isolation_level(&self) -> IsolationLevel {
        match self.isolation.as_str() {
            "read_committed" => IsolationLevel::ReadCommitted,
            _ => IsolationLevel::ReadUncommitted,
        }
    }
}
