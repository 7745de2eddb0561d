//! Shared identifier types.

use serde::{Deserialize, Serialize};

/// Server-side resource (job) id.
pub type ResourceId = i64;

/// Server-side task instance id.
pub type TaskId = i64;

/// Identity of one experiment run.
///
/// The server may hold several runs of the same experiment name; the
/// `timestamp` (milliseconds since epoch) pins one of them. The client
/// tracks exactly one active `ExperimentId` at a time and drops any
/// notification tagged with a different one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExperimentId {
    pub name: String,
    pub timestamp: i64,
}

impl ExperimentId {
    pub fn new(name: impl Into<String>, timestamp: i64) -> Self {
        Self {
            name: name.into(),
            timestamp,
        }
    }
}

impl std::fmt::Display for ExperimentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.name, self.timestamp)
    }
}
