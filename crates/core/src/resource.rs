//! Resource records and their wire representation.

use serde::{Deserialize, Deserializer};

use crate::state::ResourceState;
use crate::types::{ResourceId, TaskId};

/// One tracked job, as held by the resource store.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceRecord {
    /// Stable identifier, unique across the store's lifetime.
    pub id: ResourceId,
    /// Current lifecycle state.
    pub state: ResourceState,
    /// Owning task instance, if any.
    pub task_id: Option<TaskId>,
    /// Progress fraction in `[0, 1]`; present only while a progress
    /// indicator is active.
    pub progress: Option<f64>,
    /// Display string (path/name). Immutable after creation.
    pub locator: String,
}

/// Wire shape of a resource, as delivered in snapshots and in
/// `RESOURCE_ADDED` payloads.
///
/// The server serializes ids as either JSON numbers or strings
/// depending on the code path, and states in arbitrary casing; both
/// are normalized here.
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceSeed {
    #[serde(deserialize_with = "id_from_number_or_string")]
    pub id: ResourceId,
    pub state: ResourceState,
    #[serde(default, rename = "taskid")]
    pub task_id: Option<TaskId>,
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default)]
    pub locator: String,
}

impl From<ResourceSeed> for ResourceRecord {
    fn from(seed: ResourceSeed) -> Self {
        // A progress indicator only makes sense for a running job;
        // snapshots occasionally carry stale zero values.
        let progress = match seed.progress {
            Some(p) if seed.state == ResourceState::Running && p > 0.0 => {
                Some(p.clamp(0.0, 1.0))
            }
            _ => None,
        };
        ResourceRecord {
            id: seed.id,
            state: seed.state,
            task_id: seed.task_id,
            progress,
            locator: seed.locator,
        }
    }
}

/// Deserialize an id the server may serialize as a JSON number or a
/// string. Also used by the notification payload types.
pub fn id_from_number_or_string<'de, D>(deserializer: D) -> Result<ResourceId, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(i64),
        String(String),
    }

    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => Ok(n),
        NumberOrString::String(s) => s.parse().map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_deserializes_with_numeric_id() {
        let seed: ResourceSeed = serde_json::from_str(
            r#"{"id": 42, "state": "RUNNING", "taskid": 7, "locator": "/data/jobs/42"}"#,
        )
        .unwrap();
        assert_eq!(seed.id, 42);
        assert_eq!(seed.state, ResourceState::Running);
        assert_eq!(seed.task_id, Some(7));
        assert_eq!(seed.locator, "/data/jobs/42");
    }

    #[test]
    fn seed_deserializes_with_string_id() {
        let seed: ResourceSeed =
            serde_json::from_str(r#"{"id": "42", "state": "done"}"#).unwrap();
        assert_eq!(seed.id, 42);
        assert!(seed.task_id.is_none());
    }

    #[test]
    fn record_keeps_progress_only_when_running() {
        let running: ResourceSeed = serde_json::from_str(
            r#"{"id": 1, "state": "running", "progress": 0.5, "locator": "a"}"#,
        )
        .unwrap();
        assert_eq!(ResourceRecord::from(running).progress, Some(0.5));

        let done: ResourceSeed =
            serde_json::from_str(r#"{"id": 2, "state": "done", "progress": 0.5}"#).unwrap();
        assert_eq!(ResourceRecord::from(done).progress, None);

        let idle: ResourceSeed =
            serde_json::from_str(r#"{"id": 3, "state": "running", "progress": 0.0}"#).unwrap();
        assert_eq!(ResourceRecord::from(idle).progress, None);
    }

    #[test]
    fn record_clamps_out_of_range_progress() {
        let seed: ResourceSeed =
            serde_json::from_str(r#"{"id": 4, "state": "running", "progress": 1.4}"#).unwrap();
        assert_eq!(ResourceRecord::from(seed).progress, Some(1.0));
    }
}
