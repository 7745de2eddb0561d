//! Initial snapshot of an experiment's resources.
//!
//! One `experiments.resources` call returns everything the client
//! needs to seed its mirror: the task table, the run's canonical
//! timestamp, and the full resource list. On failure the caller keeps
//! whatever view it had; nothing is cleared speculatively.

use std::collections::HashMap;

use chrono::{TimeZone, Utc};
use serde::Deserialize;
use serde_json::json;

use expwatch_core::{ResourceSeed, TaskId};
use expwatch_rpc::ServerProxy;

use crate::SyncError;

/// Wire shape of the `experiments.resources` reply.
#[derive(Debug, Deserialize)]
pub struct Snapshot {
    /// Task instance id -> display name.
    #[serde(default)]
    pub tasks: HashMap<TaskId, String>,
    pub experiment: SnapshotExperiment,
    #[serde(default)]
    pub resources: Vec<ResourceSeed>,
}

/// The experiment block of the reply; carries the canonical timestamp
/// used for staleness checks from then on.
#[derive(Debug, Deserialize)]
pub struct SnapshotExperiment {
    pub timestamp: i64,
}

/// Fetch the snapshot for `(name, timestamp)`.
///
/// `timestamp == 0` asks for the latest run of the experiment.
pub async fn fetch(proxy: &ServerProxy, name: &str, timestamp: i64) -> Result<Snapshot, SyncError> {
    let reply = proxy
        .call(
            "experiments.resources",
            json!({ "identifier": name, "timestamp": timestamp }),
        )
        .await?;

    let snapshot: Snapshot = serde_json::from_value(reply)?;

    let canonical = snapshot.experiment.timestamp;
    let when = Utc
        .timestamp_millis_opt(canonical)
        .single()
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| canonical.to_string());
    tracing::info!(
        experiment = name,
        timestamp = canonical,
        started = %when,
        resources = snapshot.resources.len(),
        tasks = snapshot.tasks.len(),
        "Snapshot loaded",
    );

    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use expwatch_core::ResourceState;

    #[test]
    fn deserializes_full_reply() {
        let snapshot: Snapshot = serde_json::from_str(
            r#"{
                "experiment": {"timestamp": 1700000000000},
                "tasks": {"1": "tokenize", "2": "train"},
                "resources": [
                    {"id": 10, "state": "RUNNING", "taskid": 1, "locator": "/jobs/10", "progress": 0.3},
                    {"id": 11, "state": "done", "taskid": 2, "locator": "/jobs/11"}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(snapshot.experiment.timestamp, 1700000000000);
        assert_eq!(snapshot.tasks.get(&1).map(String::as_str), Some("tokenize"));
        assert_eq!(snapshot.resources.len(), 2);
        assert_eq!(snapshot.resources[0].state, ResourceState::Running);
    }

    #[test]
    fn tasks_and_resources_default_to_empty() {
        let snapshot: Snapshot =
            serde_json::from_str(r#"{"experiment": {"timestamp": 5}}"#).unwrap();
        assert!(snapshot.tasks.is_empty());
        assert!(snapshot.resources.is_empty());
    }
}
