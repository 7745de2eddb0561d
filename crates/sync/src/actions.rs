//! User-triggered scheduler calls.
//!
//! Thin wrappers over the transport that name the server's methods and
//! parameter shapes in one place. Protocol errors are returned to the
//! caller (a failed `kill` is that caller's notice to show); they never
//! touch the resource store, which is updated only by the server's own
//! push events after the action takes effect.

use serde::Deserialize;
use serde_json::json;

use expwatch_core::ResourceId;
use expwatch_rpc::ServerProxy;

use crate::SyncError;

/// Invalidate resources so the scheduler re-runs them.
///
/// Returns the number of jobs restarted. `keep_done` preserves
/// finished outputs; `restart` asks the scheduler to requeue.
pub async fn invalidate(
    proxy: &ServerProxy,
    ids: &[ResourceId],
    keep_done: bool,
    recursive: bool,
    restart: bool,
) -> Result<i64, SyncError> {
    let reply = proxy
        .call(
            "invalidate",
            json!({
                "ids": ids,
                "keep-done": keep_done,
                "recursive": recursive,
                "restart": restart,
            }),
        )
        .await?;
    Ok(serde_json::from_value(reply)?)
}

/// Restart one job, recursively invalidating its dependents.
///
/// `restart_done` must be confirmed by the user when the job already
/// finished, since it throws the finished output away.
pub async fn restart_job(
    proxy: &ServerProxy,
    id: ResourceId,
    restart_done: bool,
) -> Result<i64, SyncError> {
    invalidate(proxy, &[id], !restart_done, true, true).await
}

/// Delete one resource. The store is updated when the server's
/// `RESOURCE_REMOVED` push arrives, not optimistically.
pub async fn remove_resource(
    proxy: &ServerProxy,
    id: ResourceId,
    recursive: bool,
) -> Result<(), SyncError> {
    proxy
        .call("remove", json!({ "id": id, "recursive": recursive }))
        .await?;
    Ok(())
}

/// Kill running jobs. Like `remove`, the state change arrives by push.
pub async fn kill_jobs(proxy: &ServerProxy, ids: &[ResourceId]) -> Result<(), SyncError> {
    proxy.call("kill", json!({ "jobs": ids })).await?;
    Ok(())
}

/// Full details of one resource, as an opaque JSON document for the
/// detail view.
pub async fn resource_information(
    proxy: &ServerProxy,
    id: ResourceId,
) -> Result<serde_json::Value, SyncError> {
    Ok(proxy
        .call("getResourceInformation", json!({ "id": id }))
        .await?)
}

/// The scheduler host's name.
pub async fn hostname(proxy: &ServerProxy) -> Result<String, SyncError> {
    let reply = proxy.call("hostname", json!({})).await?;
    Ok(serde_json::from_value(reply)?)
}

/// Names of the most recent experiments, newest first.
pub async fn latest_experiment_names(proxy: &ServerProxy) -> Result<Vec<String>, SyncError> {
    #[derive(Deserialize)]
    struct Entry {
        identifier: String,
    }

    let reply = proxy.call("experiments.latest-names", json!({})).await?;
    let entries: Vec<Entry> = serde_json::from_value(reply)?;
    Ok(entries.into_iter().map(|e| e.identifier).collect())
}
