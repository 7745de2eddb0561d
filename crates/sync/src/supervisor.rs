//! Connection supervision: connect, subscribe, resync, repeat.
//!
//! The supervisor owns the engine's single writer task. Per session it
//! opens the socket, starts the keep-alive, issues `listen` to turn on
//! server push, loads a snapshot for the selected experiment, then
//! drains notifications and UI commands from one queue. When the
//! socket drops it redials with growing waits and forces a full
//! snapshot reload -- missed events are never replayed, the server is
//! not assumed to retain history.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::sync::{mpsc, RwLock};
use tokio_util::sync::CancellationToken;

use expwatch_rpc::{connect, ServerProxy, SocketConnection};

use crate::actions;
use crate::backoff::BackoffPolicy;
use crate::engine::SyncEngine;
use crate::events::{ChangeBus, ChangeEvent};
use crate::notifications::{parse_event, EventParseError};
use crate::snapshot::{self, Snapshot};
use crate::SyncError;

/// Keep-alive period expected by the scheduler.
pub const PING_INTERVAL: Duration = Duration::from_secs(120);

/// Requests sent from the [`Monitor`](crate::Monitor) handle to the
/// supervisor task (the engine's only writer).
#[derive(Debug)]
pub(crate) enum Command {
    /// Switch the view to the latest run of the named experiment.
    LoadExperiment { name: String },
}

pub(crate) struct SupervisorConfig {
    pub ws_url: String,
    pub initial_experiment: Option<String>,
    pub ping_interval: Duration,
    pub reconnect: BackoffPolicy,
}

/// Shared record of which experiment the user currently wants on
/// screen. Updated by the `Monitor` handle the moment a switch is
/// requested, so that a slow in-flight snapshot can detect it has
/// been superseded.
pub(crate) type Selection = Arc<RwLock<Option<String>>>;

/// Run the supervision loop until the token is cancelled.
pub(crate) async fn run(
    config: SupervisorConfig,
    engine: Arc<RwLock<SyncEngine>>,
    proxy: Arc<ServerProxy>,
    bus: ChangeBus,
    selection: Selection,
    mut commands: mpsc::Receiver<Command>,
    cancel: CancellationToken,
) {
    loop {
        let Some(conn) = establish(&config.ws_url, &config.reconnect, &cancel).await else {
            return; // shutdown requested mid-dial
        };

        run_session(
            &config,
            conn,
            &engine,
            &proxy,
            &bus,
            &selection,
            &mut commands,
            &cancel,
        )
        .await;

        proxy.detach().await;
        bus.publish(ChangeEvent::ConnectionLost);

        if cancel.is_cancelled() {
            return;
        }
    }
}

/// Dial until a connection is established or shutdown is requested.
///
/// The first attempt is immediate; each failure lengthens the wait per
/// the backoff policy. The failure count starts over on every call,
/// i.e. whenever a previous session actually ran.
async fn establish(
    ws_url: &str,
    policy: &BackoffPolicy,
    cancel: &CancellationToken,
) -> Option<SocketConnection> {
    let mut failures = 0u32;
    loop {
        if cancel.is_cancelled() {
            return None;
        }

        let error = tokio::select! {
            _ = cancel.cancelled() => return None,
            result = connect(ws_url) => match result {
                Ok(conn) => return Some(conn),
                Err(e) => e,
            },
        };

        failures = failures.saturating_add(1);
        let wait = policy.wait_after(failures);
        tracing::warn!(
            error = %error,
            failures,
            wait_ms = wait.as_millis() as u64,
            "Dial failed, waiting before retry",
        );

        tokio::select! {
            _ = cancel.cancelled() => return None,
            _ = tokio::time::sleep(wait) => {}
        }
    }
}

/// Drive one connected session until the socket drops or shutdown.
#[allow(clippy::too_many_arguments)]
async fn run_session(
    config: &SupervisorConfig,
    conn: SocketConnection,
    engine: &Arc<RwLock<SyncEngine>>,
    proxy: &Arc<ServerProxy>,
    bus: &ChangeBus,
    selection: &Selection,
    commands: &mut mpsc::Receiver<Command>,
    cancel: &CancellationToken,
) {
    let SocketConnection {
        handle,
        mut notifications,
    } = conn;

    proxy.attach(handle.clone()).await;
    bus.publish(ChangeEvent::ConnectionOpened);

    // Keep-alive: the scheduler drops silent sockets.
    let ping_cancel = cancel.child_token();
    spawn_keepalive(handle.clone(), config.ping_interval, ping_cancel.clone());

    // Subscribe this channel to server push before the first snapshot,
    // so no event can slip between the two.
    if let Err(e) = handle.call("listen", json!({})).await {
        tracing::warn!(error = %e, "listen call failed, push events may not arrive");
    }

    match actions::hostname(proxy).await {
        Ok(host) => tracing::info!(host = %host, "Monitoring scheduler"),
        Err(e) => tracing::debug!(error = %e, "hostname call failed"),
    }

    // Resolve the experiment to display, then load it. A reconnect
    // keeps the previous selection and simply resyncs it.
    if let Some(name) = resolve_selection(config, proxy, selection).await {
        load_experiment(engine, proxy, bus, selection, &name, 0).await;
    }

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,

            command = commands.recv() => match command {
                Some(Command::LoadExperiment { name }) => {
                    load_experiment(engine, proxy, bus, selection, &name, 0).await;
                }
                // Monitor handle dropped: nobody can observe us anymore.
                None => break,
            },

            payload = notifications.recv() => match payload {
                Some(payload) => {
                    let reload = match parse_event(payload) {
                        Ok(event) => engine.write().await.apply(event),
                        Err(EventParseError::MissingTag) => {
                            // Some other server chatter; not an event.
                            tracing::debug!("Push without event tag, ignored");
                            None
                        }
                        Err(e @ EventParseError::UnknownTag(_)) => {
                            tracing::warn!("{e}");
                            None
                        }
                        Err(e @ EventParseError::Malformed { .. }) => {
                            tracing::warn!("{e}");
                            None
                        }
                    };
                    if let Some(reload) = reload {
                        load_experiment(engine, proxy, bus, selection, &reload.name, reload.timestamp)
                            .await;
                    }
                }
                None => {
                    tracing::info!("Notification stream closed");
                    break;
                }
            },
        }
    }

    ping_cancel.cancel();
}

/// Determine which experiment to show: the current selection, the
/// configured default, or the server's most recent experiment.
async fn resolve_selection(
    config: &SupervisorConfig,
    proxy: &ServerProxy,
    selection: &Selection,
) -> Option<String> {
    if let Some(name) = selection.read().await.clone() {
        return Some(name);
    }

    let name = match &config.initial_experiment {
        Some(name) => Some(name.clone()),
        None => match actions::latest_experiment_names(proxy).await {
            Ok(names) => names.into_iter().next(),
            Err(e) => {
                tracing::warn!(error = %e, "Could not list experiments");
                None
            }
        },
    };

    match name {
        Some(name) => {
            *selection.write().await = Some(name.clone());
            Some(name)
        }
        None => {
            tracing::warn!("No experiment to monitor");
            None
        }
    }
}

/// One full snapshot load cycle.
///
/// The engine keeps serving the previous view until the snapshot
/// arrives; a failed or superseded load leaves the store untouched.
async fn load_experiment(
    engine: &Arc<RwLock<SyncEngine>>,
    proxy: &ServerProxy,
    bus: &ChangeBus,
    selection: &Selection,
    name: &str,
    timestamp: i64,
) {
    engine.write().await.begin_load(name);
    let result = snapshot::fetch(proxy, name, timestamp).await;
    finish_load(engine, bus, selection, name, result).await;
}

/// Second half of a load cycle: apply the fetched snapshot, unless the
/// user switched views while the call was in flight. The transport
/// does not cancel an in-flight call, so the result is discarded
/// instead (stale-response guard).
async fn finish_load(
    engine: &Arc<RwLock<SyncEngine>>,
    bus: &ChangeBus,
    selection: &Selection,
    name: &str,
    result: Result<Snapshot, SyncError>,
) {
    let still_selected = selection.read().await.as_deref() == Some(name);
    if !still_selected {
        tracing::info!(experiment = name, "Snapshot superseded by a newer selection, discarded");
        return;
    }

    match result {
        Ok(snapshot) => {
            engine.write().await.apply_snapshot(name, snapshot);
        }
        Err(e) => {
            tracing::error!(experiment = name, error = %e, "Snapshot load failed");
            engine.write().await.abort_load();
            bus.publish(ChangeEvent::ExperimentLoadFailed {
                name: name.to_string(),
                error: e.to_string(),
            });
        }
    }
}

/// Periodic `ping` notification so the scheduler keeps the socket.
fn spawn_keepalive(
    handle: expwatch_rpc::SocketHandle,
    period: Duration,
    cancel: CancellationToken,
) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        // The first tick fires immediately; the connection is fresh.
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    if handle.notify("ping", json!({})).await.is_err() {
                        break; // connection gone, session will notice
                    }
                    tracing::debug!("Sent keep-alive ping");
                }
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::LoadPhase;

    fn sample_snapshot() -> Snapshot {
        serde_json::from_str(
            r#"{
                "experiment": {"timestamp": 100},
                "tasks": {"1": "tokenize"},
                "resources": [{"id": 1, "state": "running", "taskid": 1, "locator": "/jobs/1"}]
            }"#,
        )
        .unwrap()
    }

    fn setup(selected: &str) -> (Arc<RwLock<SyncEngine>>, ChangeBus, Selection) {
        let bus = ChangeBus::new();
        let engine = Arc::new(RwLock::new(SyncEngine::new(bus.clone())));
        let selection: Selection = Arc::new(RwLock::new(Some(selected.to_string())));
        (engine, bus, selection)
    }

    #[tokio::test]
    async fn snapshot_for_superseded_selection_is_discarded() {
        let (engine, bus, selection) = setup("newer");
        engine.write().await.begin_load("older");

        finish_load(&engine, &bus, &selection, "older", Ok(sample_snapshot())).await;

        let engine = engine.read().await;
        assert!(engine.experiment().is_none());
        assert!(engine.store().is_empty());
    }

    #[tokio::test]
    async fn snapshot_matching_selection_is_applied() {
        let (engine, bus, selection) = setup("ranking");
        engine.write().await.begin_load("ranking");

        finish_load(&engine, &bus, &selection, "ranking", Ok(sample_snapshot())).await;

        let engine = engine.read().await;
        assert_eq!(engine.experiment().unwrap().name, "ranking");
        assert_eq!(engine.store().len(), 1);
    }

    #[tokio::test]
    async fn failed_load_keeps_the_previous_view() {
        let (engine, bus, selection) = setup("ranking");
        engine.write().await.begin_load("ranking");
        finish_load(&engine, &bus, &selection, "ranking", Ok(sample_snapshot())).await;

        engine.write().await.begin_load("ranking");
        finish_load(
            &engine,
            &bus,
            &selection,
            "ranking",
            Err(SyncError::Terminated),
        )
        .await;

        let engine = engine.read().await;
        assert_eq!(engine.phase(), LoadPhase::Ready);
        assert_eq!(engine.store().len(), 1);
    }

    #[tokio::test]
    async fn establish_stops_on_shutdown() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let policy = BackoffPolicy::default();
        let conn = establish("ws://127.0.0.1:1/web-socket", &policy, &cancel).await;
        assert!(conn.is_none());
    }
}
