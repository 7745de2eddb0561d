//! The public handle to the synchronization engine.
//!
//! [`Monitor::start`] spawns the connection supervisor and returns a
//! shared handle. The handle only ever reads the mirror (read locks)
//! or forwards mutation requests to the supervisor task, which is the
//! engine's single writer.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, RwLock};
use tokio_util::sync::CancellationToken;

use expwatch_core::{ExperimentId, ResourceId, ResourceRecord, StateCounters};
use expwatch_rpc::ServerProxy;

use crate::actions;
use crate::backoff::BackoffPolicy;
use crate::engine::SyncEngine;
use crate::events::{ChangeBus, ChangeEvent};
use crate::supervisor::{self, Command, Selection, SupervisorConfig, PING_INTERVAL};
use crate::SyncError;

/// Buffered UI commands before `load_experiment` applies backpressure.
const COMMAND_BUFFER: usize = 16;

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Scheduler WebSocket endpoint, e.g. `ws://host:12345/web-socket`.
    pub ws_url: String,
    /// Optional JSON-RPC HTTP endpoint used as a fallback for calls
    /// while the socket is down.
    pub http_url: Option<String>,
    /// Experiment to show first; defaults to the server's most recent.
    pub experiment: Option<String>,
    /// Keep-alive period.
    pub ping_interval: Duration,
    /// Retry pacing when the connection drops.
    pub reconnect: BackoffPolicy,
}

impl MonitorConfig {
    pub fn new(ws_url: impl Into<String>) -> Self {
        Self {
            ws_url: ws_url.into(),
            http_url: None,
            experiment: None,
            ping_interval: PING_INTERVAL,
            reconnect: BackoffPolicy::default(),
        }
    }
}

pub struct Monitor {
    engine: Arc<RwLock<SyncEngine>>,
    proxy: Arc<ServerProxy>,
    bus: ChangeBus,
    selection: Selection,
    commands: mpsc::Sender<Command>,
    cancel: CancellationToken,
}

impl Monitor {
    /// Spawn the supervisor and return a shared handle.
    ///
    /// The returned `Arc` can be cheaply cloned into whatever renders
    /// the view.
    pub fn start(config: MonitorConfig) -> Arc<Self> {
        let bus = ChangeBus::new();
        let engine = Arc::new(RwLock::new(SyncEngine::new(bus.clone())));
        let proxy = Arc::new(ServerProxy::new(config.http_url.clone()));
        let selection: Selection = Arc::new(RwLock::new(None));
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let cancel = CancellationToken::new();

        let supervisor_config = SupervisorConfig {
            ws_url: config.ws_url,
            initial_experiment: config.experiment,
            ping_interval: config.ping_interval,
            reconnect: config.reconnect,
        };

        tokio::spawn(supervisor::run(
            supervisor_config,
            Arc::clone(&engine),
            Arc::clone(&proxy),
            bus.clone(),
            Arc::clone(&selection),
            command_rx,
            cancel.clone(),
        ));

        Arc::new(Self {
            engine,
            proxy,
            bus,
            selection,
            commands: command_tx,
            cancel,
        })
    }

    /// Subscribe to change events.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.bus.subscribe()
    }

    /// Switch the view to the latest run of the named experiment.
    ///
    /// Recorded immediately so that any in-flight snapshot for the
    /// previous selection is discarded on arrival.
    pub async fn load_experiment(&self, name: impl Into<String>) -> Result<(), SyncError> {
        let name = name.into();
        *self.selection.write().await = Some(name.clone());
        self.commands
            .send(Command::LoadExperiment { name })
            .await
            .map_err(|_| SyncError::Terminated)
    }

    // ---- filter operations ----
    //
    // The filter never touches records or counters, so these go
    // through the engine lock directly instead of the command queue.

    pub async fn include_task(&self, name: &str) {
        self.engine.write().await.include_task_name(name);
    }

    pub async fn exclude_task(&self, name: &str) {
        self.engine.write().await.exclude_task_name(name);
    }

    pub async fn clear_filter(&self) {
        self.engine.write().await.clear_filter();
    }

    // ---- read accessors ----

    /// Snapshot of every tracked resource.
    pub async fn resources(&self) -> Vec<ResourceRecord> {
        self.engine.read().await.store().records().cloned().collect()
    }

    /// Snapshot of the resources passing the task filter.
    pub async fn visible_resources(&self) -> Vec<ResourceRecord> {
        let engine = self.engine.read().await;
        engine
            .store()
            .records()
            .filter(|r| engine.is_visible(r))
            .cloned()
            .collect()
    }

    pub async fn counters(&self) -> StateCounters {
        self.engine.read().await.counters().clone()
    }

    pub async fn experiment(&self) -> Option<ExperimentId> {
        self.engine.read().await.experiment().cloned()
    }

    /// Task display names known to the current experiment.
    pub async fn task_names(&self) -> Vec<String> {
        self.engine
            .read()
            .await
            .groups()
            .task_names()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    pub async fn is_connected(&self) -> bool {
        self.proxy.is_connected().await
    }

    // ---- user actions ----

    pub async fn restart_job(&self, id: ResourceId, restart_done: bool) -> Result<i64, SyncError> {
        actions::restart_job(&self.proxy, id, restart_done).await
    }

    pub async fn remove_resource(&self, id: ResourceId, recursive: bool) -> Result<(), SyncError> {
        actions::remove_resource(&self.proxy, id, recursive).await
    }

    pub async fn kill_jobs(&self, ids: &[ResourceId]) -> Result<(), SyncError> {
        actions::kill_jobs(&self.proxy, ids).await
    }

    pub async fn resource_information(
        &self,
        id: ResourceId,
    ) -> Result<serde_json::Value, SyncError> {
        actions::resource_information(&self.proxy, id).await
    }

    pub async fn latest_experiment_names(&self) -> Result<Vec<String>, SyncError> {
        actions::latest_experiment_names(&self.proxy).await
    }

    /// Stop the supervisor. Terminal: the handle cannot reconnect.
    pub fn shutdown(&self) {
        tracing::info!("Shutting down monitor");
        self.cancel.cancel();
    }
}
