//! `expwatch-monitor` -- headless experiment monitor.
//!
//! Connects to an experiment scheduler, keeps a live mirror of one
//! experiment's resources, and logs every change event and the
//! per-state counters. Mostly a demonstration and debugging frontend
//! for the synchronization engine; a real UI subscribes the same way.
//!
//! # Environment variables
//!
//! | Variable         | Required | Default | Description                                      |
//! |------------------|----------|---------|--------------------------------------------------|
//! | `XPM_WS_URL`     | yes      | --      | WebSocket endpoint, e.g. `ws://host:12345/web-socket` |
//! | `XPM_HTTP_URL`   | no       | --      | JSON-RPC HTTP endpoint used while the socket is down |
//! | `XPM_EXPERIMENT` | no       | latest  | Experiment name to monitor                       |

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use expwatch_sync::{ChangeEvent, Monitor, MonitorConfig};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "expwatch=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let ws_url = std::env::var("XPM_WS_URL").unwrap_or_else(|_| {
        tracing::error!("XPM_WS_URL environment variable is required");
        std::process::exit(1);
    });

    let mut config = MonitorConfig::new(ws_url);
    config.http_url = std::env::var("XPM_HTTP_URL").ok();
    config.experiment = std::env::var("XPM_EXPERIMENT").ok();

    let monitor = Monitor::start(config);
    let mut events = monitor.subscribe();

    tracing::info!("Monitor started");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                monitor.shutdown();
                break;
            }
            event = events.recv() => match event {
                Ok(event) => report(&monitor, event).await,
                Err(tokio::sync::broadcast::error::RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "Change events dropped, view may lag");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            },
        }
    }

    tracing::info!("Monitor stopped");
}

/// Log one change event, with a counter summary after mutations.
async fn report(monitor: &Monitor, event: ChangeEvent) {
    match event {
        ChangeEvent::ResourceAdded { id, state, task_id } => {
            tracing::info!(id, state = %state, ?task_id, "Resource added");
        }
        ChangeEvent::ResourceStateChanged { id, old_state, state } => {
            tracing::info!(id, from = %old_state, to = %state, "State changed");
            tracing::info!(counters = %monitor.counters().await, "Counters");
        }
        ChangeEvent::ResourceProgress { id, progress } => {
            tracing::debug!(id, progress, "Progress");
        }
        ChangeEvent::ResourceRemoved { id, state } => {
            tracing::info!(id, state = %state, "Resource removed");
            tracing::info!(counters = %monitor.counters().await, "Counters");
        }
        ChangeEvent::ExperimentLoading { name } => {
            tracing::info!(experiment = %name, "Loading experiment");
        }
        ChangeEvent::ExperimentReady { experiment, resources } => {
            tracing::info!(experiment = %experiment, resources, "Experiment ready");
            tracing::info!(counters = %monitor.counters().await, "Counters");
        }
        ChangeEvent::ExperimentLoadFailed { name, error } => {
            tracing::error!(experiment = %name, error = %error, "Experiment load failed");
        }
        ChangeEvent::ConnectionOpened => {
            tracing::info!("Connected to scheduler");
        }
        ChangeEvent::ConnectionLost => {
            tracing::warn!("Connection lost, will resync after reconnect");
        }
    }
}
