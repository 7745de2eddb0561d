//! Resource state synchronization engine.
//!
//! Keeps a consistent in-memory mirror of one experiment's resources:
//! an initial snapshot is reconciled with the scheduler's unordered,
//! at-least-once push stream, surviving disconnects (full resync, no
//! event replay), duplicate and out-of-order events, and re-snapshot
//! races. The rendering layer reads the mirror through [`Monitor`] and
//! subscribes to [`ChangeEvent`]s; it never mutates it.

pub mod actions;
pub mod backoff;
pub mod engine;
pub mod events;
pub mod monitor;
pub mod notifications;
pub mod snapshot;
pub mod store;
pub mod supervisor;

pub use backoff::BackoffPolicy;
pub use engine::{LoadPhase, Reload, SyncEngine};
pub use events::{ChangeBus, ChangeEvent};
pub use monitor::{Monitor, MonitorConfig};
pub use notifications::{parse_event, EventParseError, ServerEvent};
pub use snapshot::Snapshot;
pub use store::{ResourceStore, StoreError};

/// Errors surfaced by the synchronization engine.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The transport failed or the server returned an RPC error.
    #[error(transparent)]
    Rpc(#[from] expwatch_rpc::RpcError),

    /// A server payload did not have the expected shape.
    #[error("Malformed server payload: {0}")]
    Decode(#[from] serde_json::Error),

    /// The engine task is gone (client shutting down).
    #[error("Synchronization engine is shut down")]
    Terminated,
}
