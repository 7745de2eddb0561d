//! Reconciliation of snapshots and push notifications.
//!
//! [`SyncEngine`] owns the resource store, the task groups, the task
//! filter, and the active experiment identity. It is mutated by a
//! single task (the connection supervisor), which is what keeps the
//! counters consistent without finer-grained locking.

use expwatch_core::{
    ExperimentId, ResourceRecord, ResourceSeed, StateCounters, TaskFilter, TaskGroups,
};

use crate::events::{ChangeBus, ChangeEvent};
use crate::notifications::ServerEvent;
use crate::snapshot::Snapshot;
use crate::store::{ResourceStore, StoreError};

/// Load cycle phase. While `Loading`, resource events are dropped:
/// the in-flight snapshot supersedes them, and holding an unbounded
/// replay buffer instead would risk unbounded memory growth. The
/// server re-announces current state via later pushes anyway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
    Loading,
    Ready,
}

/// Directive returned by [`SyncEngine::apply`] when a notification
/// requires a fresh snapshot (a new run of the displayed experiment).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reload {
    pub name: String,
    pub timestamp: i64,
}

pub struct SyncEngine {
    store: ResourceStore,
    groups: TaskGroups,
    filter: TaskFilter,
    experiment: Option<ExperimentId>,
    phase: LoadPhase,
    bus: ChangeBus,
}

impl SyncEngine {
    pub fn new(bus: ChangeBus) -> Self {
        Self {
            store: ResourceStore::new(bus.clone()),
            groups: TaskGroups::new(),
            filter: TaskFilter::new(),
            experiment: None,
            phase: LoadPhase::Loading,
            bus,
        }
    }

    /// Enter the loading phase for `name`. The current view stays
    /// intact until the snapshot arrives, so a failed load never
    /// leaves the user staring at an empty screen.
    pub fn begin_load(&mut self, name: &str) {
        self.phase = LoadPhase::Loading;
        self.bus.publish(ChangeEvent::ExperimentLoading {
            name: name.to_string(),
        });
    }

    /// Replace the view with a freshly loaded snapshot.
    pub fn apply_snapshot(&mut self, name: &str, snapshot: Snapshot) {
        self.store.clear();
        self.groups.rebuild(&snapshot.tasks);
        self.filter.clear();

        for seed in snapshot.resources {
            self.add_resource(seed);
        }

        let experiment = ExperimentId::new(name, snapshot.experiment.timestamp);
        tracing::info!(
            experiment = %experiment,
            resources = self.store.len(),
            "Experiment view ready",
        );
        self.bus.publish(ChangeEvent::ExperimentReady {
            experiment: experiment.clone(),
            resources: self.store.len(),
        });
        self.experiment = Some(experiment);
        self.phase = LoadPhase::Ready;
    }

    /// A snapshot load failed or was superseded. If a previous view
    /// exists it stays usable and keeps receiving events.
    pub fn abort_load(&mut self) {
        if self.experiment.is_some() {
            self.phase = LoadPhase::Ready;
        }
    }

    /// Apply one push notification.
    ///
    /// Unknown resource ids are dropped with a warning rather than
    /// queued: delivery order is not causal order, and the next
    /// snapshot or progress push re-announces anything missed.
    pub fn apply(&mut self, event: ServerEvent) -> Option<Reload> {
        if self.phase == LoadPhase::Loading {
            // A reload directive must still be honored mid-load; all
            // resource events are covered by the pending snapshot.
            if let ServerEvent::ExperimentAdded { name, timestamp } = event {
                return self.experiment_added(name, timestamp);
            }
            tracing::warn!("Notification during snapshot load, dropped");
            return None;
        }

        match event {
            ServerEvent::StateChanged { id, state } => {
                self.store.transition(id, state);
            }
            ServerEvent::ResourceRemoved { id } => {
                self.store.remove(id);
            }
            ServerEvent::Progress { id, progress } => {
                self.store.set_progress(id, progress);
            }
            ServerEvent::ResourceAdded(seed) => {
                self.add_resource(seed);
            }
            ServerEvent::ExperimentResourceAdded {
                name,
                timestamp,
                resource,
            } => {
                let active = self.experiment.as_ref();
                let matches = active
                    .map(|e| e.name == name && e.timestamp == timestamp)
                    .unwrap_or(false);
                if matches {
                    self.add_resource(resource);
                } else {
                    // Belongs to another (possibly stale) view.
                    tracing::debug!(
                        experiment = %name,
                        timestamp,
                        "Resource for non-active experiment, dropped",
                    );
                }
            }
            ServerEvent::ExperimentAdded { name, timestamp } => {
                return self.experiment_added(name, timestamp);
            }
        }
        None
    }

    fn experiment_added(&mut self, name: String, timestamp: i64) -> Option<Reload> {
        let displayed = self.experiment.as_ref().map(|e| e.name.as_str());
        if displayed == Some(name.as_str()) {
            tracing::info!(experiment = %name, timestamp, "New run of displayed experiment");
            Some(Reload { name, timestamp })
        } else {
            None
        }
    }

    /// Insert a resource and attach it to its task group.
    fn add_resource(&mut self, seed: ResourceSeed) {
        let task_id = seed.task_id;
        let record = ResourceRecord::from(seed);
        let id = record.id;
        match self.store.upsert(record) {
            Ok(()) => {
                if let Some(task_id) = task_id {
                    self.groups.attach(task_id, id);
                }
            }
            Err(StoreError::Duplicate(id)) => {
                // At-least-once delivery: the server re-announces
                // resources the snapshot already carried.
                tracing::warn!(id, "Resource already exists, dropped");
            }
        }
    }

    // ---- filter operations (by task display name, as the UI sees them) ----

    /// Make every task instance displayed under `name` visible.
    pub fn include_task_name(&mut self, name: &str) {
        for &task_id in self.groups.tasks_named(name) {
            self.filter.include(task_id);
        }
    }

    /// Remove every task instance displayed under `name` from the
    /// visible set. An empty set means "show all" again.
    pub fn exclude_task_name(&mut self, name: &str) {
        for &task_id in self.groups.tasks_named(name) {
            self.filter.exclude(task_id);
        }
    }

    pub fn clear_filter(&mut self) {
        self.filter.clear();
    }

    // ---- read accessors ----

    pub fn store(&self) -> &ResourceStore {
        &self.store
    }

    pub fn counters(&self) -> &StateCounters {
        self.store.counters()
    }

    pub fn groups(&self) -> &TaskGroups {
        &self.groups
    }

    pub fn filter(&self) -> &TaskFilter {
        &self.filter
    }

    pub fn is_visible(&self, record: &ResourceRecord) -> bool {
        self.filter.is_visible(record)
    }

    pub fn experiment(&self) -> Option<&ExperimentId> {
        self.experiment.as_ref()
    }

    pub fn phase(&self) -> LoadPhase {
        self.phase
    }
}
