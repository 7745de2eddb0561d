//! The authoritative in-memory resource table.
//!
//! [`ResourceStore`] is the only component allowed to mutate resource
//! state. Every mutation keeps the per-state counters exactly in step
//! with the records and publishes a [`ChangeEvent`]; mutations are
//! synchronous, so no observer can see counters and records disagree.

use std::collections::HashMap;

use expwatch_core::{ResourceId, ResourceRecord, ResourceState, StateCounters};

use crate::events::{ChangeBus, ChangeEvent};

/// Errors from store mutations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// `upsert` was handed an id that already exists. State changes
    /// must go through `transition` so the counters stay consistent.
    #[error("Resource {0} already exists")]
    Duplicate(ResourceId),
}

pub struct ResourceStore {
    records: HashMap<ResourceId, ResourceRecord>,
    counters: StateCounters,
    bus: ChangeBus,
}

impl ResourceStore {
    pub fn new(bus: ChangeBus) -> Self {
        Self {
            records: HashMap::new(),
            counters: StateCounters::new(),
            bus,
        }
    }

    /// Insert a new record.
    ///
    /// A known id is an error: accidental duplicate adds would double
    /// count the resource's state.
    pub fn upsert(&mut self, record: ResourceRecord) -> Result<(), StoreError> {
        if self.records.contains_key(&record.id) {
            return Err(StoreError::Duplicate(record.id));
        }
        self.counters.increment(record.state);
        self.bus.publish(ChangeEvent::ResourceAdded {
            id: record.id,
            state: record.state,
            task_id: record.task_id,
        });
        self.records.insert(record.id, record);
        Ok(())
    }

    /// Move a resource to a new state.
    ///
    /// An unknown id is a benign race (the event outran the snapshot):
    /// warn and leave the store untouched. Any stale progress
    /// indicator is cleared by the transition.
    pub fn transition(&mut self, id: ResourceId, new_state: ResourceState) {
        let Some(record) = self.records.get_mut(&id) else {
            tracing::warn!(id, state = %new_state, "State change for unknown resource, dropped");
            return;
        };
        let old_state = record.state;
        record.state = new_state;
        record.progress = None;
        self.counters.decrement(old_state);
        self.counters.increment(new_state);
        self.bus.publish(ChangeEvent::ResourceStateChanged {
            id,
            old_state,
            state: new_state,
        });
    }

    /// Set a resource's progress fraction, clamped to `[0, 1]`.
    ///
    /// Noisy out-of-range reports from the server are tolerated, not
    /// rejected. Unknown ids are a no-op.
    pub fn set_progress(&mut self, id: ResourceId, fraction: f64) {
        let Some(record) = self.records.get_mut(&id) else {
            tracing::warn!(id, fraction, "Progress for unknown resource, dropped");
            return;
        };
        let clamped = fraction.clamp(0.0, 1.0);
        record.progress = Some(clamped);
        self.bus.publish(ChangeEvent::ResourceProgress {
            id,
            progress: clamped,
        });
    }

    /// Delete a record. Unknown ids are a no-op.
    pub fn remove(&mut self, id: ResourceId) {
        let Some(record) = self.records.remove(&id) else {
            return;
        };
        self.counters.decrement(record.state);
        self.bus.publish(ChangeEvent::ResourceRemoved {
            id,
            state: record.state,
        });
    }

    /// Drop all records and zero all counters (experiment switch).
    pub fn clear(&mut self) {
        self.records.clear();
        self.counters.reset();
    }

    // ---- read accessors ----

    pub fn get(&self, id: ResourceId) -> Option<&ResourceRecord> {
        self.records.get(&id)
    }

    pub fn contains(&self, id: ResourceId) -> bool {
        self.records.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> impl Iterator<Item = &ResourceRecord> {
        self.records.values()
    }

    pub fn counters(&self) -> &StateCounters {
        &self.counters
    }
}
