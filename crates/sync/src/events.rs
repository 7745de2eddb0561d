//! Change events published to the rendering boundary.
//!
//! [`ChangeBus`] is a thin wrapper over a `tokio::sync::broadcast`
//! channel so that any number of subscribers (a renderer, a logger, a
//! test) independently observe every mutation of the mirror.

use tokio::sync::broadcast;

use expwatch_core::{ExperimentId, ResourceId, ResourceState, TaskId};

/// Broadcast channel capacity for change events.
const CHANGE_CHANNEL_CAPACITY: usize = 256;

/// One observable change to the synchronized view.
#[derive(Debug, Clone)]
pub enum ChangeEvent {
    /// A resource entered the store.
    ResourceAdded {
        id: ResourceId,
        state: ResourceState,
        task_id: Option<TaskId>,
    },
    /// A resource moved to a new lifecycle state.
    ResourceStateChanged {
        id: ResourceId,
        old_state: ResourceState,
        state: ResourceState,
    },
    /// A resource reported progress.
    ResourceProgress { id: ResourceId, progress: f64 },
    /// A resource left the store.
    ResourceRemoved { id: ResourceId, state: ResourceState },
    /// A snapshot load started for the named experiment.
    ExperimentLoading { name: String },
    /// A snapshot load finished; the mirror is consistent again.
    ExperimentReady {
        experiment: ExperimentId,
        resources: usize,
    },
    /// A snapshot load failed; the previous view (if any) is intact.
    ExperimentLoadFailed { name: String, error: String },
    /// The push channel is up.
    ConnectionOpened,
    /// The push channel dropped; a resync will follow on reconnect.
    ConnectionLost,
}

/// Fan-out bus for [`ChangeEvent`]s.
#[derive(Clone)]
pub struct ChangeBus {
    sender: broadcast::Sender<ChangeEvent>,
}

impl ChangeBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.sender.subscribe()
    }

    /// Publish an event. Having no subscribers is not an error.
    pub fn publish(&self, event: ChangeEvent) {
        let _ = self.sender.send(event);
    }
}

impl Default for ChangeBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let bus = ChangeBus::new();
        let mut rx = bus.subscribe();

        bus.publish(ChangeEvent::ConnectionOpened);
        assert_matches!(rx.recv().await, Ok(ChangeEvent::ConnectionOpened));
    }

    #[test]
    fn publish_without_subscribers_is_fine() {
        let bus = ChangeBus::new();
        bus.publish(ChangeEvent::ConnectionLost);
    }
}
