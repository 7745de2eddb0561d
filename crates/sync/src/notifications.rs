//! Server push notification types and parser.
//!
//! The scheduler pushes JSON payloads discriminated by an `event`
//! field. This module deserializes them into the [`ServerEvent`] union
//! in two phases so that callers can tell an unknown event kind
//! (forward compatibility: warn and ignore) apart from a malformed
//! payload of a known kind (warn and drop).

use serde::Deserialize;
use serde_json::Value;

use expwatch_core::resource::id_from_number_or_string;
use expwatch_core::{ResourceId, ResourceSeed, ResourceState};

/// All known push notification kinds.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event")]
pub enum ServerEvent {
    /// A resource moved to a new lifecycle state.
    #[serde(rename = "STATE_CHANGED")]
    StateChanged {
        #[serde(deserialize_with = "id_from_number_or_string")]
        id: ResourceId,
        state: ResourceState,
    },

    /// A resource was deleted on the server.
    #[serde(rename = "RESOURCE_REMOVED")]
    ResourceRemoved {
        #[serde(deserialize_with = "id_from_number_or_string")]
        id: ResourceId,
    },

    /// A running resource reported progress.
    #[serde(rename = "PROGRESS")]
    Progress {
        #[serde(deserialize_with = "id_from_number_or_string")]
        id: ResourceId,
        progress: f64,
    },

    /// A new resource appeared (not tied to an experiment identity).
    #[serde(rename = "RESOURCE_ADDED")]
    ResourceAdded(ResourceSeed),

    /// A new resource appeared in a specific experiment run. Applied
    /// only when that run is the active one.
    #[serde(rename = "EXPERIMENT_RESOURCE_ADDED")]
    ExperimentResourceAdded {
        name: String,
        timestamp: i64,
        resource: ResourceSeed,
    },

    /// A new run of an experiment was registered; if it is the one on
    /// display, the client reloads at the new timestamp.
    #[serde(rename = "EXPERIMENT_ADDED")]
    ExperimentAdded { name: String, timestamp: i64 },
}

/// Why a push payload could not be turned into a [`ServerEvent`].
#[derive(Debug, thiserror::Error)]
pub enum EventParseError {
    /// The payload has no `event` discriminator; it is some other kind
    /// of server message and not ours to handle.
    #[error("Notification has no event tag")]
    MissingTag,

    /// An event kind this client does not know. Must never crash the
    /// client; callers log and ignore.
    #[error("Unhandled notification {0:?}")]
    UnknownTag(String),

    /// A known kind with a broken payload.
    #[error("Malformed {tag:?} payload: {source}")]
    Malformed {
        tag: String,
        #[source]
        source: serde_json::Error,
    },
}

const KNOWN_TAGS: [&str; 6] = [
    "STATE_CHANGED",
    "RESOURCE_REMOVED",
    "PROGRESS",
    "RESOURCE_ADDED",
    "EXPERIMENT_RESOURCE_ADDED",
    "EXPERIMENT_ADDED",
];

/// Parse one push payload into a typed event.
pub fn parse_event(payload: Value) -> Result<ServerEvent, EventParseError> {
    let tag = payload
        .get("event")
        .and_then(Value::as_str)
        .ok_or(EventParseError::MissingTag)?;

    if !KNOWN_TAGS.contains(&tag) {
        return Err(EventParseError::UnknownTag(tag.to_string()));
    }

    let tag = tag.to_string();
    serde_json::from_value(payload).map_err(|source| EventParseError::Malformed { tag, source })
}
