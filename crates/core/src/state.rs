//! Resource lifecycle states.
//!
//! The scheduler reports states in inconsistent casing (`"DONE"`,
//! `"done"`, ...); everything is normalized to lowercase on ingestion.

use serde::{Deserialize, Deserializer, Serialize};

/// Lifecycle state of a tracked resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceState {
    /// Waiting for dependencies to be met.
    Waiting,
    /// Dependencies met, waiting for an execution slot.
    Ready,
    /// Currently executing.
    Running,
    /// Completed (job) or generated (data resource).
    Done,
    /// Ran but did not complete, or the data was not generated.
    Error,
    /// Put on hold by the user.
    OnHold,
    /// Killed by the user.
    Killed,
}

impl ResourceState {
    /// All states, in counter-index order.
    pub const ALL: [ResourceState; 7] = [
        ResourceState::Waiting,
        ResourceState::Ready,
        ResourceState::Running,
        ResourceState::Done,
        ResourceState::Error,
        ResourceState::OnHold,
        ResourceState::Killed,
    ];

    /// Stable index into per-state counter arrays.
    pub fn index(self) -> usize {
        match self {
            ResourceState::Waiting => 0,
            ResourceState::Ready => 1,
            ResourceState::Running => 2,
            ResourceState::Done => 3,
            ResourceState::Error => 4,
            ResourceState::OnHold => 5,
            ResourceState::Killed => 6,
        }
    }

    /// Lowercase name, as used in counter labels and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceState::Waiting => "waiting",
            ResourceState::Ready => "ready",
            ResourceState::Running => "running",
            ResourceState::Done => "done",
            ResourceState::Error => "error",
            ResourceState::OnHold => "on_hold",
            ResourceState::Killed => "killed",
        }
    }
}

impl std::fmt::Display for ResourceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a state string is not recognized.
#[derive(Debug, thiserror::Error)]
#[error("Unknown resource state: {0:?}")]
pub struct UnknownState(pub String);

impl std::str::FromStr for ResourceState {
    type Err = UnknownState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "waiting" => Ok(ResourceState::Waiting),
            "ready" => Ok(ResourceState::Ready),
            "running" => Ok(ResourceState::Running),
            "done" => Ok(ResourceState::Done),
            "error" => Ok(ResourceState::Error),
            "on_hold" => Ok(ResourceState::OnHold),
            "killed" => Ok(ResourceState::Killed),
            _ => Err(UnknownState(s.to_string())),
        }
    }
}

impl<'de> Deserialize<'de> for ResourceState {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_any_casing() {
        assert_eq!("DONE".parse::<ResourceState>().unwrap(), ResourceState::Done);
        assert_eq!("done".parse::<ResourceState>().unwrap(), ResourceState::Done);
        assert_eq!(
            "On_Hold".parse::<ResourceState>().unwrap(),
            ResourceState::OnHold
        );
    }

    #[test]
    fn rejects_unknown_state() {
        assert!("paused".parse::<ResourceState>().is_err());
        assert!("".parse::<ResourceState>().is_err());
    }

    #[test]
    fn deserializes_from_json_string() {
        let state: ResourceState = serde_json::from_str(r#""RUNNING""#).unwrap();
        assert_eq!(state, ResourceState::Running);
    }

    #[test]
    fn serializes_lowercase() {
        let json = serde_json::to_string(&ResourceState::OnHold).unwrap();
        assert_eq!(json, r#""on_hold""#);
    }

    #[test]
    fn indices_are_dense_and_unique() {
        for (i, state) in ResourceState::ALL.iter().enumerate() {
            assert_eq!(state.index(), i);
        }
    }
}
