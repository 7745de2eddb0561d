//! Domain types for the experiment monitoring client.
//!
//! This crate has zero internal dependencies so it can be used by the
//! transport layer, the synchronization engine, and any future CLI or
//! UI frontend alike.

pub mod counters;
pub mod filter;
pub mod resource;
pub mod state;
pub mod tasks;
pub mod types;

pub use counters::StateCounters;
pub use filter::TaskFilter;
pub use resource::{ResourceRecord, ResourceSeed};
pub use state::ResourceState;
pub use tasks::TaskGroups;
pub use types::{ExperimentId, ResourceId, TaskId};
