//! Task-based visibility filter.
//!
//! The filter restricts which resources the rendering layer shows
//! without touching their stored state. An empty filter set means
//! unrestricted visibility ("show all"), not "show nothing".

use std::collections::HashSet;

use crate::resource::ResourceRecord;
use crate::types::TaskId;

#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    visible: HashSet<TaskId>,
}

impl TaskFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a task to the visible set.
    pub fn include(&mut self, task_id: TaskId) {
        self.visible.insert(task_id);
    }

    /// Remove a task from the visible set.
    pub fn exclude(&mut self, task_id: TaskId) {
        self.visible.remove(&task_id);
    }

    /// Drop every restriction (show all).
    pub fn clear(&mut self) {
        self.visible.clear();
    }

    /// True when no restriction is active.
    pub fn is_empty(&self) -> bool {
        self.visible.is_empty()
    }

    /// Whether `record` should be shown under the current filter.
    ///
    /// Resources without a task are visible only when the filter is
    /// empty: filtering by task is an explicit request to see that
    /// task's resources.
    pub fn is_visible(&self, record: &ResourceRecord) -> bool {
        if self.visible.is_empty() {
            return true;
        }
        match record.task_id {
            Some(task_id) => self.visible.contains(&task_id),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ResourceState;

    fn record(id: i64, task_id: Option<TaskId>) -> ResourceRecord {
        ResourceRecord {
            id,
            state: ResourceState::Running,
            task_id,
            progress: None,
            locator: format!("/jobs/{id}"),
        }
    }

    #[test]
    fn empty_filter_shows_everything() {
        let filter = TaskFilter::new();
        assert!(filter.is_visible(&record(1, Some(10))));
        assert!(filter.is_visible(&record(2, None)));
    }

    #[test]
    fn include_restricts_to_listed_tasks() {
        let mut filter = TaskFilter::new();
        filter.include(10);
        assert!(filter.is_visible(&record(1, Some(10))));
        assert!(!filter.is_visible(&record(2, Some(11))));
        assert!(!filter.is_visible(&record(3, None)));
    }

    #[test]
    fn exclude_returns_to_show_all_when_last_task_removed() {
        let mut filter = TaskFilter::new();
        filter.include(10);
        filter.exclude(10);
        assert!(filter.is_empty());
        assert!(filter.is_visible(&record(1, Some(11))));
    }

    #[test]
    fn visibility_is_independent_of_insertion_order() {
        // Filtering before or after a resource exists must agree,
        // because visibility is computed at read time.
        let mut filter = TaskFilter::new();
        let r = record(1, Some(10));
        assert!(filter.is_visible(&r));
        filter.include(10);
        assert!(filter.is_visible(&r));
        filter.include(11);
        assert!(filter.is_visible(&r));
        filter.exclude(10);
        assert!(!filter.is_visible(&r));
    }
}
