//! Task grouping indexes.
//!
//! A task (logical unit of work) may be instantiated by several
//! resources, and several task instances may share one display name.
//! [`TaskGroups`] keeps both directions: task id to resource ids, and
//! display name to task ids. Rebuilt once per snapshot, appended to as
//! resources arrive for known tasks, never shrunk in between.

use std::collections::HashMap;

use crate::types::{ResourceId, TaskId};

#[derive(Debug, Clone, Default)]
pub struct TaskGroups {
    /// Task id -> ordered resource ids known to belong to it.
    resources_by_task: HashMap<TaskId, Vec<ResourceId>>,
    /// Display name -> task instance ids sharing that name.
    tasks_by_name: HashMap<String, Vec<TaskId>>,
}

impl TaskGroups {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild both indexes from a snapshot's `task id -> display name`
    /// map. Duplicate display names collapse into one entry listing all
    /// their task ids.
    pub fn rebuild(&mut self, tasks: &HashMap<TaskId, String>) {
        self.resources_by_task.clear();
        self.tasks_by_name.clear();
        for (&task_id, name) in tasks {
            self.resources_by_task.entry(task_id).or_default();
            self.tasks_by_name
                .entry(name.clone())
                .or_default()
                .push(task_id);
        }
        // Deterministic order for callers that iterate.
        for ids in self.tasks_by_name.values_mut() {
            ids.sort_unstable();
        }
    }

    /// Record that `resource_id` belongs to `task_id`.
    ///
    /// Unknown task ids are accepted (a resource can arrive for a task
    /// the snapshot never named) and create a new group.
    pub fn attach(&mut self, task_id: TaskId, resource_id: ResourceId) {
        self.resources_by_task
            .entry(task_id)
            .or_default()
            .push(resource_id);
    }

    /// Resources known to belong to `task_id`.
    pub fn resources_of(&self, task_id: TaskId) -> &[ResourceId] {
        self.resources_by_task
            .get(&task_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Task instance ids displayed under `name`.
    pub fn tasks_named(&self, name: &str) -> &[TaskId] {
        self.tasks_by_name
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// All distinct task display names, sorted.
    pub fn task_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tasks_by_name.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn clear(&mut self) {
        self.resources_by_task.clear();
        self.tasks_by_name.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tasks() -> HashMap<TaskId, String> {
        HashMap::from([
            (1, "tokenize".to_string()),
            (2, "tokenize".to_string()),
            (3, "train".to_string()),
        ])
    }

    #[test]
    fn rebuild_collapses_duplicate_names() {
        let mut groups = TaskGroups::new();
        groups.rebuild(&sample_tasks());
        assert_eq!(groups.tasks_named("tokenize"), &[1, 2]);
        assert_eq!(groups.tasks_named("train"), &[3]);
        assert_eq!(groups.task_names(), vec!["tokenize", "train"]);
    }

    #[test]
    fn attach_appends_in_order() {
        let mut groups = TaskGroups::new();
        groups.rebuild(&sample_tasks());
        groups.attach(1, 100);
        groups.attach(1, 101);
        assert_eq!(groups.resources_of(1), &[100, 101]);
        assert_eq!(groups.resources_of(3), &[] as &[ResourceId]);
    }

    #[test]
    fn attach_accepts_unknown_task() {
        let mut groups = TaskGroups::new();
        groups.attach(99, 7);
        assert_eq!(groups.resources_of(99), &[7]);
    }

    #[test]
    fn rebuild_drops_previous_experiment() {
        let mut groups = TaskGroups::new();
        groups.rebuild(&sample_tasks());
        groups.attach(1, 100);
        groups.rebuild(&HashMap::from([(5, "eval".to_string())]));
        assert_eq!(groups.resources_of(1), &[] as &[ResourceId]);
        assert_eq!(groups.task_names(), vec!["eval"]);
    }
}
