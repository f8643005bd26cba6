// Boundary operations for presentation layers
//
// Callers on the far side of a transport hand over plain integers and
// strings; this layer turns them into typed store calls.

use crate::error::Result;
use crate::filter::{Filter, SortKey};
use crate::models::{Priority, Task, TaskId, TaskStats, parse_due_date};
use crate::store::TaskStore;
use std::sync::Arc;

/// The five task operations exposed to callers
#[derive(Clone)]
pub struct TaskApi {
    store: Arc<TaskStore>,
}

impl TaskApi {
    pub fn new(store: TaskStore) -> Self {
        Self::from_shared(Arc::new(store))
    }

    pub fn from_shared(store: Arc<TaskStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    /// AddTask. A missing priority means Low; a blank due date means none.
    pub fn add_task(&self, title: &str, priority: Option<i64>, due_date: Option<&str>) -> Result<Task> {
        let priority = priority.map(Priority::try_from).transpose()?.unwrap_or_default();
        let due_date = parse_due_date(due_date)?;
        self.store.create(title, priority, due_date)
    }

    /// DeleteTask
    pub fn delete_task(&self, id: TaskId) -> Result<()> {
        self.store.delete(id)
    }

    /// ToggleTask
    pub fn toggle_task(&self, id: TaskId) -> Result<Task> {
        self.store.toggle(id)
    }

    /// GetTasks. Blank filter or sort select the defaults; unknown values are rejected.
    pub fn get_tasks(&self, filter: &str, sort_by: &str) -> Result<Vec<Task>> {
        let filter: Filter = filter.parse()?;
        let sort_by: SortKey = sort_by.parse()?;
        Ok(self.store.list(filter, sort_by))
    }

    /// GetTaskStats
    pub fn get_task_stats(&self) -> TaskStats {
        self.store.stats()
    }
}
