//! Task storage.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{Task, TaskId};

/// Container for one user's tasks.
///
/// This is plain data access; lifecycle rules (who may write
/// `duration_secs`, when a task may be deleted) live with the callers.
pub trait TaskStore {
    fn get(&self, id: TaskId) -> Option<&Task>;
    /// Insert or replace by id.
    fn upsert(&mut self, task: Task);
    /// Remove and return the task, if present.
    fn delete(&mut self, id: TaskId) -> Option<Task>;
    fn list(&self) -> Vec<&Task>;
}

/// In-memory store, serialized as part of the user's snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryTaskStore {
    tasks: BTreeMap<TaskId, Task>,
    /// Highest id handed out so far; survives deletes so ids never repeat.
    #[serde(default)]
    last_id: Option<TaskId>,
}

impl MemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_id(&self) -> Option<TaskId> {
        self.last_id
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl TaskStore for MemoryTaskStore {
    fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.get(&id)
    }

    fn upsert(&mut self, task: Task) {
        if self.last_id.map_or(true, |last| task.id > last) {
            self.last_id = Some(task.id);
        }
        self.tasks.insert(task.id, task);
    }

    fn delete(&mut self, id: TaskId) -> Option<Task> {
        self.tasks.remove(&id)
    }

    fn list(&self) -> Vec<&Task> {
        self.tasks.values().collect()
    }
}
