//! Task storage with optional JSON file persistence

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Mutex,
};

use thiserror::Error;
use tracing::{debug, info, warn};

use super::Task;

/// Errors raised by task store operations
#[derive(Error, Debug)]
pub enum TaskStoreError {
    #[error("Task not found: {0}")]
    NotFound(String),

    #[error("Task store IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Task store JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Task store lock poisoned")]
    Poisoned,
}

/// Store of task records, optionally mirrored to a JSON file after every mutation
#[derive(Debug)]
pub struct TaskStore {
    tasks: Mutex<Vec<Task>>,
    path: Option<PathBuf>,
}

impl TaskStore {
    /// Create an in-memory store seeded with the welcome task
    pub fn in_memory() -> Self {
        Self {
            tasks: Mutex::new(vec![Task::welcome()]),
            path: None,
        }
    }

    /// Create an in-memory store holding exactly `tasks`
    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        Self {
            tasks: Mutex::new(tasks),
            path: None,
        }
    }

    /// Open a file-backed store, loading existing tasks if the file is present
    pub fn open(path: impl AsRef<Path>) -> Result<Self, TaskStoreError> {
        let path = path.as_ref().to_path_buf();
        let tasks = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            match serde_json::from_str::<Vec<Task>>(&raw) {
                Ok(tasks) => {
                    info!("Loaded {} tasks from {}", tasks.len(), path.display());
                    tasks
                }
                Err(e) => {
                    warn!("Error parsing saved tasks in {}: {}", path.display(), e);
                    vec![Task::welcome()]
                }
            }
        } else {
            debug!("No task file at {}, seeding welcome task", path.display());
            vec![Task::welcome()]
        };

        let store = Self {
            tasks: Mutex::new(tasks),
            path: Some(path),
        };
        store.persist(&store.list()?)?;
        Ok(store)
    }

    /// All tasks in insertion order
    pub fn list(&self) -> Result<Vec<Task>, TaskStoreError> {
        Ok(self.lock()?.clone())
    }

    pub fn get(&self, id: &str) -> Result<Task, TaskStoreError> {
        self.lock()?
            .iter()
            .find(|task| task.id == id)
            .cloned()
            .ok_or_else(|| TaskStoreError::NotFound(id.to_string()))
    }

    pub fn add(&self, task: Task) -> Result<Task, TaskStoreError> {
        info!("Adding task {} ({})", task.id, task.title);
        self.mutate(|tasks| {
            tasks.push(task.clone());
            Ok(task)
        })
    }

    /// Flip the completed flag of the task with `id`
    pub fn toggle(&self, id: &str) -> Result<Task, TaskStoreError> {
        self.mutate(|tasks| {
            let task = find_mut(tasks, id)?;
            task.completed = !task.completed;
            info!("Task {} completed={}", task.id, task.completed);
            Ok(task.clone())
        })
    }

    pub fn delete(&self, id: &str) -> Result<Task, TaskStoreError> {
        self.mutate(|tasks| {
            let index = tasks
                .iter()
                .position(|task| task.id == id)
                .ok_or_else(|| TaskStoreError::NotFound(id.to_string()))?;
            info!("Deleting task {}", id);
            Ok(tasks.remove(index))
        })
    }

    /// Replace the stored task whose id matches `task.id`
    pub fn update_task(&self, task: Task) -> Result<Task, TaskStoreError> {
        self.mutate(|tasks| {
            let stored = find_mut(tasks, &task.id)?;
            *stored = task.clone();
            debug!("Updated task {}", task.id);
            Ok(task)
        })
    }

    fn mutate<T, F>(&self, op: F) -> Result<T, TaskStoreError>
    where
        F: FnOnce(&mut Vec<Task>) -> Result<T, TaskStoreError>,
    {
        let mut tasks = self.lock()?;
        let result = op(&mut *tasks)?;
        self.persist(&tasks[..])?;
        Ok(result)
    }

    fn persist(&self, tasks: &[Task]) -> Result<(), TaskStoreError> {
        if let Some(path) = &self.path {
            let raw = serde_json::to_string_pretty(tasks)?;
            fs::write(path, raw)?;
        }
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<Task>>, TaskStoreError> {
        self.tasks.lock().map_err(|_| TaskStoreError::Poisoned)
    }
}

impl Default for TaskStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

fn find_mut<'a>(tasks: &'a mut [Task], id: &str) -> Result<&'a mut Task, TaskStoreError> {
    tasks
        .iter_mut()
        .find(|task| task.id == id)
        .ok_or_else(|| TaskStoreError::NotFound(id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Priority;

    #[test]
    fn in_memory_store_is_seeded() {
        let store = TaskStore::in_memory();
        let tasks = store.list().unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, "1");
    }

    #[test]
    fn update_replaces_matching_task() {
        let store = TaskStore::in_memory();
        let mut task = store.get("1").unwrap();
        task.title = "Renamed".to_string();
        store.update_task(task).unwrap();
        assert_eq!(store.get("1").unwrap().title, "Renamed");
    }

    #[test]
    fn update_unknown_task_is_not_found() {
        let store = TaskStore::with_tasks(Vec::new());
        let err = store.update_task(Task::welcome()).unwrap_err();
        assert!(matches!(err, TaskStoreError::NotFound(id) if id == "1"));
    }

    #[test]
    fn toggle_and_delete() {
        let store = TaskStore::in_memory();
        assert!(store.toggle("1").unwrap().completed);
        assert!(!store.toggle("1").unwrap().completed);
        store.delete("1").unwrap();
        assert!(store.list().unwrap().is_empty());
        assert!(store.delete("1").is_err());
    }

    #[test]
    fn file_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.json");

        let store = TaskStore::open(&path).unwrap();
        let added = store
            .add(Task::new("Write report", "quarterly", Priority::Secondary))
            .unwrap();
        drop(store);

        let reopened = TaskStore::open(&path).unwrap();
        let tasks = reopened.list().unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(reopened.get(&added.id).unwrap().priority, Priority::Secondary);
    }

    #[test]
    fn unparsable_file_falls_back_to_seed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        fs::write(&path, "not json").unwrap();

        let store = TaskStore::open(&path).unwrap();
        assert_eq!(store.list().unwrap(), vec![Task::welcome()]);
    }
}
