//! In-memory per-user task repository.
//!
//! The [`TaskRepository`] keeps one newest-first list of tasks per user.
//! It assigns ids and timestamps on creation and stamps `updatedAt` on
//! every patch.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use taskpad_proto::task::{Task, TaskId, dedup_tags};
use taskpad_proto::wire::{NewTask, TaskPatch};
use tokio::sync::RwLock;

/// Thread-safe in-memory task repository keyed by user id.
#[derive(Default)]
pub struct TaskRepository {
    tasks: RwLock<HashMap<String, Vec<Task>>>,
}

impl TaskRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a repository holding `seed`, each list sorted newest first
    /// with duplicate tags dropped.
    #[must_use]
    pub fn from_seed(seed: HashMap<String, Vec<Task>>) -> Self {
        let tasks = seed
            .into_iter()
            .map(|(user_id, mut list)| {
                list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
                for task in &mut list {
                    task.tags = dedup_tags(std::mem::take(&mut task.tags));
                }
                (user_id, list)
            })
            .collect();
        Self {
            tasks: RwLock::new(tasks),
        }
    }

    /// Returns all tasks of a user, newest first.
    pub async fn list(&self, user_id: &str) -> Vec<Task> {
        let tasks = self.tasks.read().await;
        tasks.get(user_id).cloned().unwrap_or_default()
    }

    /// Stores a new task for `user_id`, assigning its id and timestamps.
    pub async fn create(&self, user_id: &str, new_task: NewTask, now: DateTime<Utc>) -> Task {
        let task = Task {
            id: TaskId::generate(),
            title: new_task.title,
            description: new_task.description,
            completed: false,
            due_date: new_task.due_date,
            priority: new_task.priority.unwrap_or_default(),
            category: new_task.category,
            tags: dedup_tags(new_task.tags),
            reminder: new_task.reminder,
            created_at: now,
            updated_at: now,
        };
        let mut tasks = self.tasks.write().await;
        tasks
            .entry(user_id.to_string())
            .or_default()
            .insert(0, task.clone());
        drop(tasks);
        task
    }

    /// Returns one task of a user, if present.
    pub async fn get(&self, user_id: &str, id: &TaskId) -> Option<Task> {
        let tasks = self.tasks.read().await;
        tasks
            .get(user_id)
            .and_then(|list| list.iter().find(|t| t.id == *id).cloned())
    }

    /// Applies a patch and returns the updated task, or `None` if absent.
    pub async fn update(
        &self,
        user_id: &str,
        id: &TaskId,
        patch: &TaskPatch,
        now: DateTime<Utc>,
    ) -> Option<Task> {
        let mut tasks = self.tasks.write().await;
        let task = tasks
            .get_mut(user_id)?
            .iter_mut()
            .find(|t| t.id == *id)?;
        task.apply_patch(patch, now);
        Some(task.clone())
    }

    /// Removes a task, returning whether it existed.
    pub async fn delete(&self, user_id: &str, id: &TaskId) -> bool {
        let mut tasks = self.tasks.write().await;
        let Some(list) = tasks.get_mut(user_id) else {
            return false;
        };
        let before = list.len();
        list.retain(|t| t.id != *id);
        before != list.len()
    }
}
