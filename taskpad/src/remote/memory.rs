//! In-process remote collaborator.
//!
//! [`InMemoryRemote`] keeps per-user task lists in memory and behaves like
//! the REST service: it assigns ids and timestamps, lists newest first and
//! reports unknown ids as [`RemoteError::NotFound`]. Clones share state.
//!
//! For tests it can inject failures, delay every request, and records how
//! many requests were issued and how they overlapped.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use taskpad_proto::task::{Task, TaskId, dedup_tags};
use taskpad_proto::wire::{NewTask, TaskPatch};

use super::{RemoteError, RemoteTasks};

/// In-memory collaborator backed by a shared `HashMap` of task lists.
#[derive(Clone, Default)]
pub struct InMemoryRemote {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    /// User id -> tasks, newest first.
    tasks: Mutex<HashMap<String, Vec<Task>>>,
    failing: AtomicBool,
    latency: Mutex<Option<Duration>>,
    requests: AtomicUsize,
    current: AtomicUsize,
    max_concurrent: AtomicUsize,
    /// Task id -> number of requests currently in flight for it.
    in_flight: Mutex<HashMap<TaskId, usize>>,
    same_id_overlaps: AtomicUsize,
}

/// Marks one request as in flight until dropped.
struct Flight<'a> {
    inner: &'a Inner,
    id: Option<TaskId>,
}

impl Drop for Flight<'_> {
    fn drop(&mut self) {
        self.inner.current.fetch_sub(1, Ordering::SeqCst);
        if let Some(id) = &self.id {
            let mut in_flight = self.inner.in_flight.lock();
            if let Some(count) = in_flight.get_mut(id) {
                *count -= 1;
                if *count == 0 {
                    in_flight.remove(id);
                }
            }
        }
    }
}

impl InMemoryRemote {
    /// Creates an empty collaborator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the stored tasks of `user_id`. `tasks` should be newest first.
    pub fn seed(&self, user_id: &str, tasks: Vec<Task>) {
        self.inner.tasks.lock().insert(user_id.to_string(), tasks);
    }

    /// Returns the stored tasks of `user_id`, newest first.
    #[must_use]
    pub fn tasks(&self, user_id: &str) -> Vec<Task> {
        self.inner
            .tasks
            .lock()
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Makes every subsequent request fail (after any configured latency).
    pub fn set_failing(&self, failing: bool) {
        self.inner.failing.store(failing, Ordering::SeqCst);
    }

    /// Delays every subsequent request by `latency`.
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.inner.latency.lock() = latency;
    }

    /// Total number of requests received, including failed ones.
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.inner.requests.load(Ordering::SeqCst)
    }

    /// Highest number of requests observed in flight at the same time.
    #[must_use]
    pub fn max_concurrent(&self) -> usize {
        self.inner.max_concurrent.load(Ordering::SeqCst)
    }

    /// Number of times a request for a task id started while another
    /// request for the same id was still in flight.
    #[must_use]
    pub fn same_id_overlaps(&self) -> usize {
        self.inner.same_id_overlaps.load(Ordering::SeqCst)
    }

    fn enter(&self, id: Option<&TaskId>) -> Flight<'_> {
        self.inner.requests.fetch_add(1, Ordering::SeqCst);
        let now = self.inner.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.max_concurrent.fetch_max(now, Ordering::SeqCst);
        if let Some(id) = id {
            let mut in_flight = self.inner.in_flight.lock();
            let count = in_flight.entry(id.clone()).or_default();
            if *count > 0 {
                self.inner.same_id_overlaps.fetch_add(1, Ordering::SeqCst);
            }
            *count += 1;
        }
        Flight {
            inner: &self.inner,
            id: id.cloned(),
        }
    }

    /// Simulates the network leg of a request.
    async fn round_trip(&self) -> Result<(), RemoteError> {
        let latency = *self.inner.latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if self.inner.failing.load(Ordering::SeqCst) {
            return Err(RemoteError::Injected("service unavailable".to_string()));
        }
        Ok(())
    }
}

impl RemoteTasks for InMemoryRemote {
    async fn list(&self, user_id: &str) -> Result<Vec<Task>, RemoteError> {
        let _flight = self.enter(None);
        self.round_trip().await?;
        Ok(self.tasks(user_id))
    }

    async fn create(&self, user_id: &str, task: &NewTask) -> Result<Task, RemoteError> {
        let _flight = self.enter(None);
        self.round_trip().await?;
        let now = Utc::now();
        let created = Task {
            id: TaskId::generate(),
            title: task.title.clone(),
            description: task.description.clone(),
            completed: false,
            due_date: task.due_date,
            priority: task.priority.unwrap_or_default(),
            category: task.category.clone(),
            tags: dedup_tags(task.tags.clone()),
            reminder: task.reminder,
            created_at: now,
            updated_at: now,
        };
        self.inner
            .tasks
            .lock()
            .entry(user_id.to_string())
            .or_default()
            .insert(0, created.clone());
        Ok(created)
    }

    async fn update(
        &self,
        user_id: &str,
        id: &TaskId,
        patch: &TaskPatch,
    ) -> Result<(), RemoteError> {
        let _flight = self.enter(Some(id));
        self.round_trip().await?;
        let mut tasks = self.inner.tasks.lock();
        let task = tasks
            .get_mut(user_id)
            .and_then(|list| list.iter_mut().find(|t| t.id == *id))
            .ok_or(RemoteError::NotFound)?;
        task.apply_patch(patch, Utc::now());
        Ok(())
    }

    async fn delete(&self, user_id: &str, id: &TaskId) -> Result<(), RemoteError> {
        let _flight = self.enter(Some(id));
        self.round_trip().await?;
        let mut tasks = self.inner.tasks.lock();
        let list = tasks.get_mut(user_id).ok_or(RemoteError::NotFound)?;
        let before = list.len();
        list.retain(|t| t.id != *id);
        if list.len() == before {
            return Err(RemoteError::NotFound);
        }
        Ok(())
    }
}
