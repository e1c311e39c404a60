//! The task store: one user's ordered collection, synchronized with a
//! remote collaborator.
//!
//! Every mutation waits for the collaborator before the local collection
//! changes, so a failed request never leaves a partially applied state.
//! Mutations on the same task id are serialized through a per-id async
//! mutex; mutations on different ids run concurrently.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use taskpad_proto::task::{Task, TaskId, dedup_tags};
use taskpad_proto::wire::{NewTask, TaskPatch};

use super::{MutationAction, TaskError};
use crate::cache::{CacheError, TaskCache};
use crate::remote::{RemoteError, RemoteTasks};

/// Ordered task collection of the active user, newest first.
pub struct TaskStore<R> {
    remote: R,
    user_id: RwLock<String>,
    tasks: RwLock<Vec<Task>>,
    /// Set once a `load` has succeeded.
    loaded: AtomicBool,
    /// Task id -> mutation lock. Entries are created lazily and removed on delete.
    locks: Mutex<HashMap<TaskId, Arc<tokio::sync::Mutex<()>>>>,
    cache: Option<Box<dyn TaskCache>>,
    /// Held from snapshot to save so cache writes land in commit order.
    cache_order: Mutex<()>,
}

impl<R: RemoteTasks> TaskStore<R> {
    /// Creates an empty store for `user_id` backed by `remote`.
    pub fn new(remote: R, user_id: impl Into<String>) -> Self {
        Self {
            remote,
            user_id: RwLock::new(user_id.into()),
            tasks: RwLock::new(Vec::new()),
            loaded: AtomicBool::new(false),
            locks: Mutex::new(HashMap::new()),
            cache: None,
            cache_order: Mutex::new(()),
        }
    }

    /// Mirrors every committed change into `cache`.
    #[must_use]
    pub fn with_cache(mut self, cache: impl TaskCache + 'static) -> Self {
        self.cache = Some(Box::new(cache));
        self
    }

    /// The collaborator this store talks to.
    pub const fn remote(&self) -> &R {
        &self.remote
    }

    /// Replaces the collection with the collaborator's list for `user_id`
    /// and binds the store to that user.
    ///
    /// Returns the number of tasks loaded.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Fetch`] if the list request fails; the previous
    /// collection is left untouched.
    pub async fn load(&self, user_id: &str) -> Result<usize, TaskError> {
        let tasks = match self.remote.list(user_id).await {
            Ok(tasks) => normalize(tasks),
            Err(source) => {
                tracing::warn!(user_id = %user_id, error = %source, "failed to load tasks");
                return Err(TaskError::Fetch { source });
            }
        };
        let count = tasks.len();
        *self.user_id.write() = user_id.to_string();
        {
            let mut current = self.tasks.write();
            *current = tasks;
            self.loaded.store(true, Ordering::SeqCst);
        }
        self.persist();
        tracing::debug!(user_id = %user_id, count, "tasks loaded");
        Ok(count)
    }

    /// Creates a task and prepends the collaborator's record.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Validation`] without sending anything if the
    /// title is blank or a field is too long, and [`TaskError::Mutation`]
    /// if the collaborator rejects the request.
    pub async fn create(&self, new_task: &NewTask) -> Result<Task, TaskError> {
        new_task.validate()?;
        let user_id = self.user_id();
        let request = NewTask {
            tags: dedup_tags(new_task.tags.clone()),
            user_id: Some(user_id.clone()),
            ..new_task.clone()
        };

        let created = self
            .remote
            .create(&user_id, &request)
            .await
            .map_err(|source| mutation_failed(MutationAction::Create, None, source))?;

        {
            let mut tasks = self.tasks.write();
            tasks.retain(|t| t.id != created.id);
            tasks.insert(0, created.clone());
        }
        self.persist();
        tracing::debug!(task_id = %created.id, user_id = %user_id, "task created");
        Ok(created)
    }

    /// Flips the completion flag of `id`.
    ///
    /// The current flag is read after any earlier mutation of the same task
    /// has settled, so back-to-back toggles alternate correctly.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::NotFound`] for an unknown id (no request is
    /// sent) and [`TaskError::Mutation`] if the collaborator fails.
    pub async fn toggle_completion(&self, id: &TaskId) -> Result<Task, TaskError> {
        let lock = self.id_lock(id)?;
        let _guard = lock.lock_owned().await;
        let current = self.require(id)?;
        self.commit_update(id, &TaskPatch::completed(!current.completed))
            .await
    }

    /// Merges the fields present in `patch` into `id`.
    ///
    /// An empty patch returns the current record without a request.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Validation`] for a blank title or oversized
    /// field, [`TaskError::NotFound`] for an unknown id, and
    /// [`TaskError::Mutation`] if the collaborator fails.
    pub async fn update(&self, id: &TaskId, patch: TaskPatch) -> Result<Task, TaskError> {
        patch.validate()?;
        let patch = patch.normalized();
        if patch.is_empty() {
            return self.require(id);
        }
        let lock = self.id_lock(id)?;
        let _guard = lock.lock_owned().await;
        self.require(id)?;
        self.commit_update(id, &patch).await
    }

    /// Deletes `id`. Confirmation is the caller's responsibility.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::NotFound`] for an unknown id and
    /// [`TaskError::Mutation`] if the collaborator fails, in which case the
    /// task stays in the collection.
    pub async fn delete(&self, id: &TaskId) -> Result<(), TaskError> {
        let lock = self.id_lock(id)?;
        let _guard = lock.lock_owned().await;
        self.require(id)?;

        let user_id = self.user_id();
        self.remote
            .delete(&user_id, id)
            .await
            .map_err(|source| mutation_failed(MutationAction::Delete, Some(id), source))?;

        self.tasks.write().retain(|t| t.id != *id);
        self.locks.lock().remove(id);
        self.persist();
        tracing::debug!(task_id = %id, user_id = %user_id, "task deleted");
        Ok(())
    }

    /// Fills a never-loaded, empty store from the cache.
    ///
    /// Returns the number of tasks restored; zero when there is no cache, no
    /// snapshot for the user, or the store already holds data.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if an existing snapshot cannot be read.
    pub fn restore_from_cache(&self) -> Result<usize, CacheError> {
        let Some(cache) = &self.cache else {
            return Ok(0);
        };
        if self.loaded.load(Ordering::SeqCst) || !self.is_empty() {
            return Ok(0);
        }
        let user_id = self.user_id();
        let Some(cached) = cache.load(&user_id)? else {
            return Ok(0);
        };
        let cached = normalize(cached);
        let count = cached.len();
        {
            let mut tasks = self.tasks.write();
            // A load may have landed while the snapshot was read.
            if self.loaded.load(Ordering::SeqCst) || !tasks.is_empty() {
                return Ok(0);
            }
            *tasks = cached;
        }
        tracing::debug!(user_id = %user_id, count, "tasks restored from cache");
        Ok(count)
    }

    /// Sends `patch` and applies it locally once accepted. The caller holds
    /// the id's mutation lock.
    async fn commit_update(&self, id: &TaskId, patch: &TaskPatch) -> Result<Task, TaskError> {
        let user_id = self.user_id();
        self.remote
            .update(&user_id, id, patch)
            .await
            .map_err(|source| mutation_failed(MutationAction::Update, Some(id), source))?;

        let updated = {
            let mut tasks = self.tasks.write();
            let task = tasks
                .iter_mut()
                .find(|t| t.id == *id)
                .ok_or_else(|| TaskError::NotFound(id.clone()))?;
            task.apply_patch(patch, Utc::now());
            task.clone()
        };
        self.persist();
        tracing::debug!(task_id = %id, user_id = %user_id, "task updated");
        Ok(updated)
    }

    /// Returns the mutation lock of `id`, or `NotFound` if the task is unknown.
    fn id_lock(&self, id: &TaskId) -> Result<Arc<tokio::sync::Mutex<()>>, TaskError> {
        self.require(id)?;
        Ok(Arc::clone(self.locks.lock().entry(id.clone()).or_default()))
    }

    fn require(&self, id: &TaskId) -> Result<Task, TaskError> {
        self.get(id).ok_or_else(|| {
            tracing::debug!(task_id = %id, "task not in collection");
            TaskError::NotFound(id.clone())
        })
    }

    fn persist(&self) {
        let Some(cache) = &self.cache else {
            return;
        };
        let user_id = self.user_id();
        let _order = self.cache_order.lock();
        if let Err(e) = cache.save(&user_id, &self.snapshot()) {
            tracing::warn!(user_id = %user_id, error = %e, "failed to write task cache");
        }
    }
}

impl<R> TaskStore<R> {
    /// Copy of the collection in display order (newest first).
    #[must_use]
    pub fn snapshot(&self) -> Vec<Task> {
        self.tasks.read().clone()
    }

    /// Copy of the task with `id`, if present.
    #[must_use]
    pub fn get(&self, id: &TaskId) -> Option<Task> {
        self.tasks.read().iter().find(|t| t.id == *id).cloned()
    }

    /// Number of tasks in the collection.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.read().len()
    }

    /// Returns `true` if the collection is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.read().is_empty()
    }

    /// The user this store acts for.
    #[must_use]
    pub fn user_id(&self) -> String {
        self.user_id.read().clone()
    }

    /// Returns `true` once a load has succeeded.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::SeqCst)
    }
}

fn mutation_failed(
    action: MutationAction,
    id: Option<&TaskId>,
    source: RemoteError,
) -> TaskError {
    match id {
        Some(id) => tracing::warn!(task_id = %id, %action, error = %source, "task mutation failed"),
        None => tracing::warn!(%action, error = %source, "task mutation failed"),
    }
    TaskError::Mutation { action, source }
}

/// Drops repeated ids (first wins) and deduplicates tags.
fn normalize(tasks: Vec<Task>) -> Vec<Task> {
    let mut seen = HashSet::new();
    tasks
        .into_iter()
        .filter(|t| seen.insert(t.id.clone()))
        .map(|mut t| {
            t.tags = dedup_tags(std::mem::take(&mut t.tags));
            t
        })
        .collect()
}
