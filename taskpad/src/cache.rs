//! Local snapshot of the task collection.
//!
//! The store writes its collection through a [`TaskCache`] after every
//! accepted change so the last known state survives a restart or an
//! unreachable service. [`JsonFileCache`] keeps the snapshot as a single
//! JSON document and replaces it atomically.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use taskpad_proto::task::Task;
use tempfile::NamedTempFile;

/// Errors raised while reading or writing the cache.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Filesystem access failed.
    #[error("cache i/o failed for {path}: {source}")]
    Io {
        /// Path that was accessed.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The snapshot could not be encoded or decoded.
    #[error("cache snapshot is malformed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Persistence for the last known task collection of a user.
pub trait TaskCache: Send + Sync {
    /// Replaces the snapshot with `tasks` for `user_id`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if the snapshot cannot be written.
    fn save(&self, user_id: &str, tasks: &[Task]) -> Result<(), CacheError>;

    /// Returns the snapshot for `user_id`, or `None` if there is none or it
    /// belongs to another user.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if an existing snapshot cannot be read.
    fn load(&self, user_id: &str) -> Result<Option<Vec<Task>>, CacheError>;
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snapshot {
    user_id: String,
    tasks: Vec<Task>,
}

/// [`TaskCache`] stored as one JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileCache {
    path: PathBuf,
}

impl JsonFileCache {
    /// Creates a cache backed by `path`. Nothing is touched until first use.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Default cache location under the platform data directory.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_dir().map(|dir| dir.join("taskpad").join("tasks.json"))
    }

    /// The file backing this cache.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> CacheError {
        CacheError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl TaskCache for JsonFileCache {
    fn save(&self, user_id: &str, tasks: &[Task]) -> Result<(), CacheError> {
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir).map_err(|e| self.io_error(e))?;
        let snapshot = Snapshot {
            user_id: user_id.to_string(),
            tasks: tasks.to_vec(),
        };
        let bytes = serde_json::to_vec_pretty(&snapshot)?;

        // Temp file in the same directory + rename: readers never see a partial file.
        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| self.io_error(e))?;
        tmp.write_all(&bytes).map_err(|e| self.io_error(e))?;
        tmp.flush().map_err(|e| self.io_error(e))?;
        tmp.persist(&self.path).map_err(|e| self.io_error(e.error))?;
        Ok(())
    }

    fn load(&self, user_id: &str) -> Result<Option<Vec<Task>>, CacheError> {
        let contents = match std::fs::read(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(e)),
        };
        let snapshot: Snapshot = serde_json::from_slice(&contents)?;
        if snapshot.user_id != user_id {
            tracing::debug!(
                cached_user = %snapshot.user_id,
                user_id = %user_id,
                "ignoring cache of another user"
            );
            return Ok(None);
        }
        Ok(Some(snapshot.tasks))
    }
}
