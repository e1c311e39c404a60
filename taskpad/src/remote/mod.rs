//! Remote collaborator abstraction for `Taskpad`.
//!
//! Defines the [`RemoteTasks`] trait through which the task store reaches
//! persistence. Concrete implementations:
//! - [`memory::InMemoryRemote`]: in-process collaborator for tests and local mode
//! - [`http::HttpRemote`]: REST client for `taskpad-server` compatible services

pub mod http;
pub mod memory;

use taskpad_proto::task::{Task, TaskId};
use taskpad_proto::wire::{NewTask, TaskPatch};

/// Errors reported by a remote collaborator.
///
/// These carry internal detail (status codes, transport messages) and are
/// kept as the `source` of the user-facing [`crate::tasks::TaskError`].
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    /// The service could not be reached.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The request did not complete within the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// The service answered with a non-success status.
    #[error("service returned {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Message from the error body, or the canonical reason.
        message: String,
    },

    /// The service does not know the task.
    #[error("task not found on service")]
    NotFound,

    /// The service rejected the caller's identity.
    #[error("not signed in")]
    Unauthorized,

    /// The response body could not be decoded.
    #[error("malformed response: {0}")]
    Decode(String),

    /// A failure injected by a test collaborator.
    #[error("injected failure: {0}")]
    Injected(String),
}

/// Async collaborator holding the persisted task records.
///
/// Every call is a full round trip: a returned `Ok` means the collaborator
/// has durably accepted the change, and callers apply it locally only then.
pub trait RemoteTasks: Send + Sync {
    /// Fetch every task of `user_id`, newest first.
    fn list(
        &self,
        user_id: &str,
    ) -> impl std::future::Future<Output = Result<Vec<Task>, RemoteError>> + Send;

    /// Create a task and return the stored record with id and timestamps.
    fn create(
        &self,
        user_id: &str,
        task: &NewTask,
    ) -> impl std::future::Future<Output = Result<Task, RemoteError>> + Send;

    /// Apply a partial update. Only success is reported; callers merge locally.
    fn update(
        &self,
        user_id: &str,
        id: &TaskId,
        patch: &TaskPatch,
    ) -> impl std::future::Future<Output = Result<(), RemoteError>> + Send;

    /// Delete a task.
    fn delete(
        &self,
        user_id: &str,
        id: &TaskId,
    ) -> impl std::future::Future<Output = Result<(), RemoteError>> + Send;
}
