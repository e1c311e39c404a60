//! Task collection management for `Taskpad`.
//!
//! The [`TaskStore`] owns the user's ordered task collection and keeps it in
//! step with a remote collaborator using confirm-then-apply: nothing changes
//! locally until the collaborator has accepted the change. The [`view`]
//! module derives filtered and sorted views from a snapshot, [`draft`] builds
//! new tasks incrementally, and [`share`] renders a task as plain text.

pub mod draft;
pub mod share;
pub mod store;
pub mod view;

pub use draft::Draft;
pub use store::TaskStore;
pub use view::{FilterState, SortDirection, SortKey, StatusFilter, TaskStats, View};

use std::fmt;

use taskpad_proto::task::{TaskId, ValidationError};

use crate::remote::RemoteError;

/// Kind of mutation that failed, used in user-facing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationAction {
    /// Creating a new task.
    Create,
    /// Toggling or editing an existing task.
    Update,
    /// Deleting a task.
    Delete,
}

impl fmt::Display for MutationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        })
    }
}

/// Errors surfaced by task operations.
///
/// Display strings are safe to show to the user; remote detail is only
/// reachable through [`std::error::Error::source`].
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// Input was rejected before any request was sent.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Loading the collection failed; the previous collection is kept.
    #[error("could not load your tasks, please try again")]
    Fetch {
        /// Collaborator failure.
        #[source]
        source: RemoteError,
    },

    /// A create, update or delete round trip failed; nothing was applied.
    #[error("could not {action} the task, please try again")]
    Mutation {
        /// What was attempted.
        action: MutationAction,
        /// Collaborator failure.
        #[source]
        source: RemoteError,
    },

    /// No task with this id is in the collection.
    #[error("task not found: {0}")]
    NotFound(TaskId),
}
