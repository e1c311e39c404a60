//! An uncommitted task being composed before it is submitted.

use chrono::{DateTime, Utc};
use taskpad_proto::task::{Priority, Task, ValidationError, validate_description, validate_title};
use taskpad_proto::wire::NewTask;

use super::{TaskError, TaskStore};
use crate::remote::RemoteTasks;

/// In-progress task payload.
///
/// A draft is only cleared by a successful [`submit`](Self::submit), so a
/// failed submission can be retried without re-entering anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    /// Title; required on submit.
    pub title: String,
    /// Description; blank is sent as absent.
    pub description: String,
    /// Optional due date.
    pub due_date: Option<DateTime<Utc>>,
    /// Priority, medium unless changed.
    pub priority: Priority,
    /// Category; blank is sent as absent.
    pub category: String,
    tags: Vec<String>,
    /// Optional reminder timestamp.
    pub reminder: Option<DateTime<Utc>>,
}

impl Draft {
    /// Creates an empty draft.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the title.
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the due date.
    #[must_use]
    pub const fn due_date(mut self, due_date: DateTime<Utc>) -> Self {
        self.due_date = Some(due_date);
        self
    }

    /// Sets the priority.
    #[must_use]
    pub const fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the category.
    #[must_use]
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Sets the reminder.
    #[must_use]
    pub const fn reminder(mut self, reminder: DateTime<Utc>) -> Self {
        self.reminder = Some(reminder);
        self
    }

    /// Adds a tag token. The token is trimmed; blank tokens and tags already
    /// present are ignored.
    ///
    /// Returns `true` if the tag was appended.
    pub fn add_tag(&mut self, token: &str) -> bool {
        let tag = token.trim();
        if tag.is_empty() || self.tags.iter().any(|t| t == tag) {
            return false;
        }
        self.tags.push(tag.to_string());
        true
    }

    /// Removes `tag`. Returns `true` if it was present.
    pub fn remove_tag(&mut self, tag: &str) -> bool {
        let before = self.tags.len();
        self.tags.retain(|t| t != tag);
        self.tags.len() != before
    }

    /// Tags in insertion order.
    #[must_use]
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Checks the title and description rules.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] encountered.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_title(self.title.trim())?;
        validate_description(&self.description)
    }

    /// Converts the draft to a create request.
    #[must_use]
    pub fn to_new_task(&self) -> NewTask {
        NewTask {
            title: self.title.trim().to_string(),
            description: non_blank(&self.description),
            due_date: self.due_date,
            priority: Some(self.priority),
            category: non_blank(self.category.trim()),
            tags: self.tags.clone(),
            reminder: self.reminder,
            user_id: None,
        }
    }

    /// Creates the task through `store` and clears the draft on success.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Validation`] without sending anything if the
    /// draft is invalid, or the store's error if creation fails. In both
    /// cases the draft is kept.
    pub async fn submit<R: RemoteTasks>(
        &mut self,
        store: &TaskStore<R>,
    ) -> Result<Task, TaskError> {
        self.validate()?;
        let created = store.create(&self.to_new_task()).await?;
        self.reset();
        Ok(created)
    }

    /// Returns the draft to its empty state.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Returns `true` if nothing has been entered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

fn non_blank(value: &str) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
