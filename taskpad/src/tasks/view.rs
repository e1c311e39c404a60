//! Filtered, sorted views over a task collection.
//!
//! Everything here is a pure function of the collection, a [`FilterState`]
//! and the time used to classify upcoming and overdue tasks. The pipeline
//! runs status filter, then search, then tag selection, then a stable sort.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use taskpad_proto::task::Task;

/// Error returned when parsing a view option from text fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} `{value}`, expected one of: {expected}")]
pub struct ParseViewOptionError {
    kind: &'static str,
    value: String,
    expected: &'static str,
}

/// Which tasks pass the status stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFilter {
    /// No filtering.
    #[default]
    All,
    /// Not completed.
    Active,
    /// Completed.
    Completed,
    /// Open with a due date after now.
    Upcoming,
    /// Open with a due date before now.
    Overdue,
}

impl StatusFilter {
    /// Returns `true` if `task` passes this filter at `now`.
    #[must_use]
    pub fn matches(self, task: &Task, now: DateTime<Utc>) -> bool {
        match self {
            Self::All => true,
            Self::Active => !task.completed,
            Self::Completed => task.completed,
            Self::Upcoming => task.is_upcoming(now),
            Self::Overdue => task.is_overdue(now),
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::All => "all",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Upcoming => "upcoming",
            Self::Overdue => "overdue",
        })
    }
}

impl FromStr for StatusFilter {
    type Err = ParseViewOptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            "upcoming" => Ok(Self::Upcoming),
            "overdue" => Ok(Self::Overdue),
            _ => Err(ParseViewOptionError {
                kind: "status",
                value: s.to_string(),
                expected: "all, active, completed, upcoming, overdue",
            }),
        }
    }
}

/// Field the view is ordered by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortKey {
    /// Creation time.
    #[default]
    CreatedAt,
    /// Due date; tasks without one always come last.
    DueDate,
    /// Priority rank (high > medium > low).
    Priority,
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::CreatedAt => "created",
            Self::DueDate => "due",
            Self::Priority => "priority",
        })
    }
}

impl FromStr for SortKey {
    type Err = ParseViewOptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "created" | "createdat" | "created-at" => Ok(Self::CreatedAt),
            "due" | "duedate" | "due-date" => Ok(Self::DueDate),
            "priority" => Ok(Self::Priority),
            _ => Err(ParseViewOptionError {
                kind: "sort key",
                value: s.to_string(),
                expected: "created, due, priority",
            }),
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDirection {
    /// Smallest first.
    Asc,
    /// Largest first.
    #[default]
    Desc,
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        })
    }
}

impl FromStr for SortDirection {
    type Err = ParseViewOptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            _ => Err(ParseViewOptionError {
                kind: "sort direction",
                value: s.to_string(),
                expected: "asc, desc",
            }),
        }
    }
}

/// Everything that shapes a view. Not persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    /// Status stage.
    pub status: StatusFilter,
    /// Case-insensitive substring; empty matches everything.
    pub search: String,
    /// Tasks must carry every selected tag.
    pub tags: BTreeSet<String>,
    /// Sort field.
    pub sort_key: SortKey,
    /// Sort direction.
    pub direction: SortDirection,
}

impl FilterState {
    /// Sets the status filter.
    #[must_use]
    pub const fn with_status(mut self, status: StatusFilter) -> Self {
        self.status = status;
        self
    }

    /// Sets the search term.
    #[must_use]
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = search.into();
        self
    }

    /// Adds a tag to the selection.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    /// Sets the sort field and direction.
    #[must_use]
    pub const fn sorted_by(mut self, key: SortKey, direction: SortDirection) -> Self {
        self.sort_key = key;
        self.direction = direction;
        self
    }

    /// Selects `tag` if unselected, otherwise deselects it.
    pub fn toggle_tag(&mut self, tag: &str) {
        if !self.tags.remove(tag) {
            self.tags.insert(tag.to_string());
        }
    }
}

/// Status counts over an unfiltered collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskStats {
    /// All tasks.
    pub total: usize,
    /// Completed tasks.
    pub completed: usize,
    /// Open tasks due after now.
    pub upcoming: usize,
    /// Open tasks due before now.
    pub overdue: usize,
}

/// A derived view: the visible tasks in order, plus counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct View<'a> {
    /// Tasks that passed every stage, sorted.
    pub tasks: Vec<&'a Task>,
    /// Counts over the whole collection.
    pub stats: TaskStats,
}

/// Derives the visible tasks and the counts in one call.
#[must_use]
pub fn derive<'a>(tasks: &'a [Task], filter: &FilterState, now: DateTime<Utc>) -> View<'a> {
    View {
        tasks: filter_and_sort(tasks, filter, now),
        stats: stats(tasks, now),
    }
}

/// Runs the filter stages and sort over `tasks`.
#[must_use]
pub fn filter_and_sort<'a>(
    tasks: &'a [Task],
    filter: &FilterState,
    now: DateTime<Utc>,
) -> Vec<&'a Task> {
    let needle = filter.search.to_lowercase();
    let mut visible: Vec<&Task> = tasks
        .iter()
        .filter(|t| filter.status.matches(t, now))
        .filter(|t| matches_search(t, &needle))
        .filter(|t| filter.tags.iter().all(|tag| t.has_tag(tag)))
        .collect();
    // `sort_by` is stable: equal keys keep collection order.
    visible.sort_by(|a, b| compare(a, b, filter.sort_key, filter.direction));
    visible
}

/// Counts completed, upcoming and overdue tasks in `tasks`.
#[must_use]
pub fn stats(tasks: &[Task], now: DateTime<Utc>) -> TaskStats {
    TaskStats {
        total: tasks.len(),
        completed: tasks.iter().filter(|t| t.completed).count(),
        upcoming: tasks.iter().filter(|t| t.is_upcoming(now)).count(),
        overdue: tasks.iter().filter(|t| t.is_overdue(now)).count(),
    }
}

/// Distinct tags across `tasks`, in first-seen order.
#[must_use]
pub fn all_tags(tasks: &[Task]) -> Vec<String> {
    distinct(tasks.iter().flat_map(|t| t.tags.iter()))
}

/// Distinct categories across `tasks`, in first-seen order.
#[must_use]
pub fn all_categories(tasks: &[Task]) -> Vec<String> {
    distinct(tasks.iter().filter_map(|t| t.category.as_ref()))
}

fn distinct<'a>(values: impl Iterator<Item = &'a String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for value in values {
        if !out.contains(value) {
            out.push(value.clone());
        }
    }
    out
}

/// `needle` is already lowercased.
fn matches_search(task: &Task, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    let hit = |field: &str| field.to_lowercase().contains(needle);
    hit(&task.title)
        || task.description.as_deref().is_some_and(hit)
        || task.category.as_deref().is_some_and(hit)
        || task.tags.iter().any(|tag| hit(tag))
}

fn compare(a: &Task, b: &Task, key: SortKey, direction: SortDirection) -> Ordering {
    let directed = |ord: Ordering| match direction {
        SortDirection::Asc => ord,
        SortDirection::Desc => ord.reverse(),
    };
    match key {
        SortKey::CreatedAt => directed(a.created_at.cmp(&b.created_at)),
        SortKey::Priority => directed(a.priority.rank().cmp(&b.priority.rank())),
        // Missing due dates go last in both directions.
        SortKey::DueDate => match (a.due_date, b.due_date) {
            (Some(a), Some(b)) => directed(a.cmp(&b)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
    }
}
