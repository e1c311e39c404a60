//! Subcommands of the `taskpad` binary and their arguments.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use taskpad_proto::task::Priority;
use taskpad_proto::wire::TaskPatch;

use crate::tasks::{Draft, FilterState, SortDirection, SortKey, StatusFilter};

/// Client subcommands.
#[derive(clap::Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Show tasks through a filtered, sorted view.
    List(ListArgs),
    /// Show status counts.
    Stats,
    /// Show every tag and category in use.
    Tags,
    /// Create a task.
    Add(AddArgs),
    /// Flip a task between open and completed.
    Toggle {
        /// Task id.
        id: String,
    },
    /// Change fields of a task.
    Edit(EditArgs),
    /// Delete a task after confirmation.
    Delete {
        /// Task id.
        id: String,
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
    /// Print a task as shareable text.
    Share {
        /// Task id.
        id: String,
    },
    /// Run reminders until interrupted.
    Watch,
}

/// Arguments of `list`.
#[derive(clap::Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct ListArgs {
    /// Status filter (all, active, completed, upcoming, overdue).
    #[arg(long, default_value_t)]
    pub status: StatusFilter,
    /// Case-insensitive text to look for in title, description, category and tags.
    #[arg(long, default_value = "")]
    pub search: String,
    /// Only tasks carrying this tag; repeat to require several.
    #[arg(long = "tag")]
    pub tags: Vec<String>,
    /// Sort key (created, due, priority).
    #[arg(long, default_value_t)]
    pub sort: SortKey,
    /// Sort ascending instead of descending.
    #[arg(long)]
    pub asc: bool,
}

impl ListArgs {
    /// The view filter described by these arguments.
    #[must_use]
    pub fn filter(&self) -> FilterState {
        let direction = if self.asc {
            SortDirection::Asc
        } else {
            SortDirection::Desc
        };
        let mut filter = FilterState::default()
            .with_status(self.status)
            .with_search(self.search.clone())
            .sorted_by(self.sort, direction);
        filter.tags.extend(self.tags.iter().cloned());
        filter
    }
}

/// Arguments of `add`.
#[derive(clap::Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct AddArgs {
    /// Task title.
    pub title: String,
    /// Longer description.
    #[arg(long)]
    pub description: Option<String>,
    /// Due date (`YYYY-MM-DD`, `YYYY-MM-DDTHH:MM` or RFC 3339).
    #[arg(long, value_parser = parse_timestamp)]
    pub due: Option<DateTime<Utc>>,
    /// Priority (low, medium, high).
    #[arg(long)]
    pub priority: Option<Priority>,
    /// Category label.
    #[arg(long)]
    pub category: Option<String>,
    /// Tag; repeat for several.
    #[arg(long = "tag")]
    pub tags: Vec<String>,
    /// Reminder time (same formats as `--due`).
    #[arg(long, value_parser = parse_timestamp)]
    pub reminder: Option<DateTime<Utc>>,
}

impl AddArgs {
    /// Builds a draft from these arguments, adding tags one by one.
    #[must_use]
    pub fn to_draft(&self) -> Draft {
        let mut draft = Draft::new()
            .title(self.title.clone())
            .priority(self.priority.unwrap_or_default());
        if let Some(description) = &self.description {
            draft = draft.description(description.clone());
        }
        if let Some(category) = &self.category {
            draft = draft.category(category.clone());
        }
        if let Some(due) = self.due {
            draft = draft.due_date(due);
        }
        if let Some(reminder) = self.reminder {
            draft = draft.reminder(reminder);
        }
        for tag in &self.tags {
            draft.add_tag(tag);
        }
        draft
    }
}

/// Arguments of `edit`. Only given fields change.
#[derive(clap::Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct EditArgs {
    /// Task id.
    pub id: String,
    /// New title.
    #[arg(long)]
    pub title: Option<String>,
    /// New description.
    #[arg(long, conflicts_with = "clear_description")]
    pub description: Option<String>,
    /// Remove the description.
    #[arg(long)]
    pub clear_description: bool,
    /// New due date.
    #[arg(long, value_parser = parse_timestamp, conflicts_with = "clear_due")]
    pub due: Option<DateTime<Utc>>,
    /// Remove the due date.
    #[arg(long)]
    pub clear_due: bool,
    /// New priority.
    #[arg(long)]
    pub priority: Option<Priority>,
    /// New category.
    #[arg(long, conflicts_with = "clear_category")]
    pub category: Option<String>,
    /// Remove the category.
    #[arg(long)]
    pub clear_category: bool,
    /// Replacement tag set; repeat for several.
    #[arg(long = "tag", conflicts_with = "clear_tags")]
    pub tags: Vec<String>,
    /// Remove every tag.
    #[arg(long)]
    pub clear_tags: bool,
    /// New reminder time.
    #[arg(long, value_parser = parse_timestamp, conflicts_with = "clear_reminder")]
    pub reminder: Option<DateTime<Utc>>,
    /// Remove the reminder.
    #[arg(long)]
    pub clear_reminder: bool,
}

impl EditArgs {
    /// The partial update described by these arguments.
    #[must_use]
    pub fn to_patch(&self) -> TaskPatch {
        TaskPatch {
            title: self.title.clone(),
            description: field_change(self.description.clone(), self.clear_description),
            completed: None,
            due_date: field_change(self.due, self.clear_due),
            priority: self.priority,
            category: field_change(self.category.clone(), self.clear_category),
            tags: if self.clear_tags {
                Some(Vec::new())
            } else if self.tags.is_empty() {
                None
            } else {
                Some(self.tags.clone())
            },
            reminder: field_change(self.reminder, self.clear_reminder),
        }
    }
}

/// `Some(None)` clears, `Some(Some(v))` sets, `None` leaves unchanged.
fn field_change<T>(value: Option<T>, clear: bool) -> Option<Option<T>> {
    if clear { Some(None) } else { value.map(Some) }
}

/// Parses a timestamp given on the command line. Times without a zone are
/// taken as UTC; a bare date means midnight.
///
/// # Errors
///
/// Returns a message naming the accepted formats.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| {
            format!("invalid time '{value}' (expected YYYY-MM-DD, YYYY-MM-DDTHH:MM or RFC 3339)")
        })
}
