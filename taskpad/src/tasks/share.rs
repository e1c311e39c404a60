//! Plain-text rendering of a task for sharing.

use taskpad_proto::task::Task;

/// Renders `task` as labelled lines. Absent optional fields are omitted.
#[must_use]
pub fn share_text(task: &Task) -> String {
    let mut lines = vec![format!("Title: {}", task.title)];
    if let Some(description) = &task.description {
        lines.push(format!("Description: {description}"));
    }
    if let Some(due) = task.due_date {
        lines.push(format!("Due: {}", due.format("%Y-%m-%d")));
    }
    lines.push(format!("Priority: {}", task.priority));
    if let Some(category) = &task.category {
        lines.push(format!("Category: {category}"));
    }
    if !task.tags.is_empty() {
        lines.push(format!("Tags: {}", task.tags.join(", ")));
    }
    lines.join("\n")
}
