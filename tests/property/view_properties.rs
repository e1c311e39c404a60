//! Property-based tests for view derivation.
//!
//! Uses proptest to verify, for arbitrary collections and filters:
//! 1. The visible tasks are a subset of the collection, without repeats.
//! 2. Deriving twice gives the same order.
//! 3. Every visible task passes the status, search and tag stages.
//! 4. Sorting by due date puts undated tasks last in both directions.
//! 5. Completed, upcoming and overdue counts never exceed the total.
//! 6. Equal sort keys keep collection order.

use std::collections::HashSet;

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use proptest::prelude::*;
use taskpad::tasks::view::{filter_and_sort, stats};
use taskpad::tasks::{FilterState, SortDirection, SortKey, StatusFilter};
use taskpad_proto::task::{Priority, Task, TaskId};

const TAGS: [&str; 4] = ["work", "home", "urgent", "later"];

fn now() -> DateTime<Utc> {
    Utc.timestamp_opt(1_717_243_200, 0).single().unwrap_or_default()
}

// --- Strategies ---

/// Offsets in minutes around `now`, including `now` itself.
fn arb_offset() -> impl Strategy<Value = Option<i64>> {
    prop_oneof![
        Just(None),
        Just(Some(0)),
        (-10_000i64..10_000).prop_map(Some),
    ]
}

fn arb_priority() -> impl Strategy<Value = Priority> {
    prop_oneof![
        Just(Priority::Low),
        Just(Priority::Medium),
        Just(Priority::High),
    ]
}

fn arb_status() -> impl Strategy<Value = StatusFilter> {
    prop_oneof![
        Just(StatusFilter::All),
        Just(StatusFilter::Active),
        Just(StatusFilter::Completed),
        Just(StatusFilter::Upcoming),
        Just(StatusFilter::Overdue),
    ]
}

fn arb_sort() -> impl Strategy<Value = (SortKey, SortDirection)> {
    (
        prop_oneof![
            Just(SortKey::CreatedAt),
            Just(SortKey::DueDate),
            Just(SortKey::Priority),
        ],
        prop_oneof![Just(SortDirection::Asc), Just(SortDirection::Desc)],
    )
}

fn arb_tags() -> impl Strategy<Value = Vec<String>> {
    prop::sample::subsequence(TAGS.to_vec(), 0..=TAGS.len())
        .prop_map(|tags| tags.into_iter().map(str::to_string).collect())
}

/// Tasks with unique ids, shuffled creation times and optional due dates.
fn arb_tasks() -> impl Strategy<Value = Vec<Task>> {
    prop::collection::vec(
        (
            "[a-zA-Z ]{1,12}",
            any::<bool>(),
            arb_offset(),
            arb_priority(),
            arb_tags(),
            0i64..5_000,
        ),
        0..24,
    )
    .prop_map(|rows| {
        rows.into_iter()
            .enumerate()
            .map(|(i, (title, completed, due, priority, tags, age))| {
                let created = now() - TimeDelta::minutes(age);
                Task {
                    id: TaskId::new(i.to_string()),
                    title,
                    description: None,
                    completed,
                    due_date: due.map(|m| now() + TimeDelta::minutes(m)),
                    priority,
                    category: None,
                    tags,
                    reminder: None,
                    created_at: created,
                    updated_at: created,
                }
            })
            .collect()
    })
}

fn arb_filter() -> impl Strategy<Value = FilterState> {
    (arb_status(), "[a-z]{0,2}", arb_tags(), arb_sort()).prop_map(
        |(status, search, tags, (key, direction))| {
            let mut filter = FilterState::default()
                .with_status(status)
                .with_search(search)
                .sorted_by(key, direction);
            filter.tags.extend(tags);
            filter
        },
    )
}

fn ids(tasks: &[&Task]) -> Vec<TaskId> {
    tasks.iter().map(|t| t.id.clone()).collect()
}

// --- Property tests ---

proptest! {
    /// The view only contains tasks from the collection, each at most once.
    #[test]
    fn view_is_subset_without_repeats(tasks in arb_tasks(), filter in arb_filter()) {
        let visible = filter_and_sort(&tasks, &filter, now());
        let all: HashSet<&TaskId> = tasks.iter().map(|t| &t.id).collect();
        let seen: HashSet<&TaskId> = visible.iter().map(|t| &t.id).collect();
        prop_assert!(visible.len() <= tasks.len());
        prop_assert_eq!(seen.len(), visible.len());
        prop_assert!(seen.is_subset(&all));
    }

    /// Deriving twice from the same inputs gives the same order.
    #[test]
    fn view_is_deterministic(tasks in arb_tasks(), filter in arb_filter()) {
        let first = ids(&filter_and_sort(&tasks, &filter, now()));
        let second = ids(&filter_and_sort(&tasks, &filter, now()));
        prop_assert_eq!(first, second);
    }

    /// Every visible task passes all three filter stages.
    #[test]
    fn visible_tasks_pass_every_stage(tasks in arb_tasks(), filter in arb_filter()) {
        let needle = filter.search.to_lowercase();
        for task in filter_and_sort(&tasks, &filter, now()) {
            prop_assert!(filter.status.matches(task, now()));
            prop_assert!(filter.tags.iter().all(|tag| task.has_tag(tag)));
            let hit = needle.is_empty()
                || task.title.to_lowercase().contains(&needle)
                || task.tags.iter().any(|t| t.to_lowercase().contains(&needle));
            prop_assert!(hit);
        }
    }

    /// Undated tasks follow every dated task, ascending or descending.
    #[test]
    fn undated_tasks_sort_last(tasks in arb_tasks(), asc in any::<bool>()) {
        let direction = if asc { SortDirection::Asc } else { SortDirection::Desc };
        let filter = FilterState::default().sorted_by(SortKey::DueDate, direction);
        let visible = filter_and_sort(&tasks, &filter, now());
        let first_undated = visible
            .iter()
            .position(|t| t.due_date.is_none())
            .unwrap_or(visible.len());
        prop_assert!(visible[first_undated..].iter().all(|t| t.due_date.is_none()));

        let dated: Vec<DateTime<Utc>> =
            visible[..first_undated].iter().filter_map(|t| t.due_date).collect();
        let ordered = dated.windows(2).all(|w| if asc { w[0] <= w[1] } else { w[0] >= w[1] });
        prop_assert!(ordered);
    }

    /// The three status counts never exceed the total and agree with the filters.
    #[test]
    fn counts_are_consistent(tasks in arb_tasks()) {
        let counts = stats(&tasks, now());
        prop_assert_eq!(counts.total, tasks.len());
        prop_assert!(counts.completed + counts.upcoming + counts.overdue <= counts.total);

        let overdue = FilterState::default().with_status(StatusFilter::Overdue);
        prop_assert_eq!(filter_and_sort(&tasks, &overdue, now()).len(), counts.overdue);
        let upcoming = FilterState::default().with_status(StatusFilter::Upcoming);
        prop_assert_eq!(filter_and_sort(&tasks, &upcoming, now()).len(), counts.upcoming);
    }

    /// Tasks with equal priority keep their collection order.
    #[test]
    fn priority_sort_is_stable(tasks in arb_tasks(), asc in any::<bool>()) {
        let direction = if asc { SortDirection::Asc } else { SortDirection::Desc };
        let filter = FilterState::default().sorted_by(SortKey::Priority, direction);
        let visible = filter_and_sort(&tasks, &filter, now());
        let position = |id: &TaskId| tasks.iter().position(|t| &t.id == id);
        for pair in visible.windows(2) {
            if pair[0].priority == pair[1].priority {
                prop_assert!(position(&pair[0].id) < position(&pair[1].id));
            }
        }
    }
}
