//! Integration tests for the reminder loop running on the tokio runtime.
//!
//! Time is paused, so the loop's interval advances instantly while the
//! reminder window is still evaluated against the wall clock.
//!
//! Verification command: `cargo test --test reminders`

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use taskpad::notify::{ChannelNotifier, LogNotifier, Notification, Notifier, Permission};
use taskpad::reminder::{REMINDER_TITLE, RefirePolicy, ReminderConfig, ReminderScheduler};
use taskpad::remote::memory::InMemoryRemote;
use taskpad::session::Session;
use taskpad::tasks::{Draft, TaskStore};
use taskpad_proto::task::{Priority, Task, TaskId};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::timeout;

const POLL: Duration = Duration::from_secs(60);

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn reminder_task(id: &str, title: &str, reminder: Option<DateTime<Utc>>) -> Task {
    let created = Utc::now() - TimeDelta::days(1);
    Task {
        id: TaskId::new(id),
        title: title.to_string(),
        description: None,
        completed: false,
        due_date: None,
        priority: Priority::Medium,
        category: None,
        tags: Vec::new(),
        reminder,
        created_at: created,
        updated_at: created,
    }
}

/// A reminder two minutes ahead of the wall clock, inside the default window.
fn soon() -> Option<DateTime<Utc>> {
    Some(Utc::now() + TimeDelta::minutes(2))
}

async fn store_with(tasks: Vec<Task>) -> Arc<TaskStore<InMemoryRemote>> {
    let remote = InMemoryRemote::new();
    remote.seed("alice", tasks);
    let store = Arc::new(TaskStore::new(remote, "alice"));
    store.load("alice").await.unwrap();
    store
}

fn config(refire: RefirePolicy) -> ReminderConfig {
    ReminderConfig {
        poll_interval: POLL,
        refire,
        ..ReminderConfig::default()
    }
}

fn granted() -> (Arc<dyn Notifier>, UnboundedReceiver<Notification>) {
    let (notifier, rx) = ChannelNotifier::new(Permission::Granted);
    notifier.request_permission();
    (Arc::new(notifier), rx)
}

/// Waits up to `within` of (paused) time for the next notification.
async fn next(rx: &mut UnboundedReceiver<Notification>, within: Duration) -> Option<Notification> {
    timeout(within, rx.recv()).await.ok().flatten()
}

// ---------------------------------------------------------------------------
// Scheduler loop
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn first_check_runs_after_one_interval() {
    let store = store_with(vec![reminder_task("1", "Call mom", soon())]).await;
    let (notifier, mut rx) = granted();
    let scheduler = Arc::new(ReminderScheduler::new(
        store,
        notifier,
        config(RefirePolicy::EveryTick),
    ));
    let handle = scheduler.spawn();

    assert!(next(&mut rx, POLL - Duration::from_secs(1)).await.is_none());
    let notification = next(&mut rx, Duration::from_secs(2)).await.unwrap();
    assert_eq!(notification.title, REMINDER_TITLE);
    assert_eq!(notification.body, "Call mom");

    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn every_tick_keeps_notifying_inside_the_window() {
    let store = store_with(vec![reminder_task("1", "Call mom", soon())]).await;
    let (notifier, mut rx) = granted();
    let scheduler = Arc::new(ReminderScheduler::new(
        store,
        notifier,
        config(RefirePolicy::EveryTick),
    ));
    let handle = scheduler.spawn();

    for _ in 0..3 {
        assert!(next(&mut rx, POLL * 2).await.is_some());
    }
    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn once_notifies_a_single_time() {
    let store = store_with(vec![reminder_task("1", "Call mom", soon())]).await;
    let (notifier, mut rx) = granted();
    let scheduler = Arc::new(ReminderScheduler::new(
        store,
        notifier,
        config(RefirePolicy::Once),
    ));
    let handle = scheduler.spawn();

    assert!(next(&mut rx, POLL * 2).await.is_some());
    assert!(next(&mut rx, POLL * 5).await.is_none());
    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn tasks_created_while_running_are_picked_up() {
    let store = store_with(Vec::new()).await;
    let (notifier, mut rx) = granted();
    let scheduler = Arc::new(ReminderScheduler::new(
        Arc::clone(&store),
        notifier,
        config(RefirePolicy::Once),
    ));
    let handle = scheduler.spawn();

    assert!(next(&mut rx, POLL * 2).await.is_none());

    let mut draft = Draft::new().title("Water plants");
    draft.reminder = soon();
    draft.submit(&store).await.unwrap();

    let notification = next(&mut rx, POLL * 2).await.unwrap();
    assert_eq!(notification.body, "Water plants");
    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn completing_a_task_silences_it() {
    let store = store_with(vec![reminder_task("1", "Call mom", soon())]).await;
    let (notifier, mut rx) = granted();
    let scheduler = Arc::new(ReminderScheduler::new(
        Arc::clone(&store),
        notifier,
        config(RefirePolicy::EveryTick),
    ));
    let handle = scheduler.spawn();

    assert!(next(&mut rx, POLL * 2).await.is_some());
    store.toggle_completion(&TaskId::new("1")).await.unwrap();
    assert!(next(&mut rx, POLL * 3).await.is_none());
    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn stop_ends_the_loop() {
    let store = store_with(vec![reminder_task("1", "Call mom", soon())]).await;
    let (notifier, mut rx) = granted();
    let scheduler = Arc::new(ReminderScheduler::new(
        store,
        notifier,
        config(RefirePolicy::EveryTick),
    ));
    let handle = scheduler.spawn();
    assert!(handle.is_running());

    handle.stop().await;
    assert!(next(&mut rx, POLL * 3).await.is_none());
}

#[tokio::test(start_paused = true)]
async fn dropping_the_handle_aborts_the_loop() {
    let store = store_with(vec![reminder_task("1", "Call mom", soon())]).await;
    let (notifier, mut rx) = granted();
    let scheduler = Arc::new(ReminderScheduler::new(
        store,
        notifier,
        config(RefirePolicy::EveryTick),
    ));

    drop(scheduler.spawn());
    tokio::task::yield_now().await;
    assert!(next(&mut rx, POLL * 3).await.is_none());
}

#[tokio::test(start_paused = true)]
async fn log_notifier_drives_the_loop() {
    let store = store_with(vec![reminder_task("1", "Call mom", soon())]).await;
    let notifier = Arc::new(LogNotifier::new());
    assert_eq!(notifier.request_permission(), Permission::Granted);

    let scheduler = Arc::new(ReminderScheduler::new(
        store,
        notifier,
        config(RefirePolicy::Once),
    ));
    let fired = scheduler.tick(Utc::now());
    assert_eq!(fired.len(), 1);
    assert_eq!(fired[0].id, TaskId::new("1"));
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn session_notifies_until_ended() {
    let store = store_with(vec![reminder_task("1", "Call mom", soon())]).await;
    let (notifier, mut rx) = ChannelNotifier::new(Permission::Granted);
    let session = Session::start(store, Arc::new(notifier), config(RefirePolicy::EveryTick));

    assert_eq!(session.permission(), Permission::Granted);
    assert!(next(&mut rx, POLL * 2).await.is_some());

    session.end().await;
    assert!(next(&mut rx, POLL * 3).await.is_none());
}

#[tokio::test(start_paused = true)]
async fn denied_session_stays_silent() {
    let store = store_with(vec![reminder_task("1", "Call mom", soon())]).await;
    let (notifier, mut rx) = ChannelNotifier::new(Permission::Denied);
    let session = Session::start(store, Arc::new(notifier), config(RefirePolicy::EveryTick));

    assert_eq!(session.permission(), Permission::Denied);
    assert!(session.reminders_running());
    assert!(next(&mut rx, POLL * 3).await.is_none());
    session.end().await;
}
