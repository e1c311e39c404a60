//! Periodic reminder checks over the task store.
//!
//! Every poll interval the scheduler reads a snapshot of the store and
//! notifies about open tasks whose reminder falls within the lead window:
//! `0 < reminder - now <= lead_window`. Nothing is sent unless the notifier
//! holds a granted permission.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::Mutex;
use taskpad_proto::task::{Task, TaskId};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::notify::{Notification, Notifier, Permission};
use crate::remote::RemoteTasks;
use crate::tasks::TaskStore;

/// Title of every reminder notification; the body is the task title.
pub const REMINDER_TITLE: &str = "Task reminder";

/// Shortest accepted poll interval.
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Whether a task still inside the lead window is notified again on later ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RefirePolicy {
    /// Notify once per reminder value. Editing the reminder re-arms it.
    #[default]
    Once,
    /// Notify on every tick while the reminder is inside the window.
    EveryTick,
}

impl fmt::Display for RefirePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Once => "once",
            Self::EveryTick => "every-tick",
        })
    }
}

/// Error returned when parsing an unknown re-fire policy.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown refire policy '{0}' (expected once or every-tick)")]
pub struct ParseRefirePolicyError(String);

impl FromStr for RefirePolicy {
    type Err = ParseRefirePolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "once" => Ok(Self::Once),
            "every-tick" => Ok(Self::EveryTick),
            _ => Err(ParseRefirePolicyError(s.to_string())),
        }
    }
}

/// Scheduler timing and re-fire behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReminderConfig {
    /// Time between checks.
    pub poll_interval: Duration,
    /// How far ahead of a reminder the notification may fire.
    pub lead_window: Duration,
    /// Re-fire behavior.
    pub refire: RefirePolicy,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(60),
            lead_window: Duration::from_secs(5 * 60),
            refire: RefirePolicy::Once,
        }
    }
}

/// Returns `true` if `task` is open and its reminder lies in `(now, now + lead_window]`.
#[must_use]
pub fn is_due(task: &Task, now: DateTime<Utc>, lead_window: TimeDelta) -> bool {
    if task.completed {
        return false;
    }
    task.reminder.is_some_and(|reminder| {
        let remaining = reminder - now;
        remaining > TimeDelta::zero() && remaining <= lead_window
    })
}

/// Raises reminder notifications for the tasks of one store.
pub struct ReminderScheduler<R> {
    store: Arc<TaskStore<R>>,
    notifier: Arc<dyn Notifier>,
    config: ReminderConfig,
    /// Task id -> reminder value already notified. Only used with
    /// [`RefirePolicy::Once`].
    notified: Mutex<HashMap<TaskId, DateTime<Utc>>>,
}

impl<R: RemoteTasks> ReminderScheduler<R> {
    /// Creates a scheduler. Nothing runs until [`spawn`](Self::spawn) or
    /// [`tick`](Self::tick) is called.
    pub fn new(
        store: Arc<TaskStore<R>>,
        notifier: Arc<dyn Notifier>,
        config: ReminderConfig,
    ) -> Self {
        Self {
            store,
            notifier,
            config,
            notified: Mutex::new(HashMap::new()),
        }
    }

    /// The scheduler's configuration.
    #[must_use]
    pub const fn config(&self) -> &ReminderConfig {
        &self.config
    }

    /// Runs one check at `now` and returns the tasks that were notified.
    pub fn tick(&self, now: DateTime<Utc>) -> Vec<Task> {
        let tasks = self.store.snapshot();
        let mut notified = self.notified.lock();

        // Forget markers of deleted tasks and of reminders that were edited.
        let current: HashMap<&TaskId, Option<DateTime<Utc>>> =
            tasks.iter().map(|t| (&t.id, t.reminder)).collect();
        notified.retain(|id, at| current.get(id).is_some_and(|r| *r == Some(*at)));

        if self.notifier.permission() != Permission::Granted {
            return Vec::new();
        }

        let lead_window = TimeDelta::from_std(self.config.lead_window).unwrap_or(TimeDelta::MAX);
        let mut fired = Vec::new();
        for task in tasks.iter().filter(|t| is_due(t, now, lead_window)) {
            if self.config.refire == RefirePolicy::Once {
                let Some(reminder) = task.reminder else {
                    continue;
                };
                if notified.get(&task.id) == Some(&reminder) {
                    continue;
                }
                notified.insert(task.id.clone(), reminder);
            }
            self.notifier
                .notify(&Notification::new(REMINDER_TITLE, task.title.clone()));
            tracing::info!(task_id = %task.id, "reminder sent");
            fired.push(task.clone());
        }
        fired
    }

    /// Starts the periodic check on the tokio runtime. The first check runs
    /// one poll interval after the call.
    pub fn spawn(self: &Arc<Self>) -> ReminderHandle
    where
        R: 'static,
    {
        let scheduler = Arc::clone(self);
        let period = self.config.poll_interval.max(MIN_POLL_INTERVAL);
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = interval.tick() => {
                        let fired = scheduler.tick(Utc::now());
                        tracing::trace!(count = fired.len(), "reminder check");
                    }
                }
            }
            tracing::debug!("reminder scheduler stopped");
        });
        tracing::debug!(poll_interval = ?period, "reminder scheduler started");

        ReminderHandle {
            shutdown: Some(shutdown_tx),
            task: Some(task),
        }
    }
}

/// Handle to a running scheduler. Dropping it aborts the loop.
#[derive(Debug)]
pub struct ReminderHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl ReminderHandle {
    /// Signals the loop to stop and waits for it to finish.
    pub async fn stop(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    tracing::warn!(error = %e, "reminder scheduler ended abnormally");
                }
            }
        }
    }

    /// Returns `true` while the loop is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for ReminderHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
