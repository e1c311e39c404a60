//! One user's working session: store, notifier and reminder loop.

use std::sync::Arc;

use crate::notify::{Notifier, Permission};
use crate::reminder::{ReminderConfig, ReminderHandle, ReminderScheduler};
use crate::remote::RemoteTasks;
use crate::tasks::TaskStore;

/// Active session. Reminders run from [`start`](Self::start) until
/// [`end`](Self::end); dropping the session without ending it aborts them.
pub struct Session<R> {
    store: Arc<TaskStore<R>>,
    notifier: Arc<dyn Notifier>,
    scheduler: Arc<ReminderScheduler<R>>,
    reminders: Option<ReminderHandle>,
}

impl<R: RemoteTasks + 'static> Session<R> {
    /// Asks for notification permission and starts the reminder loop.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(
        store: Arc<TaskStore<R>>,
        notifier: Arc<dyn Notifier>,
        config: ReminderConfig,
    ) -> Self {
        let permission = notifier.request_permission();
        tracing::info!(user_id = %store.user_id(), ?permission, "session started");

        let scheduler = Arc::new(ReminderScheduler::new(
            Arc::clone(&store),
            Arc::clone(&notifier),
            config,
        ));
        let reminders = scheduler.spawn();
        Self {
            store,
            notifier,
            scheduler,
            reminders: Some(reminders),
        }
    }

    /// The session's task store.
    #[must_use]
    pub const fn store(&self) -> &Arc<TaskStore<R>> {
        &self.store
    }

    /// The session's reminder scheduler.
    #[must_use]
    pub fn scheduler(&self) -> &ReminderScheduler<R> {
        &self.scheduler
    }

    /// Notification permission as resolved at start.
    #[must_use]
    pub fn permission(&self) -> Permission {
        self.notifier.permission()
    }

    /// Returns `true` while the reminder loop runs.
    #[must_use]
    pub fn reminders_running(&self) -> bool {
        self.reminders.as_ref().is_some_and(ReminderHandle::is_running)
    }

    /// Stops the reminder loop and waits for it to exit.
    pub async fn end(mut self) {
        if let Some(reminders) = self.reminders.take() {
            reminders.stop().await;
        }
        tracing::info!(user_id = %self.store.user_id(), "session ended");
    }
}
