//! Fire-and-forget user notifications.
//!
//! A [`Notifier`] delivers a [`Notification`] only after the user granted
//! permission. Permission is asked once per session; later requests return
//! the recorded answer without asking again.

use parking_lot::Mutex;
use tokio::sync::mpsc;

/// Notification permission state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Permission {
    /// Not asked yet.
    #[default]
    Default,
    /// The user allowed notifications.
    Granted,
    /// The user refused notifications.
    Denied,
}

/// A notification with a title and a body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Short heading.
    pub title: String,
    /// Main text.
    pub body: String,
}

impl Notification {
    /// Creates a notification.
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }
}

/// Delivery channel for notifications.
pub trait Notifier: Send + Sync {
    /// Asks for permission if it has not been asked yet and returns the
    /// resulting state.
    fn request_permission(&self) -> Permission;

    /// Current permission state, without asking.
    fn permission(&self) -> Permission;

    /// Delivers `notification`. Callers check [`permission`](Self::permission)
    /// first; delivery failures are logged, never returned.
    fn notify(&self, notification: &Notification);
}

/// Records the answer to the one-time permission prompt.
#[derive(Debug)]
pub struct PermissionGate {
    state: Mutex<Permission>,
    answer: Permission,
}

impl PermissionGate {
    /// A gate whose prompt will be answered with `answer`.
    #[must_use]
    pub fn new(answer: Permission) -> Self {
        Self {
            state: Mutex::new(Permission::Default),
            answer,
        }
    }

    /// Resolves the prompt on first call; returns the recorded state after.
    pub fn request(&self) -> Permission {
        let mut state = self.state.lock();
        if *state == Permission::Default {
            *state = self.answer;
            tracing::debug!(permission = ?*state, "notification permission resolved");
        }
        *state
    }

    /// Current state.
    pub fn current(&self) -> Permission {
        *self.state.lock()
    }
}

/// Writes notifications to the tracing log.
#[derive(Debug)]
pub struct LogNotifier {
    gate: PermissionGate,
}

impl LogNotifier {
    /// Creates a notifier that grants permission when asked.
    #[must_use]
    pub fn new() -> Self {
        Self {
            gate: PermissionGate::new(Permission::Granted),
        }
    }
}

impl Default for LogNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for LogNotifier {
    fn request_permission(&self) -> Permission {
        self.gate.request()
    }

    fn permission(&self) -> Permission {
        self.gate.current()
    }

    fn notify(&self, notification: &Notification) {
        tracing::info!(title = %notification.title, body = %notification.body, "notification");
    }
}

/// Prints notifications to stdout.
#[derive(Debug)]
pub struct ConsoleNotifier {
    gate: PermissionGate,
}

impl ConsoleNotifier {
    /// Creates a console notifier whose permission prompt yields `answer`.
    #[must_use]
    pub fn new(answer: Permission) -> Self {
        Self {
            gate: PermissionGate::new(answer),
        }
    }
}

impl Notifier for ConsoleNotifier {
    fn request_permission(&self) -> Permission {
        self.gate.request()
    }

    fn permission(&self) -> Permission {
        self.gate.current()
    }

    fn notify(&self, notification: &Notification) {
        println!("[{}] {}", notification.title, notification.body);
    }
}

/// Forwards notifications into an unbounded channel.
#[derive(Debug)]
pub struct ChannelNotifier {
    gate: PermissionGate,
    tx: mpsc::UnboundedSender<Notification>,
}

impl ChannelNotifier {
    /// Creates a notifier and the receiving end of its channel.
    #[must_use]
    pub fn new(answer: Permission) -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                gate: PermissionGate::new(answer),
                tx,
            },
            rx,
        )
    }
}

impl Notifier for ChannelNotifier {
    fn request_permission(&self) -> Permission {
        self.gate.request()
    }

    fn permission(&self) -> Permission {
        self.gate.current()
    }

    fn notify(&self, notification: &Notification) {
        if self.tx.send(notification.clone()).is_err() {
            tracing::debug!("notification receiver dropped");
        }
    }
}
