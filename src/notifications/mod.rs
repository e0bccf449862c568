//! Notification presentation: collaborator traits, the desktop
//! implementations and the dispatcher that applies per-category policy.

pub mod desktop;
pub mod dispatcher;

use crate::domain::{Category, Urgency};

pub use desktop::{DesktopNotifier, SystemSound};
pub use dispatcher::{Dispatched, NotificationDispatcher};

/// Content of a single notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub message: String,
    pub urgency: Urgency,
    /// Stays on screen until the user dismisses it
    pub requires_dismissal: bool,
}

/// Where notifications are shown
pub trait NotificationSink: Send + Sync {
    /// Show a notification under presentation id `id`.
    fn show(&self, id: &str, notification: &Notification) -> anyhow::Result<()>;

    /// Remove a shown notification; `false` when it was already gone.
    fn dismiss(&self, id: &str) -> anyhow::Result<bool>;
}

/// Plays the sound associated with a category. Fire-and-forget.
pub trait AudioSink: Send + Sync {
    fn play(&self, category: Category) -> anyhow::Result<()>;
}
