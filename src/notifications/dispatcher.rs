use super::{AudioSink, Notification, NotificationSink};
use crate::clock::Clock;
use crate::domain::{Category, Phase, Task, Urgency};
use crate::scheduler::pomodoro::PhaseChange;
use crate::scheduler::timer::TimerQueue;
use chrono::Duration;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Default delay before phase notifications clear themselves
pub const DEFAULT_PHASE_NOTICE_SECS: u64 = 5;

/// Presentation rules for a category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Policy {
    pub urgency: Urgency,
    pub requires_dismissal: bool,
    pub auto_dismiss: Option<Duration>,
}

impl Policy {
    /// Task reminders stay until dismissed; phase notices clear after `phase_notice`
    pub fn for_category(category: Category, phase_notice: Duration) -> Self {
        match category {
            Category::TaskReminder => Self {
                urgency: Urgency::High,
                requires_dismissal: true,
                auto_dismiss: None,
            },
            Category::PhaseWorkStarted | Category::PhaseBreakStarted => Self {
                urgency: Urgency::Normal,
                requires_dismissal: false,
                auto_dismiss: Some(phase_notice),
            },
        }
    }
}

/// A dispatched notification
#[derive(Debug)]
pub struct Dispatched {
    pub id: String,
    /// Sound playback running on the blocking pool; dropping it detaches
    pub sound: JoinHandle<()>,
}

/// Turns reminder and phase events into notification + sound calls.
///
/// Must be used from inside a tokio runtime: sounds play on the blocking pool
/// so a slow or failing audio device never holds up the notification.
pub struct NotificationDispatcher {
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn NotificationSink>,
    audio: Arc<dyn AudioSink>,
    dismissals: TimerQueue,
    phase_notice: Duration,
    sequence: u64,
}

impl NotificationDispatcher {
    pub fn new(
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn NotificationSink>,
        audio: Arc<dyn AudioSink>,
        phase_notice: Duration,
    ) -> Self {
        Self {
            clock,
            notifier,
            audio,
            dismissals: TimerQueue::default(),
            phase_notice,
            sequence: 0,
        }
    }

    /// Show a notification for `category` and play its sound
    pub fn dispatch(&mut self, category: Category, title: &str, message: &str) -> Dispatched {
        let now = self.clock.now();
        let id = format!(
            "{}_{}_{}",
            category.as_tag(),
            now.timestamp_millis(),
            self.sequence
        );
        self.sequence += 1;

        let audio = Arc::clone(&self.audio);
        let sound = tokio::task::spawn_blocking(move || {
            if let Err(err) = audio.play(category) {
                warn!(?category, error = %err, "sound playback failed");
            }
        });

        let policy = Policy::for_category(category, self.phase_notice);
        let notification = Notification {
            title: title.to_string(),
            message: message.to_string(),
            urgency: policy.urgency,
            requires_dismissal: policy.requires_dismissal,
        };

        match self.notifier.show(&id, &notification) {
            Ok(()) => {
                if let Some(delay) = policy.auto_dismiss {
                    self.dismissals.schedule(id.clone(), now + delay);
                }
            }
            Err(err) => warn!(id = %id, error = %err, "failed to show notification"),
        }

        Dispatched { id, sound }
    }

    pub fn task_reminder(&mut self, task: &Task) -> Dispatched {
        info!(task_id = task.id, "task reminder triggered");
        self.dispatch(
            Category::TaskReminder,
            "Task Reminder",
            &format!("Reminder for: {}", task.text),
        )
    }

    /// Announce the phase that just started
    pub fn phase_started(&mut self, change: &PhaseChange) -> Dispatched {
        let (title, message) = match change.started {
            Phase::Work => ("Pomodoro Work Time", "Time to focus! Work session started."),
            Phase::Break => ("Pomodoro Break Time", "Take a break! You've earned it."),
        };
        self.dispatch(change.started.started_category(), title, message)
    }

    /// Clear notifications whose auto-dismiss delay has passed.
    /// Returns how many were actually cleared.
    pub fn poll_dismissals(&mut self) -> usize {
        let now = self.clock.now();
        let mut cleared = 0;

        for id in self.dismissals.take_due(now) {
            match self.notifier.dismiss(&id) {
                Ok(true) => cleared += 1,
                Ok(false) => debug!(id = %id, "notification already gone"),
                Err(err) => warn!(id = %id, error = %err, "failed to clear notification"),
            }
        }
        cleared
    }

    /// The user closed a notification; its pending auto-dismiss is dropped
    pub fn on_closed(&mut self, id: &str) {
        if self.dismissals.cancel(id) {
            debug!(id, "auto-dismiss cancelled");
        }
        info!(id, "notification closed");
    }

    /// The user clicked a notification
    pub fn on_clicked(&mut self, id: &str) -> Option<Category> {
        let category = Category::from_presentation_id(id);
        info!(id, ?category, "notification clicked");
        category
    }

    #[cfg(test)]
    pub fn pending_dismissals(&self) -> usize {
        self.dismissals.iter().count()
    }
}
