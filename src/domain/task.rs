use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A task as persisted in the task store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Creation timestamp in milliseconds, bumped to stay unique
    pub id: i64,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
    /// Absolute time the reminder fires (or fired)
    #[serde(default)]
    pub reminder: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Task {
    pub fn new(id: i64, text: String, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            text,
            completed: false,
            reminder: None,
            created_at,
        }
    }

    /// Check whether the reminder time has passed
    pub fn is_reminder_expired(&self, now: DateTime<Utc>) -> bool {
        self.reminder.is_some_and(|at| at < now)
    }
}

/// Next task id: the creation time in millis, or one past the largest id in use
pub fn next_task_id(tasks: &[Task], now: DateTime<Utc>) -> i64 {
    let candidate = now.timestamp_millis();
    match tasks.iter().map(|task| task.id).max() {
        Some(max) if max >= candidate => max + 1,
        _ => candidate,
    }
}

/// Incomplete tasks that carry a reminder, soonest first
pub fn reminder_agenda(tasks: &[Task]) -> Vec<&Task> {
    let mut agenda: Vec<&Task> = tasks
        .iter()
        .filter(|task| task.reminder.is_some() && !task.completed)
        .collect();
    agenda.sort_by_key(|task| task.reminder);
    agenda
}
