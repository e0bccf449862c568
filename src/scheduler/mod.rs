pub mod keys;
pub mod pomodoro;
pub mod reminders;
pub mod timer;

pub use pomodoro::{PhaseChange, PhaseDurations, PomodoroScheduler};
pub use reminders::ReminderEngine;
