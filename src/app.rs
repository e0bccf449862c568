//! The app actor.
//!
//! One `App` owns the phase scheduler, the reminder engine and the
//! dispatcher. Commands and ticks are handled one at a time, so none of that
//! state needs locking. The task store is the only shared resource.

use crate::clock::Clock;
use crate::config::Config;
use crate::domain::{next_task_id, Activity, Category, Task};
use crate::error::{CommandError, StoreError};
use crate::notifications::{AudioSink, Dispatched, NotificationDispatcher, NotificationSink};
use crate::persistence::{TaskStore, TimerFacility};
use crate::scheduler::{PhaseChange, PomodoroScheduler, ReminderEngine};
use anyhow::Context;
use chrono::{DateTime, Local, Utc};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// Pomodoro controls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PomodoroAction {
    Start,
    Pause,
    Resume,
    TogglePause,
    Reset,
}

/// Everything the actor can be asked to do
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Pomodoro(PomodoroAction),
    Status,
    AddTask {
        text: String,
        reminder: Option<DateTime<Utc>>,
    },
    SetReminder {
        task_id: i64,
        at: DateTime<Utc>,
    },
    ClearReminder {
        task_id: i64,
    },
    ToggleComplete {
        task_id: i64,
    },
    DeleteTask {
        task_id: i64,
    },
    NotificationClicked(String),
    NotificationClosed(String),
}

/// What happened during one tick
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TickReport {
    pub phase_change: Option<PhaseChange>,
    pub reminders_fired: usize,
    pub dismissed: usize,
}

pub struct App {
    clock: Arc<dyn Clock>,
    store: Arc<dyn TaskStore>,
    pomodoro: PomodoroScheduler,
    reminders: ReminderEngine,
    dispatcher: NotificationDispatcher,
    /// Sound playback still running on the blocking pool
    sounds: Vec<JoinHandle<()>>,
}

impl App {
    pub fn new(
        clock: Arc<dyn Clock>,
        store: Arc<dyn TaskStore>,
        alarms: Box<dyn TimerFacility>,
        notifier: Arc<dyn NotificationSink>,
        audio: Arc<dyn AudioSink>,
        config: &Config,
    ) -> Self {
        Self {
            pomodoro: PomodoroScheduler::new(clock.clone(), config.phase_durations()),
            reminders: ReminderEngine::new(clock.clone(), alarms, store.clone()),
            dispatcher: NotificationDispatcher::new(
                clock.clone(),
                notifier,
                audio,
                config.phase_notice(),
            ),
            clock,
            store,
            sounds: Vec::new(),
        }
    }

    #[cfg(test)]
    pub fn pomodoro(&self) -> &PomodoroScheduler {
        &self.pomodoro
    }

    pub fn reminders(&self) -> &ReminderEngine {
        &self.reminders
    }

    /// Re-register reminders missing from the alarm facility
    pub async fn startup(&mut self) -> Result<usize, StoreError> {
        let tasks = self.store.get_tasks().await?;
        self.reminders.resync(&tasks).await
    }

    pub async fn tasks(&self) -> Result<Vec<Task>, StoreError> {
        self.store.get_tasks().await
    }

    /// Create a task, optionally with a reminder
    pub async fn add_task(
        &mut self,
        text: &str,
        reminder: Option<DateTime<Utc>>,
    ) -> Result<Task, CommandError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(CommandError::EmptyText);
        }

        let mut tasks = self.store.get_tasks().await?;
        let now = self.clock.now();
        let mut task = Task::new(next_task_id(&tasks, now), text.to_string(), now);
        task.reminder = reminder;
        tasks.push(task.clone());
        self.store.set_tasks(&tasks).await?;

        if let Some(at) = reminder {
            self.reminders.schedule_reminder(task.id, at).await?;
        }
        info!(task_id = task.id, "task added");
        Ok(task)
    }

    /// Set or move a task's reminder
    pub async fn set_reminder(
        &mut self,
        task_id: i64,
        at: DateTime<Utc>,
    ) -> Result<Task, CommandError> {
        let task = self
            .update_task(task_id, |task| task.reminder = Some(at))
            .await?;
        self.reminders.schedule_reminder(task_id, at).await?;
        Ok(task)
    }

    pub async fn clear_reminder(&mut self, task_id: i64) -> Result<Task, CommandError> {
        let task = self.update_task(task_id, |task| task.reminder = None).await?;
        self.reminders.cancel_reminder(task_id).await?;
        Ok(task)
    }

    pub async fn toggle_complete(&mut self, task_id: i64) -> Result<Task, CommandError> {
        self.update_task(task_id, |task| task.completed = !task.completed)
            .await
    }

    /// Remove a task and its reminder
    pub async fn delete_task(&mut self, task_id: i64) -> Result<Task, CommandError> {
        let mut tasks = self.store.get_tasks().await?;
        let index = tasks
            .iter()
            .position(|task| task.id == task_id)
            .ok_or(CommandError::UnknownTask(task_id))?;
        let removed = tasks.remove(index);
        self.store.set_tasks(&tasks).await?;

        self.reminders.cancel_reminder(task_id).await?;
        info!(task_id, "task deleted");
        Ok(removed)
    }

    async fn update_task(
        &mut self,
        task_id: i64,
        update: impl FnOnce(&mut Task),
    ) -> Result<Task, CommandError> {
        let mut tasks = self.store.get_tasks().await?;
        let task = tasks
            .iter_mut()
            .find(|task| task.id == task_id)
            .ok_or(CommandError::UnknownTask(task_id))?;
        update(task);
        let updated = task.clone();
        self.store.set_tasks(&tasks).await?;
        Ok(updated)
    }

    /// Apply a pomodoro control; `false` when it did not apply in the current state
    pub fn pomodoro_action(&mut self, action: PomodoroAction) -> bool {
        match action {
            PomodoroAction::Start => self.pomodoro.start(),
            PomodoroAction::Pause => self.pomodoro.pause(),
            PomodoroAction::Resume => self.pomodoro.resume(),
            PomodoroAction::TogglePause => self.pomodoro.toggle_pause(),
            PomodoroAction::Reset => {
                self.pomodoro.reset();
                true
            }
        }
    }

    /// Handle one command and return a line of feedback for the user
    pub async fn handle(&mut self, command: Command) -> Result<String, CommandError> {
        match command {
            Command::Pomodoro(action) => {
                if self.pomodoro_action(action) {
                    Ok(self.status_report())
                } else {
                    Ok(format!("Nothing to do: {}", self.pomodoro.status().status_line()))
                }
            }
            Command::Status => Ok(self.status_report()),
            Command::AddTask { text, reminder } => {
                let task = self.add_task(&text, reminder).await?;
                Ok(match task.reminder {
                    Some(at) => format!(
                        "Added task {}: {} (reminder at {})",
                        task.id,
                        task.text,
                        format_local(at)
                    ),
                    None => format!("Added task {}: {}", task.id, task.text),
                })
            }
            Command::SetReminder { task_id, at } => {
                self.set_reminder(task_id, at).await?;
                Ok(format!("Reminder for task {} set for {}", task_id, format_local(at)))
            }
            Command::ClearReminder { task_id } => {
                self.clear_reminder(task_id).await?;
                Ok(format!("Reminder cleared for task {}", task_id))
            }
            Command::ToggleComplete { task_id } => {
                let task = self.toggle_complete(task_id).await?;
                if task.completed {
                    Ok(format!("Task {} marked done", task_id))
                } else {
                    Ok(format!("Task {} marked not done", task_id))
                }
            }
            Command::DeleteTask { task_id } => {
                self.delete_task(task_id).await?;
                Ok(format!("Deleted task {}", task_id))
            }
            Command::NotificationClicked(id) => {
                if self.dispatcher.on_clicked(&id) == Some(Category::TaskReminder) {
                    let tasks = self.store.get_tasks().await?;
                    info!(tasks = tasks.len(), "current tasks at reminder click");
                }
                Ok(String::new())
            }
            Command::NotificationClosed(id) => {
                self.dispatcher.on_closed(&id);
                Ok(String::new())
            }
        }
    }

    /// Status line with phase progress and the next boundary, if armed
    pub fn status_report(&self) -> String {
        let status = self.pomodoro.status();
        let mut report = status.to_string();
        if status.activity != Activity::Inactive {
            report.push_str(&format!(", {:.0}% of phase left", status.progress * 100.0));
        }
        if let Some(at) = self.pomodoro.next_boundary() {
            report.push_str(&format!(", next phase at {}", format_local(at)));
        }
        report
    }

    /// Fire everything that is due: phase boundary, auto-dismissals, reminders
    pub async fn tick(&mut self) -> Result<TickReport, StoreError> {
        self.reap_sounds().await;
        let mut report = TickReport::default();

        if let Some(change) = self.pomodoro.poll() {
            let dispatched = self.dispatcher.phase_started(&change);
            self.track(dispatched);
            report.phase_change = Some(change);
        }
        report.dismissed = self.dispatcher.poll_dismissals();

        let fired = self.reminders.fire_due(&mut self.dispatcher).await?;
        report.reminders_fired = fired.len();
        for dispatched in fired {
            self.track(dispatched);
        }
        Ok(report)
    }

    fn track(&mut self, dispatched: Dispatched) {
        debug!(id = %dispatched.id, "notification dispatched");
        self.sounds.push(dispatched.sound);
    }

    /// Collect finished sound tasks; with `wait_all`, also wait for the rest
    async fn reap_sounds_until(&mut self, wait_all: bool) {
        let (finished, playing): (Vec<_>, Vec<_>) = std::mem::take(&mut self.sounds)
            .into_iter()
            .partition(|sound| wait_all || sound.is_finished());
        self.sounds = playing;

        for sound in finished {
            if let Err(err) = sound.await {
                warn!(error = %err, "sound task failed");
            }
        }
    }

    async fn reap_sounds(&mut self) {
        self.reap_sounds_until(false).await;
    }

    /// Process ticks and commands until the channel closes or Ctrl-C
    pub async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        tick: std::time::Duration,
    ) -> anyhow::Result<()> {
        let mut ticker = tokio::time::interval(tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(?tick, "focusbell running");

        loop {
            tokio::select! {
                _ = ticker.tick() => match self.tick().await {
                    Ok(report) => announce(&report),
                    Err(err) => error!(error = %err, "tick failed"),
                },
                command = commands.recv() => match command {
                    Some(command) => match self.handle(command).await {
                        Ok(reply) if !reply.is_empty() => println!("{}", reply),
                        Ok(_) => {}
                        Err(err) => {
                            error!(error = %err, "command failed");
                            println!("Error: {}", err);
                        }
                    },
                    None => {
                        info!("command input closed");
                        break;
                    }
                },
                result = tokio::signal::ctrl_c() => {
                    result.context("Failed to listen for Ctrl-C")?;
                    info!("interrupted");
                    break;
                }
            }
        }

        // Let the last chime finish before the process exits.
        self.reap_sounds_until(true).await;
        Ok(())
    }
}

/// Print phase changes for the user and log reminder activity
fn announce(report: &TickReport) {
    if let Some(change) = &report.phase_change {
        println!(
            "{} is over; {} started at {} (cycles completed: {})",
            change.ended.label(),
            change.started.label(),
            format_local(change.at),
            change.completed_cycles
        );
    }
    if report.reminders_fired > 0 || report.dismissed > 0 {
        debug!(
            reminders_fired = report.reminders_fired,
            dismissed = report.dismissed,
            "tick delivered notifications"
        );
    }
}

/// Format an absolute time in the local timezone for display
pub fn format_local(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}
