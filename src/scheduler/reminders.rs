//! Task reminder scheduling.
//!
//! Each task has at most one alarm, keyed by [`reminder_key`]. Alarms live in
//! the host timer facility, not in this struct, so they outlive the process.
//! A fired alarm only carries the task id; the task itself is looked up at
//! fire time and may have been deleted in the meantime.

use super::keys::{parse_reminder_key, reminder_key};
use crate::clock::Clock;
use crate::domain::Task;
use crate::error::StoreError;
use crate::notifications::{Dispatched, NotificationDispatcher};
use crate::persistence::{TaskStore, TimerFacility};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub struct ReminderEngine {
    clock: Arc<dyn Clock>,
    alarms: Box<dyn TimerFacility>,
    store: Arc<dyn TaskStore>,
}

impl ReminderEngine {
    pub fn new(
        clock: Arc<dyn Clock>,
        alarms: Box<dyn TimerFacility>,
        store: Arc<dyn TaskStore>,
    ) -> Self {
        Self {
            clock,
            alarms,
            store,
        }
    }

    /// Register a one-shot reminder, replacing any earlier one for the task.
    ///
    /// A time in the past is kept and fires on the next tick.
    pub async fn schedule_reminder(
        &mut self,
        task_id: i64,
        fire_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.alarms.schedule(&reminder_key(task_id), fire_at).await?;
        if fire_at <= self.clock.now() {
            info!(task_id, %fire_at, "reminder time already passed; firing on next tick");
        } else {
            info!(task_id, %fire_at, "reminder scheduled");
        }
        Ok(())
    }

    /// Drop the task's reminder; returns whether one was pending
    pub async fn cancel_reminder(&mut self, task_id: i64) -> Result<bool, StoreError> {
        let cancelled = self.alarms.cancel(&reminder_key(task_id)).await?;
        if cancelled {
            info!(task_id, "reminder cancelled");
        }
        Ok(cancelled)
    }

    /// When the task's reminder will fire, if one is pending
    pub async fn scheduled_at(&self, task_id: i64) -> Result<Option<DateTime<Utc>>, StoreError> {
        let key = reminder_key(task_id);
        Ok(self
            .alarms
            .pending()
            .await?
            .into_iter()
            .find(|alarm| alarm.key == key)
            .map(|alarm| alarm.fire_at))
    }

    /// Deliver a fired reminder.
    ///
    /// A task deleted after scheduling yields `Ok(None)`: nothing is shown.
    pub async fn on_fire(
        &self,
        task_id: i64,
        dispatcher: &mut NotificationDispatcher,
    ) -> Result<Option<Dispatched>, StoreError> {
        let tasks = self.store.get_tasks().await?;
        match tasks.iter().find(|task| task.id == task_id) {
            Some(task) => Ok(Some(dispatcher.task_reminder(task))),
            None => {
                info!(task_id, "reminder fired for a task that no longer exists; dropped");
                Ok(None)
            }
        }
    }

    /// Fire every reminder that is due, earliest first.
    ///
    /// If a task lookup fails, that reminder and every one not yet tried are
    /// put back as due before the error is returned, so the next tick retries
    /// them.
    pub async fn fire_due(
        &mut self,
        dispatcher: &mut NotificationDispatcher,
    ) -> Result<Vec<Dispatched>, StoreError> {
        let now = self.clock.now();
        let mut keys = self.alarms.take_due(now).await?.into_iter();

        let mut fired = Vec::new();
        while let Some(key) = keys.next() {
            let task_id = match parse_reminder_key(&key) {
                Ok(task_id) => task_id,
                Err(err) => {
                    warn!(error = %err, "discarding malformed alarm");
                    continue;
                }
            };
            debug!(task_id, "reminder alarm fired");
            match self.on_fire(task_id, dispatcher).await {
                Ok(Some(dispatched)) => fired.push(dispatched),
                Ok(None) => {}
                Err(err) => {
                    self.requeue(std::iter::once(key).chain(keys), now).await;
                    return Err(err);
                }
            }
        }
        Ok(fired)
    }

    async fn requeue(&mut self, keys: impl Iterator<Item = String>, due: DateTime<Utc>) {
        for key in keys {
            match self.alarms.schedule(&key, due).await {
                Ok(()) => debug!(%key, "reminder put back for retry"),
                Err(err) => error!(%key, error = %err, "failed to put reminder back; it is lost"),
            }
        }
    }

    /// Best-effort startup pass: register reminders that should be pending
    /// but are missing from the facility.
    ///
    /// Only future reminders of incomplete tasks qualify, so a restart never
    /// re-delivers a reminder that already fired.
    pub async fn resync(&mut self, tasks: &[Task]) -> Result<usize, StoreError> {
        let now = self.clock.now();
        let pending: HashSet<String> = self
            .alarms
            .pending()
            .await?
            .into_iter()
            .map(|alarm| alarm.key)
            .collect();

        let mut registered = 0;
        for task in tasks.iter().filter(|task| !task.completed) {
            let Some(fire_at) = task.reminder else {
                continue;
            };
            let key = reminder_key(task.id);
            if fire_at > now && !pending.contains(&key) {
                self.alarms.schedule(&key, fire_at).await?;
                registered += 1;
            }
        }

        if registered > 0 {
            info!(registered, "re-registered missing reminders");
        }
        Ok(registered)
    }
}
