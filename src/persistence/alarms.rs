//! Host timer facility for reminders.
//!
//! `AlarmFile` keeps every entry in `alarms.json` and re-reads it on each
//! call, so alarms registered by a short-lived CLI process are picked up by
//! the long-running daemon and survive restarts.

use super::files::{atomic_write, read_file};
use crate::error::StoreError;
use crate::scheduler::timer::TimerQueue;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::PathBuf;

/// A pending alarm
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alarm {
    pub key: String,
    pub fire_at: DateTime<Utc>,
}

/// Keyed one-shot alarms
#[async_trait]
pub trait TimerFacility: Send + Sync {
    /// Register `key` to fire at `fire_at`, replacing any entry with the same key.
    /// A time in the past fires on the next `take_due`.
    async fn schedule(&mut self, key: &str, fire_at: DateTime<Utc>) -> Result<(), StoreError>;

    /// Remove `key`; returns whether it was pending.
    async fn cancel(&mut self, key: &str) -> Result<bool, StoreError>;

    /// Remove and return every key due at `now`, earliest first.
    async fn take_due(&mut self, now: DateTime<Utc>) -> Result<Vec<String>, StoreError>;

    /// Every pending alarm, earliest first.
    async fn pending(&self) -> Result<Vec<Alarm>, StoreError>;
}

fn pending_alarms(queue: &TimerQueue) -> Vec<Alarm> {
    let mut alarms: Vec<Alarm> = queue
        .iter()
        .map(|(key, fire_at)| Alarm {
            key: key.to_string(),
            fire_at,
        })
        .collect();
    alarms.sort_by_key(|alarm| alarm.fire_at);
    alarms
}

/// Restart-durable alarms stored as JSON
#[derive(Debug, Clone)]
pub struct AlarmFile {
    path: PathBuf,
}

impl AlarmFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn load(&self) -> Result<TimerQueue, StoreError> {
        let content = read_file(&self.path).map_err(|source| self.io_error(source))?;
        if content.trim().is_empty() {
            return Ok(TimerQueue::default());
        }
        serde_json::from_str(&content).map_err(|source| StoreError::Format {
            path: self.path.clone(),
            source,
        })
    }

    fn save(&self, queue: &TimerQueue) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(queue).map_err(|source| StoreError::Format {
            path: self.path.clone(),
            source,
        })?;
        atomic_write(&self.path, &json).map_err(|source| self.io_error(source))
    }

    fn io_error(&self, source: anyhow::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }

    /// Load, apply `update` and save if it reports a change, on the blocking pool
    async fn with_queue<T, F>(&self, update: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut TimerQueue) -> (T, bool) + Send + 'static,
    {
        let file = self.clone();
        tokio::task::spawn_blocking(move || {
            let mut queue = file.load()?;
            let (result, changed) = update(&mut queue);
            if changed {
                file.save(&queue)?;
            }
            Ok(result)
        })
        .await?
    }
}

#[async_trait]
impl TimerFacility for AlarmFile {
    async fn schedule(&mut self, key: &str, fire_at: DateTime<Utc>) -> Result<(), StoreError> {
        let key = key.to_string();
        self.with_queue(move |queue| {
            queue.schedule(key, fire_at);
            ((), true)
        })
        .await
    }

    async fn cancel(&mut self, key: &str) -> Result<bool, StoreError> {
        let key = key.to_string();
        self.with_queue(move |queue| {
            let removed = queue.cancel(&key);
            (removed, removed)
        })
        .await
    }

    async fn take_due(&mut self, now: DateTime<Utc>) -> Result<Vec<String>, StoreError> {
        self.with_queue(move |queue| {
            let due = queue.take_due(now);
            let changed = !due.is_empty();
            (due, changed)
        })
        .await
    }

    async fn pending(&self) -> Result<Vec<Alarm>, StoreError> {
        self.with_queue(|queue| (pending_alarms(queue), false)).await
    }
}

/// Volatile alarms, lost on restart
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryAlarms {
    queue: TimerQueue,
}

#[cfg(test)]
#[async_trait]
impl TimerFacility for MemoryAlarms {
    async fn schedule(&mut self, key: &str, fire_at: DateTime<Utc>) -> Result<(), StoreError> {
        self.queue.schedule(key, fire_at);
        Ok(())
    }

    async fn cancel(&mut self, key: &str) -> Result<bool, StoreError> {
        Ok(self.queue.cancel(key))
    }

    async fn take_due(&mut self, now: DateTime<Utc>) -> Result<Vec<String>, StoreError> {
        Ok(self.queue.take_due(now))
    }

    async fn pending(&self) -> Result<Vec<Alarm>, StoreError> {
        Ok(pending_alarms(&self.queue))
    }
}
