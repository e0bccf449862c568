//! Recording collaborators shared by unit tests.

use crate::domain::{Category, Task};
use crate::error::StoreError;
use crate::notifications::{AudioSink, Notification, NotificationSink};
use crate::persistence::task_store::MemoryTaskStore;
use crate::persistence::TaskStore;
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Notification sink that remembers everything it was asked to do
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    shown: Mutex<Vec<(String, Notification)>>,
    open: Mutex<HashSet<String>>,
    dismiss_calls: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn shown(&self) -> Vec<(String, Notification)> {
        self.shown.lock().unwrap().clone()
    }

    pub fn dismiss_calls(&self) -> Vec<String> {
        self.dismiss_calls.lock().unwrap().clone()
    }

    /// Simulate the user closing a notification
    pub fn close_by_user(&self, id: &str) {
        self.open.lock().unwrap().remove(id);
    }
}

impl NotificationSink for RecordingNotifier {
    fn show(&self, id: &str, notification: &Notification) -> anyhow::Result<()> {
        self.shown
            .lock()
            .unwrap()
            .push((id.to_string(), notification.clone()));
        self.open.lock().unwrap().insert(id.to_string());
        Ok(())
    }

    fn dismiss(&self, id: &str) -> anyhow::Result<bool> {
        self.dismiss_calls.lock().unwrap().push(id.to_string());
        Ok(self.open.lock().unwrap().remove(id))
    }
}

/// Notification sink whose display always fails
#[derive(Debug, Default)]
pub struct FailingNotifier;

impl NotificationSink for FailingNotifier {
    fn show(&self, _id: &str, _notification: &Notification) -> anyhow::Result<()> {
        anyhow::bail!("display unavailable")
    }

    fn dismiss(&self, _id: &str) -> anyhow::Result<bool> {
        Ok(false)
    }
}

/// Audio sink that records categories instead of playing them
#[derive(Debug, Default)]
pub struct RecordingAudio {
    played: Mutex<Vec<Category>>,
}

impl RecordingAudio {
    pub fn played(&self) -> Vec<Category> {
        self.played.lock().unwrap().clone()
    }
}

impl AudioSink for RecordingAudio {
    fn play(&self, category: Category) -> anyhow::Result<()> {
        self.played.lock().unwrap().push(category);
        Ok(())
    }
}

/// Audio sink with no working device
#[derive(Debug, Default)]
pub struct FailingAudio;

impl AudioSink for FailingAudio {
    fn play(&self, _category: Category) -> anyhow::Result<()> {
        anyhow::bail!("no audio device")
    }
}

/// In-memory task store that can be told to fail its next calls with an
/// I/O error
#[derive(Debug)]
pub struct FailingTaskStore {
    inner: MemoryTaskStore,
    failures: AtomicUsize,
}

impl FailingTaskStore {
    /// Every call fails
    pub fn always() -> Self {
        let store = Self::with_tasks(Vec::new());
        store.fail_next(usize::MAX);
        store
    }

    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        Self {
            inner: MemoryTaskStore::with_tasks(tasks),
            failures: AtomicUsize::new(0),
        }
    }

    /// Fail the next `calls` reads or writes
    pub fn fail_next(&self, calls: usize) {
        self.failures.store(calls, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StoreError> {
        let failed = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| match left {
                0 => None,
                usize::MAX => Some(usize::MAX),
                left => Some(left - 1),
            })
            .is_ok();
        if failed {
            return Err(StoreError::Io {
                path: PathBuf::from("tasks.json"),
                source: anyhow::anyhow!("disk unavailable"),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl TaskStore for FailingTaskStore {
    async fn get_tasks(&self) -> Result<Vec<Task>, StoreError> {
        self.check()?;
        self.inner.get_tasks().await
    }

    async fn set_tasks(&self, tasks: &[Task]) -> Result<(), StoreError> {
        self.check()?;
        self.inner.set_tasks(tasks).await
    }
}
