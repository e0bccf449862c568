//! Durable storage of the task list.
//!
//! The store has no transactions: callers do read-modify-write and two
//! processes racing on the same file can lose an update.

use super::files::{atomic_write, read_file};
use crate::domain::Task;
use crate::error::StoreError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Persistent task list shared by the CLI and the running daemon
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Load every task; an empty store yields an empty list.
    async fn get_tasks(&self) -> Result<Vec<Task>, StoreError>;

    /// Replace the whole task list.
    async fn set_tasks(&self, tasks: &[Task]) -> Result<(), StoreError>;
}

/// Task list kept as pretty-printed JSON in `tasks.json`
#[derive(Debug, Clone)]
pub struct JsonTaskStore {
    path: PathBuf,
}

impl JsonTaskStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl TaskStore for JsonTaskStore {
    async fn get_tasks(&self) -> Result<Vec<Task>, StoreError> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || load_tasks(&path)).await?
    }

    async fn set_tasks(&self, tasks: &[Task]) -> Result<(), StoreError> {
        let path = self.path.clone();
        let json = serde_json::to_string_pretty(tasks).map_err(|source| StoreError::Format {
            path: path.clone(),
            source,
        })?;
        tokio::task::spawn_blocking(move || {
            atomic_write(&path, &json).map_err(|source| StoreError::Io { path, source })
        })
        .await?
    }
}

fn load_tasks(path: &Path) -> Result<Vec<Task>, StoreError> {
    let content = read_file(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(&content).map_err(|source| StoreError::Format {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
pub use memory::MemoryTaskStore;
