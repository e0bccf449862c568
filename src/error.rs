use std::path::PathBuf;
use thiserror::Error;

/// Failure reading or writing durable state (task list or alarm file).
///
/// Never retried inside the core; the caller decides what to do.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access {}: {source:#}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("malformed data in {}: {source}", path.display())]
    Format {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("store worker stopped: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

/// A fired alarm key that does not map back to a task id
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleKeyError {
    #[error("alarm key `{0}` is missing the task reminder prefix")]
    MissingPrefix(String),

    #[error("alarm key `{0}` does not end in a canonical task id")]
    BadTaskId(String),
}

/// Errors from task commands handled by the app actor
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("task text must not be empty")]
    EmptyText,

    #[error("no task with id {0}")]
    UnknownTask(i64),

    #[error(transparent)]
    Store(#[from] StoreError),
}
