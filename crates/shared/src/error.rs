use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The task returned an error of its own.
    Domain,
    /// The worker execution context could not run the task to completion.
    Worker,
    /// The task panicked.
    Panic,
}

/// Retained record of a failed run, as shown by a status display.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{task_name} failed: {message}")]
pub struct TaskFailure {
    pub kind: FailureKind,
    pub task_name: String,
    pub message: String,
    pub failed_at: DateTime<Utc>,
}

impl TaskFailure {
    pub fn new(
        kind: FailureKind,
        task_name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            task_name: task_name.into(),
            message: message.into(),
            failed_at: Utc::now(),
        }
    }

    pub fn domain(task_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(FailureKind::Domain, task_name, message)
    }

    pub fn worker(task_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(FailureKind::Worker, task_name, message)
    }

    pub fn panic(task_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(FailureKind::Panic, task_name, message)
    }
}
