use thiserror::Error;

#[derive(Debug, Error)]
pub enum TaskError {
    /// `run_task` was called while another run is still active.
    #[error("task '{active}' is already running")]
    AlreadyRunning { active: String },
    /// A cancellation check observed a pending cancel request.
    #[error("task was cancelled")]
    Cancelled,
    #[error(transparent)]
    Failed(#[from] anyhow::Error),
    #[error(transparent)]
    Worker(#[from] WorkerError),
}

impl TaskError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Wraps a plain message as a domain failure.
    pub fn failed(message: impl std::fmt::Display) -> Self {
        Self::Failed(anyhow::anyhow!("{message}"))
    }
}

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("failed to spawn worker thread '{name}': {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },
    #[error("no worker runtime available: {0}")]
    Unavailable(String),
    #[error("worker context dropped task '{task}' before it finished")]
    Dropped { task: String },
}
