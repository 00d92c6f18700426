//! Worker execution contexts a task runner can be dispatched to.

use std::thread;

use tokio::runtime::Handle;

use crate::error::WorkerError;

pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Something that runs a job off the UI thread.
///
/// A pool that cannot run the job must drop it; the runner turns a dropped
/// job into a worker failure.
pub trait WorkerPool: Send + Sync {
    fn execute(&self, label: &str, job: Job) -> Result<(), WorkerError>;
}

/// Spawns one named OS thread per job.
#[derive(Debug, Clone)]
pub struct ThreadPerTask {
    prefix: String,
}

impl ThreadPerTask {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Default for ThreadPerTask {
    fn default() -> Self {
        Self::new("task-worker")
    }
}

impl WorkerPool for ThreadPerTask {
    fn execute(&self, label: &str, job: Job) -> Result<(), WorkerError> {
        let name = format!("{}-{label}", self.prefix);
        thread::Builder::new()
            .name(name.clone())
            .spawn(job)
            .map(|_detached| ())
            .map_err(|source| WorkerError::Spawn { name, source })
    }
}

/// Runs jobs on the blocking pool of an existing tokio runtime.
#[derive(Debug, Clone)]
pub struct TokioBlockingPool {
    handle: Handle,
}

impl TokioBlockingPool {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Uses the runtime the caller is currently inside of.
    pub fn current() -> Result<Self, WorkerError> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|err| WorkerError::Unavailable(err.to_string()))
    }
}

impl WorkerPool for TokioBlockingPool {
    fn execute(&self, label: &str, job: Job) -> Result<(), WorkerError> {
        tracing::debug!(job = label, "dispatching job to tokio blocking pool");
        // A runtime that is shutting down drops the closure without running it.
        drop(self.handle.spawn_blocking(job));
        Ok(())
    }
}
