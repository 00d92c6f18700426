use std::{marker::PhantomData, sync::Arc};

use shared::{domain::RunId, status::StatusSnapshot};

use crate::{
    error::TaskError,
    manager::ManagerHandle,
    runner::{CancelState, RunnerShared},
};

/// A unit of long-running work executed off the UI thread.
///
/// `perform` runs exactly once, on a worker. It should call
/// [`TaskContext::check_for_cancellation`] (or report progress) at safe
/// checkpoints and propagate the resulting [`TaskError::Cancelled`] with `?`.
pub trait Task: Send + 'static {
    type Output: Send + 'static;

    fn name(&self) -> &str;

    fn perform(&mut self, ctx: &TaskContext) -> Result<Self::Output, TaskError>;
}

/// Handle a running task uses to talk back to its manager.
pub struct TaskContext {
    runner: Arc<RunnerShared>,
    manager: ManagerHandle,
}

impl TaskContext {
    pub(crate) fn new(runner: Arc<RunnerShared>, manager: ManagerHandle) -> Self {
        Self { runner, manager }
    }

    pub fn run_id(&self) -> RunId {
        self.runner.run_id()
    }

    pub fn task_name(&self) -> &str {
        self.runner.task_name()
    }

    /// Starts a snapshot pre-filled with this task's name.
    pub fn status(&self, phase: impl Into<String>) -> StatusSnapshot {
        StatusSnapshot::new(self.task_name(), phase)
    }

    /// Publishes a snapshot to the status display. Fails with
    /// [`TaskError::Cancelled`] once cancellation has been requested.
    pub fn report_progress(&self, snapshot: StatusSnapshot) -> Result<(), TaskError> {
        self.runner.publish_progress(snapshot)
    }

    pub fn check_for_cancellation(&self) -> Result<(), TaskError> {
        self.runner.check_for_cancellation()
    }

    /// Peeks at the flag without marking the cancellation as observed.
    pub fn is_cancel_requested(&self) -> bool {
        self.runner.cancel_state() != CancelState::Running
    }

    pub fn last_published(&self) -> Option<StatusSnapshot> {
        self.runner.last_published()
    }

    pub fn manager(&self) -> &ManagerHandle {
        &self.manager
    }
}

/// Adapts a closure into a [`Task`].
pub struct FnTask<F, T> {
    name: String,
    body: F,
    output: PhantomData<fn() -> T>,
}

pub fn task_fn<F, T>(name: impl Into<String>, body: F) -> FnTask<F, T>
where
    F: FnMut(&TaskContext) -> Result<T, TaskError> + Send + 'static,
    T: Send + 'static,
{
    FnTask {
        name: name.into(),
        body,
        output: PhantomData,
    }
}

impl<F, T> Task for FnTask<F, T>
where
    F: FnMut(&TaskContext) -> Result<T, TaskError> + Send + 'static,
    T: Send + 'static,
{
    type Output = T;

    fn name(&self) -> &str {
        &self.name
    }

    fn perform(&mut self, ctx: &TaskContext) -> Result<T, TaskError> {
        (self.body)(ctx)
    }
}
