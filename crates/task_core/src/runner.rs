//! Per-run wrapper that executes one task on a worker and ferries its
//! progress and outcome back to the UI thread.

use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
    sync::{
        atomic::{AtomicBool, AtomicU8, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
};

use crossbeam_channel::Sender;
use shared::{domain::RunId, error::TaskFailure, status::StatusSnapshot};

use crate::{
    error::{TaskError, WorkerError},
    manager::ManagerHandle,
    task::{Task, TaskContext},
    worker::{Job, WorkerPool},
};

const FLAG_RUNNING: u8 = 0;
const FLAG_CANCEL_REQUESTED: u8 = 1;
const FLAG_CANCELLED: u8 = 2;

const DISPATCH_PENDING: u8 = 0;
const DISPATCH_ACCEPTED: u8 = 1;
const DISPATCH_DROPPED_EARLY: u8 = 2;

/// Worker-visible cancellation state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelState {
    Running,
    /// The UI asked for cancellation; the task has not noticed yet.
    CancelRequested,
    /// The task observed the request through a cancellation check.
    Cancelled,
}

pub(crate) type TaskOutput = Box<dyn Any + Send>;

pub(crate) enum RunOutcome {
    Succeeded(TaskOutput),
    Cancelled,
    Failed(TaskFailure),
}

pub(crate) enum RunnerEvent {
    /// `snapshot` is `None` when the snapshot waits in the runner's
    /// coalescing slot.
    Progress {
        run_id: RunId,
        snapshot: Option<StatusSnapshot>,
    },
    Finished {
        run_id: RunId,
        outcome: RunOutcome,
    },
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// State shared between the UI thread and the worker running the task.
pub struct RunnerShared {
    run_id: RunId,
    task_name: String,
    flag: AtomicU8,
    coalesce: bool,
    pending: Mutex<Option<StatusSnapshot>>,
    last_published: Mutex<Option<StatusSnapshot>>,
    finished: AtomicBool,
    dispatch: AtomicU8,
    events: Sender<RunnerEvent>,
}

impl RunnerShared {
    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    pub fn task_name(&self) -> &str {
        &self.task_name
    }

    pub fn cancel_state(&self) -> CancelState {
        match self.flag.load(Ordering::Acquire) {
            FLAG_RUNNING => CancelState::Running,
            FLAG_CANCEL_REQUESTED => CancelState::CancelRequested,
            _ => CancelState::Cancelled,
        }
    }

    /// Returns false when cancellation was already requested or observed.
    pub fn request_cancel(&self) -> bool {
        self.flag
            .compare_exchange(
                FLAG_RUNNING,
                FLAG_CANCEL_REQUESTED,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    pub fn check_for_cancellation(&self) -> Result<(), TaskError> {
        if self.flag.load(Ordering::Acquire) == FLAG_RUNNING {
            return Ok(());
        }
        self.flag.store(FLAG_CANCELLED, Ordering::Release);
        Err(TaskError::Cancelled)
    }

    pub fn publish_progress(&self, snapshot: StatusSnapshot) -> Result<(), TaskError> {
        self.check_for_cancellation()?;

        {
            let mut last = lock(&self.last_published);
            if let Some(previous) = last.as_ref() {
                if snapshot.regresses_from(previous) {
                    tracing::warn!(
                        run_id = %self.run_id,
                        task = %self.task_name,
                        phase = %snapshot.phase,
                        "progress moved backwards within a phase"
                    );
                }
            }
            *last = Some(snapshot.clone());
        }

        let event = if self.coalesce {
            let slot_was_empty = lock(&self.pending).replace(snapshot).is_none();
            if !slot_was_empty {
                return Ok(());
            }
            RunnerEvent::Progress {
                run_id: self.run_id,
                snapshot: None,
            }
        } else {
            RunnerEvent::Progress {
                run_id: self.run_id,
                snapshot: Some(snapshot),
            }
        };

        if self.events.send(event).is_err() {
            tracing::debug!(run_id = %self.run_id, "ui side gone; progress dropped");
        }
        Ok(())
    }

    pub fn last_published(&self) -> Option<StatusSnapshot> {
        lock(&self.last_published).clone()
    }

    pub(crate) fn take_pending(&self) -> Option<StatusSnapshot> {
        lock(&self.pending).take()
    }

    /// Sends the terminal event. Only the first call has any effect.
    pub(crate) fn finish(&self, outcome: RunOutcome) {
        if self.finished.swap(true, Ordering::AcqRel) {
            return;
        }
        let event = RunnerEvent::Finished {
            run_id: self.run_id,
            outcome,
        };
        if self.events.send(event).is_err() {
            tracing::warn!(
                run_id = %self.run_id,
                task = %self.task_name,
                "ui side gone; outcome dropped"
            );
        }
    }

    fn report_dropped(&self) {
        let err = WorkerError::Dropped {
            task: self.task_name.clone(),
        };
        tracing::error!(run_id = %self.run_id, "{err}");
        self.finish(RunOutcome::Failed(TaskFailure::worker(
            &self.task_name,
            err.to_string(),
        )));
    }

    fn resolve(&self, result: Result<TaskOutput, TaskError>) -> RunOutcome {
        match result {
            Ok(output) => RunOutcome::Succeeded(output),
            Err(TaskError::Cancelled) => RunOutcome::Cancelled,
            // The task saw the cancel request and bailed out with its own error.
            Err(_) if self.cancel_state() == CancelState::Cancelled => RunOutcome::Cancelled,
            Err(TaskError::Worker(err)) => {
                RunOutcome::Failed(TaskFailure::worker(&self.task_name, err.to_string()))
            }
            Err(TaskError::Failed(err)) => {
                RunOutcome::Failed(TaskFailure::domain(&self.task_name, format!("{err:#}")))
            }
            Err(err) => RunOutcome::Failed(TaskFailure::domain(&self.task_name, err.to_string())),
        }
    }
}

/// Reports a worker failure if the job is dropped before it finishes.
///
/// A drop while the pool is still deciding is left to [`TaskRunner::start`],
/// which knows whether the pool refused the job or lost it.
struct FinishGuard {
    shared: Arc<RunnerShared>,
}

impl Drop for FinishGuard {
    fn drop(&mut self) {
        if self.shared.finished.load(Ordering::Acquire) {
            return;
        }
        let dropped_during_dispatch = self
            .shared
            .dispatch
            .compare_exchange(
                DISPATCH_PENDING,
                DISPATCH_DROPPED_EARLY,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok();
        if !dropped_during_dispatch {
            self.shared.report_dropped();
        }
    }
}

type TaskBody = Box<dyn FnOnce(&TaskContext) -> Result<TaskOutput, TaskError> + Send>;

pub struct TaskRunner {
    shared: Arc<RunnerShared>,
    body: TaskBody,
    manager: ManagerHandle,
}

impl TaskRunner {
    pub(crate) fn new<T: Task>(
        run_id: RunId,
        mut task: T,
        coalesce: bool,
        events: Sender<RunnerEvent>,
        manager: ManagerHandle,
    ) -> Self {
        let shared = Arc::new(RunnerShared {
            run_id,
            task_name: task.name().to_string(),
            flag: AtomicU8::new(FLAG_RUNNING),
            coalesce,
            pending: Mutex::new(None),
            last_published: Mutex::new(None),
            finished: AtomicBool::new(false),
            dispatch: AtomicU8::new(DISPATCH_PENDING),
            events,
        });
        let body: TaskBody = Box::new(move |ctx: &TaskContext| {
            task.perform(ctx)
                .map(|output| Box::new(output) as TaskOutput)
        });
        Self {
            shared,
            body,
            manager,
        }
    }

    pub fn shared(&self) -> Arc<RunnerShared> {
        Arc::clone(&self.shared)
    }

    /// Dispatches the task. Exactly one `Finished` event follows, whether the
    /// task returns, panics, or never gets to run.
    pub fn start(self, pool: &dyn WorkerPool) {
        let Self {
            shared,
            body,
            manager,
        } = self;
        let label = shared.run_id.to_string();
        let guard = FinishGuard {
            shared: Arc::clone(&shared),
        };

        let job: Job = Box::new(move || {
            let ctx = TaskContext::new(Arc::clone(&guard.shared), manager);
            let outcome = match panic::catch_unwind(AssertUnwindSafe(|| body(&ctx))) {
                Ok(result) => guard.shared.resolve(result),
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    tracing::error!(run_id = %guard.shared.run_id, "task panicked: {message}");
                    RunOutcome::Failed(TaskFailure::panic(&guard.shared.task_name, message))
                }
            };
            guard.shared.finish(outcome);
        });

        match pool.execute(&label, job) {
            Ok(()) => {
                let accepted = shared
                    .dispatch
                    .compare_exchange(
                        DISPATCH_PENDING,
                        DISPATCH_ACCEPTED,
                        Ordering::AcqRel,
                        Ordering::Acquire,
                    )
                    .is_ok();
                // The pool claimed success but discarded the job on the spot.
                if !accepted {
                    shared.report_dropped();
                }
            }
            Err(err) => {
                tracing::error!(
                    run_id = %shared.run_id,
                    task = %shared.task_name,
                    "worker dispatch failed: {err}"
                );
                shared.finish(RunOutcome::Failed(TaskFailure::worker(
                    &shared.task_name,
                    err.to_string(),
                )));
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "task panicked".to_string()
    }
}
