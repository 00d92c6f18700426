//! The UI-side coordinator that owns the single active task run.

use std::{
    fmt,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use shared::{
    domain::{RunId, RunnerState},
    error::TaskFailure,
    status::StatusSnapshot,
};

use crate::{
    config::Settings,
    display::StatusDisplay,
    error::TaskError,
    runner::{lock, CancelState, RunOutcome, RunnerEvent, RunnerShared, TaskOutput, TaskRunner},
    task::Task,
    worker::{ThreadPerTask, WorkerPool},
};

type ActiveSlot = Arc<Mutex<Option<Arc<RunnerShared>>>>;
type ResultHandler = Box<dyn FnOnce(TaskOutput)>;

/// Read-only view of the run in flight.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveTask {
    pub run_id: RunId,
    pub task_name: String,
    pub started_at: Instant,
    pub cancel_requested: bool,
    pub last_snapshot: Option<StatusSnapshot>,
}

/// What happened to the most recently retired run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub run_id: RunId,
    pub task_name: String,
    pub state: RunnerState,
    pub elapsed: Duration,
    pub failure: Option<TaskFailure>,
}

struct ActiveRun {
    runner: Arc<RunnerShared>,
    state: RunnerState,
    started_at: Instant,
    on_result: Option<ResultHandler>,
    last_snapshot: Option<StatusSnapshot>,
}

struct DwellTimer {
    run_id: RunId,
    deadline: Instant,
}

/// Worker-safe access to whatever run is currently active.
///
/// Cloned into every [`TaskContext`](crate::TaskContext); also usable by
/// external collaborators such as a deadline watchdog.
#[derive(Clone)]
pub struct ManagerHandle {
    active: ActiveSlot,
}

impl ManagerHandle {
    fn current(&self) -> Option<Arc<RunnerShared>> {
        lock(&self.active).clone()
    }

    pub fn is_busy(&self) -> bool {
        lock(&self.active).is_some()
    }

    /// Requests cancellation of the active run. No-op when idle.
    pub fn cancel_active(&self) -> bool {
        match self.current() {
            Some(runner) => runner.request_cancel(),
            None => false,
        }
    }

    pub fn check_for_cancellation(&self) -> Result<(), TaskError> {
        match self.current() {
            Some(runner) => runner.check_for_cancellation(),
            None => Ok(()),
        }
    }

    pub fn report_progress(&self, snapshot: StatusSnapshot) -> Result<(), TaskError> {
        match self.current() {
            Some(runner) => runner.publish_progress(snapshot),
            None => {
                tracing::debug!(task = %snapshot.task_name, "no active run; progress dropped");
                Ok(())
            }
        }
    }
}

/// Owns the active task run and routes its progress and outcome to a
/// [`StatusDisplay`]. Lives on the UI thread; the UI loop must call
/// [`ThreadManager::process_events`] regularly.
pub struct ThreadManager<D: StatusDisplay> {
    display: D,
    settings: Settings,
    pool: Arc<dyn WorkerPool>,
    events_tx: Sender<RunnerEvent>,
    events_rx: Receiver<RunnerEvent>,
    active_slot: ActiveSlot,
    active: Option<ActiveRun>,
    last_error: Option<TaskFailure>,
    last_run: Option<RunSummary>,
    dwell: Option<DwellTimer>,
    next_run_id: RunId,
}

impl<D: StatusDisplay> ThreadManager<D> {
    pub fn new(display: D, settings: Settings) -> Self {
        let pool = Arc::new(ThreadPerTask::new(settings.worker_thread_prefix.clone()));
        Self::with_pool(display, settings, pool)
    }

    pub fn with_pool(display: D, settings: Settings, pool: Arc<dyn WorkerPool>) -> Self {
        let (events_tx, events_rx) = bounded(settings.event_queue_capacity.max(1));
        Self {
            display,
            settings,
            pool,
            events_tx,
            events_rx,
            active_slot: Arc::new(Mutex::new(None)),
            active: None,
            last_error: None,
            last_run: None,
            dwell: None,
            next_run_id: RunId(1),
        }
    }

    pub fn handle(&self) -> ManagerHandle {
        ManagerHandle {
            active: Arc::clone(&self.active_slot),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn display_mut(&mut self) -> &mut D {
        &mut self.display
    }

    pub fn is_busy(&self) -> bool {
        self.active.is_some()
    }

    pub fn active_task(&self) -> Option<ActiveTask> {
        self.active.as_ref().map(|active| ActiveTask {
            run_id: active.runner.run_id(),
            task_name: active.runner.task_name().to_string(),
            started_at: active.started_at,
            cancel_requested: active.runner.cancel_state() != CancelState::Running,
            last_snapshot: active.last_snapshot.clone(),
        })
    }

    /// The failure of the last run, kept until [`Self::clear_error`] or the next run.
    pub fn last_error(&self) -> Option<&TaskFailure> {
        self.last_error.as_ref()
    }

    pub fn last_run(&self) -> Option<&RunSummary> {
        self.last_run.as_ref()
    }

    /// Starts `task` on a worker. `on_result` runs on the UI thread if the
    /// task succeeds, before the display shows completion.
    pub fn run_task<T, F>(&mut self, task: T, on_result: F) -> Result<RunId, TaskError>
    where
        T: Task,
        F: FnOnce(T::Output) + 'static,
    {
        if let Some(active) = &self.active {
            tracing::warn!(
                active = %active.runner.task_name(),
                requested = %task.name(),
                "refusing to start task while another is running"
            );
            return Err(TaskError::AlreadyRunning {
                active: active.runner.task_name().to_string(),
            });
        }

        self.reset_display_for_new_run();

        let run_id = self.next_run_id;
        self.next_run_id = run_id.next();

        let runner = TaskRunner::new(
            run_id,
            task,
            self.settings.coalesce_progress,
            self.events_tx.clone(),
            self.handle(),
        );
        let shared = runner.shared();
        let task_name = shared.task_name().to_string();

        let handler_task = task_name.clone();
        let on_result: ResultHandler = Box::new(move |output: TaskOutput| {
            match output.downcast::<T::Output>() {
                Ok(output) => on_result(*output),
                Err(_) => tracing::error!(
                    task = %handler_task,
                    "task produced an unexpected output type"
                ),
            }
        });

        *lock(&self.active_slot) = Some(Arc::clone(&shared));
        self.active = Some(ActiveRun {
            runner: shared,
            state: RunnerState::Idle.advance(RunnerState::Running),
            started_at: Instant::now(),
            on_result: Some(on_result),
            last_snapshot: None,
        });

        tracing::info!(run_id = %run_id, task = %task_name, "starting task");
        runner.start(self.pool.as_ref());
        Ok(run_id)
    }

    /// [`Self::run_task`] for tasks whose output nobody needs.
    pub fn run<T: Task>(&mut self, task: T) -> Result<RunId, TaskError> {
        self.run_task(task, |_output| {})
    }

    /// Asks the active task to stop at its next checkpoint. Returns false
    /// when idle or when cancellation was already requested.
    pub fn cancel_active(&self) -> bool {
        let Some(active) = &self.active else {
            tracing::debug!("cancel requested while idle; nothing to do");
            return false;
        };
        let requested = active.runner.request_cancel();
        if requested {
            tracing::info!(
                run_id = %active.runner.run_id(),
                task = %active.runner.task_name(),
                "cancellation requested"
            );
        }
        requested
    }

    /// Clears a retained failure from the manager and the display.
    pub fn clear_error(&mut self) -> bool {
        if self.last_error.take().is_none() {
            return false;
        }
        self.display.clear();
        true
    }

    /// Applies everything the workers have sent so far, then fires a due
    /// auto-clear. Never blocks. Returns the number of events handled.
    pub fn process_events(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            self.dispatch(event);
            handled += 1;
        }
        self.tick(Instant::now());
        handled
    }

    /// Like [`Self::process_events`] but waits up to `timeout` for the first
    /// event. For hosts without a UI frame loop.
    pub fn wait_for_events(&mut self, timeout: Duration) -> usize {
        match self.events_rx.recv_timeout(timeout) {
            Ok(event) => {
                self.dispatch(event);
                1 + self.process_events()
            }
            // The manager holds a sender itself, so this is always a timeout.
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => {
                self.tick(Instant::now());
                0
            }
        }
    }

    /// Pumps events until the manager is idle. Returns false on timeout.
    pub fn run_until_idle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.active.is_some() {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            self.wait_for_events(deadline - now);
        }
        true
    }

    /// Clears a "done" or "cancelled" display once its dwell interval has passed.
    pub fn tick(&mut self, now: Instant) {
        let due = self
            .dwell
            .as_ref()
            .is_some_and(|timer| now >= timer.deadline);
        if !due {
            return;
        }
        if let Some(timer) = self.dwell.take() {
            tracing::debug!(run_id = %timer.run_id, "dwell elapsed; clearing status display");
            self.display.clear();
        }
    }

    fn reset_display_for_new_run(&mut self) {
        let had_dwell = self.dwell.take().is_some();
        let had_error = self.last_error.take().is_some();
        if had_dwell || had_error {
            self.display.clear();
        }
    }

    fn dispatch(&mut self, event: RunnerEvent) {
        match event {
            RunnerEvent::Progress { run_id, snapshot } => self.handle_progress(run_id, snapshot),
            RunnerEvent::Finished { run_id, outcome } => self.handle_finished(run_id, outcome),
        }
    }

    fn is_current(&self, run_id: RunId) -> bool {
        self.active
            .as_ref()
            .is_some_and(|active| active.runner.run_id() == run_id)
    }

    fn handle_progress(&mut self, run_id: RunId, snapshot: Option<StatusSnapshot>) {
        if !self.is_current(run_id) {
            tracing::warn!(run_id = %run_id, "dropping progress from a retired run");
            return;
        }
        let Some(active) = self.active.as_mut() else {
            return;
        };
        let snapshot = snapshot.or_else(|| active.runner.take_pending());
        if let Some(snapshot) = snapshot {
            tracing::debug!(
                run_id = %run_id,
                phase = %snapshot.phase,
                step = %snapshot.step,
                "progress"
            );
            self.display.set_progress(&snapshot);
            active.last_snapshot = Some(snapshot);
        }
    }

    fn handle_finished(&mut self, run_id: RunId, outcome: RunOutcome) {
        if !self.is_current(run_id) {
            tracing::warn!(run_id = %run_id, "dropping outcome from a retired run");
            return;
        }
        // Anything still parked in the coalescing slot was accepted before the outcome.
        self.handle_progress(run_id, None);

        match outcome {
            RunOutcome::Succeeded(output) => self.handle_completion(output),
            RunOutcome::Cancelled => self.handle_cancellation(),
            RunOutcome::Failed(failure) => self.handle_failure(failure),
        }
    }

    fn handle_completion(&mut self, output: TaskOutput) {
        let Some(mut run) = self.retire(RunnerState::Succeeded, None) else {
            return;
        };
        let run_id = run.runner.run_id();

        if let Some(on_result) = run.on_result.take() {
            on_result(output);
        }
        self.display.set_completion();
        self.arm_dwell(run_id, self.settings.completion_dwell());
    }

    fn handle_cancellation(&mut self) {
        let Some(run) = self.retire(RunnerState::Cancelled, None) else {
            return;
        };
        self.display.set_cancelled();
        self.arm_dwell(run.runner.run_id(), self.settings.cancelled_dwell());
    }

    fn handle_failure(&mut self, failure: TaskFailure) {
        if self.retire(RunnerState::Failed, Some(failure.clone())).is_none() {
            return;
        }
        tracing::error!(
            task = %failure.task_name,
            kind = ?failure.kind,
            "task failed: {}",
            failure.message
        );
        self.dwell = None;
        self.display.set_failure(&failure);
        self.last_error = Some(failure);
    }

    /// Makes the manager idle again and records the run's summary.
    fn retire(&mut self, outcome: RunnerState, failure: Option<TaskFailure>) -> Option<ActiveRun> {
        let mut run = self.active.take()?;
        *lock(&self.active_slot) = None;

        run.state = run.state.advance(outcome);
        let summary = RunSummary {
            run_id: run.runner.run_id(),
            task_name: run.runner.task_name().to_string(),
            state: run.state,
            elapsed: run.started_at.elapsed(),
            failure,
        };
        tracing::info!(
            run_id = %summary.run_id,
            task = %summary.task_name,
            state = %summary.state,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "task finished"
        );
        self.last_run = Some(summary);
        Some(run)
    }

    fn arm_dwell(&mut self, run_id: RunId, dwell: Duration) {
        self.dwell = Some(DwellTimer {
            run_id,
            deadline: Instant::now() + dwell,
        });
    }
}

impl<D: StatusDisplay> Drop for ThreadManager<D> {
    fn drop(&mut self) {
        if let Some(active) = &self.active {
            tracing::info!(
                task = %active.runner.task_name(),
                "manager dropped; cancelling active task"
            );
            active.runner.request_cancel();
        }
    }
}

impl fmt::Debug for ManagerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagerHandle")
            .field("busy", &self.is_busy())
            .finish()
    }
}

#[cfg(test)]
impl ManagerHandle {
    pub(crate) fn detached() -> Self {
        Self {
            active: Arc::new(Mutex::new(None)),
        }
    }
}
