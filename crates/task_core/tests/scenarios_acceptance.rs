use std::time::{Duration, Instant};

use crossbeam_channel::bounded;
use task_core::{
    task_fn, RunnerState, Settings, StatusBar, StatusDisplay, StatusSnapshot, StatusTone,
    TaskContext, TaskError, TaskFailure, ThreadManager,
};

const WAIT: Duration = Duration::from_secs(5);

/// Status bar that also remembers every step value it was shown.
#[derive(Default)]
struct TracingBar {
    bar: StatusBar,
    seen_steps: Vec<u64>,
    completions: usize,
    cancellations: usize,
    failures: Vec<String>,
}

impl StatusDisplay for TracingBar {
    fn set_progress(&mut self, snapshot: &StatusSnapshot) {
        self.seen_steps.push(snapshot.step.done);
        self.bar.set_progress(snapshot);
    }

    fn set_completion(&mut self) {
        self.completions += 1;
        self.bar.set_completion();
    }

    fn set_cancelled(&mut self) {
        self.cancellations += 1;
        self.bar.set_cancelled();
    }

    fn set_failure(&mut self, failure: &TaskFailure) {
        self.failures.push(failure.message.clone());
        self.bar.set_failure(failure);
    }

    fn clear(&mut self) {
        self.bar.clear();
    }
}

fn exact_settings() -> Settings {
    Settings {
        coalesce_progress: false,
        completion_dwell_ms: 2_000,
        cancelled_dwell_ms: 2_000,
        ..Settings::default()
    }
}

#[test]
fn scenario_a_progress_then_completion_then_idle() {
    let mut manager = ThreadManager::new(TracingBar::default(), exact_settings());

    manager
        .run(task_fn("task-a", |ctx: &TaskContext| {
            for done in [1, 5, 10] {
                ctx.report_progress(ctx.status("working").with_steps(done, 10))?;
            }
            Ok(())
        }))
        .expect("start");

    assert!(manager.run_until_idle(WAIT));
    let display = manager.display();
    assert_eq!(display.seen_steps, vec![1, 5, 10]);
    assert_eq!(display.completions, 1);
    assert_eq!(display.bar.tone(), StatusTone::Done);
    assert!(manager.active_task().is_none());

    manager.tick(Instant::now() + Duration::from_secs(10));
    assert_eq!(manager.display().bar.tone(), StatusTone::Idle);
}

#[test]
fn scenario_b_cancel_before_any_progress() {
    let mut manager = ThreadManager::new(TracingBar::default(), exact_settings());
    let (release, wait) = bounded::<()>(1);

    manager
        .run(task_fn("task-b", move |ctx: &TaskContext| {
            wait.recv().map_err(TaskError::failed)?;
            ctx.check_for_cancellation()?;
            ctx.report_progress(ctx.status("never shown").with_steps(1, 1))?;
            Ok(())
        }))
        .expect("start");

    assert!(manager.cancel_active());
    release.send(()).expect("release");
    assert!(manager.run_until_idle(WAIT));

    let display = manager.display();
    assert!(display.seen_steps.is_empty());
    assert_eq!(display.cancellations, 1);
    assert_eq!(display.bar.tone(), StatusTone::Cancelled);
    assert_eq!(
        manager.last_run().map(|run| run.state),
        Some(RunnerState::Cancelled)
    );
}

#[test]
fn scenario_c_failure_persists_until_next_run() {
    let mut manager = ThreadManager::new(TracingBar::default(), exact_settings());

    manager
        .run(task_fn("task-c", |_ctx: &TaskContext| -> Result<(), TaskError> {
            Err(TaskError::failed("disk full"))
        }))
        .expect("start");
    assert!(manager.run_until_idle(WAIT));

    assert_eq!(manager.display().failures, vec!["disk full".to_string()]);
    assert_eq!(manager.display().bar.label(), "task-c failed: disk full");
    manager.tick(Instant::now() + Duration::from_secs(60));
    assert_eq!(manager.display().bar.tone(), StatusTone::Error);
    assert_eq!(
        manager.last_error().map(|failure| failure.message.as_str()),
        Some("disk full")
    );

    manager
        .run(task_fn("task-c-retry", |_ctx: &TaskContext| Ok(())))
        .expect("restart");
    assert!(manager.last_error().is_none());
    assert!(manager.run_until_idle(WAIT));
    assert_eq!(manager.display().bar.tone(), StatusTone::Done);
}

#[test]
fn scenario_d_back_to_back_start_is_rejected() {
    let mut manager = ThreadManager::new(TracingBar::default(), exact_settings());
    let (release, wait) = bounded::<()>(1);

    let first = manager
        .run(task_fn("task-d", move |ctx: &TaskContext| {
            wait.recv().map_err(TaskError::failed)?;
            ctx.report_progress(ctx.status("finishing").with_steps(1, 1))?;
            Ok(())
        }))
        .expect("first start");

    let second = manager.run(task_fn("task-d2", |_ctx: &TaskContext| Ok(())));
    assert!(matches!(second, Err(TaskError::AlreadyRunning { .. })));
    assert_eq!(manager.active_task().map(|task| task.run_id), Some(first));

    release.send(()).expect("release");
    assert!(manager.run_until_idle(WAIT));
    assert_eq!(manager.display().seen_steps, vec![1]);
    assert_eq!(manager.display().completions, 1);
}

#[test]
fn coalesced_progress_never_goes_backwards() {
    let mut manager = ThreadManager::new(
        TracingBar::default(),
        Settings {
            coalesce_progress: true,
            ..exact_settings()
        },
    );

    manager
        .run(task_fn("flood", |ctx: &TaskContext| {
            for done in 1..=2_000 {
                ctx.report_progress(ctx.status("flooding").with_steps(done, 2_000))?;
            }
            Ok(())
        }))
        .expect("start");

    let deadline = Instant::now() + WAIT;
    while manager.is_busy() && Instant::now() < deadline {
        manager.process_events();
        std::thread::sleep(Duration::from_millis(1));
    }

    assert!(!manager.is_busy());
    let steps = &manager.display().seen_steps;
    assert!(!steps.is_empty());
    assert!(steps.windows(2).all(|pair| pair[0] < pair[1]));
    assert_eq!(steps.last(), Some(&2_000));
    assert_eq!(manager.display().completions, 1);
}
