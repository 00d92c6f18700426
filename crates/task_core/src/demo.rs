//! Simulated long-running jobs used by the desktop shell and `taskctl`.

use std::{fmt, str::FromStr, thread, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{
    error::TaskError,
    task::{Task, TaskContext},
};

/// Chunks per file in the copy job.
const COPY_CHUNKS: u64 = 4;
const SIMULATED_FILE_BYTES: u64 = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DemoKind {
    Scan,
    Copy,
    Import,
}

impl DemoKind {
    pub const ALL: [DemoKind; 3] = [DemoKind::Scan, DemoKind::Copy, DemoKind::Import];

    pub fn as_str(self) -> &'static str {
        match self {
            DemoKind::Scan => "scan",
            DemoKind::Copy => "copy",
            DemoKind::Import => "import",
        }
    }

    fn default_steps(self) -> u64 {
        match self {
            DemoKind::Scan => 40,
            DemoKind::Copy => 12,
            DemoKind::Import => 30,
        }
    }
}

impl fmt::Display for DemoKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DemoKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        DemoKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| format!("unknown demo job '{value}' (expected scan, copy or import)"))
    }
}

/// What a finished demo job reports back to its caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemoReport {
    pub kind: DemoKind,
    pub items: u64,
    pub bytes: u64,
}

#[derive(Debug, Clone)]
pub struct DemoJob {
    kind: DemoKind,
    name: String,
    steps: u64,
    step_delay: Duration,
    fail_at: Option<u64>,
}

impl DemoJob {
    pub fn new(kind: DemoKind) -> Self {
        Self {
            kind,
            name: kind.as_str().to_string(),
            steps: kind.default_steps(),
            step_delay: Duration::from_millis(50),
            fail_at: None,
        }
    }

    pub fn with_steps(mut self, steps: u64) -> Self {
        self.steps = steps.max(1);
        self
    }

    pub fn with_step_delay(mut self, delay: Duration) -> Self {
        self.step_delay = delay;
        self
    }

    /// Makes the job fail with a domain error when it reaches `step` (1-based).
    pub fn with_failure_at(mut self, step: Option<u64>) -> Self {
        self.fail_at = step;
        self
    }

    pub fn kind(&self) -> DemoKind {
        self.kind
    }

    fn work_on(&self, ctx: &TaskContext, step: u64, what: &str) -> Result<(), TaskError> {
        if !self.step_delay.is_zero() {
            thread::sleep(self.step_delay);
        }
        ctx.check_for_cancellation()?;
        if self.fail_at == Some(step) {
            return Err(anyhow::anyhow!("{what} {step} of {} could not be read", self.steps).into());
        }
        Ok(())
    }

    fn scan(&self, ctx: &TaskContext) -> Result<DemoReport, TaskError> {
        for step in 1..=self.steps {
            self.work_on(ctx, step, "directory")?;
            ctx.report_progress(ctx.status("scanning").with_steps(step, self.steps))?;
        }
        Ok(self.report(self.steps, 0))
    }

    fn copy(&self, ctx: &TaskContext) -> Result<DemoReport, TaskError> {
        let chunk_bytes = SIMULATED_FILE_BYTES / COPY_CHUNKS;
        let mut bytes = 0;
        for step in 1..=self.steps {
            self.work_on(ctx, step, "file")?;
            for chunk in 1..=COPY_CHUNKS {
                bytes += chunk_bytes;
                let done = if chunk == COPY_CHUNKS { step } else { step - 1 };
                ctx.report_progress(
                    ctx.status("copying")
                        .with_steps(done, self.steps)
                        .with_sub_steps(chunk, COPY_CHUNKS),
                )?;
            }
        }
        Ok(self.report(self.steps, bytes))
    }

    fn import(&self, ctx: &TaskContext) -> Result<DemoReport, TaskError> {
        let reading = self.steps.div_ceil(2);
        let mut status = ctx.status("reading").with_steps(0, self.steps);
        for step in 1..=self.steps {
            if step == reading + 1 {
                status = status.next_phase("indexing");
            }
            self.work_on(ctx, step, "record")?;
            status.step.done = step;
            ctx.report_progress(status.clone())?;
        }
        Ok(self.report(self.steps, 0))
    }

    fn report(&self, items: u64, bytes: u64) -> DemoReport {
        DemoReport {
            kind: self.kind,
            items,
            bytes,
        }
    }
}

impl Task for DemoJob {
    type Output = DemoReport;

    fn name(&self) -> &str {
        &self.name
    }

    fn perform(&mut self, ctx: &TaskContext) -> Result<DemoReport, TaskError> {
        tracing::debug!(job = %self.kind, steps = self.steps, "demo job started");
        match self.kind {
            DemoKind::Scan => self.scan(ctx),
            DemoKind::Copy => self.copy(ctx),
            DemoKind::Import => self.import(ctx),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc, time::Duration};

    use super::*;
    use crate::{
        config::Settings,
        display::{StatusBar, StatusTone},
        manager::ThreadManager,
    };
    use shared::domain::RunnerState;

    const WAIT: Duration = Duration::from_secs(5);

    fn quick(kind: DemoKind) -> DemoJob {
        DemoJob::new(kind)
            .with_steps(6)
            .with_step_delay(Duration::ZERO)
    }

    fn manager() -> ThreadManager<StatusBar> {
        ThreadManager::new(StatusBar::new(), Settings::default())
    }

    #[test]
    fn parses_kinds_case_insensitively() {
        assert_eq!("Copy".parse::<DemoKind>(), Ok(DemoKind::Copy));
        assert_eq!(" import ".parse::<DemoKind>(), Ok(DemoKind::Import));
        assert!("mirror".parse::<DemoKind>().is_err());
    }

    #[test]
    fn every_job_reports_its_items() {
        for kind in DemoKind::ALL {
            let mut manager = manager();
            let report = Rc::new(RefCell::new(None));
            let sink = Rc::clone(&report);

            manager
                .run_task(quick(kind), move |output| *sink.borrow_mut() = Some(output))
                .expect("start");
            assert!(manager.run_until_idle(WAIT));

            let report = report.borrow().expect("report delivered");
            assert_eq!(report.kind, kind);
            assert_eq!(report.items, 6);
            assert_eq!(manager.display().tone(), StatusTone::Done);
        }
    }

    #[test]
    fn copy_counts_every_chunk() {
        let mut manager = manager();
        let bytes = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&bytes);

        manager
            .run_task(quick(DemoKind::Copy), move |report| *sink.borrow_mut() = report.bytes)
            .expect("start");
        assert!(manager.run_until_idle(WAIT));
        assert_eq!(*bytes.borrow(), 6 * SIMULATED_FILE_BYTES);
    }

    #[test]
    fn injected_failure_surfaces_as_domain_error() {
        let mut manager = manager();
        manager
            .run(quick(DemoKind::Scan).with_failure_at(Some(3)))
            .expect("start");
        assert!(manager.run_until_idle(WAIT));

        let failure = manager.last_error().expect("failure retained");
        assert_eq!(failure.task_name, "scan");
        assert_eq!(failure.message, "directory 3 of 6 could not be read");
        assert_eq!(manager.display().tone(), StatusTone::Error);
    }

    #[test]
    fn slow_job_stops_when_cancelled() {
        let mut manager = manager();
        manager
            .run(
                DemoJob::new(DemoKind::Import)
                    .with_steps(1_000)
                    .with_step_delay(Duration::from_millis(5)),
            )
            .expect("start");

        assert!(manager.cancel_active());
        assert!(manager.run_until_idle(WAIT));
        assert_eq!(
            manager.last_run().map(|run| run.state),
            Some(RunnerState::Cancelled)
        );
    }
}
