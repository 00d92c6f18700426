//! Commands the UI issues against the thread manager.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use task_core::{DemoJob, DemoKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskCommand {
    Start(DemoKind),
    Cancel,
    ClearError,
}

impl TaskCommand {
    pub fn name(&self) -> &'static str {
        match self {
            TaskCommand::Start(_) => "start",
            TaskCommand::Cancel => "cancel",
            TaskCommand::ClearError => "clear_error",
        }
    }
}

/// Knobs for the demo jobs, persisted between sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobOptions {
    pub steps: u64,
    pub step_delay_ms: u64,
    pub inject_failure: bool,
    pub fail_at: u64,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            steps: 40,
            step_delay_ms: 80,
            inject_failure: false,
            fail_at: 10,
        }
    }
}

impl JobOptions {
    pub fn build(&self, kind: DemoKind) -> DemoJob {
        let fail_at = self.inject_failure.then_some(self.fail_at.clamp(1, self.steps.max(1)));
        DemoJob::new(kind)
            .with_steps(self.steps)
            .with_step_delay(Duration::from_millis(self.step_delay_ms))
            .with_failure_at(fail_at)
    }
}
