//! Immutable progress records published by running tasks.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A `done / total` pair. `total == 0` means the amount of work is unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StepCount {
    pub done: u64,
    pub total: u64,
}

impl StepCount {
    /// Builds a count, clamping `done` to `total` when the total is known.
    pub fn new(done: u64, total: u64) -> Self {
        let done = if total > 0 { done.min(total) } else { done };
        Self { done, total }
    }

    pub fn is_determinate(&self) -> bool {
        self.total > 0
    }

    pub fn fraction(&self) -> Option<f64> {
        self.is_determinate()
            .then(|| self.done as f64 / self.total as f64)
    }
}

impl fmt::Display for StepCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_determinate() {
            write!(f, "{}/{}", self.done, self.total)
        } else {
            write!(f, "{}", self.done)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub task_name: String,
    pub phase: String,
    pub step: StepCount,
    #[serde(default)]
    pub sub_step: StepCount,
}

impl StatusSnapshot {
    pub fn new(task_name: impl Into<String>, phase: impl Into<String>) -> Self {
        Self {
            task_name: task_name.into(),
            phase: phase.into(),
            step: StepCount::default(),
            sub_step: StepCount::default(),
        }
    }

    pub fn with_steps(mut self, done: u64, total: u64) -> Self {
        self.step = StepCount::new(done, total);
        self
    }

    pub fn with_sub_steps(mut self, done: u64, total: u64) -> Self {
        self.sub_step = StepCount::new(done, total);
        self
    }

    /// Starts a new phase. The step counter carries over, sub-steps restart at zero.
    pub fn next_phase(&self, phase: impl Into<String>) -> Self {
        Self {
            task_name: self.task_name.clone(),
            phase: phase.into(),
            step: self.step,
            sub_step: StepCount::new(0, self.sub_step.total),
        }
    }

    /// Overall completion in `[0, 1]`, counting the sub-step share of the
    /// step in flight. `None` while the step total is unknown.
    pub fn fraction(&self) -> Option<f64> {
        let step = self.step.fraction()?;
        let partial = match self.sub_step.fraction() {
            Some(sub) if self.step.done < self.step.total => sub / self.step.total as f64,
            _ => 0.0,
        };
        Some((step + partial).min(1.0))
    }

    /// True when `self` moves backwards relative to `previous` within the same phase.
    pub fn regresses_from(&self, previous: &StatusSnapshot) -> bool {
        if self.phase != previous.phase {
            return false;
        }
        if self.step.done != previous.step.done {
            return self.step.done < previous.step.done;
        }
        self.sub_step.done < previous.sub_step.done
    }

    pub fn summary(&self) -> String {
        let mut text = format!("{}: {}", self.task_name, self.phase);
        if self.step.is_determinate() || self.step.done > 0 {
            text.push_str(&format!(" ({})", self.step));
        }
        if self.sub_step.is_determinate() {
            text.push_str(&format!(" [{}]", self.sub_step));
        }
        text
    }
}
