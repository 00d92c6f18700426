//! Background task execution for a single-threaded UI.
//!
//! A [`ThreadManager`] lives on the UI thread and runs at most one [`Task`]
//! at a time on a worker context. Progress snapshots and the terminal outcome
//! travel back over a channel and are applied to a [`StatusDisplay`] when the
//! UI loop pumps [`ThreadManager::process_events`]. Cancellation is
//! cooperative: the task observes it through [`TaskContext`].

pub mod config;
pub mod demo;
pub mod display;
pub mod error;
pub mod manager;
mod runner;
pub mod task;
pub mod worker;

pub use config::{load_settings, Settings};
pub use demo::{DemoJob, DemoKind, DemoReport};
pub use display::{StatusBar, StatusDisplay, StatusTone};
pub use error::{TaskError, WorkerError};
pub use manager::{ActiveTask, ManagerHandle, RunSummary, ThreadManager};
pub use runner::CancelState;
pub use shared::{
    domain::{RunId, RunnerState},
    error::{FailureKind, TaskFailure},
    status::{StatusSnapshot, StepCount},
};
pub use task::{task_fn, FnTask, Task, TaskContext};
pub use worker::{Job, ThreadPerTask, TokioBlockingPool, WorkerPool};

#[cfg(test)]
#[path = "tests/runner_tests.rs"]
mod runner_tests;

#[cfg(test)]
#[path = "tests/manager_tests.rs"]
mod manager_tests;
