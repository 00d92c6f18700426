//! Command orchestration from UI actions to the thread manager.

use std::{cell::RefCell, rc::Rc};

use chrono::Local;
use task_core::{StatusDisplay, TaskError, ThreadManager};

use crate::backend_bridge::commands::{JobOptions, TaskCommand};

/// Finished-run lines, newest last.
pub type RunHistory = Rc<RefCell<Vec<String>>>;

pub const HISTORY_LIMIT: usize = 20;

pub fn dispatch_task_command<D: StatusDisplay>(
    manager: &mut ThreadManager<D>,
    cmd: TaskCommand,
    options: &JobOptions,
    history: &RunHistory,
    status: &mut String,
) {
    let cmd_name = cmd.name();
    match cmd {
        TaskCommand::Start(kind) => {
            let sink = Rc::clone(history);
            let result = manager.run_task(options.build(kind), move |report| {
                push_history(
                    &sink,
                    format!(
                        "{} {}: {} items, {} bytes",
                        Local::now().format("%H:%M:%S"),
                        report.kind,
                        report.items,
                        report.bytes
                    ),
                );
            });
            match result {
                Ok(run_id) => {
                    tracing::debug!(command = cmd_name, run_id = %run_id, "started task");
                    status.clear();
                }
                Err(TaskError::AlreadyRunning { active }) => {
                    *status =
                        format!("'{active}' is still running; wait for it or cancel it first");
                }
                Err(err) => *status = format!("Could not start {kind}: {err}"),
            }
        }
        TaskCommand::Cancel => {
            if manager.cancel_active() {
                return;
            }
            *status = match manager.active_task() {
                Some(active) => format!("'{}' is already stopping", active.task_name),
                None => "Nothing to cancel".to_string(),
            };
        }
        TaskCommand::ClearError => {
            manager.clear_error();
            status.clear();
        }
    }
}

fn push_history(history: &RunHistory, line: String) {
    let mut history = history.borrow_mut();
    history.push(line);
    let overflow = history.len().saturating_sub(HISTORY_LIMIT);
    history.drain(..overflow);
}
