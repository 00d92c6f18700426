//! Status display that writes to a terminal or a JSON-lines stream.

use std::io::Write;

use shared::{domain::RunId, error::TaskFailure, protocol::StatusEvent, status::StatusSnapshot};
use task_core::{StatusBar, StatusDisplay};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Text,
    Json,
}

pub struct ConsoleDisplay<W: Write> {
    out: W,
    mode: OutputMode,
    bar: StatusBar,
    run_id: RunId,
}

impl<W: Write> ConsoleDisplay<W> {
    pub fn new(out: W, mode: OutputMode) -> Self {
        Self {
            out,
            mode,
            bar: StatusBar::new(),
            run_id: RunId(0),
        }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }

    /// Announces a run the manager has just accepted.
    pub fn begin_run(&mut self, run_id: RunId, task_name: &str) {
        self.run_id = run_id;
        match self.mode {
            OutputMode::Text => self.write_line(&format!("started {task_name} ({run_id})")),
            OutputMode::Json => self.emit(StatusEvent::Started {
                run_id,
                task_name: task_name.to_string(),
            }),
        }
    }

    fn emit(&mut self, event: StatusEvent) {
        match event.to_json_line() {
            Ok(line) => self.write_line(&line),
            Err(err) => tracing::warn!("failed to encode status event: {err}"),
        }
    }

    fn write_text(&mut self) {
        let line = match self.bar.fraction() {
            Some(fraction) => format!("[{:>3.0}%] {}", fraction * 100.0, self.bar.label()),
            None => format!("[ .. ] {}", self.bar.label()),
        };
        self.write_line(&line);
    }

    fn write_line(&mut self, line: &str) {
        if let Err(err) = writeln!(self.out, "{line}").and_then(|()| self.out.flush()) {
            tracing::warn!("failed to write status line: {err}");
        }
    }
}

impl<W: Write> StatusDisplay for ConsoleDisplay<W> {
    fn set_progress(&mut self, snapshot: &StatusSnapshot) {
        self.bar.set_progress(snapshot);
        match self.mode {
            OutputMode::Text => self.write_text(),
            OutputMode::Json => self.emit(StatusEvent::Progress {
                run_id: self.run_id,
                snapshot: snapshot.clone(),
            }),
        }
    }

    fn set_completion(&mut self) {
        self.bar.set_completion();
        match self.mode {
            OutputMode::Text => self.write_text(),
            OutputMode::Json => self.emit(StatusEvent::Completed {
                run_id: self.run_id,
            }),
        }
    }

    fn set_cancelled(&mut self) {
        self.bar.set_cancelled();
        match self.mode {
            OutputMode::Text => self.write_text(),
            OutputMode::Json => self.emit(StatusEvent::Cancelled {
                run_id: self.run_id,
            }),
        }
    }

    fn set_failure(&mut self, failure: &TaskFailure) {
        self.bar.set_failure(failure);
        match self.mode {
            OutputMode::Text => self.write_text(),
            OutputMode::Json => self.emit(StatusEvent::Failed {
                run_id: self.run_id,
                failure: failure.clone(),
            }),
        }
    }

    fn clear(&mut self) {
        let was_visible = self.bar.is_visible();
        self.bar.clear();
        if was_visible && self.mode == OutputMode::Json {
            self.emit(StatusEvent::Cleared);
        }
    }
}
