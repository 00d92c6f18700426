//! The status display contract and a toolkit-independent progress bar model.

use shared::{error::TaskFailure, status::StatusSnapshot};

/// Renders task status. Every method is called on the UI thread only.
pub trait StatusDisplay {
    fn set_progress(&mut self, snapshot: &StatusSnapshot);

    fn set_completion(&mut self);

    fn set_cancelled(&mut self);

    /// The failure stays visible until [`StatusDisplay::clear`].
    fn set_failure(&mut self, failure: &TaskFailure);

    fn clear(&mut self);
}

impl<D: StatusDisplay + ?Sized> StatusDisplay for Box<D> {
    fn set_progress(&mut self, snapshot: &StatusSnapshot) {
        (**self).set_progress(snapshot);
    }

    fn set_completion(&mut self) {
        (**self).set_completion();
    }

    fn set_cancelled(&mut self) {
        (**self).set_cancelled();
    }

    fn set_failure(&mut self, failure: &TaskFailure) {
        (**self).set_failure(failure);
    }

    fn clear(&mut self) {
        (**self).clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusTone {
    #[default]
    Idle,
    Busy,
    Done,
    Cancelled,
    Error,
}

/// Progress bar plus label, as a toolkit would show it in a status area.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusBar {
    label: String,
    fraction: Option<f32>,
    tone: StatusTone,
    task_name: Option<String>,
}

impl StatusBar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// `None` means indeterminate (or nothing to show).
    pub fn fraction(&self) -> Option<f32> {
        self.fraction
    }

    pub fn tone(&self) -> StatusTone {
        self.tone
    }

    pub fn task_name(&self) -> Option<&str> {
        self.task_name.as_deref()
    }

    pub fn is_visible(&self) -> bool {
        self.tone != StatusTone::Idle
    }

    fn terminal_label(&self, outcome: &str) -> String {
        match &self.task_name {
            Some(name) => format!("{name}: {outcome}"),
            None => outcome.to_string(),
        }
    }
}

impl StatusDisplay for StatusBar {
    fn set_progress(&mut self, snapshot: &StatusSnapshot) {
        self.task_name = Some(snapshot.task_name.clone());
        self.label = snapshot.summary();
        self.fraction = snapshot.fraction().map(|fraction| fraction as f32);
        self.tone = StatusTone::Busy;
    }

    fn set_completion(&mut self) {
        self.label = self.terminal_label("done");
        self.fraction = Some(1.0);
        self.tone = StatusTone::Done;
    }

    fn set_cancelled(&mut self) {
        self.label = self.terminal_label("cancelled");
        self.fraction = None;
        self.tone = StatusTone::Cancelled;
    }

    fn set_failure(&mut self, failure: &TaskFailure) {
        self.task_name = Some(failure.task_name.clone());
        self.label = failure.to_string();
        self.fraction = None;
        self.tone = StatusTone::Error;
    }

    fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_then_completion_fills_the_bar() {
        let mut bar = StatusBar::new();
        assert!(!bar.is_visible());

        bar.set_progress(&StatusSnapshot::new("scan", "reading").with_steps(5, 10));
        assert_eq!(bar.tone(), StatusTone::Busy);
        assert_eq!(bar.label(), "scan: reading (5/10)");
        assert_eq!(bar.fraction(), Some(0.5));

        bar.set_completion();
        assert_eq!(bar.tone(), StatusTone::Done);
        assert_eq!(bar.label(), "scan: done");
        assert_eq!(bar.fraction(), Some(1.0));
    }

    #[test]
    fn failure_label_carries_the_message_until_cleared() {
        let mut bar = StatusBar::new();
        bar.set_failure(&TaskFailure::domain("copy", "disk full"));
        assert_eq!(bar.tone(), StatusTone::Error);
        assert_eq!(bar.label(), "copy failed: disk full");

        bar.clear();
        assert_eq!(bar, StatusBar::default());
    }

    #[test]
    fn cancellation_without_progress_uses_generic_label() {
        let mut bar = StatusBar::new();
        bar.set_cancelled();
        assert_eq!(bar.label(), "cancelled");
        assert_eq!(bar.fraction(), None);
    }
}
