//! Failure modeling for the desktop shell's error banner.

use shared::error::{FailureKind, TaskFailure};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorCategory {
    Io,
    Validation,
    Worker,
    Crash,
    Unknown,
}

#[derive(Debug, Clone)]
pub struct UiError {
    category: UiErrorCategory,
    task_name: String,
    message: String,
}

impl UiError {
    pub fn from_failure(failure: &TaskFailure) -> Self {
        let category = match failure.kind {
            FailureKind::Panic => UiErrorCategory::Crash,
            FailureKind::Worker => UiErrorCategory::Worker,
            FailureKind::Domain => classify_message(&failure.message),
        };

        Self {
            category,
            task_name: failure.task_name.clone(),
            message: failure.message.clone(),
        }
    }

    pub fn task_name(&self) -> &str {
        &self.task_name
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Short advice shown under the error banner.
    pub fn hint(&self) -> &'static str {
        match self.category {
            UiErrorCategory::Io => "Check that the files are reachable and retry.",
            UiErrorCategory::Validation => "Adjust the job options and retry.",
            UiErrorCategory::Worker => "The worker runtime is unavailable; restart the app.",
            UiErrorCategory::Crash => "The task crashed; see the log for details.",
            UiErrorCategory::Unknown => "Retry the task or clear the error.",
        }
    }
}

fn classify_message(message: &str) -> UiErrorCategory {
    let lower = message.to_ascii_lowercase();
    if lower.contains("could not be read")
        || lower.contains("disk full")
        || lower.contains("permission denied")
        || lower.contains("no such file")
        || lower.contains("i/o")
    {
        UiErrorCategory::Io
    } else if lower.contains("invalid") || lower.contains("missing") || lower.contains("malformed")
    {
        UiErrorCategory::Validation
    } else {
        UiErrorCategory::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_failures_are_classified_by_message() {
        let err = UiError::from_failure(&TaskFailure::domain("copy", "Disk full"));
        assert_eq!(err.category, UiErrorCategory::Io);

        let err = UiError::from_failure(&TaskFailure::domain("import", "malformed record header"));
        assert_eq!(err.category, UiErrorCategory::Validation);

        let err = UiError::from_failure(&TaskFailure::domain("scan", "something odd"));
        assert_eq!(err.category, UiErrorCategory::Unknown);
    }

    #[test]
    fn panics_and_worker_losses_ignore_the_message() {
        let err = UiError::from_failure(&TaskFailure::panic("scan", "disk full"));
        assert_eq!(err.category, UiErrorCategory::Crash);

        let err = UiError::from_failure(&TaskFailure::worker("scan", "invalid handle"));
        assert_eq!(err.category, UiErrorCategory::Worker);
        assert_eq!(err.task_name(), "scan");
    }
}
