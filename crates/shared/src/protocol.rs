//! Serializable status events, one per line, for headless consumers.

use serde::{Deserialize, Serialize};

use crate::{domain::RunId, error::TaskFailure, status::StatusSnapshot};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum StatusEvent {
    Started { run_id: RunId, task_name: String },
    Progress { run_id: RunId, snapshot: StatusSnapshot },
    Completed { run_id: RunId },
    Cancelled { run_id: RunId },
    Failed { run_id: RunId, failure: TaskFailure },
    Cleared,
}

impl StatusEvent {
    pub fn to_json_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_use_tagged_snake_case_encoding() {
        let event = StatusEvent::Progress {
            run_id: RunId(3),
            snapshot: StatusSnapshot::new("scan", "reading").with_steps(1, 10),
        };
        let line = event.to_json_line().expect("encode");
        assert!(line.starts_with(r#"{"type":"progress","payload":{"run_id":3"#));

        let decoded: StatusEvent = serde_json::from_str(&line).expect("decode");
        assert_eq!(decoded, event);
    }

    #[test]
    fn cleared_has_no_payload() {
        assert_eq!(
            StatusEvent::Cleared.to_json_line().expect("encode"),
            r#"{"type":"cleared"}"#
        );
    }
}
