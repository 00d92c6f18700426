use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident, $prefix:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "-{}"), self.0)
            }
        }
    };
}

id_newtype!(RunId, "run");

impl RunId {
    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

/// Lifecycle of one task run.
///
/// `Succeeded`, `Cancelled` and `Failed` are absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunnerState {
    Idle,
    Running,
    Succeeded,
    Cancelled,
    Failed,
}

impl RunnerState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Cancelled | Self::Failed)
    }

    /// Moves to `next` unless the current state is terminal or the move skips
    /// `Running`. Returns the state actually reached.
    pub fn advance(self, next: RunnerState) -> RunnerState {
        match (self, next) {
            (Self::Idle, Self::Running) => next,
            (Self::Running, next) if next.is_terminal() => next,
            (current, _) => current,
        }
    }
}

impl fmt::Display for RunnerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states_are_absorbing() {
        for terminal in [
            RunnerState::Succeeded,
            RunnerState::Cancelled,
            RunnerState::Failed,
        ] {
            assert_eq!(terminal.advance(RunnerState::Running), terminal);
            assert_eq!(terminal.advance(RunnerState::Idle), terminal);
            assert_eq!(terminal.advance(RunnerState::Failed), terminal);
        }
    }

    #[test]
    fn idle_cannot_jump_straight_to_an_outcome() {
        assert_eq!(
            RunnerState::Idle.advance(RunnerState::Succeeded),
            RunnerState::Idle
        );
        assert_eq!(
            RunnerState::Idle
                .advance(RunnerState::Running)
                .advance(RunnerState::Cancelled),
            RunnerState::Cancelled
        );
    }

    #[test]
    fn run_ids_render_with_prefix() {
        assert_eq!(RunId(7).to_string(), "run-7");
        assert_eq!(RunId(7).next(), RunId(8));
    }
}
