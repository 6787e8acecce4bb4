// src/exec/state.rs

//! Run lifecycle state machine and terminal outcomes.

use std::fmt;

/// Lifecycle of one process run.
///
/// ```text
/// NotStarted -> Starting -> Running -> Completed | TimedOut | Killed
///                        \-> StartFailed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    NotStarted,
    Starting,
    Running,
    Completed,
    TimedOut,
    Killed,
    StartFailed,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunState::Completed | RunState::TimedOut | RunState::Killed | RunState::StartFailed
        )
    }

    /// Timeout and user kill both abort the run.
    pub fn is_aborted(self) -> bool {
        matches!(self, RunState::TimedOut | RunState::Killed)
    }

    pub fn can_transition_to(self, next: RunState) -> bool {
        use RunState::*;
        matches!(
            (self, next),
            (NotStarted, Starting)
                | (Starting, Running)
                | (Starting, StartFailed)
                | (Running, Completed)
                | (Running, TimedOut)
                | (Running, Killed)
        )
    }

    /// Move to `next`, or report the illegal transition.
    pub fn advance(self, next: RunState) -> Result<RunState, String> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(format!("illegal run state transition {self} -> {next}"))
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunState::NotStarted => "not-started",
            RunState::Starting => "starting",
            RunState::Running => "running",
            RunState::Completed => "completed",
            RunState::TimedOut => "timed-out",
            RunState::Killed => "killed",
            RunState::StartFailed => "start-failed",
        };
        f.write_str(s)
    }
}

/// How a run ended. Exactly one of these is produced per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunTermination {
    /// Both streams closed and the process exited on its own.
    Completed { exit_code: Option<i32> },
    /// The process ran, but its exit status could not be collected.
    WaitFailed { message: String },
    TimedOut { message: String },
    Killed { message: String },
    StartFailed { message: String },
}

impl RunTermination {
    pub fn state(&self) -> RunState {
        match self {
            RunTermination::Completed { .. } | RunTermination::WaitFailed { .. } => {
                RunState::Completed
            }
            RunTermination::TimedOut { .. } => RunState::TimedOut,
            RunTermination::Killed { .. } => RunState::Killed,
            RunTermination::StartFailed { .. } => RunState::StartFailed,
        }
    }

    /// Only a zero exit code counts as success.
    pub fn succeeded(&self) -> bool {
        matches!(self, RunTermination::Completed { exit_code: Some(0) })
    }

    /// User-facing message for anything other than a clean exit.
    pub fn message(&self, program: &str) -> Option<String> {
        match self {
            RunTermination::Completed { exit_code: Some(0) } => None,
            RunTermination::Completed { exit_code: Some(code) } => {
                Some(format!("process '{program}' exited with code {code}"))
            }
            RunTermination::Completed { exit_code: None } => {
                Some(format!("process '{program}' was terminated by a signal"))
            }
            RunTermination::WaitFailed { message }
            | RunTermination::TimedOut { message }
            | RunTermination::Killed { message }
            | RunTermination::StartFailed { message } => Some(message.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_transitions() {
        let s = RunState::NotStarted;
        let s = s.advance(RunState::Starting).unwrap();
        let s = s.advance(RunState::Running).unwrap();
        let s = s.advance(RunState::Completed).unwrap();
        assert!(s.is_terminal());
        assert!(!s.is_aborted());
    }

    #[test]
    fn terminal_states_do_not_move() {
        for terminal in [
            RunState::Completed,
            RunState::TimedOut,
            RunState::Killed,
            RunState::StartFailed,
        ] {
            assert!(terminal.is_terminal());
            assert!(terminal.advance(RunState::Running).is_err());
            assert!(terminal.advance(RunState::Killed).is_err());
        }
    }

    #[test]
    fn start_failure_only_from_starting() {
        assert!(RunState::Starting.can_transition_to(RunState::StartFailed));
        assert!(!RunState::Running.can_transition_to(RunState::StartFailed));
        assert!(!RunState::NotStarted.can_transition_to(RunState::Running));
    }

    #[test]
    fn aborted_messages_are_distinct() {
        let timed_out = RunTermination::TimedOut { message: "timed out".into() };
        let killed = RunTermination::Killed { message: "killed".into() };
        assert!(timed_out.state().is_aborted());
        assert!(killed.state().is_aborted());
        assert_ne!(timed_out.message("x"), killed.message("x"));
    }

    #[test]
    fn non_zero_exit_is_failure() {
        let done = RunTermination::Completed { exit_code: Some(3) };
        assert!(!done.succeeded());
        assert_eq!(done.message("node").unwrap(), "process 'node' exited with code 3");
        assert!(RunTermination::Completed { exit_code: Some(0) }.succeeded());
    }
}
