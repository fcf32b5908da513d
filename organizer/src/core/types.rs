//! Shared deterministic types for the organizer loop.
//!
//! These types define stable contracts between the batch loop, the failure log
//! and the classifier. They must not depend on I/O.

use std::fmt;

use serde::{Deserialize, Serialize};

/// How the agent process ended, before any filesystem verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum AgentExit {
    /// Exit status 0. Says nothing about whether the file was organized.
    Success,
    /// Non-zero exit. `code` is `None` when the process was killed by a signal.
    Failed { code: Option<i32> },
    /// The agent exceeded its wall-clock budget and was killed.
    TimedOut { secs: u64 },
    /// The agent was killed because an immediate stop was requested.
    Interrupted,
}

/// Result of handing one file to the agent and checking the root afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum Outcome {
    /// The file left the root for a category directory.
    Moved,
    /// The file left the root for the quarantine directory.
    Quarantined,
    /// The agent exited 0 but the file is still in the root.
    StillPresent,
    /// The agent exited non-zero.
    ProcessError { code: Option<i32> },
    /// The agent ran out of time.
    TimedOut { secs: u64 },
    /// The file disappeared before the agent was invoked for it.
    Vanished,
    /// The run was stopped while the agent was working on this file.
    Interrupted,
}

impl Outcome {
    /// Combine the agent's exit with the post-condition checks.
    pub fn from_exit(exit: AgentExit, moved: bool, quarantined: bool) -> Self {
        match exit {
            AgentExit::Interrupted => Outcome::Interrupted,
            AgentExit::TimedOut { secs } => Outcome::TimedOut { secs },
            AgentExit::Failed { code } => Outcome::ProcessError { code },
            AgentExit::Success if !moved => Outcome::StillPresent,
            AgentExit::Success if quarantined => Outcome::Quarantined,
            AgentExit::Success => Outcome::Moved,
        }
    }

    /// Terminal state this outcome drives the file into, if any.
    pub fn state(self) -> FileState {
        match self {
            Outcome::Moved => FileState::Moved,
            Outcome::Quarantined => FileState::Quarantined,
            Outcome::StillPresent | Outcome::ProcessError { .. } | Outcome::TimedOut { .. } => {
                FileState::Failed
            }
            Outcome::Vanished | Outcome::Interrupted => FileState::Pending,
        }
    }

    /// Reason to write into the failure log, or `None` when nothing is logged.
    pub fn failure_reason(self) -> Option<FailureReason> {
        match self {
            Outcome::StillPresent => Some(FailureReason::NotMoved),
            Outcome::ProcessError { code } => Some(FailureReason::AgentExit { code }),
            Outcome::TimedOut { secs } => Some(FailureReason::TimedOut { secs }),
            Outcome::Moved | Outcome::Quarantined | Outcome::Vanished | Outcome::Interrupted => {
                None
            }
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Outcome::Moved => "moved",
            Outcome::Quarantined => "quarantined",
            Outcome::StillPresent => "failed (not moved)",
            Outcome::ProcessError { .. } => "failed (agent error)",
            Outcome::TimedOut { .. } => "failed (timed out)",
            Outcome::Vanished => "gone before processing",
            Outcome::Interrupted => "interrupted",
        }
    }
}

/// Per-file lifecycle: `Pending -> Processing -> {Moved, Quarantined, Failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileState {
    Pending,
    Processing,
    Moved,
    Quarantined,
    Failed,
}

impl FileState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            FileState::Moved | FileState::Quarantined | FileState::Failed
        )
    }
}

/// Why a file was written to the failure log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    AgentExit { code: Option<i32> },
    NotMoved,
    TimedOut { secs: u64 },
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::AgentExit { code: Some(code) } => {
                write!(f, "Agent exited with code {code}")
            }
            FailureReason::AgentExit { code: None } => {
                write!(f, "Agent was terminated by a signal")
            }
            FailureReason::NotMoved => write!(f, "Agent finished but file was NOT moved"),
            FailureReason::TimedOut { secs } => write!(f, "Agent timed out after {secs}s"),
        }
    }
}

/// What to do when an interrupt arrives while the agent is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InterruptMode {
    /// Let the current file finish, then stop. A second interrupt stops immediately.
    #[default]
    AfterCurrent,
    /// Kill the running agent and stop.
    Immediate,
}
