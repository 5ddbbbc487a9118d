use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, RunnerError};

/// One invocation: which script, and the optional single argument it receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    pub script_identifier: String,
    pub argument: Option<String>,
}

impl RunRequest {
    pub fn new(script_identifier: impl Into<String>, argument: Option<String>) -> Self {
        Self {
            script_identifier: script_identifier.into(),
            argument,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Starting,
    Running,
    Terminated,
}

/// Terminal report for one run. Exactly one is produced per request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOutcome {
    pub succeeded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_cause: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    pub duration_ms: u64,
    pub stdout_lines: u64,
    pub stderr_lines: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stderr_tail: Vec<String>,
}

impl RunOutcome {
    /// Outcome for a request that never produced a child process.
    pub fn start_failed(err: &RunnerError) -> Self {
        Self {
            succeeded: false,
            error_cause: Some(err.to_string()),
            error_kind: Some(err.kind()),
            exit_code: None,
            duration_ms: 0,
            stdout_lines: 0,
            stderr_lines: 0,
            stderr_tail: Vec::new(),
        }
    }
}
