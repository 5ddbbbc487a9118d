use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Coarse classification of a failed run, stable enough to map onto exit codes
/// and machine-readable output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidRequest,
    ScriptNotFound,
    InterpreterUnavailable,
    ChildProcess,
    StreamRead,
    Cancelled,
    TimedOut,
    Io,
}

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("invalid run request: {0}")]
    InvalidRequest(String),

    #[error("script not found: {}", path.display())]
    ScriptNotFound { path: PathBuf },

    #[error("interpreter unavailable: {interpreter} ({reason})")]
    InterpreterUnavailable { interpreter: String, reason: String },

    #[error("script exited with code {code}")]
    ChildExit { code: i32 },

    #[error("script terminated by signal {signal}")]
    Signal { signal: i32 },

    #[error("io error while reading {stream}: {message}")]
    StreamRead { stream: &'static str, message: String },

    #[error("run cancelled")]
    Cancelled,

    #[error("run timed out after {secs}s")]
    TimedOut { secs: u64 },

    #[error("failed to wait for script: {0}")]
    Io(#[source] std::io::Error),
}

impl RunnerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RunnerError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            RunnerError::ScriptNotFound { .. } => ErrorKind::ScriptNotFound,
            RunnerError::InterpreterUnavailable { .. } => ErrorKind::InterpreterUnavailable,
            RunnerError::ChildExit { .. } | RunnerError::Signal { .. } => ErrorKind::ChildProcess,
            RunnerError::StreamRead { .. } => ErrorKind::StreamRead,
            RunnerError::Cancelled => ErrorKind::Cancelled,
            RunnerError::TimedOut { .. } => ErrorKind::TimedOut,
            RunnerError::Io(_) => ErrorKind::Io,
        }
    }

    /// True for failures detected before any child process existed.
    pub fn is_start_failure(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::InvalidRequest | ErrorKind::ScriptNotFound | ErrorKind::InterpreterUnavailable
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_exit_message_carries_code() {
        let err = RunnerError::ChildExit { code: 1 };
        assert_eq!(err.to_string(), "script exited with code 1");
        assert_eq!(err.kind(), ErrorKind::ChildProcess);
        assert!(!err.is_start_failure());
    }

    #[test]
    fn signal_and_exit_share_kind() {
        assert_eq!(
            RunnerError::Signal { signal: 9 }.kind(),
            RunnerError::ChildExit { code: 2 }.kind()
        );
    }

    #[test]
    fn start_failures_are_distinguishable() {
        let missing = RunnerError::ScriptNotFound {
            path: PathBuf::from("scripts/sap_runner_1_missing.py"),
        };
        let interp = RunnerError::InterpreterUnavailable {
            interpreter: "python9".into(),
            reason: "not found on PATH".into(),
        };
        assert!(missing.is_start_failure());
        assert!(interp.is_start_failure());
        assert_ne!(missing.kind(), interp.kind());
        assert!(missing.to_string().contains("sap_runner_1_missing.py"));
        assert!(interp.to_string().contains("python9"));
    }

    #[test]
    fn kind_serializes_snake_case() {
        let s = serde_json::to_string(&ErrorKind::InterpreterUnavailable).unwrap();
        assert_eq!(s, "\"interpreter_unavailable\"");
    }
}
