//! Stable re-exports for consumers (`cli` and external crates).
//!
//! Prefer importing from `scriptrun_core::api` instead of reaching into internal modules.

pub use crate::config::{
    load_default, load_from, AppConfig, InterpreterConfig, LoggingConfig, RunnerConfig,
    ScriptsConfig, DEFAULT_CONFIG_FILE,
};
pub use crate::error::{ConfigError, ErrorKind, RunnerError};
pub use crate::runner::{
    Canceller, Invocation, ProcessRunner, RunHandle, RunObserver, RunOutcome, RunRequest,
    RunState, RunTranscript, RunnerEvent, StreamKind,
};
