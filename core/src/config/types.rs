use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub interpreter: InterpreterConfig,

    #[serde(default)]
    pub scripts: ScriptsConfig,

    #[serde(default)]
    pub runner: RunnerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterpreterConfig {
    /// Absolute path, relative path, or bare name looked up on `PATH`.
    #[serde(default = "default_interpreter_path")]
    pub path: String,

    /// Flags placed before the script path.
    #[serde(default = "default_interpreter_args")]
    pub args: Vec<String>,
}

fn default_interpreter_path() -> String {
    if cfg!(windows) {
        "python".to_string()
    } else {
        "python3".to_string()
    }
}

fn default_interpreter_args() -> Vec<String> {
    vec!["-u".to_string()]
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            path: default_interpreter_path(),
            args: default_interpreter_args(),
        }
    }
}

/// Naming convention mapping an identifier to `<dir>/<prefix><id>.<extension>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptsConfig {
    #[serde(default = "default_script_dir")]
    pub dir: PathBuf,

    #[serde(default = "default_script_prefix")]
    pub prefix: String,

    #[serde(default = "default_script_extension")]
    pub extension: String,
}

fn default_script_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_script_prefix() -> String {
    "sap_runner_1_".to_string()
}

fn default_script_extension() -> String {
    "py".to_string()
}

impl Default for ScriptsConfig {
    fn default() -> Self {
        Self {
            dir: default_script_dir(),
            prefix: default_script_prefix(),
            extension: default_script_extension(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    #[serde(default = "default_stderr_tail_lines")]
    pub stderr_tail_lines: usize,

    /// How long output readers may keep draining once the script has ended.
    /// Processes the script left behind can hold the pipes open past that.
    #[serde(default = "default_drain_grace_ms")]
    pub drain_grace_ms: u64,

    #[serde(default = "default_max_line_bytes")]
    pub max_line_bytes: usize,

    #[serde(default)]
    pub working_dir: Option<PathBuf>,

    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

fn default_stderr_tail_lines() -> usize {
    20
}

fn default_drain_grace_ms() -> u64 {
    2000
}

fn default_max_line_bytes() -> usize {
    64 * 1024
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            timeout_secs: None,
            stderr_tail_lines: default_stderr_tail_lines(),
            drain_grace_ms: default_drain_grace_ms(),
            max_line_bytes: default_max_line_bytes(),
            working_dir: None,
            env: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub dir: Option<PathBuf>,
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            dir: None,
        }
    }
}
