mod config;
mod runner;

pub use config::ConfigError;
pub use runner::{ErrorKind, RunnerError};
