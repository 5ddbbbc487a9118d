use std::path::Path;

use crate::error::ConfigError;

use super::types::AppConfig;

pub const DEFAULT_CONFIG_FILE: &str = "scriptrun.toml";

pub const ENV_INTERPRETER: &str = "SCRIPTRUN_INTERPRETER";
pub const ENV_SCRIPT_DIR: &str = "SCRIPTRUN_SCRIPT_DIR";
pub const ENV_TIMEOUT_SECS: &str = "SCRIPTRUN_TIMEOUT_SECS";

/// Loads `scriptrun.toml` from the working directory when present, otherwise
/// defaults, then applies environment overrides.
pub fn load_default() -> Result<AppConfig, ConfigError> {
    let mut cfg = if Path::new(DEFAULT_CONFIG_FILE).exists() {
        read_file(Path::new(DEFAULT_CONFIG_FILE))?
    } else {
        AppConfig::default()
    };
    apply_env_overrides(&mut cfg, |k| std::env::var(k).ok())?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Loads an explicitly named config file; a missing file is an error here.
pub fn load_from(path: &Path) -> Result<AppConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.display().to_string()));
    }
    let mut cfg = read_file(path)?;
    apply_env_overrides(&mut cfg, |k| std::env::var(k).ok())?;
    validate(&cfg)?;
    Ok(cfg)
}

pub fn parse_str(s: &str) -> Result<AppConfig, ConfigError> {
    let cfg = toml::from_str::<AppConfig>(s).map_err(ConfigError::Parse)?;
    validate(&cfg)?;
    Ok(cfg)
}

fn read_file(path: &Path) -> Result<AppConfig, ConfigError> {
    let s = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    toml::from_str::<AppConfig>(&s).map_err(ConfigError::Parse)
}

pub fn apply_env_overrides<F>(cfg: &mut AppConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = lookup(ENV_INTERPRETER) {
        if !v.trim().is_empty() {
            cfg.interpreter.path = v;
        }
    }
    if let Some(v) = lookup(ENV_SCRIPT_DIR) {
        if !v.trim().is_empty() {
            cfg.scripts.dir = v.into();
        }
    }
    if let Some(v) = lookup(ENV_TIMEOUT_SECS) {
        if !v.trim().is_empty() {
            let secs = v.trim().parse::<u64>().map_err(|_| ConfigError::EnvInvalid {
                key: ENV_TIMEOUT_SECS.to_string(),
                value: v.clone(),
            })?;
            cfg.runner.timeout_secs = Some(secs);
        }
    }
    Ok(())
}

pub fn validate(cfg: &AppConfig) -> Result<(), ConfigError> {
    if cfg.interpreter.path.trim().is_empty() {
        return Err(ConfigError::Validation("interpreter.path must not be empty".into()));
    }
    if cfg.scripts.extension.trim_start_matches('.').trim().is_empty() {
        return Err(ConfigError::Validation("scripts.extension must not be empty".into()));
    }
    if cfg.runner.timeout_secs == Some(0) {
        return Err(ConfigError::Validation("runner.timeout_secs must be positive".into()));
    }
    if cfg.runner.max_line_bytes == 0 {
        return Err(ConfigError::Validation("runner.max_line_bytes must be positive".into()));
    }
    Ok(())
}
