use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::config::{InterpreterConfig, ScriptsConfig};
use crate::error::RunnerError;

use super::types::RunRequest;

/// Fully resolved command line for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub script_path: PathBuf,
    /// Interpreter flags, then the script path, then the optional argument.
    pub args: Vec<OsString>,
}

pub fn script_file_name(scripts: &ScriptsConfig, identifier: &str) -> String {
    let ext = scripts.extension.trim_start_matches('.');
    format!("{}{}.{}", scripts.prefix, identifier, ext)
}

pub fn validate_identifier(identifier: &str) -> Result<(), RunnerError> {
    if identifier.trim().is_empty() {
        return Err(RunnerError::InvalidRequest(
            "script identifier must not be empty".into(),
        ));
    }
    if identifier.contains(['/', '\\', '\0']) || identifier.contains("..") {
        return Err(RunnerError::InvalidRequest(format!(
            "script identifier {identifier:?} must not contain path components"
        )));
    }
    Ok(())
}

pub fn resolve_script(scripts: &ScriptsConfig, identifier: &str) -> Result<PathBuf, RunnerError> {
    validate_identifier(identifier)?;
    let candidate = scripts.dir.join(script_file_name(scripts, identifier));
    if !candidate.is_file() {
        return Err(RunnerError::ScriptNotFound { path: candidate });
    }
    // The child may run in another working directory.
    Ok(std::path::absolute(&candidate).unwrap_or(candidate))
}

pub fn resolve_interpreter(interpreter: &InterpreterConfig) -> Result<PathBuf, RunnerError> {
    let raw = interpreter.path.trim();
    which::which(raw).map_err(|e| RunnerError::InterpreterUnavailable {
        interpreter: raw.to_string(),
        reason: e.to_string(),
    })
}

pub fn build_args(
    interpreter: &InterpreterConfig,
    script_path: &Path,
    argument: Option<&str>,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = interpreter.args.iter().map(OsString::from).collect();
    args.push(script_path.as_os_str().to_os_string());
    if let Some(arg) = argument {
        args.push(OsString::from(arg));
    }
    args
}

/// Script resolution runs first so a missing script is reported even when
/// the interpreter is also unavailable.
pub fn resolve(
    interpreter: &InterpreterConfig,
    scripts: &ScriptsConfig,
    request: &RunRequest,
) -> Result<Invocation, RunnerError> {
    let script_path = resolve_script(scripts, &request.script_identifier)?;
    let program = resolve_interpreter(interpreter)?;
    let args = build_args(interpreter, &script_path, request.argument.as_deref());
    Ok(Invocation {
        program,
        script_path,
        args,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use pretty_assertions::assert_eq;

    fn scripts_in(dir: &Path) -> ScriptsConfig {
        ScriptsConfig {
            dir: dir.to_path_buf(),
            ..ScriptsConfig::default()
        }
    }

    #[test]
    fn file_name_follows_convention() {
        let scripts = ScriptsConfig::default();
        assert_eq!(script_file_name(&scripts, "zecomrecon"), "sap_runner_1_zecomrecon.py");

        let dotted = ScriptsConfig {
            extension: ".sh".into(),
            ..ScriptsConfig::default()
        };
        assert_eq!(script_file_name(&dotted, "ZVM01"), "sap_runner_1_ZVM01.sh");
    }

    #[test]
    fn identifiers_with_path_parts_are_rejected() {
        for bad in ["", "   ", "../etc", "a/b", "a\\b"] {
            let err = validate_identifier(bad).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidRequest, "identifier {bad:?}");
        }
        assert!(validate_identifier("ZVM01").is_ok());
    }

    #[test]
    fn missing_script_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve_script(&scripts_in(dir.path()), "missing").unwrap_err();
        match err {
            RunnerError::ScriptNotFound { path } => {
                assert!(path.ends_with("sap_runner_1_missing.py"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn directory_named_like_script_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sap_runner_1_dir.py")).unwrap();
        let err = resolve_script(&scripts_in(dir.path()), "dir").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ScriptNotFound);
    }

    #[test]
    fn existing_script_resolves_to_absolute_path() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("sap_runner_1_echo1.py"), "print('x')\n").unwrap();
        let path = resolve_script(&scripts_in(dir.path()), "echo1").unwrap();
        assert!(path.is_absolute());
        assert!(path.ends_with("sap_runner_1_echo1.py"));
    }

    #[test]
    fn unknown_interpreter_is_unavailable() {
        let interp = InterpreterConfig {
            path: "definitely-not-an-interpreter-4f2a".into(),
            args: vec![],
        };
        let err = resolve_interpreter(&interp).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InterpreterUnavailable);
        assert!(err.to_string().contains("definitely-not-an-interpreter-4f2a"));
    }

    #[test]
    fn argument_is_appended_only_when_present() {
        let interp = InterpreterConfig {
            path: "python3".into(),
            args: vec!["-u".into()],
        };
        let script = Path::new("/scripts/sap_runner_1_x.py");

        let without = build_args(&interp, script, None);
        assert_eq!(
            without,
            vec![OsString::from("-u"), OsString::from("/scripts/sap_runner_1_x.py")]
        );

        let with = build_args(&interp, script, Some("orders list.csv"));
        assert_eq!(with.len(), 3);
        assert_eq!(with[2], OsString::from("orders list.csv"));
    }

    #[test]
    fn missing_script_wins_over_missing_interpreter() {
        let dir = tempfile::tempdir().unwrap();
        let interp = InterpreterConfig {
            path: "definitely-not-an-interpreter-4f2a".into(),
            args: vec![],
        };
        let err = resolve(
            &interp,
            &scripts_in(dir.path()),
            &RunRequest::new("missing", None),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ScriptNotFound);
    }
}
