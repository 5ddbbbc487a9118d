use std::path::PathBuf;

use clap::Parser;

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamFormat {
    Text,
    Jsonl,
}

#[derive(Parser, Debug, Clone)]
#[command(version, about = "Run a sap_runner_1_<IDENTIFIER> script and relay its output")]
pub struct Args {
    /// Logical script key, e.g. `zecomrecon` for `sap_runner_1_zecomrecon.py`.
    pub identifier: String,

    /// Single argument forwarded verbatim to the script. Omitted when absent.
    #[arg(allow_hyphen_values = true)]
    pub argument: Option<String>,

    /// Config file (TOML). Defaults to `scriptrun.toml` in the working directory.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Interpreter binary: a path or a name looked up on PATH.
    #[arg(long)]
    pub interpreter: Option<String>,

    #[arg(long)]
    pub script_dir: Option<PathBuf>,

    #[arg(long)]
    pub timeout_secs: Option<u64>,

    #[arg(long, value_enum, default_value_t = StreamFormat::Text)]
    pub stream_format: StreamFormat,

    /// Use plain ASCII markers in text output.
    #[arg(long, default_value_t = false)]
    pub ascii: bool,

    /// Write logs to `<dir>/scriptrun.log` instead of stderr.
    #[arg(long)]
    pub log_dir: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn identifier_only() {
        let args = Args::try_parse_from(["scriptrun", "zecomrecon"]).unwrap();
        assert_eq!(args.identifier, "zecomrecon");
        assert_eq!(args.argument, None);
        assert_eq!(args.stream_format, StreamFormat::Text);
        assert!(!args.ascii);
    }

    #[test]
    fn argument_and_flags() {
        let args = Args::try_parse_from([
            "scriptrun",
            "--interpreter",
            "/usr/bin/python3",
            "--stream-format",
            "jsonl",
            "ZVM01",
            "MnSOrdersListFromKibo.csv",
        ])
        .unwrap();
        assert_eq!(args.identifier, "ZVM01");
        assert_eq!(args.argument.as_deref(), Some("MnSOrdersListFromKibo.csv"));
        assert_eq!(args.interpreter.as_deref(), Some("/usr/bin/python3"));
        assert_eq!(args.stream_format, StreamFormat::Jsonl);
    }

    #[test]
    fn hyphenated_argument_is_forwarded() {
        let args = Args::try_parse_from(["scriptrun", "ZVM01", "-x"]).unwrap();
        assert_eq!(args.argument.as_deref(), Some("-x"));
    }

    #[test]
    fn identifier_is_required() {
        assert!(Args::try_parse_from(["scriptrun"]).is_err());
    }
}
