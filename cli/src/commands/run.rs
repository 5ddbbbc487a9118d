use scriptrun_core::api::{
    AppConfig, ErrorKind, ProcessRunner, RunObserver, RunOutcome, RunRequest,
};
use scriptrun_core::config::{self, load};
use tokio::sync::mpsc;
use tracing::Instrument;
use uuid::Uuid;

use crate::render::{JsonlRenderer, Presenter, TextMarkers, TextRenderer};

use super::cli::{Args, StreamFormat};

pub fn load_config(args: &Args) -> anyhow::Result<AppConfig> {
    let mut cfg = match &args.config {
        Some(path) => config::load_from(path)?,
        None => config::load_default()?,
    };
    apply_overrides(&mut cfg, args);
    load::validate(&cfg)?;
    Ok(cfg)
}

/// Command-line flags take precedence over file and environment settings.
pub fn apply_overrides(cfg: &mut AppConfig, args: &Args) {
    if let Some(interpreter) = &args.interpreter {
        cfg.interpreter.path = interpreter.clone();
    }
    if let Some(dir) = &args.script_dir {
        cfg.scripts.dir = dir.clone();
    }
    if let Some(secs) = args.timeout_secs {
        cfg.runner.timeout_secs = Some(secs);
    }
}

pub fn exit_code_for(outcome: &RunOutcome) -> i32 {
    match outcome.error_kind {
        None => 0,
        Some(ErrorKind::ChildProcess) => outcome.exit_code.filter(|c| *c != 0).unwrap_or(1),
        Some(ErrorKind::InvalidRequest) | Some(ErrorKind::ScriptNotFound) => 2,
        Some(ErrorKind::InterpreterUnavailable) => 3,
        Some(ErrorKind::StreamRead) => 4,
        Some(ErrorKind::TimedOut) => 124,
        Some(ErrorKind::Cancelled) => 130,
        Some(ErrorKind::Io) => 1,
    }
}

pub async fn run(args: &Args, cfg: &AppConfig) -> anyhow::Result<i32> {
    let run_id = Uuid::new_v4().to_string();
    let request = RunRequest::new(args.identifier.clone(), args.argument.clone());

    let mut presenter: Box<dyn Presenter> = match args.stream_format {
        StreamFormat::Text => {
            let markers = if args.ascii {
                TextMarkers::ascii()
            } else {
                TextMarkers::unicode()
            };
            Box::new(TextRenderer::new(std::io::stdout(), std::io::stderr(), markers))
        }
        StreamFormat::Jsonl => Box::new(JsonlRenderer::new(std::io::stdout(), run_id.clone())),
    };

    let span = tracing::info_span!("run", run_id = %run_id, script = %request.script_identifier);
    let runner = ProcessRunner::from_app_config(cfg);
    let outcome = execute(runner, request, presenter.as_mut())
        .instrument(span)
        .await;

    Ok(exit_code_for(&outcome))
}

async fn execute(
    runner: ProcessRunner,
    request: RunRequest,
    presenter: &mut dyn Presenter,
) -> RunOutcome {
    presenter.begin(&request);

    let (tx, mut rx) = mpsc::unbounded_channel();
    match runner.start(request, tx) {
        Ok(handle) => {
            let canceller = handle.canceller();
            let interrupt = tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::warn!("interrupt received, cancelling script");
                    canceller.cancel();
                }
            });
            let outcome = handle.relay(&mut rx, presenter).await;
            interrupt.abort();
            outcome
        }
        Err(err) => {
            let outcome = RunOutcome::start_failed(&err);
            presenter.on_complete(&outcome).await;
            outcome
        }
    }
}
