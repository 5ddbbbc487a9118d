use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot, watch, Notify};
use tokio::task::JoinHandle;

use crate::config::{AppConfig, InterpreterConfig, RunnerConfig, ScriptsConfig};
use crate::error::{ErrorKind, RunnerError};

use super::events::{RunnerEvent, StreamKind};
use super::exit::{exit_error, normalize_exit};
use super::observer::{RunObserver, RunTranscript};
use super::resolve::{self, Invocation};
use super::tee::{self, LineLimits, StreamReport};
use super::types::{RunOutcome, RunRequest, RunState};

/// Launches one script under the configured interpreter.
///
/// A runner is single-use: [`ProcessRunner::start`] and [`ProcessRunner::run`]
/// consume it, so the `Idle → Starting → Running → Terminated` progression
/// can only happen once per instance. Both must be called from within a tokio
/// runtime.
pub struct ProcessRunner {
    interpreter: InterpreterConfig,
    scripts: ScriptsConfig,
    runner: RunnerConfig,
    state_tx: watch::Sender<RunState>,
}

impl ProcessRunner {
    pub fn new(interpreter: InterpreterConfig, scripts: ScriptsConfig, runner: RunnerConfig) -> Self {
        let (state_tx, _) = watch::channel(RunState::Idle);
        Self {
            interpreter,
            scripts,
            runner,
            state_tx,
        }
    }

    pub fn from_app_config(cfg: &AppConfig) -> Self {
        Self::new(cfg.interpreter.clone(), cfg.scripts.clone(), cfg.runner.clone())
    }

    pub fn state(&self) -> RunState {
        *self.state_tx.borrow()
    }

    pub fn resolve(&self, request: &RunRequest) -> Result<Invocation, RunnerError> {
        resolve::resolve(&self.interpreter, &self.scripts, request)
    }

    /// Spawns the child and returns immediately.
    ///
    /// Output lines and the final outcome are sent on `event_tx`. Errors
    /// returned here mean no process was started and no event was sent.
    pub fn start(
        self,
        request: RunRequest,
        event_tx: mpsc::UnboundedSender<RunnerEvent>,
    ) -> Result<RunHandle, RunnerError> {
        self.state_tx.send_replace(RunState::Starting);

        let mut child = match self.resolve(&request).and_then(|inv| self.spawn(&inv)) {
            Ok(child) => child,
            Err(err) => {
                self.state_tx.send_replace(RunState::Terminated);
                tracing::warn!(
                    target: "scriptrun.runner",
                    script = %request.script_identifier,
                    error.kind = ?err.kind(),
                    error.message = %err,
                    "script failed to start"
                );
                return Err(err);
            }
        };

        let started = Instant::now();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let (stop_tx, stop_rx) = watch::channel(false);
        let out_limits = LineLimits {
            tail_lines: 0,
            max_line_bytes: self.runner.max_line_bytes,
        };
        let err_limits = LineLimits {
            tail_lines: self.runner.stderr_tail_lines,
            ..out_limits
        };
        let out_task = stdout
            .map(|s| tee::pump(s, StreamKind::Stdout, event_tx.clone(), out_limits, stop_rx.clone()));
        let err_task = stderr
            .map(|s| tee::pump(s, StreamKind::Stderr, event_tx.clone(), err_limits, stop_rx));

        self.state_tx.send_replace(RunState::Running);

        let cancel = Arc::new(Notify::new());
        let (outcome_tx, outcome_rx) = oneshot::channel();
        let state_rx = self.state_tx.subscribe();

        tokio::spawn(supervise(Supervision {
            child,
            out_task,
            err_task,
            cancel: cancel.clone(),
            timeout_secs: self.runner.timeout_secs,
            drain_grace: Duration::from_millis(self.runner.drain_grace_ms),
            stop_readers: stop_tx,
            started,
            event_tx,
            outcome_tx,
            state_tx: self.state_tx,
        }));

        Ok(RunHandle {
            cancel,
            outcome_rx,
            state_rx,
        })
    }

    /// Drives `observer` until the run completes.
    ///
    /// `on_complete` fires exactly once, including when the script could not
    /// be started; in that case no other callback fires.
    pub async fn run<O>(self, request: RunRequest, observer: &mut O) -> RunOutcome
    where
        O: RunObserver + ?Sized,
    {
        let (tx, mut rx) = mpsc::unbounded_channel();
        match self.start(request, tx) {
            Ok(handle) => handle.relay(&mut rx, observer).await,
            Err(err) => {
                let outcome = RunOutcome::start_failed(&err);
                observer.on_complete(&outcome).await;
                outcome
            }
        }
    }

    /// Runs to completion and returns every relayed line with the outcome.
    pub async fn run_collect(self, request: RunRequest) -> RunTranscript {
        let mut transcript = RunTranscript::default();
        self.run(request, &mut transcript).await;
        transcript
    }

    fn spawn(&self, invocation: &Invocation) -> Result<Child, RunnerError> {
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .envs(&self.runner.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // Own process group, so cancel and timeout reach anything the script starts.
        #[cfg(unix)]
        cmd.process_group(0);
        if let Some(dir) = &self.runner.working_dir {
            cmd.current_dir(dir);
        }

        tracing::info!(
            target: "scriptrun.runner",
            interpreter = %invocation.program.display(),
            script = %invocation.script_path.display(),
            args = ?invocation.args,
            "starting script"
        );

        cmd.spawn().map_err(|e| RunnerError::InterpreterUnavailable {
            interpreter: invocation.program.display().to_string(),
            reason: e.to_string(),
        })
    }
}

/// Handle to a running script.
///
/// Dropping the handle detaches from the run; the child keeps running until
/// it exits on its own. Once the child has ended, the outcome is reported
/// after its output is drained or after `drain_grace_ms`, whichever comes
/// first.
pub struct RunHandle {
    cancel: Arc<Notify>,
    outcome_rx: oneshot::Receiver<RunOutcome>,
    state_rx: watch::Receiver<RunState>,
}

impl RunHandle {
    pub fn state(&self) -> RunState {
        *self.state_rx.borrow()
    }

    /// Asks the supervisor to kill the child. Has no effect once terminated.
    pub fn cancel(&self) {
        self.cancel.notify_one();
    }

    pub fn canceller(&self) -> Canceller {
        Canceller(self.cancel.clone())
    }

    /// Feeds the events of this run from `rx` into `observer` and returns the
    /// outcome once `on_complete` has been called.
    pub async fn relay<O>(
        self,
        rx: &mut mpsc::UnboundedReceiver<RunnerEvent>,
        observer: &mut O,
    ) -> RunOutcome
    where
        O: RunObserver + ?Sized,
    {
        let mut completed = None;
        while let Some(event) = rx.recv().await {
            match event {
                RunnerEvent::Message(line) => observer.on_message(&line).await,
                RunnerEvent::Error(line) => observer.on_error(&line).await,
                RunnerEvent::Complete(outcome) => {
                    completed = Some(outcome);
                    break;
                }
            }
        }

        let outcome = match completed {
            Some(outcome) => outcome,
            None => self.wait().await,
        };
        observer.on_complete(&outcome).await;
        outcome
    }

    pub async fn wait(self) -> RunOutcome {
        match self.outcome_rx.await {
            Ok(outcome) => outcome,
            Err(_) => RunOutcome::start_failed(&RunnerError::Io(std::io::Error::other(
                "run supervisor stopped before reporting an outcome",
            ))),
        }
    }
}

/// Cloneable cancellation trigger, usable after the handle moved into `wait`.
#[derive(Clone)]
pub struct Canceller(Arc<Notify>);

impl Canceller {
    pub fn cancel(&self) {
        self.0.notify_one();
    }
}

struct Supervision {
    child: Child,
    out_task: Option<JoinHandle<StreamReport>>,
    err_task: Option<JoinHandle<StreamReport>>,
    cancel: Arc<Notify>,
    timeout_secs: Option<u64>,
    drain_grace: Duration,
    stop_readers: watch::Sender<bool>,
    started: Instant,
    event_tx: mpsc::UnboundedSender<RunnerEvent>,
    outcome_tx: oneshot::Sender<RunOutcome>,
    state_tx: watch::Sender<RunState>,
}

enum Stop {
    Exited(std::io::Result<ExitStatus>),
    Cancelled,
    TimedOut(u64),
}

async fn supervise(s: Supervision) {
    let Supervision {
        mut child,
        out_task,
        err_task,
        cancel,
        timeout_secs,
        drain_grace,
        stop_readers,
        started,
        event_tx,
        outcome_tx,
        state_tx,
    } = s;

    let deadline = async move {
        match timeout_secs {
            Some(secs) => {
                tokio::time::sleep(Duration::from_secs(secs)).await;
                secs
            }
            None => std::future::pending::<u64>().await,
        }
    };
    tokio::pin!(deadline);

    let stop = tokio::select! {
        res = child.wait() => Stop::Exited(res),
        _ = cancel.notified() => Stop::Cancelled,
        secs = &mut deadline => Stop::TimedOut(secs),
    };

    let (exit_code, primary) = match stop {
        Stop::Exited(Ok(status)) => (Some(normalize_exit(status)), exit_error(status)),
        Stop::Exited(Err(e)) => (None, Some(RunnerError::Io(e))),
        Stop::Cancelled => {
            kill(&mut child).await;
            (None, Some(RunnerError::Cancelled))
        }
        Stop::TimedOut(secs) => {
            kill(&mut child).await;
            (None, Some(RunnerError::TimedOut { secs }))
        }
    };

    let joined = async {
        let out = join_pump(out_task, StreamKind::Stdout).await;
        let err = join_pump(err_task, StreamKind::Stderr).await;
        (out, err)
    };
    tokio::pin!(joined);
    let (out, err) = match tokio::time::timeout(drain_grace, &mut joined).await {
        Ok(reports) => reports,
        Err(_) => {
            tracing::warn!(
                target: "scriptrun.runner",
                grace_ms = drain_grace.as_millis() as u64,
                "output still open after the script ended; stopping readers"
            );
            stop_readers.send_replace(true);
            joined.await
        }
    };

    let outcome = build_outcome(
        exit_code,
        primary,
        out,
        err,
        started.elapsed().as_millis() as u64,
    );

    state_tx.send_replace(RunState::Terminated);
    if outcome.succeeded {
        tracing::info!(
            target: "scriptrun.runner",
            duration_ms = outcome.duration_ms,
            stdout_lines = outcome.stdout_lines,
            stderr_lines = outcome.stderr_lines,
            "script finished"
        );
    } else {
        tracing::warn!(
            target: "scriptrun.runner",
            exit_code = ?outcome.exit_code,
            error.kind = ?outcome.error_kind,
            duration_ms = outcome.duration_ms,
            "script failed"
        );
    }

    let _ = event_tx.send(RunnerEvent::Complete(outcome.clone()));
    let _ = outcome_tx.send(outcome);
}

async fn kill(child: &mut Child) {
    #[cfg(unix)]
    kill_group(child);
    if let Err(e) = child.kill().await {
        tracing::error!(target: "scriptrun.runner", error = %e, "failed to kill script");
    }
}

/// Kills every process left in the child's group.
#[cfg(unix)]
fn kill_group(child: &Child) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Some(pid) = child.id() else {
        return;
    };
    if let Err(e) = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
        tracing::debug!(target: "scriptrun.runner", pid, error = %e, "process group kill failed");
    }
}

async fn join_pump(task: Option<JoinHandle<StreamReport>>, stream: StreamKind) -> StreamReport {
    let Some(task) = task else {
        return StreamReport::default();
    };
    match task.await {
        Ok(report) => report,
        Err(e) => StreamReport {
            error: Some(RunnerError::StreamRead {
                stream: stream.as_str(),
                message: e.to_string(),
            }),
            ..StreamReport::default()
        },
    }
}

fn build_outcome(
    exit_code: Option<i32>,
    primary: Option<RunnerError>,
    out: StreamReport,
    err: StreamReport,
    duration_ms: u64,
) -> RunOutcome {
    // The exit status outranks a stream failure; both end up in the cause.
    let stream_error = out.error.or(err.error);
    let failure = match (primary, stream_error) {
        (Some(p), Some(s)) => Some((p.kind(), format!("{p}; {s}"))),
        (Some(p), None) => Some((p.kind(), p.to_string())),
        (None, Some(s)) => Some((s.kind(), s.to_string())),
        (None, None) => None,
    };

    match failure {
        None => RunOutcome {
            succeeded: true,
            error_cause: None,
            error_kind: None,
            exit_code,
            duration_ms,
            stdout_lines: out.lines,
            stderr_lines: err.lines,
            stderr_tail: err.tail,
        },
        Some((kind, mut cause)) => {
            if kind == ErrorKind::ChildProcess && !err.tail.is_empty() {
                cause.push('\n');
                cause.push_str(&err.tail.join("\n"));
            }
            RunOutcome {
                succeeded: false,
                error_cause: Some(cause),
                error_kind: Some(kind),
                exit_code,
                duration_ms,
                stdout_lines: out.lines,
                stderr_lines: err.lines,
                stderr_tail: err.tail,
            }
        }
    }
}
