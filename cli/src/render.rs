use std::io::Write;
use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use scriptrun_core::api::{RunObserver, RunOutcome, RunRequest};
use serde::Serialize;

#[derive(Debug, Clone, Copy)]
pub struct TextMarkers {
    pub message: &'static str,
    pub error: &'static str,
    pub ok: &'static str,
    pub fail: &'static str,
}

impl TextMarkers {
    pub fn unicode() -> Self {
        Self {
            message: "🐍",
            error: "⚠️",
            ok: "✅",
            fail: "❌",
        }
    }

    pub fn ascii() -> Self {
        Self {
            message: ">",
            error: "!",
            ok: "[ok]",
            fail: "[fail]",
        }
    }
}

/// Console presentation of one run.
pub trait Presenter: RunObserver {
    fn begin(&mut self, request: &RunRequest);
}

pub struct TextRenderer<O, E> {
    out: O,
    err: E,
    markers: TextMarkers,
    started: Instant,
}

impl<O: Write + Send, E: Write + Send> TextRenderer<O, E> {
    pub fn new(out: O, err: E, markers: TextMarkers) -> Self {
        Self {
            out,
            err,
            markers,
            started: Instant::now(),
        }
    }
}

impl<O: Write + Send, E: Write + Send> Presenter for TextRenderer<O, E> {
    fn begin(&mut self, _request: &RunRequest) {
        self.started = Instant::now();
    }
}

#[async_trait]
impl<O: Write + Send, E: Write + Send> RunObserver for TextRenderer<O, E> {
    async fn on_message(&mut self, line: &str) {
        let _ = writeln!(self.out, "{} {}", self.markers.message, line);
    }

    async fn on_error(&mut self, line: &str) {
        let _ = writeln!(self.err, "{} {}", self.markers.error, line);
    }

    async fn on_complete(&mut self, outcome: &RunOutcome) {
        let secs = self.started.elapsed().as_secs_f64();
        if outcome.succeeded {
            let _ = writeln!(self.out, "{} script finished ({secs:.1}s)", self.markers.ok);
        } else {
            let cause = outcome.error_cause.as_deref().unwrap_or("unknown error");
            let _ = writeln!(self.err, "{} script failed: {cause}", self.markers.fail);
        }
        let _ = self.out.flush();
        let _ = self.err.flush();
    }
}

#[derive(Debug, Serialize)]
pub struct JsonlEvent<'a> {
    pub v: u8,
    #[serde(rename = "type")]
    pub event_type: &'static str,
    pub ts: String,
    pub run_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub argument: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<&'a RunOutcome>,
}

impl<'a> JsonlEvent<'a> {
    fn new(event_type: &'static str, run_id: &'a str) -> Self {
        Self {
            v: 1,
            event_type,
            ts: Utc::now().to_rfc3339(),
            run_id,
            script: None,
            argument: None,
            line: None,
            outcome: None,
        }
    }
}

pub struct JsonlRenderer<W> {
    out: W,
    run_id: String,
}

impl<W: Write + Send> JsonlRenderer<W> {
    pub fn new(out: W, run_id: String) -> Self {
        Self { out, run_id }
    }

    fn emit(&mut self, event: &JsonlEvent<'_>) {
        match serde_json::to_string(event) {
            Ok(s) => {
                let _ = writeln!(self.out, "{s}");
                let _ = self.out.flush();
            }
            Err(e) => tracing::error!(error = %e, "failed to encode jsonl event"),
        }
    }
}

impl<W: Write + Send> Presenter for JsonlRenderer<W> {
    fn begin(&mut self, request: &RunRequest) {
        let run_id = self.run_id.clone();
        let mut ev = JsonlEvent::new("run.start", &run_id);
        ev.script = Some(&request.script_identifier);
        ev.argument = request.argument.as_deref();
        self.emit(&ev);
    }
}

#[async_trait]
impl<W: Write + Send> RunObserver for JsonlRenderer<W> {
    async fn on_message(&mut self, line: &str) {
        let run_id = self.run_id.clone();
        let mut ev = JsonlEvent::new("stdout", &run_id);
        ev.line = Some(line);
        self.emit(&ev);
    }

    async fn on_error(&mut self, line: &str) {
        let run_id = self.run_id.clone();
        let mut ev = JsonlEvent::new("stderr", &run_id);
        ev.line = Some(line);
        self.emit(&ev);
    }

    async fn on_complete(&mut self, outcome: &RunOutcome) {
        let run_id = self.run_id.clone();
        let mut ev = JsonlEvent::new("run.end", &run_id);
        ev.outcome = Some(outcome);
        self.emit(&ev);
    }
}
