use std::collections::VecDeque;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::error::RunnerError;

use super::events::{RunnerEvent, StreamKind};

#[derive(Debug, Default)]
pub(crate) struct StreamReport {
    pub lines: u64,
    pub tail: Vec<String>,
    pub error: Option<RunnerError>,
}

/// Splits on `\n`, drops a trailing `\r`, decodes lossily.
pub(crate) fn decode_line(raw: &[u8]) -> String {
    let mut end = raw.len();
    if end > 0 && raw[end - 1] == b'\n' {
        end -= 1;
    }
    if end > 0 && raw[end - 1] == b'\r' {
        end -= 1;
    }
    String::from_utf8_lossy(&raw[..end]).into_owned()
}

/// Per-stream reading limits.
#[derive(Debug, Clone, Copy)]
pub(crate) struct LineLimits {
    /// Number of trailing lines kept in the report; zero keeps none.
    pub tail_lines: usize,
    /// Longest line forwarded in one piece; longer runs are split.
    pub max_line_bytes: usize,
}

pub(crate) fn pump<R>(
    reader: R,
    stream: StreamKind,
    tx: mpsc::UnboundedSender<RunnerEvent>,
    limits: LineLimits,
    stop: watch::Receiver<bool>,
) -> JoinHandle<StreamReport>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move { pump_lines(reader, stream, tx, limits, stop).await })
}

async fn stop_requested(stop: &mut watch::Receiver<bool>) -> bool {
    stop.wait_for(|stopped| *stopped).await.is_ok()
}

/// Reads `reader` line by line until EOF, a read error, or `stop` turns true.
///
/// A stop flushes any partially read line. If the stop sender goes away the
/// reader simply runs to EOF.
pub(crate) async fn pump_lines<R>(
    reader: R,
    stream: StreamKind,
    tx: mpsc::UnboundedSender<RunnerEvent>,
    limits: LineLimits,
    mut stop: watch::Receiver<bool>,
) -> StreamReport
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::with_capacity(256);
    let mut tail: VecDeque<String> = VecDeque::with_capacity(limits.tail_lines);
    let mut report = StreamReport::default();
    let max_line = limits.max_line_bytes.max(1) as u64;

    let mut emit = |raw: &[u8], report: &mut StreamReport| {
        let line = decode_line(raw);
        report.lines += 1;
        tracing::trace!(target: "scriptrun.runner", stream = stream.as_str(), line = %line);
        if limits.tail_lines > 0 {
            if tail.len() == limits.tail_lines {
                tail.pop_front();
            }
            tail.push_back(line.clone());
        }
        // Keep draining after the receiver is gone so the child never
        // blocks on a full pipe.
        let _ = tx.send(stream.event(line));
    };

    loop {
        buf.clear();
        let mut limited = (&mut reader).take(max_line);
        let read = tokio::select! {
            biased;
            true = stop_requested(&mut stop) => None,
            res = limited.read_until(b'\n', &mut buf) => Some(res),
        };

        match read {
            None => {
                if !buf.is_empty() {
                    emit(&buf, &mut report);
                }
                tracing::debug!(
                    target: "scriptrun.runner",
                    stream = stream.as_str(),
                    "stopped reading with the pipe still open"
                );
                break;
            }
            Some(Ok(0)) => break,
            Some(Ok(_)) => emit(&buf, &mut report),
            Some(Err(e)) => {
                let err = RunnerError::StreamRead {
                    stream: stream.as_str(),
                    message: e.to_string(),
                };
                tracing::warn!(
                    target: "scriptrun.runner",
                    stream = stream.as_str(),
                    error = %e,
                    "stream read failed"
                );
                let _ = tx.send(RunnerEvent::Error(err.to_string()));
                report.error = Some(err);
                break;
            }
        }
    }

    report.tail = tail.into_iter().collect();
    report
}
