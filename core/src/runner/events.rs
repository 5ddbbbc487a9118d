use super::types::RunOutcome;

/// Events emitted by a started run.
///
/// Within one stream, events arrive in the order the child wrote them.
/// `Complete` is always the last event and is sent exactly once.
#[derive(Debug, Clone)]
pub enum RunnerEvent {
    Message(String),
    Error(String),
    Complete(RunOutcome),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

impl StreamKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StreamKind::Stdout => "stdout",
            StreamKind::Stderr => "stderr",
        }
    }

    pub(crate) fn event(self, line: String) -> RunnerEvent {
        match self {
            StreamKind::Stdout => RunnerEvent::Message(line),
            StreamKind::Stderr => RunnerEvent::Error(line),
        }
    }
}
