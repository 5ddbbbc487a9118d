use async_trait::async_trait;

use super::types::RunOutcome;

/// Callback contract for one run.
///
/// `on_message` receives stdout lines and `on_error` stderr lines, each in the
/// order the child wrote them. `on_complete` is called exactly once, last.
#[async_trait]
pub trait RunObserver: Send {
    async fn on_message(&mut self, line: &str);
    async fn on_error(&mut self, line: &str);
    async fn on_complete(&mut self, outcome: &RunOutcome);
}

/// Observer that keeps everything it is told.
#[derive(Debug, Clone, Default)]
pub struct RunTranscript {
    pub messages: Vec<String>,
    pub errors: Vec<String>,
    pub outcome: Option<RunOutcome>,
    pub completions: usize,
}

#[async_trait]
impl RunObserver for RunTranscript {
    async fn on_message(&mut self, line: &str) {
        self.messages.push(line.to_string());
    }

    async fn on_error(&mut self, line: &str) {
        self.errors.push(line.to_string());
    }

    async fn on_complete(&mut self, outcome: &RunOutcome) {
        self.completions += 1;
        self.outcome = Some(outcome.clone());
    }
}
