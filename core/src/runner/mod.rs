mod events;
pub mod exit;
mod observer;
pub mod resolve;
mod run;
mod tee;
mod types;

pub use events::{RunnerEvent, StreamKind};
pub use observer::{RunObserver, RunTranscript};
pub use resolve::Invocation;
pub use run::{Canceller, ProcessRunner, RunHandle};
pub use types::{RunOutcome, RunRequest, RunState};
