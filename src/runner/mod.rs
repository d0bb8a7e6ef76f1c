mod executor;
mod orchestrator;
mod progress;
mod retry;

pub use executor::attempt_download;
pub use orchestrator::{
    BatchSummary, FailedItem, FetchOutcome, FetchStatus, Orchestrator, WorkItem, CANCELLED,
};
pub use progress::{NoProgress, ProgressSink};
pub use retry::{retry_with_backoff, RetryError, Retried};
