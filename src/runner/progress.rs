use super::{BatchSummary, FetchOutcome};

/// Receives one event per finished series, for display only
pub trait ProgressSink: Send + Sync {
    fn start(&self, _total: usize) {}

    fn advance(&self, outcome: &FetchOutcome);

    fn finish(&self, _summary: &BatchSummary) {}
}

/// Discards progress events
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn advance(&self, _outcome: &FetchOutcome) {}
}
