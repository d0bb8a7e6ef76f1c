use crate::config::RetryPolicy;
use crate::error::RunnerError;
use crate::fetch::{Fetcher, Resolver};
use futures::stream::{FuturesUnordered, StreamExt};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::executor::attempt_download;
use super::progress::ProgressSink;

/// Failure cause recorded for series abandoned because the run was cancelled
pub const CANCELLED: &str = "cancelled";

const WORKER_LOST: &str = "worker stopped before reporting";

/// One series to download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub series_id: String,
    pub source_url: String,
    pub destination: PathBuf,
}

impl WorkItem {
    pub fn resolve(series_id: &str, resolver: &dyn Resolver) -> Self {
        let resolved = resolver.resolve(series_id);
        Self {
            series_id: series_id.to_string(),
            source_url: resolved.source_url,
            destination: resolved.destination,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchStatus {
    Success,
    Failed,
}

impl std::fmt::Display for FetchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchStatus::Success => write!(f, "success"),
            FetchStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Terminal result of one series
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub series_id: String,
    pub status: FetchStatus,
    pub attempts: u32,
    pub last_error: Option<String>,
    pub duration: Duration,
}

impl FetchOutcome {
    pub fn success(series_id: &str, attempts: u32, duration: Duration) -> Self {
        Self {
            series_id: series_id.to_string(),
            status: FetchStatus::Success,
            attempts,
            last_error: None,
            duration,
        }
    }

    pub fn failed(
        series_id: &str,
        attempts: u32,
        error: impl Into<String>,
        duration: Duration,
    ) -> Self {
        Self {
            series_id: series_id.to_string(),
            status: FetchStatus::Failed,
            attempts,
            last_error: Some(error.into()),
            duration,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == FetchStatus::Success
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedItem {
    pub series_id: String,
    pub attempts: u32,
    pub error: String,
}

/// Aggregate over a whole batch; `succeeded + failed == total`
#[derive(Debug, Clone)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// In manifest order
    pub failed_items: Vec<FailedItem>,
    pub cancelled: bool,
    pub duration: Duration,
}

impl BatchSummary {
    pub fn empty() -> Self {
        Self {
            total: 0,
            succeeded: 0,
            failed: 0,
            failed_items: Vec::new(),
            cancelled: false,
            duration: Duration::ZERO,
        }
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    pub fn failed_ids(&self) -> impl Iterator<Item = &str> {
        self.failed_items.iter().map(|f| f.series_id.as_str())
    }
}

/// Single owner of the aggregate; every outcome passes through `record`
struct Collector {
    total: usize,
    succeeded: usize,
    failed: Vec<(usize, FailedItem)>,
    pending: HashMap<usize, String>,
}

impl Collector {
    fn new(items: &[WorkItem]) -> Self {
        Self {
            total: items.len(),
            succeeded: 0,
            failed: Vec::new(),
            pending: items
                .iter()
                .enumerate()
                .map(|(slot, item)| (slot, item.series_id.clone()))
                .collect(),
        }
    }

    /// Returns false for a slot that already has an outcome
    fn record(&mut self, slot: usize, outcome: &FetchOutcome) -> bool {
        if self.pending.remove(&slot).is_none() {
            warn!(
                "Ignoring duplicate outcome for series {}",
                outcome.series_id
            );
            return false;
        }

        match outcome.status {
            FetchStatus::Success => self.succeeded += 1,
            FetchStatus::Failed => self.failed.push((
                slot,
                FailedItem {
                    series_id: outcome.series_id.clone(),
                    attempts: outcome.attempts,
                    error: outcome
                        .last_error
                        .clone()
                        .unwrap_or_else(|| "unknown error".to_string()),
                },
            )),
        }
        true
    }

    /// Outcomes for slots nobody reported, so no series is dropped
    fn unreported(&self, cause: &str) -> Vec<(usize, FetchOutcome)> {
        let mut slots: Vec<_> = self.pending.iter().collect();
        slots.sort_by_key(|(slot, _)| **slot);
        slots
            .into_iter()
            .map(|(slot, series_id)| {
                (*slot, FetchOutcome::failed(series_id, 0, cause, Duration::ZERO))
            })
            .collect()
    }

    fn finish(mut self, cancelled: bool, duration: Duration) -> BatchSummary {
        self.failed.sort_by_key(|(slot, _)| *slot);
        let failed_items: Vec<FailedItem> = self.failed.into_iter().map(|(_, f)| f).collect();

        BatchSummary {
            total: self.total,
            succeeded: self.succeeded,
            failed: failed_items.len(),
            failed_items,
            cancelled,
            duration,
        }
    }
}

type Queue = Arc<Mutex<VecDeque<(usize, WorkItem)>>>;

/// Runs every work item through the retrying fetcher on a fixed pool of
/// `njobs` workers.
pub struct Orchestrator {
    fetcher: Arc<dyn Fetcher>,
    policy: RetryPolicy,
    njobs: usize,
}

impl Orchestrator {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        policy: RetryPolicy,
        njobs: usize,
    ) -> Result<Self, RunnerError> {
        if njobs == 0 {
            return Err(RunnerError::InvalidJobs);
        }
        Ok(Self {
            fetcher,
            policy,
            njobs,
        })
    }

    pub async fn run(
        &self,
        items: Vec<WorkItem>,
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> BatchSummary {
        let start = Instant::now();
        let mut collector = Collector::new(&items);
        progress.start(items.len());

        if items.is_empty() {
            let summary = BatchSummary::empty();
            progress.finish(&summary);
            return summary;
        }

        let workers = self.njobs.min(items.len());
        info!(
            "Downloading {} series with {} worker(s)",
            items.len(),
            workers
        );

        let queue: Queue = Arc::new(Mutex::new(items.into_iter().enumerate().collect()));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let mut handles = FuturesUnordered::new();
        for worker in 0..workers {
            let queue = queue.clone();
            let outcomes = tx.clone();
            let fetcher = self.fetcher.clone();
            let policy = self.policy.clone();
            let cancel = cancel.clone();

            handles.push(tokio::spawn(async move {
                run_worker(worker, queue, fetcher, policy, cancel, outcomes).await
            }));
        }
        // Channel closes once the last worker exits
        drop(tx);

        while let Some((slot, outcome)) = rx.recv().await {
            if collector.record(slot, &outcome) {
                progress.advance(&outcome);
            }
        }

        while let Some(joined) = handles.next().await {
            if let Err(e) = joined {
                warn!("Worker task panicked: {}", e);
            }
        }

        let cancelled = cancel.is_cancelled();
        let cause = if cancelled { CANCELLED } else { WORKER_LOST };
        for (slot, outcome) in collector.unreported(cause) {
            collector.record(slot, &outcome);
            progress.advance(&outcome);
        }

        let summary = collector.finish(cancelled, start.elapsed());
        info!(
            "Finished {} series: {} succeeded, {} failed in {:.1}s",
            summary.total,
            summary.succeeded,
            summary.failed,
            summary.duration.as_secs_f64()
        );
        progress.finish(&summary);
        summary
    }
}

async fn run_worker(
    worker: usize,
    queue: Queue,
    fetcher: Arc<dyn Fetcher>,
    policy: RetryPolicy,
    cancel: CancellationToken,
    outcomes: mpsc::UnboundedSender<(usize, FetchOutcome)>,
) {
    loop {
        if cancel.is_cancelled() {
            debug!(worker, "Cancelled, no longer claiming work");
            break;
        }

        let next = queue.lock().await.pop_front();
        let Some((slot, item)) = next else {
            break;
        };

        let outcome = attempt_download(&item, fetcher.as_ref(), &policy, &cancel).await;
        if outcomes.send((slot, outcome)).is_err() {
            break;
        }
    }
    debug!(worker, "Worker exiting");
}
