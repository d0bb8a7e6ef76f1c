use crate::config::RetryPolicy;
use crate::fetch::Fetcher;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::retry::{retry_with_backoff, RetryError};
use super::{FetchOutcome, WorkItem, CANCELLED};

/// Drive one series to a terminal outcome.
///
/// Touches nothing but the fetcher and the clock, so any worker can call it
/// without coordination.
pub async fn attempt_download(
    item: &WorkItem,
    fetcher: &dyn Fetcher,
    policy: &RetryPolicy,
    cancel: &CancellationToken,
) -> FetchOutcome {
    let start = Instant::now();

    debug!(
        "Fetching series {} via {} -> {}",
        item.series_id,
        fetcher.name(),
        item.destination.display()
    );

    let retried = retry_with_backoff(policy, cancel, move || {
        fetcher.fetch(&item.source_url, &item.destination)
    })
    .await;

    match retried.result {
        Ok(()) => {
            debug!(
                "Series {} done after {} attempt(s) in {:?}",
                item.series_id,
                retried.attempts,
                start.elapsed()
            );
            FetchOutcome::success(&item.series_id, retried.attempts, start.elapsed())
        }
        Err(RetryError::GaveUp(e)) => {
            warn!(
                "Failed to download series {} after {} attempt(s): {}",
                item.series_id, retried.attempts, e
            );
            FetchOutcome::failed(&item.series_id, retried.attempts, e.to_string(), start.elapsed())
        }
        Err(RetryError::Cancelled) => {
            debug!("Series {} abandoned: cancelled", item.series_id);
            FetchOutcome::failed(&item.series_id, retried.attempts, CANCELLED, start.elapsed())
        }
    }
}
