//! Terminal progress bar for a batch

use crate::runner::{BatchSummary, FetchOutcome, ProgressSink};
use indicatif::{ProgressBar, ProgressStyle};

const TEMPLATE: &str =
    "{msg}\n{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({eta})";

/// One tick per finished series, whatever its outcome
pub struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::default_bar()
                .template(TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        bar.set_message("Downloading");
        Self { bar }
    }

    /// Bar that draws nowhere; used when output is not a terminal
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }
}

impl Default for BarProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for BarProgress {
    fn start(&self, total: usize) {
        self.bar.set_length(total as u64);
    }

    fn advance(&self, outcome: &FetchOutcome) {
        self.bar
            .set_message(format!("{} {}", outcome.status, outcome.series_id));
        self.bar.inc(1);
    }

    fn finish(&self, summary: &BatchSummary) {
        self.bar.finish_with_message(format!(
            "Done: {} succeeded, {} failed",
            summary.succeeded, summary.failed
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_one_tick_per_outcome() {
        let progress = BarProgress::hidden();
        progress.start(3);

        progress.advance(&FetchOutcome::success("a", 1, Duration::ZERO));
        progress.advance(&FetchOutcome::failed("b", 4, "boom", Duration::ZERO));

        assert_eq!(progress.position(), 2);
    }
}
