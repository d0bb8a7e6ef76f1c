mod progress;
mod summary;

pub use progress::BarProgress;
pub use summary::{exit_code, write_retry_manifest, write_summary, SummaryReport, RETRY_MANIFEST};
