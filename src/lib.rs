//! Parallel, retrying downloader for TCIA image series manifests.
//!
//! ```no_run
//! # async fn example() -> Result<(), tcia_fetch::error::TciaError> {
//! let summary = tcia_fetch::download_from_manifest("cohort.tcia", "downloads", 4).await?;
//! for series in summary.failed_ids() {
//!     eprintln!("failed: {}", series);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
mod download;
pub mod error;
pub mod fetch;
pub mod manifest;
pub mod output;
pub mod runner;

pub use download::{
    download_from_manifest, download_from_manifest_with, DownloadPlan, DownloadRequest,
};
pub use runner::{BatchSummary, FetchOutcome, FetchStatus, WorkItem};
