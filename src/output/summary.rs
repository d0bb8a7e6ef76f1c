use crate::error::OutputError;
use crate::manifest::Manifest;
use crate::runner::{BatchSummary, FailedItem};
use chrono::Utc;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const SUMMARY_FILE: &str = "summary.json";
pub const RETRY_MANIFEST: &str = "retry.tcia";

#[derive(Debug, Serialize)]
pub struct SummaryReport {
    pub timestamp: String,
    pub manifest: String,
    pub destination: PathBuf,
    pub duration_sec: f64,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub cancelled: bool,
    pub failed_items: Vec<FailedItem>,
    pub exit_code: i32,
}

/// 0 when every series arrived, 1 otherwise
pub fn exit_code(summary: &BatchSummary) -> i32 {
    if summary.is_success() {
        0
    } else {
        1
    }
}

pub fn build_summary(
    summary: &BatchSummary,
    manifest_name: &str,
    destination: &Path,
) -> SummaryReport {
    SummaryReport {
        timestamp: Utc::now().to_rfc3339(),
        manifest: manifest_name.to_string(),
        destination: destination.to_path_buf(),
        duration_sec: summary.duration.as_secs_f64(),
        total: summary.total,
        succeeded: summary.succeeded,
        failed: summary.failed,
        cancelled: summary.cancelled,
        failed_items: summary.failed_items.clone(),
        exit_code: exit_code(summary),
    }
}

/// Write `summary.json` into the destination folder
pub fn write_summary(
    destination: &Path,
    manifest_name: &str,
    summary: &BatchSummary,
) -> Result<PathBuf, OutputError> {
    fs::create_dir_all(destination).map_err(|e| OutputError::CreateDir {
        path: destination.to_path_buf(),
        source: e,
    })?;

    let report = build_summary(summary, manifest_name, destination);
    let path = destination.join(SUMMARY_FILE);
    let json = serde_json::to_string_pretty(&report)?;
    fs::write(&path, json).map_err(OutputError::WriteSummary)?;

    Ok(path)
}

/// Write a manifest listing only the failed series, for re-running.
///
/// Returns `None` (and removes any stale retry manifest) when nothing failed.
pub fn write_retry_manifest(
    destination: &Path,
    manifest: &Manifest,
    summary: &BatchSummary,
) -> Result<Option<PathBuf>, OutputError> {
    let path = destination.join(RETRY_MANIFEST);

    if summary.is_success() {
        if path.exists() {
            fs::remove_file(&path).map_err(OutputError::WriteSummary)?;
        }
        return Ok(None);
    }

    let retry = manifest.with_series(summary.failed_ids());
    fs::write(&path, retry.to_string()).map_err(OutputError::WriteSummary)?;
    Ok(Some(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn summary_with_failures() -> BatchSummary {
        BatchSummary {
            total: 3,
            succeeded: 1,
            failed: 2,
            failed_items: vec![
                FailedItem {
                    series_id: "1.1".to_string(),
                    attempts: 4,
                    error: "Server returned status 500".to_string(),
                },
                FailedItem {
                    series_id: "1.3".to_string(),
                    attempts: 0,
                    error: "cancelled".to_string(),
                },
            ],
            cancelled: true,
            duration: Duration::from_millis(1500),
        }
    }

    #[test]
    fn test_exit_code() {
        assert_eq!(exit_code(&BatchSummary::empty()), 0);
        assert_eq!(exit_code(&summary_with_failures()), 1);
    }

    #[test]
    fn test_write_summary_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_summary(dir.path(), "set.tcia", &summary_with_failures()).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(json["manifest"], "set.tcia");
        assert_eq!(json["total"], 3);
        assert_eq!(json["failed"], 2);
        assert_eq!(json["cancelled"], true);
        assert_eq!(json["exit_code"], 1);
        assert_eq!(json["failed_items"][1]["series_id"], "1.3");
    }

    #[test]
    fn test_retry_manifest_lists_failed_series() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = Manifest::parse("noOfrRetry=2\nListOfSeriesToDownload=\n1.1\n1.2\n1.3\n");

        let path = write_retry_manifest(dir.path(), &manifest, &summary_with_failures())
            .unwrap()
            .unwrap();

        let retry = Manifest::load(&path).unwrap();
        assert_eq!(retry.series_ids(), &["1.1".to_string(), "1.3".to_string()]);
        assert_eq!(retry.retries().unwrap(), Some(2));
    }

    #[test]
    fn test_clean_run_removes_stale_retry_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let stale = dir.path().join(RETRY_MANIFEST);
        fs::write(&stale, "ListOfSeriesToDownload=old\n").unwrap();

        let written =
            write_retry_manifest(dir.path(), &Manifest::default(), &BatchSummary::empty()).unwrap();

        assert!(written.is_none());
        assert!(!stale.exists());
    }
}
