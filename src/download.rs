use crate::config::{Config, RetryPolicy};
use crate::error::{ManifestError, OutputError, TciaError};
use crate::fetch::{Fetcher, HttpFetcher, TciaResolver};
use crate::manifest::Manifest;
use crate::output::{write_retry_manifest, write_summary};
use crate::runner::{BatchSummary, NoProgress, Orchestrator, ProgressSink, WorkItem};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub manifest_path: PathBuf,
    pub output_base: PathBuf,
    pub config: Config,
}

impl DownloadRequest {
    /// Sequential download with default settings
    pub fn new(manifest_path: impl Into<PathBuf>, output_base: impl Into<PathBuf>) -> Self {
        Self {
            manifest_path: manifest_path.into(),
            output_base: output_base.into(),
            config: Config {
                njobs: 1,
                ..Config::default()
            },
        }
    }

    pub fn njobs(mut self, njobs: usize) -> Self {
        self.config.njobs = njobs;
        self
    }
}

/// Everything resolved from a request, before anything touches the disk
#[derive(Debug, Clone)]
pub struct DownloadPlan {
    pub manifest_path: PathBuf,
    pub manifest: Manifest,
    pub manifest_name: String,
    /// `<output_base>/<manifest file name>`
    pub destination: PathBuf,
    pub items: Vec<WorkItem>,
    pub policy: RetryPolicy,
    pub njobs: usize,
}

impl DownloadPlan {
    pub fn build(request: &DownloadRequest) -> Result<Self, TciaError> {
        let config = &request.config;
        config.validate()?;

        let manifest_path = request.manifest_path.clone();
        let manifest = Manifest::load(&manifest_path)?;
        let manifest_name = manifest_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| ManifestError::NotAFile(manifest_path.clone()))?;
        let destination = request.output_base.join(&manifest_name);

        let mut policy = config.retry.clone();
        if config.honor_manifest_retries {
            if let Some(retries) = manifest.retries()? {
                policy.max_retries = retries;
            }
        }

        let resolver = TciaResolver::new(config.server_url.clone(), destination.clone());
        let items: Vec<WorkItem> = {
            let mut seen = HashSet::new();
            manifest
                .series_ids()
                .iter()
                .inspect(|id| {
                    if !seen.insert(id.as_str()) {
                        warn!("Series {} is listed more than once", id);
                    }
                })
                .map(|id| WorkItem::resolve(id, &resolver))
                .collect()
        };

        Ok(Self {
            manifest_path,
            manifest,
            manifest_name,
            destination,
            items,
            policy,
            njobs: config.njobs,
        })
    }

    /// Create the destination folder and keep a copy of the manifest in it
    pub fn prepare_destination(&self) -> Result<(), OutputError> {
        fs::create_dir_all(&self.destination).map_err(|e| OutputError::CreateDir {
            path: self.destination.clone(),
            source: e,
        })?;

        let copy = self.destination.join(&self.manifest_name);
        if !same_file(&self.manifest_path, &copy) {
            fs::copy(&self.manifest_path, &copy).map_err(OutputError::CopyManifest)?;
        }
        Ok(())
    }

    pub async fn execute(
        &self,
        fetcher: Arc<dyn Fetcher>,
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<BatchSummary, TciaError> {
        let orchestrator = Orchestrator::new(fetcher, self.policy.clone(), self.njobs)?;
        self.prepare_destination()?;

        info!(
            "Downloading {} series to {}",
            self.items.len(),
            self.destination.display()
        );
        let summary = orchestrator
            .run(self.items.clone(), progress, cancel)
            .await;

        if let Err(e) = write_summary(&self.destination, &self.manifest_name, &summary) {
            warn!("Failed to write summary: {}", e);
        }
        match write_retry_manifest(&self.destination, &self.manifest, &summary) {
            Ok(Some(path)) => info!("Failed series listed in {}", path.display()),
            Ok(None) => {}
            Err(e) => warn!("Failed to write retry manifest: {}", e),
        }

        Ok(summary)
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Download every series in a manifest into `<output_base>/<manifest name>/`
/// using `njobs` concurrent connections.
pub async fn download_from_manifest(
    manifest_path: impl AsRef<Path>,
    output_base: impl AsRef<Path>,
    njobs: usize,
) -> Result<BatchSummary, TciaError> {
    let request = DownloadRequest::new(manifest_path.as_ref(), output_base.as_ref()).njobs(njobs);
    download_from_manifest_with(&request, &NoProgress, &CancellationToken::new()).await
}

pub async fn download_from_manifest_with(
    request: &DownloadRequest,
    progress: &dyn ProgressSink,
    cancel: &CancellationToken,
) -> Result<BatchSummary, TciaError> {
    let plan = DownloadPlan::build(request)?;
    let fetcher = Arc::new(HttpFetcher::from_config(&request.config)?);
    plan.execute(fetcher, progress, cancel).await
}
