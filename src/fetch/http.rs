use super::Fetcher;
use crate::config::Config;
use crate::error::FetchError;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::HeaderMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

const METADATA_HEADER: &str = "metadata";

/// Streams series archives over HTTP.
///
/// Bodies are written to `<destination>.part` and renamed into place only
/// after the full body arrived, so a failed or abandoned attempt never leaves
/// a file at `destination`.
pub struct HttpFetcher {
    client: reqwest::Client,
    verify_zip_metadata: bool,
    skip_existing: bool,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("tcia-fetch/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            verify_zip_metadata: true,
            skip_existing: true,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, FetchError> {
        Ok(Self::new(config.timeout())?
            .verify_zip_metadata(config.verify_zip_metadata)
            .skip_existing(config.skip_existing))
    }

    pub fn verify_zip_metadata(mut self, verify: bool) -> Self {
        self.verify_zip_metadata = verify;
        self
    }

    pub fn skip_existing(mut self, skip: bool) -> Self {
        self.skip_existing = skip;
        self
    }

    async fn download(&self, source_url: &str, part: &Path) -> Result<(), FetchError> {
        let response = self.client.get(source_url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        if self.verify_zip_metadata {
            check_zip_metadata(response.headers())?;
        }

        let expected = response.content_length();
        let mut file = fs::File::create(part).await?;
        let mut received: u64 = 0;
        let mut body = response.bytes_stream();

        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            received += chunk.len() as u64;
        }

        file.flush().await?;
        file.sync_all().await?;

        if let Some(expected) = expected {
            if received < expected {
                return Err(FetchError::Incomplete { received, expected });
            }
        }

        debug!("Received {} bytes into {}", received, part.display());
        Ok(())
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn fetch(&self, source_url: &str, destination: &Path) -> Result<(), FetchError> {
        if self.skip_existing && fs::try_exists(destination).await.unwrap_or(false) {
            debug!("{} already exists, skipping", destination.display());
            return Ok(());
        }

        if let Some(parent) = destination.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        // Also covers the future being dropped mid-transfer on cancellation
        let part = PartFile::new(part_path(destination));
        self.download(source_url, part.path()).await?;
        fs::rename(part.path(), destination).await?;
        part.keep();
        Ok(())
    }
}

/// Removes the temporary file when dropped, unless it was renamed into place
struct PartFile {
    path: PathBuf,
    armed: bool,
}

impl PartFile {
    fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn keep(mut self) {
        self.armed = false;
    }
}

impl Drop for PartFile {
    fn drop(&mut self) {
        if self.armed {
            if let Err(e) = std::fs::remove_file(&self.path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    debug!("Could not remove {}: {}", self.path.display(), e);
                }
            }
        }
    }
}

fn part_path(destination: &Path) -> PathBuf {
    let mut name = destination.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

/// TCIA announces the payload type as `{"Result": {"Type": ["ZIP"]}}`
fn check_zip_metadata(headers: &HeaderMap) -> Result<(), FetchError> {
    let raw = headers
        .get(METADATA_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("{}");

    let metadata: serde_json::Value = serde_json::from_str(raw)
        .map_err(|e| FetchError::InvalidContent(format!("unreadable metadata header: {}", e)))?;

    let filetype = metadata
        .pointer("/Result/Type/0")
        .and_then(|v| v.as_str())
        .unwrap_or("");

    if filetype != "ZIP" {
        return Err(FetchError::InvalidContent(format!(
            "expected a ZIP file, server reported '{}'",
            filetype
        )));
    }

    Ok(())
}
