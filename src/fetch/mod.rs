mod http;
mod resolver;

pub use http::HttpFetcher;
pub use resolver::TciaResolver;

use crate::error::FetchError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Where a series comes from and where it lands
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub source_url: String,
    pub destination: PathBuf,
}

pub trait Resolver: Send + Sync {
    fn resolve(&self, series_id: &str) -> Resolved;
}

/// Fetch one URL into one destination file.
///
/// Implementations must leave `destination` either complete or untouched;
/// an `Err` means nothing at `destination` can be trusted.
#[async_trait]
pub trait Fetcher: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch(&self, source_url: &str, destination: &Path) -> Result<(), FetchError>;
}
