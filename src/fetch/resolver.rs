use super::{Resolved, Resolver};
use std::path::PathBuf;

/// Resolves series against a TCIA-style `getImage` endpoint, one ZIP per series
#[derive(Debug, Clone)]
pub struct TciaResolver {
    pub server_url: String,
    pub destination_dir: PathBuf,
}

impl TciaResolver {
    pub fn new(server_url: impl Into<String>, destination_dir: impl Into<PathBuf>) -> Self {
        Self {
            server_url: server_url.into(),
            destination_dir: destination_dir.into(),
        }
    }
}

impl Resolver for TciaResolver {
    fn resolve(&self, series_id: &str) -> Resolved {
        let source_url = match reqwest::Url::parse_with_params(
            &self.server_url,
            &[("SeriesInstanceUID", series_id)],
        ) {
            Ok(url) => url.to_string(),
            // Unparseable base; let the fetch attempt report it
            Err(_) => format!("{}?SeriesInstanceUID={}", self.server_url, series_id),
        };

        Resolved {
            source_url,
            destination: self.destination_dir.join(format!("{}.zip", series_id)),
        }
    }
}
