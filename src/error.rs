use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TciaError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),

    #[error("Runner error: {0}")]
    Runner(#[from] RunnerError),

    #[error("Output error: {0}")]
    Output(#[from] OutputError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Job count must be at least 1")]
    InvalidJobs,

    #[error("Invalid retry policy: {0}")]
    InvalidRetry(String),

    #[error("Invalid server url: {0}")]
    InvalidServerUrl(String),
}

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("{0} does not exist or is not a file")]
    NotAFile(PathBuf),

    #[error("Failed to read manifest '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid value for '{key}': {value}")]
    InvalidValue { key: String, value: String },
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Server returned status {0}")]
    Status(u16),

    #[error("Invalid series: {0}")]
    InvalidContent(String),

    #[error("Incomplete transfer: received {received} of {expected} bytes")]
    Incomplete { received: u64, expected: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Classifies failures as transient or permanent. Only consulted when the
/// retry policy asks to stop early on permanent failures.
pub trait IsRetryable {
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for FetchError {
    fn is_retryable(&self) -> bool {
        match self {
            FetchError::Network(_) => true,
            FetchError::Status(code) => *code >= 500 || *code == 408 || *code == 429,
            FetchError::InvalidContent(_) => false,
            FetchError::Incomplete { .. } => true,
            FetchError::Io(_) => true,
        }
    }
}

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Job count must be at least 1")]
    InvalidJobs,
}

#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to create output directory '{path}': {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to copy manifest: {0}")]
    CopyManifest(std::io::Error),

    #[error("Failed to write summary: {0}")]
    WriteSummary(std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}
