use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::defaults::*;

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct Config {
    /// Endpoint queried with `SeriesInstanceUID=<id>`
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// Number of series downloaded concurrently
    #[serde(default = "default_njobs")]
    pub njobs: usize,

    /// Per-request timeout
    #[serde(default = "default_timeout_sec")]
    pub timeout_sec: u64,

    /// Reject responses whose `metadata` header does not announce a ZIP
    #[serde(default = "default_true")]
    pub verify_zip_metadata: bool,

    /// Treat an existing destination file as already downloaded
    #[serde(default = "default_true")]
    pub skip_existing: bool,

    #[serde(default = "default_true")]
    pub progress: bool,

    /// Let a manifest's `noOfrRetry` override `retry.max_retries`
    #[serde(default = "default_true")]
    pub honor_manifest_retries: bool,

    #[serde(default)]
    pub retry: RetryPolicy,
}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct RetryPolicy {
    /// Retries after the first attempt; a series gets `max_retries + 1` tries
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,

    #[serde(default)]
    pub backoff: Backoff,

    /// Growth factor for exponential backoff
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Add up to `delay_ms` of random delay to each wait
    #[serde(default)]
    pub jitter: bool,

    /// Give up at once on failures classified as permanent (client errors,
    /// non-ZIP payloads) instead of spending the remaining attempts
    #[serde(default)]
    pub stop_on_permanent: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            delay_ms: default_delay_ms(),
            backoff: Backoff::default(),
            multiplier: default_multiplier(),
            max_delay_ms: default_max_delay_ms(),
            jitter: false,
            stop_on_permanent: false,
        }
    }
}

impl RetryPolicy {
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Wait before retry number `retry` (1-based), without jitter
    pub fn delay_for(&self, retry: u32) -> Duration {
        let base = self.delay_ms;
        let ms = match self.backoff {
            Backoff::Fixed => base,
            Backoff::Exponential => {
                let exp = retry.saturating_sub(1).min(63) as i32;
                let scaled = base as f64 * self.multiplier.powi(exp);
                if scaled.is_finite() {
                    (scaled as u64).min(self.max_delay_ms.max(base))
                } else {
                    self.max_delay_ms.max(base)
                }
            }
        };
        Duration::from_millis(ms)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Backoff {
    #[default]
    Fixed,
    Exponential,
}

impl std::fmt::Display for Backoff {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backoff::Fixed => write!(f, "fixed"),
            Backoff::Exponential => write!(f, "exponential"),
        }
    }
}

impl std::str::FromStr for Backoff {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fixed" | "constant" => Ok(Backoff::Fixed),
            "exponential" | "exp" => Ok(Backoff::Exponential),
            _ => Err(format!("Unknown backoff: {}", s)),
        }
    }
}
