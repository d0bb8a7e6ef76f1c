mod defaults;
mod types;

pub use defaults::TCIA_IMAGE_URL;
pub use types::*;

use crate::error::ConfigError;
use defaults::*;
use std::path::Path;
use std::time::Duration;

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            njobs: default_njobs(),
            timeout_sec: default_timeout_sec(),
            verify_zip_metadata: true,
            skip_existing: true,
            progress: true,
            honor_manifest_retries: true,
            retry: RetryPolicy::default(),
        }
    }
}

impl Config {
    /// Load config from a YAML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Load from `path` when given, otherwise use defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_sec)
    }

    /// Validate the config
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.njobs == 0 {
            return Err(ConfigError::InvalidJobs);
        }

        if !self.retry.multiplier.is_finite() || self.retry.multiplier < 1.0 {
            return Err(ConfigError::InvalidRetry(format!(
                "multiplier must be >= 1.0, got {}",
                self.retry.multiplier
            )));
        }

        reqwest::Url::parse(&self.server_url)
            .map_err(|e| ConfigError::InvalidServerUrl(format!("{}: {}", self.server_url, e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server_url, TCIA_IMAGE_URL);
        assert_eq!(config.njobs, 5);
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.retry.max_attempts(), 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let yaml = "njobs: 8\nretry:\n  max_retries: 5\n  backoff: exponential\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.njobs, 8);
        assert_eq!(config.retry.max_retries, 5);
        assert_eq!(config.retry.backoff, Backoff::Exponential);
        assert_eq!(config.retry.delay_ms, 1000);
        assert!(!config.retry.stop_on_permanent);
        assert!(config.verify_zip_metadata);
    }

    #[test]
    fn test_serialized_config_has_only_live_keys() {
        let yaml = serde_yaml::to_string(&Config::default()).unwrap();
        assert!(!yaml.contains("version"));
        assert!(yaml.contains("stop_on_permanent: false"));
    }

    #[test]
    fn test_validate_rejects_zero_jobs() {
        let config = Config {
            njobs: 0,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidJobs)));
    }

    #[test]
    fn test_validate_rejects_bad_url() {
        let config = Config {
            server_url: "not a url".to_string(),
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidServerUrl(_))
        ));
    }

    #[test]
    fn test_fixed_delay() {
        let policy = RetryPolicy {
            delay_ms: 250,
            ..RetryPolicy::default()
        };
        assert_eq!(policy.delay_for(1), Duration::from_millis(250));
        assert_eq!(policy.delay_for(5), Duration::from_millis(250));
    }

    #[test]
    fn test_exponential_delay_is_capped() {
        let policy = RetryPolicy {
            delay_ms: 100,
            backoff: Backoff::Exponential,
            multiplier: 2.0,
            max_delay_ms: 500,
            ..RetryPolicy::default()
        };
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(400));
        assert_eq!(policy.delay_for(4), Duration::from_millis(500));
        assert_eq!(policy.delay_for(60), Duration::from_millis(500));
    }

    #[test]
    fn test_backoff_from_str() {
        assert_eq!("Exponential".parse::<Backoff>().unwrap(), Backoff::Exponential);
        assert_eq!("fixed".parse::<Backoff>().unwrap(), Backoff::Fixed);
        assert!("linear".parse::<Backoff>().is_err());
    }
}
