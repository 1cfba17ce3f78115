use crate::error::ConfigError;
use log::{debug, info};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "https://api.github.com";
const CONFIG_FILE_NAME: &str = "gitwrapped.toml";

/// Engine settings. Every field may be omitted from the TOML file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub api_base_url: String,
    pub user_agent: String,
    /// Page size for every listing call; GitHub caps it at 100.
    pub per_page: u8,
    pub max_concurrent_repos: usize,
    pub request_timeout_secs: u64,
    /// Retries for 5xx responses.
    pub max_retries: u32,
    /// Polls after a 202 while GitHub computes repository statistics.
    pub stats_retries: u32,
    /// Wait between those polls.
    pub stats_retry_delay_ms: u64,
    /// Report an anonymous user instead of failing when `/user` fails.
    pub anonymous_identity_fallback: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            user_agent: concat!("gitwrapped/", env!("CARGO_PKG_VERSION")).to_string(),
            per_page: 100,
            max_concurrent_repos: 4,
            request_timeout_secs: 10,
            max_retries: 3,
            stats_retries: 6,
            stats_retry_delay_ms: 2000,
            anonymous_identity_fallback: false,
        }
    }
}

impl EngineConfig {
    /// Load configuration using the discovery order: explicit path, then
    /// `./gitwrapped.toml`, then the user config directory. Falls back to
    /// defaults when no file exists. Environment overrides are applied last.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match explicit {
            Some(path) => Self::load_from_file(path)?,
            None => match discover_config_file() {
                Some(path) => Self::load_from_file(&path)?,
                None => {
                    info!("No configuration file found, using defaults");
                    Self::default()
                }
            },
        };

        let config = config.with_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        debug!("Loading configuration from file: {}", path.display());
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Loaded configuration from: {}", path.display());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Apply `GITWRAPPED_API_URL` and `GITWRAPPED_CONCURRENCY` from `lookup`.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("GITWRAPPED_API_URL") {
            debug!("API base URL overridden from environment");
            self.api_base_url = url;
        }
        if let Some(raw) = lookup("GITWRAPPED_CONCURRENCY") {
            self.max_concurrent_repos = raw.trim().parse().map_err(|_| {
                ConfigError::Invalid(format!("GITWRAPPED_CONCURRENCY is not a number: {raw}"))
            })?;
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrent_repos == 0 {
            return Err(ConfigError::Invalid(
                "max_concurrent_repos must be at least 1".to_string(),
            ));
        }
        if !(1..=100).contains(&self.per_page) {
            return Err(ConfigError::Invalid(format!(
                "per_page must be between 1 and 100, got {}",
                self.per_page
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "request_timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.stats_retry_delay_ms > 60_000 {
            return Err(ConfigError::Invalid(format!(
                "stats_retry_delay_ms must be at most 60000, got {}",
                self.stats_retry_delay_ms
            )));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn stats_retry_delay(&self) -> Duration {
        Duration::from_millis(self.stats_retry_delay_ms)
    }

    /// Upper bound for one commit-activity call: every poll may use the full
    /// request timeout, plus the waits between polls.
    pub fn commit_activity_timeout(&self) -> Duration {
        let polls = self.stats_retries.saturating_add(1);
        self.request_timeout()
            .saturating_mul(polls)
            .saturating_add(self.stats_retry_delay().saturating_mul(self.stats_retries))
    }
}

fn discover_config_file() -> Option<PathBuf> {
    let mut candidates = vec![PathBuf::from(CONFIG_FILE_NAME)];
    if let Some(dir) = dirs::config_dir() {
        candidates.push(dir.join("gitwrapped").join("config.toml"));
    }

    candidates.into_iter().find(|path| {
        debug!("Looking for configuration at: {}", path.display());
        path.is_file()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = EngineConfig::from_toml("max_concurrent_repos = 8\n").unwrap();
        assert_eq!(config.max_concurrent_repos, 8);
        assert_eq!(config.per_page, 100);
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(EngineConfig::from_toml("concurrency = 8\n").is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("GITWRAPPED_API_URL", "http://localhost:9000"),
            ("GITWRAPPED_CONCURRENCY", "2"),
        ]
        .into_iter()
        .collect();

        let config = EngineConfig::default()
            .with_env_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.api_base_url, "http://localhost:9000");
        assert_eq!(config.max_concurrent_repos, 2);
    }

    #[test]
    fn test_bad_env_concurrency() {
        let result = EngineConfig::default().with_env_overrides(|key| {
            (key == "GITWRAPPED_CONCURRENCY").then(|| "many".to_string())
        });
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate() {
        assert!(EngineConfig::default().validate().is_ok());

        let zero_workers = EngineConfig {
            max_concurrent_repos: 0,
            ..EngineConfig::default()
        };
        assert!(zero_workers.validate().is_err());

        let huge_page = EngineConfig {
            per_page: 101,
            ..EngineConfig::default()
        };
        assert!(huge_page.validate().is_err());
    }

    #[test]
    fn test_stats_polling_outlasts_server_error_retries() {
        let config = EngineConfig::default();
        assert!(config.stats_retries > config.max_retries);
        assert_eq!(config.stats_retry_delay(), Duration::from_secs(2));
        // 7 polls of 10s plus 6 waits of 2s
        assert_eq!(config.commit_activity_timeout(), Duration::from_secs(82));
        assert!(config.commit_activity_timeout() > config.request_timeout());

        let config =
            EngineConfig::from_toml("stats_retries = 2\nstats_retry_delay_ms = 500\n").unwrap();
        assert_eq!(config.stats_retries, 2);
        assert_eq!(config.commit_activity_timeout(), Duration::from_secs(31));

        let slow = EngineConfig {
            stats_retry_delay_ms: 120_000,
            ..EngineConfig::default()
        };
        assert!(slow.validate().is_err());
    }

    #[test]
    fn test_load_from_missing_file() {
        let result = EngineConfig::load_from_file(Path::new("/nonexistent/gitwrapped.toml"));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }
}
