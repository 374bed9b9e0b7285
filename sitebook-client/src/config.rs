//! Configuration loading for the Sitebook client.
//!
//! Only `api_base_url` is required; everything else has a working default.

use serde::Deserialize;
use sitebook_cache::RetryPolicy;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::http::{FileToken, NoToken, StaticToken, TokenSource};

/// Environment variable naming the config file when `--config` is absent.
pub const CONFIG_ENV_VAR: &str = "SITEBOOK_CONFIG";

const DEFAULT_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_COLLECT_INTERVAL_MS: u64 = 60_000;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    pub api_base_url: String,
    #[serde(default = "default_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Log every request's method, path, and site header at debug level.
    #[serde(default)]
    pub dev_mode: bool,
    #[serde(default)]
    pub auth: AuthConfig,
    /// Where the selected site is persisted. In-memory only when unset.
    #[serde(default)]
    pub selection_path: Option<PathBuf>,
    #[serde(default)]
    pub retry: RetryPolicy,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    pub token: Option<String>,
    /// File holding the token; re-read on every request.
    pub token_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    #[serde(default = "default_collect_interval_ms")]
    pub collect_interval_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            collect_interval_ms: DEFAULT_COLLECT_INTERVAL_MS,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// `EnvFilter` directives; `RUST_LOG` wins when set.
    pub filter: Option<String>,
    #[serde(default)]
    pub json: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing configuration file path (use --config or SITEBOOK_CONFIG)")]
    MissingConfigPath,
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

fn default_collect_interval_ms() -> u64 {
    DEFAULT_COLLECT_INTERVAL_MS
}

impl ClientConfig {
    /// Config with defaults for everything but the base URL.
    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            request_timeout_ms: DEFAULT_TIMEOUT_MS,
            dev_mode: false,
            auth: AuthConfig::default(),
            selection_path: None,
            retry: RetryPolicy::default(),
            cache: CacheConfig::default(),
            log: LogConfig::default(),
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.auth.token = Some(token.into());
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_selection_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.selection_path = Some(path.into());
        self
    }

    pub fn load() -> Result<Self, ConfigError> {
        let path = config_path_from_args().or_else(config_path_from_env);
        let path = path.ok_or(ConfigError::MissingConfigPath)?;
        Self::from_path(&path)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: ClientConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let base = self.api_base_url.trim();
        if base.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "api_base_url",
                reason: "must not be empty".to_string(),
            });
        }
        if !base.starts_with("http://") && !base.starts_with("https://") {
            return Err(ConfigError::InvalidValue {
                field: "api_base_url",
                reason: "must start with http:// or https://".to_string(),
            });
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "request_timeout_ms",
                reason: "must be > 0".to_string(),
            });
        }
        if self.auth.token.is_some() && self.auth.token_path.is_some() {
            return Err(ConfigError::InvalidValue {
                field: "auth",
                reason: "set token or token_path, not both".to_string(),
            });
        }
        if self.retry.base_delay.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "retry.base_delay_ms",
                reason: "must be > 0".to_string(),
            });
        }
        if self.retry.max_delay < self.retry.base_delay {
            return Err(ConfigError::InvalidValue {
                field: "retry.max_delay_ms",
                reason: "must be >= base_delay_ms".to_string(),
            });
        }
        if self.cache.collect_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "cache.collect_interval_ms",
                reason: "must be > 0".to_string(),
            });
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn collect_interval(&self) -> Duration {
        Duration::from_millis(self.cache.collect_interval_ms)
    }

    pub fn base_url(&self) -> &str {
        self.api_base_url.trim().trim_end_matches('/')
    }

    /// Where the bearer token comes from. No token is a valid configuration.
    pub fn token_source(&self) -> Arc<dyn TokenSource> {
        match (&self.auth.token, &self.auth.token_path) {
            (Some(token), _) => Arc::new(StaticToken::new(token.clone())),
            (None, Some(path)) => Arc::new(FileToken::new(path.clone())),
            (None, None) => Arc::new(NoToken),
        }
    }
}

fn config_path_from_env() -> Option<PathBuf> {
    std::env::var(CONFIG_ENV_VAR).ok().map(PathBuf::from)
}

fn config_path_from_args() -> Option<PathBuf> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            return args.next().map(PathBuf::from);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = ClientConfig::from_toml_str(r#"api_base_url = "https://api.example.com/""#).unwrap();
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.retry, RetryPolicy::default());
        assert_eq!(config.base_url(), "https://api.example.com");
        assert!(!config.dev_mode);
        assert!(config.selection_path.is_none());
    }

    #[test]
    fn test_full_config() {
        let config = ClientConfig::from_toml_str(
            r#"
api_base_url = "http://localhost:8080/api"
request_timeout_ms = 5000
dev_mode = true
selection_path = "/tmp/sitebook/selection.json"

[auth]
token = "abc"

[retry]
max_retries = 2
base_delay_ms = 250
max_delay_ms = 4000

[cache]
collect_interval_ms = 1000

[log]
filter = "sitebook_client=trace"
json = true
"#,
        )
        .unwrap();
        assert!(config.dev_mode);
        assert_eq!(config.retry.max_retries, 2);
        assert_eq!(config.retry.base_delay, Duration::from_millis(250));
        assert_eq!(config.collect_interval(), Duration::from_secs(1));
        assert!(config.log.json);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = ClientConfig::from_toml_str(
            r#"
api_base_url = "http://localhost"
tenant = "x"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_validation_names_field() {
        let mut config = ClientConfig::new("http://localhost");
        config.request_timeout_ms = 0;
        match config.validate() {
            Err(ConfigError::InvalidValue { field, .. }) => assert_eq!(field, "request_timeout_ms"),
            other => panic!("unexpected: {:?}", other),
        }

        let mut config = ClientConfig::new("http://localhost");
        config.retry.max_delay = Duration::from_millis(10);
        match config.validate() {
            Err(ConfigError::InvalidValue { field, .. }) => assert_eq!(field, "retry.max_delay_ms"),
            other => panic!("unexpected: {:?}", other),
        }

        assert!(ClientConfig::new("  ").validate().is_err());
        assert!(ClientConfig::new("ftp://host").validate().is_err());
    }

    #[test]
    fn test_token_and_token_path_are_exclusive() {
        let mut config = ClientConfig::new("http://localhost").with_token("t");
        config.auth.token_path = Some(PathBuf::from("/tmp/token"));
        assert!(config.validate().is_err());
    }
}
