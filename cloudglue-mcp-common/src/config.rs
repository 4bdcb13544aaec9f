//! Configuration module for loading CLI flags, environment variables and settings.

use crate::error::ConfigError;
use clap::Args;
use std::path::PathBuf;
use std::time::Duration;

/// Default Cloudglue REST endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.cloudglue.dev/v1";

/// Interval between job status checks.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 5000;

pub const API_KEY_VAR: &str = "CLOUDGLUE_API_KEY";
pub const BASE_URL_VAR: &str = "CLOUDGLUE_BASE_URL";
pub const WORKING_DIR_VAR: &str = "CLOUDGLUE_WORKING_DIR";
pub const POLL_INTERVAL_VAR: &str = "CLOUDGLUE_POLL_INTERVAL_MS";
pub const POLL_MAX_ATTEMPTS_VAR: &str = "CLOUDGLUE_POLL_MAX_ATTEMPTS";

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Cloudglue API key (required)
    pub api_key: String,
    /// REST base URL without a trailing slash
    pub base_url: String,
    /// Directory relative upload paths are resolved against
    pub working_dir: PathBuf,
    /// Sleep between job status checks
    pub poll_interval: Duration,
    /// Upper bound on status checks per job; `None` polls until the job settles
    pub poll_max_attempts: Option<u32>,
}

impl Config {
    /// Load configuration from environment variables and .env file.
    ///
    /// # Errors
    /// Returns `ConfigError::MissingEnvVar` if CLOUDGLUE_API_KEY is not set.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let poll_interval_ms = match std::env::var(POLL_INTERVAL_VAR) {
            Ok(raw) => Some(
                raw.parse()
                    .map_err(|_| ConfigError::invalid_value(POLL_INTERVAL_VAR, raw))?,
            ),
            Err(_) => None,
        };
        let poll_max_attempts = match std::env::var(POLL_MAX_ATTEMPTS_VAR) {
            Ok(raw) => Some(
                raw.parse()
                    .map_err(|_| ConfigError::invalid_value(POLL_MAX_ATTEMPTS_VAR, raw))?,
            ),
            Err(_) => None,
        };

        ConfigArgs {
            api_key: std::env::var(API_KEY_VAR).ok(),
            base_url: std::env::var(BASE_URL_VAR).ok(),
            working_dir: std::env::var(WORKING_DIR_VAR).ok().map(PathBuf::from),
            poll_interval_ms,
            poll_max_attempts,
        }
        .into_config()
    }
}

/// Command-line flags for the Cloudglue connection.
///
/// Each flag falls back to its `CLOUDGLUE_*` environment variable.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Cloudglue API key
    #[arg(long, env = API_KEY_VAR, hide_env_values = true)]
    pub api_key: Option<String>,

    /// Cloudglue API base URL
    #[arg(long, env = BASE_URL_VAR)]
    pub base_url: Option<String>,

    /// Working directory for resolving relative file paths
    #[arg(long, env = WORKING_DIR_VAR)]
    pub working_dir: Option<PathBuf>,

    /// Milliseconds between job status checks (default: 5000)
    #[arg(long, env = POLL_INTERVAL_VAR)]
    pub poll_interval_ms: Option<u64>,

    /// Maximum status checks per job before giving up (default: unbounded)
    #[arg(long, env = POLL_MAX_ATTEMPTS_VAR)]
    pub poll_max_attempts: Option<u32>,
}

impl ConfigArgs {
    /// Validate the flags and fill in defaults.
    pub fn into_config(self) -> Result<Config, ConfigError> {
        let api_key = self
            .api_key
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or_else(|| ConfigError::missing_env_var(API_KEY_VAR))?;

        let base_url = normalize_base_url(self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL))?;

        let working_dir = match self.working_dir {
            Some(dir) => dir,
            None => std::env::current_dir()
                .map_err(|e| ConfigError::invalid_value(WORKING_DIR_VAR, e.to_string()))?,
        };

        let poll_interval_ms = self.poll_interval_ms.unwrap_or(DEFAULT_POLL_INTERVAL_MS);
        if poll_interval_ms == 0 {
            return Err(ConfigError::invalid_value(POLL_INTERVAL_VAR, "must be greater than 0"));
        }
        if self.poll_max_attempts == Some(0) {
            return Err(ConfigError::invalid_value(POLL_MAX_ATTEMPTS_VAR, "must be greater than 0"));
        }

        Ok(Config {
            api_key,
            base_url,
            working_dir,
            poll_interval: Duration::from_millis(poll_interval_ms),
            poll_max_attempts: self.poll_max_attempts,
        })
    }
}

fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(ConfigError::invalid_value(
            BASE_URL_VAR,
            format!("'{}' must start with http:// or https://", raw),
        ));
    }
    Ok(trimmed.to_string())
}
