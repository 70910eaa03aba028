//! Client configuration via `fireman.toml`
//!
//! One explicit value selects the backend, its credentials and the retry
//! policy. It is handed to [`Client::from_config`](crate::Client::from_config)
//! instead of being stored in global state.

use fireman_concurrency::RetryConfig;
use fireman_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Conventional config file name
pub const CONFIG_FILE_NAME: &str = "fireman.toml";

/// Which backend the client talks to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// In-memory emulation, optionally loaded from a JSON file
    #[default]
    Local,
    /// The hosted REST service
    Remote,
}

/// Client configuration loaded from `fireman.toml`.
///
/// # Example
///
/// ```toml
/// backend = "remote"
/// app_name = "my-app"
/// api_key = "secret"
/// timeout_ms = 10000
///
/// [retry]
/// max_retries = 3
/// base_delay_ms = 2000
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// `"local"` (default) or `"remote"`
    #[serde(default)]
    pub backend: BackendKind,
    /// JSON file backing the local database
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_file: Option<PathBuf>,
    /// Remote application name (`<app_name>.firebaseio.com`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,
    /// Remote database secret or token, sent as `auth`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Remote request timeout in milliseconds (default: 10000)
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Retry policy; defaults depend on the backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetryConfig>,
}

fn default_timeout_ms() -> u64 {
    10_000
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Local,
            db_file: None,
            app_name: None,
            api_key: None,
            timeout_ms: default_timeout_ms(),
            retry: None,
        }
    }
}

impl ClientConfig {
    /// Local backend loaded from `db_file`
    pub fn local(db_file: impl Into<PathBuf>) -> Self {
        Self {
            db_file: Some(db_file.into()),
            ..Self::default()
        }
    }

    /// Remote backend for `app_name` authenticated with `api_key`
    pub fn remote(app_name: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            backend: BackendKind::Remote,
            app_name: Some(app_name.into()),
            api_key: Some(api_key.into()),
            ..Self::default()
        }
    }

    /// Override the retry policy
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = Some(retry);
        self
    }

    /// Effective retry policy.
    ///
    /// Local operations cannot fail transiently, so they default to no
    /// retries; remote ones default to [`RetryConfig::default`].
    pub fn retry_policy(&self) -> RetryConfig {
        self.retry.unwrap_or(match self.backend {
            BackendKind::Local => RetryConfig::no_retry(),
            BackendKind::Remote => RetryConfig::default(),
        })
    }

    /// Remote request timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Check that the selected backend has what it needs.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` when a remote config lacks `app_name` or
    /// `api_key`.
    pub fn validate(&self) -> Result<()> {
        if self.backend == BackendKind::Remote {
            if self.app_name.as_deref().map_or(true, str::is_empty) {
                return Err(Error::Config("remote backend requires app_name".to_string()));
            }
            if self.api_key.as_deref().map_or(true, str::is_empty) {
                return Err(Error::Config("remote backend requires api_key".to_string()));
            }
        }
        Ok(())
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# Fireman client configuration
#
# Backend: "local" (default) or "remote"
#   "local"  = in-memory database, loaded from db_file when set
#   "remote" = hosted REST service at https://<app_name>.firebaseio.com
backend = "local"

# db_file = "database.json"

# app_name = "my-app"
# api_key = "database-secret"
# timeout_ms = 10000

# Retry policy for failed requests (remote default: 3 retries from 2000ms).
# [retry]
# max_retries = 3
# base_delay_ms = 2000
"#
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config: ClientConfig = toml::from_str(&content).map_err(|e| {
            Error::Config(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Write the default config file if it does not already exist.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                Error::Config(format!(
                    "Failed to write default config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            Error::Config(format!(
                "Failed to write config file '{}': {}",
                path.display(),
                e
            ))
        })
    }
}
