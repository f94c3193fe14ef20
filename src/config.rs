//! config
//!
//! Configuration schema and loading.
//!
//! # Locations
//!
//! Searched in order (first hit wins):
//! 1. `$FORGELINE_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/forgeline/config.toml`
//! 3. `~/.forgeline/config.toml`
//!
//! Missing files are not an error; defaults apply field by field, so a
//! config file may set any subset of keys.
//!
//! # Example
//!
//! ```toml
//! [http]
//! timeout_seconds = 30
//! curl_bin = "curl"
//!
//! [tools]
//! git_bin = "git"
//! gh_bin = "gh"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP transport settings.
    pub http: HttpConfig,

    /// External tool locations.
    pub tools: ToolsConfig,
}

/// Settings for the curl-backed HTTP transport.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct HttpConfig {
    /// Per-request timeout in seconds. Defaults to 30 when unset.
    pub timeout_seconds: Option<u64>,

    /// The curl binary to invoke. Defaults to `curl` from `PATH`.
    pub curl_bin: Option<String>,
}

/// Locations of the external tools the session shells out to.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ToolsConfig {
    /// The git binary. Defaults to `git` from `PATH`.
    pub git_bin: Option<String>,

    /// The gh binary. Defaults to `gh` from `PATH`.
    pub gh_bin: Option<String>,
}

impl Config {
    /// Load configuration from the standard locations.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be read or
    /// parsed, or contains an invalid value. A missing file yields
    /// defaults.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = std::env::var("FORGELINE_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Self::load_from(&path);
            }
        }

        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("forgeline/config.toml");
            if path.exists() {
                return Self::load_from(&path);
            }
        }

        if let Some(home) = dirs::home_dir() {
            let path = home.join(".forgeline/config.toml");
            if path.exists() {
                return Self::load_from(&path);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Config = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate loaded values.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(secs) = self.http.timeout_seconds {
            if secs == 0 {
                return Err(ConfigError::InvalidValue(
                    "http.timeout_seconds must be at least 1".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Per-request timeout with the default applied.
    pub fn timeout_seconds(&self) -> u64 {
        self.http
            .timeout_seconds
            .unwrap_or(crate::http::DEFAULT_TIMEOUT_SECS)
    }

    /// The curl binary with the default applied.
    pub fn curl_bin(&self) -> &str {
        self.http.curl_bin.as_deref().unwrap_or("curl")
    }

    /// The git binary with the default applied.
    pub fn git_bin(&self) -> &str {
        self.tools.git_bin.as_deref().unwrap_or("git")
    }

    /// The gh binary with the default applied.
    pub fn gh_bin(&self) -> &str {
        self.tools.gh_bin.as_deref().unwrap_or("gh")
    }
}
