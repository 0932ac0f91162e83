//! Client configuration parsing, validation, and environment overrides.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::{AppError, Result};

/// Environment variable that overrides [`ClientConfig::api_base`].
pub const API_BASE_ENV: &str = "MEETING_TASKS_API_BASE";

/// Inclusive bounds for the retrieval depth `k`.
pub const K_RANGE: std::ops::RangeInclusive<u32> = 1..=10;

/// HTTP timeout values (seconds).
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct TimeoutConfig {
    /// TCP/TLS connect timeout.
    #[serde(default = "default_connect_seconds")]
    pub connect_seconds: u64,
    /// Whole-request timeout for non-streaming calls.
    ///
    /// Extraction streams are not bounded by this value.
    #[serde(default = "default_request_seconds")]
    pub request_seconds: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_seconds: default_connect_seconds(),
            request_seconds: default_request_seconds(),
        }
    }
}

impl TimeoutConfig {
    /// Connect timeout as a [`Duration`].
    #[must_use]
    pub fn connect(&self) -> Duration {
        Duration::from_secs(self.connect_seconds)
    }

    /// Request timeout as a [`Duration`].
    #[must_use]
    pub fn request(&self) -> Duration {
        Duration::from_secs(self.request_seconds)
    }
}

fn default_connect_seconds() -> u64 {
    10
}

fn default_request_seconds() -> u64 {
    60
}

fn default_api_base() -> String {
    "http://127.0.0.1:8000".into()
}

fn default_k() -> u32 {
    5
}

fn default_recent_store() -> PathBuf {
    PathBuf::from(".meeting-tasks").join("recent.json")
}

fn default_presets() -> Vec<String> {
    [
        "action items",
        "decisions",
        "follow-ups blockers",
        "risks",
        "bugs & regressions",
    ]
    .into_iter()
    .map(str::to_owned)
    .collect()
}

/// Client configuration parsed from `config.toml`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ClientConfig {
    /// Backend base URL (no trailing slash required).
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Default retrieval depth sent as `k`.
    #[serde(default = "default_k")]
    pub default_k: u32,
    /// File holding the persisted recency lists.
    #[serde(default = "default_recent_store")]
    pub recent_store: PathBuf,
    /// Preset queries used by multi-query runs.
    #[serde(default = "default_presets")]
    pub presets: Vec<String>,
    /// HTTP timeouts.
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    /// Assignee hint to tracker username mapping forwarded on create.
    #[serde(default)]
    pub assignees: HashMap<String, String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            default_k: default_k(),
            recent_store: default_recent_store(),
            presets: default_presets(),
            timeouts: TimeoutConfig::default(),
            assignees: HashMap::new(),
        }
    }
}

impl ClientConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string and validate it.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `MEETING_TASKS_API_BASE` on top of the parsed values.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the overridden value fails validation.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(base) = env::var(API_BASE_ENV) {
            if !base.trim().is_empty() {
                debug!(api_base = %base, "api_base overridden from environment");
                self.api_base = base;
            }
        }
        self.validate()
    }

    /// Validate cross-field constraints and normalize the base URL.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` describing the first violated constraint.
    pub fn validate(&mut self) -> Result<()> {
        let url = reqwest::Url::parse(self.api_base.trim())
            .map_err(|err| AppError::Config(format!("api_base invalid: {err}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(AppError::Config(format!(
                "api_base must use http or https, got {}",
                url.scheme()
            )));
        }
        self.api_base = self.api_base.trim().trim_end_matches('/').to_owned();

        if !K_RANGE.contains(&self.default_k) {
            return Err(AppError::Config(format!(
                "default_k must be between {} and {}",
                K_RANGE.start(),
                K_RANGE.end()
            )));
        }

        if self.presets.iter().all(|p| p.trim().is_empty()) {
            return Err(AppError::Config("presets must not be empty".into()));
        }

        Ok(())
    }
}
