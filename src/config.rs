//! Tap configuration
//!
//! Settings are read from a JSON file or an inline JSON string:
//!
//! ```json
//! {
//!   "api_id": "...",
//!   "api_token": "...",
//!   "start_date": "2024-01-01T00:00:00Z",
//!   "interval_hours": 24
//! }
//! ```
//!
//! Engine knobs (`max_concurrency`, `result_ceiling`, ...) have defaults and
//! are rarely set by hand.

use crate::auth::AuthConfig;
use crate::error::{Error, Result};
use crate::http::{HttpClientConfig, RateLimiterConfig};
use crate::types::OptionStringExt;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Default Aircall API root
pub const DEFAULT_API_URL: &str = "https://api.aircall.io";

/// Aircall stops returning results past this many per query
pub const DEFAULT_RESULT_CEILING: usize = 10_000;

/// Aircall's maximum page size
pub const DEFAULT_PER_PAGE: u32 = 50;

/// Settings for one tap run
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct TapConfig {
    /// Basic auth user (Aircall API ID)
    #[serde(default)]
    pub api_id: Option<String>,

    /// Basic auth password (Aircall API token)
    #[serde(default)]
    pub api_token: Option<String>,

    /// Bearer token; wins over the Basic pair when set
    #[serde(default)]
    pub auth_token: Option<String>,

    /// Earliest timestamp to replicate; absent means unwindowed fetches
    #[serde(default)]
    pub start_date: Option<String>,

    /// Window width for windowed streams
    #[serde(default)]
    pub interval_hours: Option<f64>,

    /// API root
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Concurrent windows or child contexts
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Records per (stream, context, window) before the unit is truncated
    #[serde(default = "default_result_ceiling")]
    pub result_ceiling: usize,

    /// Page size sent with every request
    #[serde(default = "default_per_page")]
    pub per_page: u32,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Transport retries before a fetch fails
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Request budget per minute
    #[serde(default = "default_rate_limit")]
    pub rate_limit_per_minute: u32,

    /// Custom user agent
    #[serde(default)]
    pub user_agent: Option<String>,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_max_concurrency() -> usize {
    1
}

fn default_result_ceiling() -> usize {
    DEFAULT_RESULT_CEILING
}

fn default_per_page() -> u32 {
    DEFAULT_PER_PAGE
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_rate_limit() -> u32 {
    60
}

impl Default for TapConfig {
    fn default() -> Self {
        Self {
            api_id: None,
            api_token: None,
            auth_token: None,
            start_date: None,
            interval_hours: None,
            api_url: default_api_url(),
            max_concurrency: default_max_concurrency(),
            result_ceiling: default_result_ceiling(),
            per_page: default_per_page(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            rate_limit_per_minute: default_rate_limit(),
            user_agent: None,
        }
    }
}

impl TapConfig {
    /// Load config, inline JSON taking precedence over the file
    pub fn load(path: Option<&Path>, inline: Option<&str>) -> Result<Self> {
        if let Some(json) = inline {
            return Self::from_json(json);
        }
        match path {
            Some(path) => Self::from_file(path),
            None => Err(Error::config(
                "No config given (use --config or --config-json)",
            )),
        }
    }

    /// Read and validate a config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            Error::config(format!("Failed to read config file {}: {e}", path.display()))
        })?;
        Self::from_json(&content)
    }

    /// Parse and validate a JSON config
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| Error::config(format!("Invalid config JSON: {e}")))?;
        let config = config.normalized();
        config.validate()?;
        Ok(config)
    }

    /// Blank strings count as unset
    fn normalized(mut self) -> Self {
        self.api_id = self.api_id.none_if_empty();
        self.api_token = self.api_token.none_if_empty();
        self.auth_token = self.auth_token.none_if_empty();
        self.start_date = self.start_date.none_if_empty();
        self.user_agent = self.user_agent.none_if_empty();
        self
    }

    /// Check required fields and value ranges
    pub fn validate(&self) -> Result<()> {
        let parsed = url::Url::parse(&self.api_url)?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::invalid_value(
                "api_url",
                format!("unsupported scheme '{}'", parsed.scheme()),
            ));
        }

        if self.auth_token.is_none() {
            if self.api_id.is_none() {
                return Err(Error::missing_field("api_id"));
            }
            if self.api_token.is_none() {
                return Err(Error::missing_field("api_token"));
            }
        }

        if self.max_concurrency == 0 {
            return Err(Error::invalid_value("max_concurrency", "must be at least 1"));
        }
        if self.result_ceiling == 0 {
            return Err(Error::invalid_value("result_ceiling", "must be at least 1"));
        }
        if self.per_page == 0 {
            return Err(Error::invalid_value("per_page", "must be at least 1"));
        }

        Ok(())
    }

    /// Credentials for the HTTP client
    pub fn auth_config(&self) -> AuthConfig {
        AuthConfig::from_credentials(
            self.api_id.as_deref(),
            self.api_token.as_deref(),
            self.auth_token.as_deref(),
        )
    }

    /// HTTP client settings
    pub fn http_config(&self) -> HttpClientConfig {
        let mut builder = HttpClientConfig::builder()
            .base_url(&self.api_url)
            .timeout(Duration::from_secs(self.timeout_secs))
            .max_retries(self.max_retries);

        builder = if self.rate_limit_per_minute == 0 {
            builder.no_rate_limit()
        } else {
            builder.rate_limit(RateLimiterConfig::per_minute(self.rate_limit_per_minute))
        };

        if let Some(agent) = &self.user_agent {
            builder = builder.user_agent(agent);
        }

        builder.build()
    }
}

impl fmt::Debug for TapConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "***");
        f.debug_struct("TapConfig")
            .field("api_id", &self.api_id)
            .field("api_token", &redact(&self.api_token))
            .field("auth_token", &redact(&self.auth_token))
            .field("start_date", &self.start_date)
            .field("interval_hours", &self.interval_hours)
            .field("api_url", &self.api_url)
            .field("max_concurrency", &self.max_concurrency)
            .field("result_ceiling", &self.result_ceiling)
            .field("per_page", &self.per_page)
            .finish_non_exhaustive()
    }
}
