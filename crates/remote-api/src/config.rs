//! Connection settings for the platform REST API.

use std::time::Duration;

use reqwest_retry::Jitter;
use secrecy::SecretString;
use thiserror::Error;
use url::Url;

/// Environment variable the CLI reads the platform API key from.
pub const API_KEY_ENV: &str = "TRIGGERS_API_KEY";

/// Environment variable the CLI reads to override
/// [`ClientConfig::DEFAULT_BASE_URL`].
pub const BASE_URL_ENV: &str = "TRIGGERS_BASE_URL";

/// Errors raised while building a [`ClientConfig`] or the HTTP client from it.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("API key is missing; set {API_KEY_ENV} or pass one explicitly")]
    MissingApiKey,

    #[error("Invalid base URL '{url}': {message}")]
    InvalidBaseUrl { url: String, message: String },

    #[error("Could not build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Configuration for HTTP retry policies
#[derive(Debug, Clone)]
pub struct HttpRetryConfig {
    /// Maximum number of retries for transient errors
    pub max_retries: u32,
    /// Base duration for exponential backoff calculations
    pub base_for_backoff: u32,
    /// Initial backoff duration before the first retry
    pub initial_backoff: Duration,
    /// Maximum backoff duration for retries
    pub max_backoff: Duration,
    /// Jitter to apply to the backoff duration
    pub jitter: Jitter,
}

impl Default for HttpRetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_for_backoff: 2,
            initial_backoff: Duration::from_millis(250),
            max_backoff: Duration::from_secs(10),
            jitter: Jitter::Full,
        }
    }
}

impl HttpRetryConfig {
    /// A policy that never retries.
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }
}

/// Everything needed to talk to the platform REST API.
#[derive(Debug)]
pub struct ClientConfig {
    pub base_url: Url,
    pub api_key: SecretString,
    /// Applied to each HTTP request, including reading the body.
    pub request_timeout: Duration,
    pub retry: HttpRetryConfig,
}

impl ClientConfig {
    pub const DEFAULT_BASE_URL: &'static str = "https://backend.composio.dev";
    pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

    /// Creates a configuration for the default base URL.
    pub fn new(api_key: impl Into<String>) -> Result<Self, ConfigError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey);
        }

        Ok(Self {
            base_url: parse_base_url(Self::DEFAULT_BASE_URL)?,
            api_key: SecretString::from(api_key),
            request_timeout: Self::DEFAULT_REQUEST_TIMEOUT,
            retry: HttpRetryConfig::default(),
        })
    }

    pub fn with_base_url(mut self, url: &str) -> Result<Self, ConfigError> {
        self.base_url = parse_base_url(url)?;
        Ok(self)
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: HttpRetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

fn parse_base_url(url: &str) -> Result<Url, ConfigError> {
    let parsed = Url::parse(url.trim()).map_err(|e| ConfigError::InvalidBaseUrl {
        url: url.to_string(),
        message: e.to_string(),
    })?;

    if parsed.cannot_be_a_base() || !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidBaseUrl {
            url: url.to_string(),
            message: "expected an http(s) URL".to_string(),
        });
    }

    Ok(parsed)
}
