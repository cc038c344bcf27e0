//! Realtime feed connection settings.

use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Environment variable the CLI reads to override the derived feed URL.
pub const FEED_URL_ENV: &str = "TRIGGERS_FEED_URL";

/// Path of the feed endpoint relative to the platform base URL.
pub const FEED_PATH: &str = "api/v1/client/feed";

/// Errors raised while resolving the feed URL.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FeedConfigError {
    #[error("Invalid feed URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },
}

/// Configuration for the WebSocket feed.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedConfig {
    /// Explicit feed URL. When `None` the URL is derived from the platform
    /// base URL passed to `connect`.
    pub url: Option<Url>,
    /// How long to wait for the WebSocket handshake.
    pub connect_timeout: Duration,
    /// Reconnect attempts after the socket drops, before the feed gives up
    /// and releases every registration.
    pub max_reconnect_attempts: u32,
    /// Delay before the first reconnect attempt; doubled on each further
    /// attempt up to [`FeedConfig::MAX_RECONNECT_BACKOFF`].
    pub reconnect_backoff: Duration,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: None,
            connect_timeout: Self::DEFAULT_CONNECT_TIMEOUT,
            max_reconnect_attempts: Self::DEFAULT_MAX_RECONNECT_ATTEMPTS,
            reconnect_backoff: Self::DEFAULT_RECONNECT_BACKOFF,
        }
    }
}

impl FeedConfig {
    pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
    pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 5;
    pub const DEFAULT_RECONNECT_BACKOFF: Duration = Duration::from_secs(1);
    pub const MAX_RECONNECT_BACKOFF: Duration = Duration::from_secs(30);

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_url(mut self, url: &str) -> Result<Self, FeedConfigError> {
        self.url = Some(parse_ws_url(url)?);
        Ok(self)
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_reconnect(mut self, max_attempts: u32, backoff: Duration) -> Self {
        self.max_reconnect_attempts = max_attempts;
        self.reconnect_backoff = backoff;
        self
    }

    /// Delay before reconnect attempt `attempt` (1-based).
    pub fn reconnect_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.reconnect_backoff
            .saturating_mul(factor)
            .min(Self::MAX_RECONNECT_BACKOFF)
    }

    /// Returns the URL to connect to for a platform at `base_url`.
    pub fn resolve_url(&self, base_url: &str) -> Result<Url, FeedConfigError> {
        match &self.url {
            Some(url) => Ok(url.clone()),
            None => feed_url_from_base(base_url),
        }
    }
}

/// Derives the feed URL from an HTTP(S) base URL.
///
/// `http` maps to `ws` and `https` to `wss`; any path on the base URL is kept
/// as a prefix of [`FEED_PATH`].
pub fn feed_url_from_base(base_url: &str) -> Result<Url, FeedConfigError> {
    let invalid = |message: &str| FeedConfigError::InvalidUrl {
        url: base_url.to_string(),
        message: message.to_string(),
    };

    let base = Url::parse(base_url.trim()).map_err(|e| invalid(&e.to_string()))?;
    let scheme = match base.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        _ => return Err(invalid("expected an http(s) or ws(s) URL")),
    };

    let path = format!("{}/{}", base.path().trim_end_matches('/'), FEED_PATH);
    let host = base.host_str().ok_or_else(|| invalid("URL has no host"))?;
    let authority = match base.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    };

    Url::parse(&format!("{scheme}://{authority}{path}")).map_err(|e| invalid(&e.to_string()))
}

fn parse_ws_url(url: &str) -> Result<Url, FeedConfigError> {
    let parsed = Url::parse(url.trim()).map_err(|e| FeedConfigError::InvalidUrl {
        url: url.to_string(),
        message: e.to_string(),
    })?;

    if !matches!(parsed.scheme(), "ws" | "wss") {
        return Err(FeedConfigError::InvalidUrl {
            url: url.to_string(),
            message: "expected a ws(s) URL".to_string(),
        });
    }

    Ok(parsed)
}
