//! Error and retry-policy types for the trigger domain.
//!
//! [`TriggerError`] is the single error type surfaced by the [`crate::Triggers`]
//! facade. Port implementations report their own failures through
//! [`ApiError`], [`RealtimeError`] and [`SessionError`]; only [`ApiError`] is
//! rewritten (into a [`NormalizedError`]) before it reaches the caller.
//!
//! [`RetryPolicy`] lets callers decide whether a failed remote operation is
//! worth re-issuing. The facade itself never retries.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Retry semantics
// ---------------------------------------------------------------------------

/// Whether an error condition is safe to retry and, if so, after what delay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RetryPolicy {
    /// The operation may be retried.
    Retryable {
        /// Minimum back-off before the next attempt, derived from the
        /// `Retry-After` response header when the platform sent one.
        after: Option<Duration>,
    },
    /// Retrying without changing the request will fail the same way.
    NonRetryable,
}

// ---------------------------------------------------------------------------
// Raw port failures
// ---------------------------------------------------------------------------

/// A failure reported by a [`crate::TriggersApi`] implementation.
///
/// These are transport-shaped and never reach facade callers directly; the
/// [`crate::ErrorNormalizer`] turns them into a [`NormalizedError`].
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ApiError {
    /// The request never produced a response (DNS, TLS, connection reset).
    #[error("Network error: {message}")]
    Network { message: String },

    /// The request or the response exceeded the configured timeout.
    #[error("Request timed out: {message}")]
    Timeout { message: String },

    /// The platform answered with a non-2xx status.
    #[error("Platform returned HTTP {status}")]
    Status {
        status: u16,
        /// Raw response body, kept for normalization.
        body: String,
        retry_after: Option<Duration>,
    },

    /// The response body could not be decoded into the expected shape.
    #[error("Could not decode platform response: {message}")]
    Decode { message: String },

    /// The platform answered 2xx but omitted a body the operation requires.
    #[error("Platform response for '{operation}' had no body")]
    MissingBody { operation: String },

    /// The request could not be built (e.g. an unusable base URL).
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },
}

/// A failure establishing or using the realtime channel.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RealtimeError {
    #[error("Could not connect to realtime feed at {url}: {message}")]
    Connect { url: String, message: String },

    /// An operation required an open channel but none exists.
    #[error("Realtime feed is not connected")]
    NotConnected,

    #[error("Realtime feed send failed: {message}")]
    Send { message: String },
}

/// A failure obtaining session details (client identifier, credentials).
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SessionError {
    #[error("Could not resolve client id: {message}")]
    ClientId { message: String },
}

// ---------------------------------------------------------------------------
// Normalized errors
// ---------------------------------------------------------------------------

/// Stable classification of a remote failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    Timeout,
    RateLimited,
    ServerError,
    ServiceUnavailable,
    NoConnection,
    InvalidResponse,
    Unknown,
}

impl ErrorCode {
    /// Returns the wire/log representation, e.g. `"BACKEND.NOT_FOUND"`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BadRequest => "BACKEND.BAD_REQUEST",
            Self::Unauthorized => "BACKEND.UNAUTHORIZED",
            Self::Forbidden => "BACKEND.FORBIDDEN",
            Self::NotFound => "BACKEND.NOT_FOUND",
            Self::Timeout => "SDK.TIMEOUT",
            Self::RateLimited => "BACKEND.RATE_LIMIT",
            Self::ServerError => "BACKEND.SERVER_ERROR",
            Self::ServiceUnavailable => "BACKEND.SERVICE_UNAVAILABLE",
            Self::NoConnection => "SDK.NO_CONNECTION",
            Self::InvalidResponse => "SDK.INVALID_RESPONSE",
            Self::Unknown => "BACKEND.UNKNOWN",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Uniform representation of any remote failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedError {
    pub code: ErrorCode,
    /// Short, stable summary for the code.
    pub message: String,
    /// Detail for this occurrence; the platform's own message when it sent one.
    pub description: String,
    pub possible_fix: String,
    /// HTTP status, when the failure came from a platform response.
    pub status: Option<u16>,
    /// Correlation id, logged alongside the error.
    pub error_id: Uuid,
    /// Back-off suggested by the platform, if any.
    pub retry_after: Option<Duration>,
}

impl NormalizedError {
    /// Returns whether the failed request may be retried unchanged.
    pub fn retry_policy(&self) -> RetryPolicy {
        match self.code {
            ErrorCode::Timeout
            | ErrorCode::RateLimited
            | ErrorCode::ServiceUnavailable
            | ErrorCode::NoConnection => RetryPolicy::Retryable {
                after: self.retry_after,
            },
            _ => RetryPolicy::NonRetryable,
        }
    }
}

impl std::fmt::Display for NormalizedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}: {}", self.code, self.message, self.description)
    }
}

impl std::error::Error for NormalizedError {}

// ---------------------------------------------------------------------------
// Facade errors
// ---------------------------------------------------------------------------

/// Errors returned by the [`crate::Triggers`] facade.
#[derive(Debug, Error)]
pub enum TriggerError {
    /// A caller-supplied argument was rejected locally, before any network call.
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// A remote API call failed. Always normalized.
    #[error(transparent)]
    Remote(#[from] NormalizedError),

    /// The realtime feed failed. Propagated unmodified.
    #[error(transparent)]
    Realtime(#[from] RealtimeError),

    /// The session provider failed. Propagated unmodified.
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl TriggerError {
    /// Creates an [`TriggerError::InvalidArgument`].
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Returns the normalized error if this is a remote failure.
    pub fn as_remote(&self) -> Option<&NormalizedError> {
        match self {
            Self::Remote(e) => Some(e),
            _ => None,
        }
    }
}
