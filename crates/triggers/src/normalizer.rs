//! Translation of raw [`ApiError`]s into [`NormalizedError`]s.

use serde_json::Value;
use uuid::Uuid;

use crate::{ApiError, ErrorCode, NormalizedError};

/// Converts every transport-level failure into a [`NormalizedError`].
///
/// Implementations must be total: every input yields an error, nothing is
/// swallowed or turned into a success value.
pub trait ErrorNormalizer: Send + Sync {
    fn normalize(&self, error: ApiError) -> NormalizedError;
}

/// Default normalizer: classifies by HTTP status or transport failure kind and
/// lifts the platform's own message out of JSON error bodies.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardErrorNormalizer;

impl StandardErrorNormalizer {
    fn code_for_status(status: u16) -> ErrorCode {
        match status {
            400 => ErrorCode::BadRequest,
            401 => ErrorCode::Unauthorized,
            403 => ErrorCode::Forbidden,
            404 => ErrorCode::NotFound,
            408 => ErrorCode::Timeout,
            429 => ErrorCode::RateLimited,
            500 => ErrorCode::ServerError,
            502..=504 => ErrorCode::ServiceUnavailable,
            _ => ErrorCode::Unknown,
        }
    }

    fn summary(code: ErrorCode) -> (&'static str, &'static str) {
        match code {
            ErrorCode::BadRequest => (
                "The request was rejected by the platform",
                "Check the trigger name and configuration against the trigger's config schema.",
            ),
            ErrorCode::Unauthorized => (
                "The API key was not accepted",
                "Verify the API key is set and has not been revoked.",
            ),
            ErrorCode::Forbidden => (
                "The API key is not allowed to perform this operation",
                "Check that the connected account belongs to this client.",
            ),
            ErrorCode::NotFound => (
                "The requested resource does not exist",
                "Check the connected account id, trigger name or trigger instance id.",
            ),
            ErrorCode::Timeout => (
                "The request timed out",
                "Retry the request; increase the request timeout if it keeps failing.",
            ),
            ErrorCode::RateLimited => (
                "Too many requests",
                "Wait before retrying; honour the suggested back-off when present.",
            ),
            ErrorCode::ServerError => (
                "The platform failed to process the request",
                "Retry later; report the error id if the failure persists.",
            ),
            ErrorCode::ServiceUnavailable => (
                "The platform is temporarily unavailable",
                "Retry later.",
            ),
            ErrorCode::NoConnection => (
                "Could not reach the platform",
                "Check network connectivity and the configured base URL.",
            ),
            ErrorCode::InvalidResponse => (
                "The platform response was not in the expected shape",
                "Check that the client and platform API versions are compatible.",
            ),
            ErrorCode::Unknown => (
                "The platform returned an unexpected status",
                "Retry later; report the error id if the failure persists.",
            ),
        }
    }

    /// Extracts the platform's message from a JSON error body, falling back to
    /// the raw body text.
    fn describe_body(body: &str) -> Option<String> {
        let trimmed = body.trim();
        if trimmed.is_empty() {
            return None;
        }

        let from_json = serde_json::from_str::<Value>(trimmed).ok().and_then(|v| {
            ["message", "error"]
                .iter()
                .find_map(|key| v.get(key).and_then(Value::as_str).map(str::to_string))
        });

        Some(from_json.unwrap_or_else(|| trimmed.to_string()))
    }
}

impl ErrorNormalizer for StandardErrorNormalizer {
    fn normalize(&self, error: ApiError) -> NormalizedError {
        let (code, status, description, retry_after) = match &error {
            ApiError::Status {
                status,
                body,
                retry_after,
            } => (
                Self::code_for_status(*status),
                Some(*status),
                Self::describe_body(body),
                *retry_after,
            ),
            ApiError::Network { .. } => (ErrorCode::NoConnection, None, None, None),
            ApiError::Timeout { .. } => (ErrorCode::Timeout, None, None, None),
            ApiError::Decode { .. } | ApiError::MissingBody { .. } => {
                (ErrorCode::InvalidResponse, None, None, None)
            }
            ApiError::InvalidRequest { .. } => (ErrorCode::BadRequest, None, None, None),
        };

        let (message, possible_fix) = Self::summary(code);

        NormalizedError {
            code,
            message: message.to_string(),
            description: description.unwrap_or_else(|| error.to_string()),
            possible_fix: possible_fix.to_string(),
            status,
            error_id: Uuid::new_v4(),
            retry_after,
        }
    }
}
