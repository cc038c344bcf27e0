//! Shared HTTP plumbing: retrying client construction, endpoint URLs,
//! authentication and response decoding.

use std::time::Duration;

use reqwest::{header::RETRY_AFTER, Method, Response};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware, RequestBuilder};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::debug;
use triggers::{ApiError, ApiResponse};
use url::Url;

use crate::{ClientConfig, ConfigError, HttpRetryConfig};

/// Header carrying the platform API key on every request.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Creates a retryable HTTP client with middleware
///
/// Transient failures (connection errors, timeouts, 408, 429 and 5xx
/// responses) are retried with exponential back-off per `config`.
pub fn create_retryable_http_client(
    config: &HttpRetryConfig,
    base_client: reqwest::Client,
) -> ClientWithMiddleware {
    let retry_policy = ExponentialBackoff::builder()
        .base(config.base_for_backoff)
        .retry_bounds(config.initial_backoff, config.max_backoff)
        .jitter(config.jitter)
        .build_with_max_retries(config.max_retries);

    ClientBuilder::new(base_client)
        .with(RetryTransientMiddleware::new_with_policy(retry_policy))
        .build()
}

/// An authenticated client bound to one platform base URL.
///
/// Idempotent requests go through the retrying client. `POST` and `PATCH`
/// are sent exactly once, since a retry after a lost response could apply
/// them twice.
///
/// Shared by [`crate::HttpTriggersApi`] and [`crate::BackendSession`].
#[derive(Debug)]
pub struct PlatformClient {
    http: ClientWithMiddleware,
    http_once: ClientWithMiddleware,
    base_url: Url,
    api_key: SecretString,
}

impl PlatformClient {
    pub fn new(config: ClientConfig) -> Result<Self, ConfigError> {
        let base_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        let http_once = ClientBuilder::new(base_client.clone()).build();
        let http = create_retryable_http_client(&config.retry, base_client);

        Ok(Self {
            http,
            http_once,
            base_url: config.base_url,
            api_key: config.api_key,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn api_key(&self) -> &SecretString {
        &self.api_key
    }

    /// Builds `base_url/<segments...>`, percent-encoding each segment.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidRequest {
                message: format!("base URL '{}' cannot carry a path", self.base_url),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Starts an authenticated request to the given endpoint.
    ///
    /// Only idempotent methods are retried on transient failures.
    pub fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder, ApiError> {
        let url = self.endpoint(segments)?;
        let client = if method.is_idempotent() {
            &self.http
        } else {
            &self.http_once
        };
        Ok(client
            .request(method, url)
            .header(API_KEY_HEADER, self.api_key.expose_secret()))
    }

    /// Sends `request` and decodes a 2xx body into `T`.
    ///
    /// Empty 2xx bodies produce [`ApiResponse::empty`]; non-2xx statuses are
    /// returned as [`ApiError::Status`] with the raw body preserved.
    pub async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<ApiResponse<T>, ApiError> {
        let response = request.send().await.map_err(transport_error)?;
        decode_response(response).await
    }
}

async fn decode_response<T: DeserializeOwned>(
    response: Response,
) -> Result<ApiResponse<T>, ApiError> {
    let status = response.status();
    let retry_after = retry_after(&response);
    let body = response.text().await.map_err(reqwest_error)?;

    if !status.is_success() {
        debug!(status = status.as_u16(), "Platform returned an error status");
        return Err(ApiError::Status {
            status: status.as_u16(),
            body,
            retry_after,
        });
    }

    if body.trim().is_empty() {
        return Ok(ApiResponse::empty(status.as_u16()));
    }

    let data = serde_json::from_str(&body).map_err(|e| ApiError::Decode {
        message: e.to_string(),
    })?;
    Ok(ApiResponse::with_data(status.as_u16(), data))
}

/// Reads a `Retry-After` header given in whole seconds.
fn retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

fn reqwest_error(error: reqwest::Error) -> ApiError {
    if error.is_timeout() {
        ApiError::Timeout {
            message: error.to_string(),
        }
    } else if error.is_decode() {
        ApiError::Decode {
            message: error.to_string(),
        }
    } else {
        ApiError::Network {
            message: error.to_string(),
        }
    }
}

fn transport_error(error: reqwest_middleware::Error) -> ApiError {
    match error {
        reqwest_middleware::Error::Reqwest(e) => reqwest_error(e),
        reqwest_middleware::Error::Middleware(e) => ApiError::Network {
            message: e.to_string(),
        },
    }
}
