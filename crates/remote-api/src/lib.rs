//! Platform REST adapter.
//!
//! Implements the [`triggers::TriggersApi`] and [`triggers::SessionProvider`]
//! ports over the platform's HTTP API using `reqwest`.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** URL construction, authentication headers, retry and
//! timeout policy, and response decoding all live here. The [`triggers`]
//! crate sees only the port traits and [`triggers::ApiError`].
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use remote_api::{BackendSession, ClientConfig, HttpTriggersApi, PlatformClient};
//!
//! let config = ClientConfig::new("my-api-key")?;
//! let platform = Arc::new(PlatformClient::new(config)?);
//! let api = HttpTriggersApi::new(platform.clone());
//! let session = BackendSession::new(platform);
//! # Ok::<(), remote_api::ConfigError>(())
//! ```

pub mod config;
pub mod http;
pub mod session;
pub mod triggers_api;

pub use config::{ClientConfig, ConfigError, HttpRetryConfig, API_KEY_ENV, BASE_URL_ENV};
pub use http::{create_retryable_http_client, PlatformClient, API_KEY_HEADER};
pub use session::BackendSession;
pub use triggers_api::HttpTriggersApi;
