//! [`SessionProvider`] backed by the platform's client-info endpoint.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use secrecy::SecretString;
use serde::Deserialize;
use tokio::sync::OnceCell;
use tracing::{debug, instrument};
use triggers::{ClientId, SessionError, SessionProvider};

use crate::PlatformClient;

#[derive(Debug, Deserialize)]
struct ClientInfoResponse {
    client: ClientInfo,
}

#[derive(Debug, Deserialize)]
struct ClientInfo {
    id: String,
}

/// Session details for one API key.
///
/// The client id is fetched from `GET /api/v1/client/auth/client_info` on
/// first use and cached for the lifetime of the session.
#[derive(Debug)]
pub struct BackendSession {
    platform: Arc<PlatformClient>,
    base_url: String,
    client_id: OnceCell<ClientId>,
}

impl BackendSession {
    pub fn new(platform: Arc<PlatformClient>) -> Self {
        let base_url = platform.base_url().as_str().trim_end_matches('/').to_string();
        Self {
            platform,
            base_url,
            client_id: OnceCell::new(),
        }
    }

    #[instrument(skip_all)]
    async fn fetch_client_id(&self) -> Result<ClientId, SessionError> {
        let to_session_error = |message: String| SessionError::ClientId { message };

        let request = self
            .platform
            .request(Method::GET, &["api", "v1", "client", "auth", "client_info"])
            .map_err(|e| to_session_error(e.to_string()))?;
        let response = self
            .platform
            .send::<ClientInfoResponse>(request)
            .await
            .map_err(|e| to_session_error(e.to_string()))?;

        let info = response
            .data
            .ok_or_else(|| to_session_error("client info response had no body".to_string()))?;
        let client_id = ClientId::new(info.client.id)
            .ok_or_else(|| to_session_error("client info response had an empty id".to_string()))?;

        debug!(client_id = %client_id, "Resolved client id");
        Ok(client_id)
    }
}

#[async_trait]
impl SessionProvider for BackendSession {
    async fn client_id(&self) -> Result<ClientId, SessionError> {
        self.client_id
            .get_or_try_init(|| self.fetch_client_id())
            .await
            .cloned()
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn api_key(&self) -> &SecretString {
        self.platform.api_key()
    }
}
