//! [`TriggersApi`] over the platform's REST endpoints.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use tracing::instrument;
use triggers::{
    ApiError, ApiResponse, ConnectedAccountId, EnableTriggerRequest, ListTriggersQuery,
    SetupResponse, SwitchStatusRequest, TriggerConfig, TriggerDefinition, TriggerInstanceId,
    TriggerName, TriggersApi,
};

use crate::PlatformClient;

/// HTTP implementation of [`TriggersApi`].
///
/// | Operation | Request |
/// |-----------|---------|
/// | list | `GET /api/v1/triggers?appNames=a,b` |
/// | enable | `POST /api/v1/triggers/enable/{connectedAccountId}/{triggerName}` |
/// | switch status | `PATCH /api/v1/triggers/instance/{triggerId}/status` |
/// | delete | `DELETE /api/v1/triggers/instance/{triggerInstanceId}` |
#[derive(Debug, Clone)]
pub struct HttpTriggersApi {
    platform: Arc<PlatformClient>,
}

impl HttpTriggersApi {
    pub fn new(platform: Arc<PlatformClient>) -> Self {
        Self { platform }
    }
}

#[async_trait]
impl TriggersApi for HttpTriggersApi {
    #[instrument(skip_all, fields(app_names = ?query.app_names))]
    async fn list_triggers(
        &self,
        query: &ListTriggersQuery,
    ) -> Result<ApiResponse<Vec<TriggerDefinition>>, ApiError> {
        let mut request = self
            .platform
            .request(Method::GET, &["api", "v1", "triggers"])?;

        if let Some(app_names) = &query.app_names {
            request = request.query(&[("appNames", app_names.join(","))]);
        }

        self.platform.send(request).await
    }

    #[instrument(skip_all, fields(account = %account, trigger = %trigger_name))]
    async fn enable_trigger(
        &self,
        account: &ConnectedAccountId,
        trigger_name: &TriggerName,
        config: &TriggerConfig,
    ) -> Result<ApiResponse<SetupResponse>, ApiError> {
        let body = EnableTriggerRequest {
            trigger_config: config.clone(),
        };
        let request = self
            .platform
            .request(
                Method::POST,
                &[
                    "api",
                    "v1",
                    "triggers",
                    "enable",
                    account.as_str(),
                    trigger_name.as_str(),
                ],
            )?
            .json(&body);

        self.platform.send(request).await
    }

    #[instrument(skip_all, fields(trigger_id = %trigger_id, enabled = enabled))]
    async fn switch_trigger_instance_status(
        &self,
        trigger_id: &TriggerInstanceId,
        enabled: bool,
    ) -> Result<ApiResponse<Value>, ApiError> {
        let request = self
            .platform
            .request(
                Method::PATCH,
                &["api", "v1", "triggers", "instance", trigger_id.as_str(), "status"],
            )?
            .json(&SwitchStatusRequest { enabled });

        self.platform.send(request).await
    }

    #[instrument(skip_all, fields(trigger_instance_id = %trigger_instance_id))]
    async fn delete_trigger(
        &self,
        trigger_instance_id: &TriggerInstanceId,
    ) -> Result<ApiResponse<Value>, ApiError> {
        let request = self.platform.request(
            Method::DELETE,
            &["api", "v1", "triggers", "instance", trigger_instance_id.as_str()],
        )?;

        self.platform.send(request).await
    }
}
