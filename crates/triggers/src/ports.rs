//! Port traits implemented by infrastructure crates.
//!
//! The [`crate::Triggers`] facade depends only on these traits. `remote-api`
//! implements [`TriggersApi`] and [`SessionProvider`] over HTTP; `listener`
//! implements [`RealtimeFeed`] over a WebSocket.

use async_trait::async_trait;
use secrecy::SecretString;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::{
    ApiError, ApiResponse, ClientId, ConnectedAccountId, ListTriggersQuery, RealtimeError,
    SessionError, SetupResponse, TriggerConfig, TriggerDefinition, TriggerEvent,
    TriggerInstanceId, TriggerName,
};

/// Sending half of a subscription's event channel.
///
/// A [`RealtimeFeed`] holds one sink per client id and pushes every event for
/// that client into it. Dropping the sink ends the subscription.
pub type EventSink = mpsc::UnboundedSender<TriggerEvent>;

/// Authenticated access to the platform's trigger endpoints.
#[async_trait]
pub trait TriggersApi: Send + Sync {
    /// Lists trigger definitions, optionally restricted by `query`.
    async fn list_triggers(
        &self,
        query: &ListTriggersQuery,
    ) -> Result<ApiResponse<Vec<TriggerDefinition>>, ApiError>;

    /// Configures `trigger_name` on `account`, forwarding `config` verbatim.
    async fn enable_trigger(
        &self,
        account: &ConnectedAccountId,
        trigger_name: &TriggerName,
        config: &TriggerConfig,
    ) -> Result<ApiResponse<SetupResponse>, ApiError>;

    /// Switches a trigger instance on or off.
    async fn switch_trigger_instance_status(
        &self,
        trigger_id: &TriggerInstanceId,
        enabled: bool,
    ) -> Result<ApiResponse<Value>, ApiError>;

    /// Deletes a trigger instance.
    async fn delete_trigger(
        &self,
        trigger_instance_id: &TriggerInstanceId,
    ) -> Result<ApiResponse<Value>, ApiError>;
}

/// A persistent realtime channel delivering [`TriggerEvent`]s per client id.
///
/// Registration changes for one client id are serialized by the
/// implementation. At most one sink is registered per client id.
#[async_trait]
pub trait RealtimeFeed: Send + Sync {
    /// Establishes the channel, or reuses it if it is already open.
    async fn connect(&self, base_url: &str, api_key: &SecretString) -> Result<(), RealtimeError>;

    /// Registers `sink` for `client_id`, replacing any previous registration.
    async fn subscribe(&self, client_id: &ClientId, sink: EventSink) -> Result<(), RealtimeError>;

    /// Removes the registration for `client_id`. A no-op if none exists.
    async fn unsubscribe(&self, client_id: &ClientId) -> Result<(), RealtimeError>;
}

/// Supplies the identity and connection parameters of the current session.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn client_id(&self) -> Result<ClientId, SessionError>;

    fn base_url(&self) -> &str;

    fn api_key(&self) -> &SecretString;
}
