//! Request and response shapes exchanged with the trigger platform.
//!
//! None of these types are owned or persisted by this workspace. They are
//! transient values decoded from (or encoded into) platform responses and
//! realtime events. Field names follow the platform's camelCase JSON.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::TriggerInstanceId;

/// Opaque trigger configuration forwarded verbatim to the platform.
pub type TriggerConfig = Map<String, Value>;

// ---------------------------------------------------------------------------
// Response wrapper
// ---------------------------------------------------------------------------

/// A successful platform response.
///
/// `data` is `None` when the response body was empty. Callers decide whether
/// an empty body is acceptable for the operation at hand.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse<T> {
    /// HTTP status of the response (always 2xx).
    pub status: u16,
    /// Decoded body, if the platform sent one.
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// Creates a response carrying a decoded body.
    pub fn with_data(status: u16, data: T) -> Self {
        Self {
            status,
            data: Some(data),
        }
    }

    /// Creates a response with an empty body.
    pub fn empty(status: u16) -> Self {
        Self { status, data: None }
    }
}

// ---------------------------------------------------------------------------
// Trigger definitions
// ---------------------------------------------------------------------------

/// Query filter for listing trigger definitions.
///
/// The default query lists every definition visible to the API key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListTriggersQuery {
    /// Restrict the listing to triggers owned by these applications.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_names: Option<Vec<String>>,
}

impl ListTriggersQuery {
    /// Restricts the query to the given application names.
    pub fn with_app_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.app_names = Some(names.into_iter().map(Into::into).collect());
        self
    }
}

/// An available trigger type as described by the platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerDefinition {
    /// Platform name of the trigger; used as `triggerName` when enabling it.
    pub name: String,
    #[serde(default, rename = "display_name", skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default)]
    pub description: String,
    /// JSON schema describing the configuration accepted by `setup`.
    #[serde(default)]
    pub config: Value,
    /// JSON schema describing the payload delivered when the trigger fires.
    #[serde(default)]
    pub payload: Value,
    /// Name of the application that owns the trigger.
    #[serde(default)]
    pub app_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    #[serde(default)]
    pub enabled: bool,
}

// ---------------------------------------------------------------------------
// Trigger instance lifecycle
// ---------------------------------------------------------------------------

/// Body sent when enabling a trigger on a connected account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnableTriggerRequest {
    pub trigger_config: TriggerConfig,
}

/// Body sent when switching a trigger instance on or off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchStatusRequest {
    pub enabled: bool,
}

/// Result of configuring a trigger on a connected account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupResponse {
    /// Server-assigned status of the new instance.
    pub status: String,
    /// Identifier of the newly created trigger instance.
    pub trigger_id: TriggerInstanceId,
}

/// Uniform acknowledgement returned by enable, disable and delete.
///
/// The platform response body is discarded; a `StatusAck` only states that
/// the request completed without an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusAck {
    pub status: String,
}

impl StatusAck {
    /// Status literal reported for every completed lifecycle request.
    pub const SUCCESS: &'static str = "success";

    /// Creates the success marker.
    pub fn success() -> Self {
        Self {
            status: Self::SUCCESS.to_string(),
        }
    }

    /// Returns `true` if this is the success marker.
    pub fn is_success(&self) -> bool {
        self.status == Self::SUCCESS
    }
}

// ---------------------------------------------------------------------------
// Realtime events
// ---------------------------------------------------------------------------

/// A fired-trigger payload delivered through the realtime feed.
///
/// Exists only for the duration of a callback invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerEvent {
    /// Name of the application whose trigger fired.
    #[serde(default)]
    pub app_name: String,
    /// Trigger payload, in the shape described by the definition's `payload` schema.
    #[serde(default)]
    pub payload: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_payload: Option<Value>,
    #[serde(default)]
    pub metadata: TriggerMetadata,
}

/// Routing metadata attached to a [`TriggerEvent`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerMetadata {
    /// Trigger instance that fired.
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub connection_id: String,
    #[serde(default)]
    pub trigger_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_config: Option<Value>,
    #[serde(default)]
    pub connection: TriggerConnection,
}

/// The connected account an event was produced for.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerConnection {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub integration_id: String,
    /// Owning user/entity of the connection.
    #[serde(default)]
    pub client_unique_user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}
