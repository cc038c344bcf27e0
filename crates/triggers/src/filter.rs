//! Subscription filters for realtime trigger events.
//!
//! A [`SubscriptionFilter`] is a plain value object evaluated once per incoming
//! [`TriggerEvent`]. Semantics:
//!
//! - a filter with no fields set matches every event;
//! - each set field must equal the corresponding event field exactly;
//! - unset fields are wildcards;
//! - all set conditions are ANDed.
//!
//! An empty string counts as unset.

use serde::{Deserialize, Serialize};

use crate::TriggerEvent;

/// Caller-supplied predicate deciding which events reach a subscription callback.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integration_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_name: Option<String>,
    /// Matched against the connection's client unique user id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
}

/// Reads one event field compared by the filter.
type EventField = fn(&TriggerEvent) -> &str;

impl SubscriptionFilter {
    /// Creates a filter that matches every event.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn app_name(mut self, value: impl Into<String>) -> Self {
        self.app_name = Some(value.into());
        self
    }

    pub fn trigger_id(mut self, value: impl Into<String>) -> Self {
        self.trigger_id = Some(value.into());
        self
    }

    pub fn connection_id(mut self, value: impl Into<String>) -> Self {
        self.connection_id = Some(value.into());
        self
    }

    pub fn integration_id(mut self, value: impl Into<String>) -> Self {
        self.integration_id = Some(value.into());
        self
    }

    pub fn trigger_name(mut self, value: impl Into<String>) -> Self {
        self.trigger_name = Some(value.into());
        self
    }

    pub fn entity_id(mut self, value: impl Into<String>) -> Self {
        self.entity_id = Some(value.into());
        self
    }

    /// The comparison table: each filter field paired with the event field it
    /// must equal.
    fn conditions(&self) -> [(Option<&str>, EventField); 6] {
        [
            (self.app_name.as_deref(), |e| e.app_name.as_str()),
            (self.trigger_id.as_deref(), |e| e.metadata.id.as_str()),
            (self.connection_id.as_deref(), |e| {
                e.metadata.connection_id.as_str()
            }),
            (self.trigger_name.as_deref(), |e| {
                e.metadata.trigger_name.as_str()
            }),
            (self.entity_id.as_deref(), |e| {
                e.metadata.connection.client_unique_user_id.as_str()
            }),
            (self.integration_id.as_deref(), |e| {
                e.metadata.connection.integration_id.as_str()
            }),
        ]
    }

    /// Returns `true` if no field is set, i.e. the filter matches everything.
    pub fn is_empty(&self) -> bool {
        self.conditions()
            .iter()
            .all(|(expected, _)| expected.map_or(true, str::is_empty))
    }

    /// Evaluates the filter against one event.
    pub fn matches(&self, event: &TriggerEvent) -> bool {
        self.conditions()
            .iter()
            .all(|(expected, field)| match expected {
                Some(expected) if !expected.is_empty() => field(event) == *expected,
                _ => true,
            })
    }
}
