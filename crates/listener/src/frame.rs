//! Wire frames exchanged on the feed socket.
//!
//! Every frame is a JSON object `{"event": ..., "channel": ..., "data": ...}`.
//! Each client listens on its own private channel,
//! `private-<clientId>_triggers`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use triggers::{ClientId, TriggerEvent};

pub const EVENT_SUBSCRIBE: &str = "subscribe";
pub const EVENT_UNSUBSCRIBE: &str = "unsubscribe";
pub const EVENT_TRIGGER: &str = "trigger_to_client";
pub const EVENT_PING: &str = "ping";
pub const EVENT_PONG: &str = "pong";

const CHANNEL_PREFIX: &str = "private-";
const CHANNEL_SUFFIX: &str = "_triggers";

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("Malformed frame: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Frame '{event}' has no data")]
    MissingData { event: String },

    #[error("Frame has no client channel")]
    MissingChannel,

    #[error("Channel '{channel}' is not a trigger channel")]
    InvalidChannel { channel: String },
}

/// Returns the private trigger channel for `client_id`.
pub fn channel_for(client_id: &ClientId) -> String {
    format!("{CHANNEL_PREFIX}{client_id}{CHANNEL_SUFFIX}")
}

/// Extracts the client id from a private trigger channel name.
pub fn client_id_from_channel(channel: &str) -> Option<ClientId> {
    channel
        .strip_prefix(CHANNEL_PREFIX)?
        .strip_suffix(CHANNEL_SUFFIX)
        .and_then(ClientId::new)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedFrame {
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl FeedFrame {
    pub fn subscribe(client_id: &ClientId) -> Self {
        Self {
            event: EVENT_SUBSCRIBE.to_string(),
            channel: Some(channel_for(client_id)),
            data: None,
        }
    }

    pub fn unsubscribe(client_id: &ClientId) -> Self {
        Self {
            event: EVENT_UNSUBSCRIBE.to_string(),
            channel: Some(channel_for(client_id)),
            data: None,
        }
    }

    pub fn pong() -> Self {
        Self {
            event: EVENT_PONG.to_string(),
            channel: None,
            data: None,
        }
    }

    pub fn decode(text: &str) -> Result<Self, FrameError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn encode(&self) -> Result<String, FrameError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn is_trigger(&self) -> bool {
        self.event == EVENT_TRIGGER
    }

    pub fn is_ping(&self) -> bool {
        self.event == EVENT_PING
    }

    /// Client id addressed by this frame's channel.
    pub fn client_id(&self) -> Result<ClientId, FrameError> {
        let channel = self.channel.as_deref().ok_or(FrameError::MissingChannel)?;
        client_id_from_channel(channel).ok_or_else(|| FrameError::InvalidChannel {
            channel: channel.to_string(),
        })
    }

    /// Decodes the event carried by a `trigger_to_client` frame.
    ///
    /// The platform sends `data` either as an object or as a JSON-encoded
    /// string of that object.
    pub fn trigger_event(&self) -> Result<TriggerEvent, FrameError> {
        let data = self.data.as_ref().ok_or_else(|| FrameError::MissingData {
            event: self.event.clone(),
        })?;

        let event = match data {
            Value::String(encoded) => serde_json::from_str(encoded)?,
            other => serde_json::from_value(other.clone())?,
        };
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client(id: &str) -> ClientId {
        ClientId::new(id).unwrap()
    }

    #[test]
    fn test_channel_naming() {
        assert_eq!(channel_for(&client("c1")), "private-c1_triggers");
        assert_eq!(
            client_id_from_channel("private-c1_triggers"),
            Some(client("c1"))
        );
        assert_eq!(client_id_from_channel("presence-c1_triggers"), None);
        assert_eq!(client_id_from_channel("private-_triggers"), None);
    }

    #[test]
    fn test_subscribe_frame_shape() {
        let text = FeedFrame::subscribe(&client("c1")).encode().unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(
            value,
            json!({ "event": "subscribe", "channel": "private-c1_triggers" })
        );
    }

    #[test]
    fn test_trigger_data_as_object() {
        let frame = FeedFrame::decode(
            &json!({
                "event": "trigger_to_client",
                "channel": "private-c1_triggers",
                "data": { "appName": "slack", "payload": { "text": "hi" } }
            })
            .to_string(),
        )
        .unwrap();

        assert!(frame.is_trigger());
        assert_eq!(frame.client_id().unwrap(), client("c1"));
        let event = frame.trigger_event().unwrap();
        assert_eq!(event.app_name, "slack");
        assert_eq!(event.payload, json!({ "text": "hi" }));
    }

    #[test]
    fn test_trigger_data_as_encoded_string() {
        let inner = json!({
            "appName": "github",
            "metadata": { "triggerName": "github_star_added" }
        })
        .to_string();
        let frame = FeedFrame {
            event: EVENT_TRIGGER.to_string(),
            channel: Some("private-c1_triggers".to_string()),
            data: Some(Value::String(inner)),
        };

        let event = frame.trigger_event().unwrap();
        assert_eq!(event.app_name, "github");
        assert_eq!(event.metadata.trigger_name, "github_star_added");
    }

    #[test]
    fn test_trigger_without_data_is_rejected() {
        let frame = FeedFrame::decode(r#"{"event":"trigger_to_client"}"#).unwrap();
        assert!(matches!(
            frame.trigger_event(),
            Err(FrameError::MissingData { .. })
        ));
        assert!(matches!(frame.client_id(), Err(FrameError::MissingChannel)));
    }

    #[test]
    fn test_malformed_text_is_rejected() {
        assert!(matches!(
            FeedFrame::decode("not json"),
            Err(FrameError::Json(_))
        ));
    }
}
