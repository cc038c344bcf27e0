//! Test doubles for the trigger ports.
#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
};

use async_trait::async_trait;
use mockall::mock;
use serde_json::Value;
use triggers::{
    ApiError, ApiResponse, ClientId, ConnectedAccountId, EventSink, ListTriggersQuery,
    RealtimeError, RealtimeFeed, SecretString, SessionError, SessionProvider, SetupResponse,
    TriggerConfig, TriggerDefinition, TriggerEvent, TriggerInstanceId, TriggerName, TriggersApi,
};

mock! {
    pub Api {}

    #[async_trait]
    impl TriggersApi for Api {
        async fn list_triggers(
            &self,
            query: &ListTriggersQuery,
        ) -> Result<ApiResponse<Vec<TriggerDefinition>>, ApiError>;

        async fn enable_trigger(
            &self,
            account: &ConnectedAccountId,
            trigger_name: &TriggerName,
            config: &TriggerConfig,
        ) -> Result<ApiResponse<SetupResponse>, ApiError>;

        async fn switch_trigger_instance_status(
            &self,
            trigger_id: &TriggerInstanceId,
            enabled: bool,
        ) -> Result<ApiResponse<Value>, ApiError>;

        async fn delete_trigger(
            &self,
            trigger_instance_id: &TriggerInstanceId,
        ) -> Result<ApiResponse<Value>, ApiError>;
    }
}

/// Session with a fixed client id that counts how often it was asked for it.
pub struct StaticSession {
    client_id: Result<ClientId, SessionError>,
    base_url: String,
    api_key: SecretString,
    pub client_id_calls: AtomicUsize,
}

impl StaticSession {
    pub fn new(client_id: &str) -> Self {
        Self {
            client_id: Ok(ClientId::new(client_id).unwrap()),
            base_url: "https://platform.test".to_string(),
            api_key: SecretString::from("test-key".to_string()),
            client_id_calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(error: SessionError) -> Self {
        Self {
            client_id: Err(error),
            ..Self::new("unused")
        }
    }
}

#[async_trait]
impl SessionProvider for StaticSession {
    async fn client_id(&self) -> Result<ClientId, SessionError> {
        self.client_id_calls.fetch_add(1, Ordering::SeqCst);
        self.client_id.clone()
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn api_key(&self) -> &SecretString {
        &self.api_key
    }
}

/// In-memory feed keeping one sink per client id, like the real registry.
#[derive(Default)]
pub struct RecordingFeed {
    sinks: Mutex<HashMap<ClientId, EventSink>>,
    pub connects: Mutex<Vec<String>>,
    pub unsubscribes: AtomicUsize,
    pub fail_connect: bool,
}

impl RecordingFeed {
    pub fn failing_connect() -> Self {
        Self {
            fail_connect: true,
            ..Self::default()
        }
    }

    /// Pushes an event to the sink registered for `client_id`.
    pub fn push(&self, client_id: &str, event: TriggerEvent) -> bool {
        let sinks = self.sinks.lock().unwrap();
        match sinks.get(&ClientId::new(client_id).unwrap()) {
            Some(sink) => sink.send(event).is_ok(),
            None => false,
        }
    }

    pub fn registrations(&self) -> usize {
        self.sinks.lock().unwrap().len()
    }
}

#[async_trait]
impl RealtimeFeed for RecordingFeed {
    async fn connect(&self, base_url: &str, _api_key: &SecretString) -> Result<(), RealtimeError> {
        if self.fail_connect {
            return Err(RealtimeError::Connect {
                url: base_url.to_string(),
                message: "refused".to_string(),
            });
        }
        self.connects.lock().unwrap().push(base_url.to_string());
        Ok(())
    }

    async fn subscribe(&self, client_id: &ClientId, sink: EventSink) -> Result<(), RealtimeError> {
        self.sinks.lock().unwrap().insert(client_id.clone(), sink);
        Ok(())
    }

    async fn unsubscribe(&self, client_id: &ClientId) -> Result<(), RealtimeError> {
        self.unsubscribes.fetch_add(1, Ordering::SeqCst);
        self.sinks.lock().unwrap().remove(client_id);
        Ok(())
    }
}
