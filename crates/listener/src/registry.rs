//! Per-client event sinks.

use dashmap::DashMap;
use tracing::debug;
use triggers::{ClientId, EventSink, TriggerEvent};

/// Maps each client id to the sink of its one active subscription.
#[derive(Debug, Default)]
pub struct HandlerRegistry {
    sinks: DashMap<ClientId, EventSink>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `sink` for `client_id`. Returns `true` if it replaced an
    /// existing registration; the old sink is dropped.
    pub fn register(&self, client_id: ClientId, sink: EventSink) -> bool {
        self.sinks.insert(client_id, sink).is_some()
    }

    /// Returns `true` if a registration was removed.
    pub fn remove(&self, client_id: &ClientId) -> bool {
        self.sinks.remove(client_id).is_some()
    }

    pub fn contains(&self, client_id: &ClientId) -> bool {
        self.sinks.contains_key(client_id)
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Drops every registration. Receivers see their channel end once any
    /// queued events are drained.
    pub fn clear(&self) {
        self.sinks.clear();
    }

    pub fn client_ids(&self) -> Vec<ClientId> {
        self.sinks.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Delivers `event` to the sink registered for `client_id`.
    ///
    /// Returns `false` when nobody is registered or the receiver has gone
    /// away; a closed sink is removed.
    pub fn dispatch(&self, client_id: &ClientId, event: TriggerEvent) -> bool {
        let delivered = match self.sinks.get(client_id) {
            Some(sink) => sink.send(event).is_ok(),
            None => {
                debug!(client_id = %client_id, "No handler registered; dropping event");
                return false;
            }
        };

        if !delivered {
            debug!(client_id = %client_id, "Handler receiver closed; removing registration");
            self.sinks.remove_if(client_id, |_, sink| sink.is_closed());
        }
        delivered
    }
}
