//! The [`Triggers`] facade.
//!
//! Every operation is a thin delegation to one port:
//!
//! | Operation | Port call |
//! |-----------|-----------|
//! | [`Triggers::list`] | [`TriggersApi::list_triggers`] |
//! | [`Triggers::setup`] | [`TriggersApi::enable_trigger`] |
//! | [`Triggers::enable`] / [`Triggers::disable`] | [`TriggersApi::switch_trigger_instance_status`] |
//! | [`Triggers::delete`] | [`TriggersApi::delete_trigger`] |
//! | [`Triggers::subscribe`] | [`SessionProvider`] then [`RealtimeFeed::connect`] + [`RealtimeFeed::subscribe`] |
//! | [`Triggers::unsubscribe`] | [`SessionProvider`] then [`RealtimeFeed::unsubscribe`] |
//!
//! Remote failures pass through the [`ErrorNormalizer`]; session and feed
//! failures propagate unmodified.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use crate::{
    ApiError, ClientId, ConnectedAccountId, ErrorNormalizer, ListTriggersQuery, RealtimeFeed,
    SessionProvider, SetupResponse, StandardErrorNormalizer, StatusAck, SubscriptionFilter,
    TriggerConfig, TriggerDefinition, TriggerError, TriggerEvent, TriggerInstanceId, TriggerName,
    TriggersApi,
};

/// A caller-supplied function invoked once per matching [`TriggerEvent`].
///
/// Callbacks run on a Tokio task owned by the subscription, one event at a
/// time, in delivery order.
#[derive(Clone)]
pub struct EventCallback(Arc<dyn Fn(TriggerEvent) + Send + Sync>);

impl EventCallback {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(TriggerEvent) + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    fn call(&self, event: TriggerEvent) {
        (self.0)(event)
    }
}

impl std::fmt::Debug for EventCallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("EventCallback")
    }
}

/// Client-side facade for listing, configuring and observing triggers.
#[derive(Clone)]
pub struct Triggers {
    api: Arc<dyn TriggersApi>,
    feed: Arc<dyn RealtimeFeed>,
    session: Arc<dyn SessionProvider>,
    normalizer: Arc<dyn ErrorNormalizer>,
}

impl Triggers {
    /// Creates a facade using the [`StandardErrorNormalizer`].
    pub fn new(
        api: Arc<dyn TriggersApi>,
        feed: Arc<dyn RealtimeFeed>,
        session: Arc<dyn SessionProvider>,
    ) -> Self {
        Self {
            api,
            feed,
            session,
            normalizer: Arc::new(StandardErrorNormalizer),
        }
    }

    /// Replaces the error normalizer.
    pub fn with_normalizer(mut self, normalizer: Arc<dyn ErrorNormalizer>) -> Self {
        self.normalizer = normalizer;
        self
    }

    fn remote_error(&self, operation: &'static str, error: ApiError) -> TriggerError {
        let normalized = self.normalizer.normalize(error);
        warn!(
            operation,
            code = %normalized.code,
            status = ?normalized.status,
            error_id = %normalized.error_id,
            "{}",
            normalized.description
        );
        TriggerError::Remote(normalized)
    }

    /// Lists trigger definitions.
    ///
    /// An empty response body yields an empty list.
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        query: &ListTriggersQuery,
    ) -> Result<Vec<TriggerDefinition>, TriggerError> {
        let response = self
            .api
            .list_triggers(query)
            .await
            .map_err(|e| self.remote_error("list", e))?;

        Ok(response.data.unwrap_or_default())
    }

    /// Configures `trigger_name` on a connected account.
    ///
    /// `config` is forwarded verbatim; validation happens on the platform.
    #[instrument(skip_all, fields(account = %account, trigger = %trigger_name))]
    pub async fn setup(
        &self,
        account: &ConnectedAccountId,
        trigger_name: &TriggerName,
        config: &TriggerConfig,
    ) -> Result<SetupResponse, TriggerError> {
        let response = self
            .api
            .enable_trigger(account, trigger_name, config)
            .await
            .map_err(|e| self.remote_error("setup", e))?;

        let created = response.data.ok_or_else(|| {
            self.remote_error(
                "setup",
                ApiError::MissingBody {
                    operation: "setup".to_string(),
                },
            )
        })?;

        info!(trigger_id = %created.trigger_id, status = %created.status, "Trigger set up");
        Ok(created)
    }

    /// Enables a trigger instance.
    pub async fn enable(&self, trigger_id: &TriggerInstanceId) -> Result<StatusAck, TriggerError> {
        self.switch_status(trigger_id, true).await
    }

    /// Disables a trigger instance.
    pub async fn disable(&self, trigger_id: &TriggerInstanceId) -> Result<StatusAck, TriggerError> {
        self.switch_status(trigger_id, false).await
    }

    // The response body is discarded: callers only learn that the request
    // completed without an error.
    #[instrument(skip_all, fields(trigger_id = %trigger_id, enabled = enabled))]
    async fn switch_status(
        &self,
        trigger_id: &TriggerInstanceId,
        enabled: bool,
    ) -> Result<StatusAck, TriggerError> {
        let operation = if enabled { "enable" } else { "disable" };
        self.api
            .switch_trigger_instance_status(trigger_id, enabled)
            .await
            .map_err(|e| self.remote_error(operation, e))?;

        Ok(StatusAck::success())
    }

    /// Deletes a trigger instance.
    #[instrument(skip_all, fields(trigger_instance_id = %trigger_instance_id))]
    pub async fn delete(
        &self,
        trigger_instance_id: &TriggerInstanceId,
    ) -> Result<StatusAck, TriggerError> {
        self.api
            .delete_trigger(trigger_instance_id)
            .await
            .map_err(|e| self.remote_error("delete", e))?;

        Ok(StatusAck::success())
    }

    /// Subscribes `callback` to realtime trigger events matching `filter`.
    ///
    /// Fails with [`TriggerError::InvalidArgument`] when `callback` is `None`,
    /// before the session or the feed is touched. A later call replaces this
    /// subscription; it does not add a second one.
    #[instrument(skip(self, callback))]
    pub async fn subscribe(
        &self,
        callback: Option<EventCallback>,
        filter: SubscriptionFilter,
    ) -> Result<(), TriggerError> {
        let callback = callback.ok_or_else(|| {
            TriggerError::invalid_argument("a callback is required for trigger subscription")
        })?;

        let client_id = self.session.client_id().await?;
        self.feed
            .connect(self.session.base_url(), self.session.api_key())
            .await?;

        info!(client_id = %client_id, filter = ?filter, "Subscribing to triggers");

        let (sink, mut events) = mpsc::unbounded_channel::<TriggerEvent>();
        self.feed.subscribe(&client_id, sink).await?;

        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                if filter.matches(&event) {
                    callback.call(event);
                } else {
                    debug!(
                        app = %event.app_name,
                        trigger_id = %event.metadata.id,
                        "Trigger event filtered out"
                    );
                }
            }
            debug!(client_id = %client_id, "Trigger subscription closed");
        });

        Ok(())
    }

    /// Removes the realtime subscription for this session, if any.
    #[instrument(skip(self))]
    pub async fn unsubscribe(&self) -> Result<(), TriggerError> {
        let client_id = self.session.client_id().await?;
        self.feed.unsubscribe(&client_id).await?;
        info!(client_id = %client_id, "Unsubscribed from triggers");
        Ok(())
    }

    /// Returns the client identifier of the current session.
    pub async fn client_id(&self) -> Result<ClientId, TriggerError> {
        Ok(self.session.client_id().await?)
    }
}
