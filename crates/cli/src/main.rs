//! Triggers CLI entry point.
//!
//! This binary is the composition root for the workspace. Responsibilities:
//!
//! 1. **Load configuration**: `.env` via `dotenvy`, then flags and environment
//!    variables via `clap`.
//! 2. **Wire observability**: `tracing-subscriber` with a pretty or JSON
//!    layer, plus an optional OpenTelemetry OTLP exporter.
//! 3. **Construct infrastructure**: `HttpTriggersApi` and `BackendSession`
//!    over one `PlatformClient`, and a `WsFeed`, injected into
//!    [`triggers::Triggers`].
//! 4. **Run one subcommand**: `list`, `setup`, `enable`, `disable`,
//!    `delete`, or `listen`.

mod args;
mod observability;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use listener::{FeedConfig, WsFeed};
use remote_api::{BackendSession, ClientConfig, HttpTriggersApi, PlatformClient};
use serde::Serialize;
use tracing::{error, info};
use triggers::{
    ConnectedAccountId, EventCallback, SubscriptionFilter, TriggerInstanceId, TriggerName,
    Triggers,
};

use crate::args::{list_query, Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let telemetry = observability::init(cli.log_format, cli.otlp_endpoint.as_deref())?;
    let result = run(cli).await;
    if let Err(e) = &result {
        error!(error = %format!("{e:#}"), "Command failed");
    }
    telemetry.shutdown();
    result
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let (triggers, feed) = build(&cli)?;

    match cli.command {
        Command::List { apps } => {
            let definitions = triggers.list(&list_query(apps)).await?;
            print_json(&definitions)?;
        }
        Command::Setup {
            account,
            trigger,
            config,
        } => {
            let account = ConnectedAccountId::new(account).context("account id is empty")?;
            let trigger = TriggerName::new(trigger).context("trigger name is empty")?;
            let created = triggers
                .setup(&account, &trigger, &config.unwrap_or_default())
                .await?;
            print_json(&created)?;
        }
        Command::Enable { id } => print_json(&triggers.enable(&instance_id(id)?).await?)?,
        Command::Disable { id } => print_json(&triggers.disable(&instance_id(id)?).await?)?,
        Command::Delete { id } => print_json(&triggers.delete(&instance_id(id)?).await?)?,
        Command::Listen(filter) => {
            listen(&triggers, &feed, filter.into()).await?;
            feed.disconnect().await;
        }
    }

    Ok(())
}

fn build(cli: &Cli) -> anyhow::Result<(Triggers, Arc<WsFeed>)> {
    let mut config = ClientConfig::new(cli.api_key.clone())?;
    if let Some(url) = &cli.base_url {
        config = config.with_base_url(url)?;
    }
    let platform = Arc::new(PlatformClient::new(config)?);

    let mut feed_config = FeedConfig::new();
    if let Some(url) = &cli.feed_url {
        feed_config = feed_config.with_url(url)?;
    }
    let feed = Arc::new(WsFeed::new(feed_config));

    let triggers = Triggers::new(
        Arc::new(HttpTriggersApi::new(platform.clone())),
        feed.clone(),
        Arc::new(BackendSession::new(platform)),
    );
    Ok((triggers, feed))
}

async fn listen(
    triggers: &Triggers,
    feed: &WsFeed,
    filter: SubscriptionFilter,
) -> anyhow::Result<()> {
    let callback = EventCallback::new(|event| match serde_json::to_string(&event) {
        Ok(line) => println!("{line}"),
        Err(e) => error!(error = %e, "Could not serialise trigger event"),
    });

    triggers.subscribe(Some(callback), filter).await?;
    info!("Listening for trigger events; press Ctrl-C to stop");

    tokio::select! {
        signal = tokio::signal::ctrl_c() => signal.context("failed to wait for Ctrl-C")?,
        () = feed.closed() => anyhow::bail!("realtime feed connection lost"),
    }

    triggers.unsubscribe().await?;
    Ok(())
}

fn instance_id(id: String) -> anyhow::Result<TriggerInstanceId> {
    TriggerInstanceId::new(id).context("trigger instance id is empty")
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
