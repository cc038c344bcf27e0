//! Command-line arguments.

use clap::{Args, Parser, Subcommand};
use listener::FEED_URL_ENV;
use remote_api::{API_KEY_ENV, BASE_URL_ENV};
use triggers::{ListTriggersQuery, SubscriptionFilter, TriggerConfig};

use crate::observability::LogFormat;

/// Manage triggers on connected third-party accounts and listen for their
/// events.
#[derive(Debug, Parser)]
#[command(name = "triggers", version, about, long_about = None)]
pub struct Cli {
    /// Platform API key.
    #[arg(long, env = API_KEY_ENV, hide_env_values = true)]
    pub api_key: String,

    /// Platform base URL.
    #[arg(long, env = BASE_URL_ENV)]
    pub base_url: Option<String>,

    /// Realtime feed URL; derived from the base URL when unset.
    #[arg(long, env = FEED_URL_ENV)]
    pub feed_url: Option<String>,

    #[arg(long, env = "TRIGGERS_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    /// Export traces to this OTLP/gRPC endpoint.
    #[arg(long = "otlp", env = "OTEL_EXPORTER_OTLP_ENDPOINT")]
    pub otlp_endpoint: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List available trigger definitions.
    List {
        /// Only list triggers of this app (repeatable).
        #[arg(long = "app")]
        apps: Vec<String>,
    },

    /// Set up a trigger on a connected account.
    Setup {
        account: String,
        trigger: String,
        /// Trigger configuration as a JSON object.
        #[arg(long, value_parser = parse_config)]
        config: Option<TriggerConfig>,
    },

    /// Enable a trigger instance.
    Enable { id: String },

    /// Disable a trigger instance.
    Disable { id: String },

    /// Delete a trigger instance.
    Delete { id: String },

    /// Print matching trigger events as JSON lines until interrupted.
    Listen(FilterArgs),
}

#[derive(Debug, Clone, Default, Args)]
pub struct FilterArgs {
    #[arg(long = "app")]
    pub app_name: Option<String>,
    #[arg(long)]
    pub trigger_id: Option<String>,
    #[arg(long)]
    pub connection_id: Option<String>,
    #[arg(long)]
    pub integration_id: Option<String>,
    #[arg(long)]
    pub trigger_name: Option<String>,
    #[arg(long)]
    pub entity_id: Option<String>,
}

impl From<FilterArgs> for SubscriptionFilter {
    fn from(args: FilterArgs) -> Self {
        SubscriptionFilter {
            app_name: args.app_name,
            trigger_id: args.trigger_id,
            connection_id: args.connection_id,
            integration_id: args.integration_id,
            trigger_name: args.trigger_name,
            entity_id: args.entity_id,
        }
    }
}

/// Builds the list query; no `--app` flags means no app restriction.
pub fn list_query(apps: Vec<String>) -> ListTriggersQuery {
    if apps.is_empty() {
        ListTriggersQuery::default()
    } else {
        ListTriggersQuery::default().with_app_names(apps)
    }
}

fn parse_config(raw: &str) -> Result<TriggerConfig, String> {
    serde_json::from_str(raw).map_err(|e| format!("expected a JSON object: {e}"))
}
