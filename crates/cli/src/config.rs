//! Command-line and environment configuration.
//!
//! Every setting can come from a flag or an environment variable; a `.env`
//! file in the working directory is loaded first when present. Settings are
//! turned into the explicit config structs of the library crates here and
//! nowhere else.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use listener::{ListenerConfig, ListenerError, DEFAULT_PATH};
use publisher::TopicConfig;

#[derive(Parser)]
#[command(
    name = "eventgrid",
    version,
    about = "Publish and consume Event Grid events with typed dispatch"
)]
pub struct Cli {
    #[command(flatten)]
    pub telemetry: TelemetryArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Serve the webhook endpoint and dispatch delivered events.
    Listen(ListenArgs),
    /// Publish synthetic item events to a custom topic on a timer.
    Publish(PublishArgs),
    /// Dispatch one delivery body read from a file or stdin.
    Dispatch(DispatchArgs),
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// One JSON object per line.
    Json,
    /// Human-readable lines.
    Pretty,
}

#[derive(Args)]
pub struct TelemetryArgs {
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Json, global = true)]
    pub log_format: LogFormat,

    /// OTLP gRPC collector (e.g. `http://localhost:4317`). Spans are only
    /// exported when this is set.
    #[arg(long, env = "OTEL_EXPORTER_OTLP_ENDPOINT", global = true)]
    pub otlp_endpoint: Option<String>,
}

#[derive(Args)]
pub struct ListenArgs {
    #[arg(long, env = "EVENTGRID_LISTEN_ADDR", default_value = "0.0.0.0:8080")]
    pub bind: SocketAddr,

    #[arg(long, env = "EVENTGRID_WEBHOOK_PATH", default_value = DEFAULT_PATH)]
    pub path: String,
}

impl ListenArgs {
    pub fn listener_config(&self) -> Result<ListenerConfig, ListenerError> {
        ListenerConfig::new(self.bind, self.path.clone())
    }
}

#[derive(Args)]
pub struct TopicArgs {
    /// Topic endpoint as shown in the portal.
    #[arg(long = "topic-endpoint", env = "EVENTGRID_TOPIC_ENDPOINT")]
    pub endpoint: String,

    /// Topic shared access key.
    #[arg(long = "topic-key", env = "EVENTGRID_TOPIC_KEY", hide_env_values = true)]
    pub key: String,

    /// Per-request timeout in seconds.
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,
}

impl TopicArgs {
    pub fn topic_config(&self) -> Result<TopicConfig, eventing::PublishError> {
        Ok(TopicConfig::new(&self.endpoint, self.key.clone())?
            .with_request_timeout(Duration::from_secs(self.timeout_secs)))
    }
}

#[derive(Args)]
pub struct PublishArgs {
    #[command(flatten)]
    pub topic: TopicArgs,

    /// Events per batch.
    #[arg(long, default_value_t = 5)]
    pub count: usize,

    #[arg(long, default_value = "Contoso Item SKU #1")]
    pub item_sku: String,

    /// Seconds between batches.
    #[arg(long, default_value_t = 20, value_parser = clap::value_parser!(u64).range(1..))]
    pub interval_secs: u64,

    /// Publish a single batch and exit.
    #[arg(long)]
    pub once: bool,
}

#[derive(Args)]
pub struct DispatchArgs {
    /// File containing the delivery body. Reads stdin when omitted.
    #[arg(long, short)]
    pub file: Option<PathBuf>,
}
