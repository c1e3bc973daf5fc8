//! Event Grid samples entry point.
//!
//! This binary is the composition root for the workspace. Responsibilities:
//!
//! 1. **Parse configuration**: load `.env` if present, then flags and
//!    environment variables into explicit config structs.
//! 2. **Wire observability**: install `tracing-subscriber` with a JSON (or
//!    pretty) layer and, when an OTLP endpoint is configured, an
//!    OpenTelemetry exporter. All spans and events emitted by every crate in
//!    the workspace flow through this subscriber.
//! 3. **Run one flow**:
//!    - `listen`: serve the webhook and dispatch deliveries to the sample
//!      consumers.
//!    - `publish`: publish synthetic `Contoso.Items.ItemReceived` batches to a
//!      custom topic on a timer.
//!    - `dispatch`: dispatch a single delivery body from a file or stdin.

mod commands;
mod config;
mod consumers;
mod telemetry;

use clap::Parser;

use crate::config::{Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is the normal case outside development.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _telemetry = telemetry::init(&cli.telemetry)?;

    let result = match cli.command {
        Command::Listen(args) => commands::listen(args).await,
        Command::Publish(args) => commands::publish(args).await,
        Command::Dispatch(args) => commands::dispatch(args).await,
    };
    if let Err(err) = &result {
        tracing::error!(error = %format!("{err:#}"), "command failed");
    }
    result
}
