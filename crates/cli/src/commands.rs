//! The three sample flows.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use eventing::{parse_batch, DispatchOutcome, EventPublisher};
use listener::{deliver, serve, DeliveryReport};
use publisher::{sample_item_batch, EventGridPublisher};
use tokio::io::AsyncReadExt;
use tracing::{info, warn};

use crate::config::{DispatchArgs, ListenArgs, PublishArgs};
use crate::consumers::sample_dispatcher;

/// Serves the webhook until Ctrl-C.
pub async fn listen(args: ListenArgs) -> anyhow::Result<()> {
    let config = args.listener_config()?;
    let dispatcher = Arc::new(sample_dispatcher());
    serve(config, dispatcher, shutdown_signal()).await?;
    Ok(())
}

/// Publishes a batch every interval until Ctrl-C (or once with `--once`).
///
/// A failed batch is logged with its retry policy and the next tick tries
/// again with a fresh batch.
pub async fn publish(args: PublishArgs) -> anyhow::Result<()> {
    let publisher = EventGridPublisher::new(args.topic.topic_config()?)?;
    info!(
        topic = publisher.endpoint().host(),
        count = args.count,
        interval_secs = args.interval_secs,
        "publishing sample item events"
    );

    if args.once {
        publish_batch(&publisher, &args).await?;
        return Ok(());
    }

    let mut ticker = tokio::time::interval(Duration::from_secs(args.interval_secs));
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = ticker.tick() => {
                if let Err(err) = publish_batch(&publisher, &args).await {
                    warn!(error = %err, retry = ?err.retry_policy(), "batch publish failed");
                }
            }
        }
    }
    Ok(())
}

async fn publish_batch(
    publisher: &EventGridPublisher,
    args: &PublishArgs,
) -> Result<(), eventing::PublishError> {
    let batch = sample_item_batch(args.count, &args.item_sku)?;
    publisher.publish_events(&batch).await?;
    info!(batch_size = batch.len(), "published batch");
    Ok(())
}

/// Dispatches one delivery body and prints one line per envelope.
pub async fn dispatch(args: DispatchArgs) -> anyhow::Result<()> {
    let raw = match &args.file {
        Some(path) => tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut buf = Vec::new();
            tokio::io::stdin()
                .read_to_end(&mut buf)
                .await
                .context("failed to read stdin")?;
            buf
        }
    };

    let envelopes = parse_batch(&raw)?;
    let report = deliver(&sample_dispatcher(), envelopes).await;

    let mut out = std::io::stdout().lock();
    write_report(&mut out, &report)?;
    out.flush()?;

    let failed = report.summary().failed;
    if failed > 0 {
        bail!("{failed} of {} events failed to dispatch", report.results.len());
    }
    Ok(())
}

fn write_report(out: &mut impl Write, report: &DeliveryReport) -> std::io::Result<()> {
    for result in &report.results {
        match result {
            Ok(DispatchOutcome::Handled { event_id, event_type }) => {
                writeln!(out, "handled\t{event_id}\t{event_type}")?
            }
            Ok(DispatchOutcome::Unhandled { event_id, event_type }) => {
                writeln!(out, "unhandled\t{event_id}\t{event_type}")?
            }
            Err(err) => writeln!(out, "failed\t{err}")?,
        }
    }
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown requested"),
        Err(err) => {
            warn!(error = %err, "failed to listen for Ctrl-C; running until killed");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use eventing::{DispatchError, EventId};

    use super::*;

    #[test]
    fn report_lines_are_tab_separated() {
        let report = DeliveryReport {
            results: vec![
                Ok(DispatchOutcome::Handled {
                    event_id: EventId::new("a").unwrap(),
                    event_type: "Contoso.Items.ItemReceived".into(),
                }),
                Ok(DispatchOutcome::Unhandled {
                    event_id: EventId::new("b").unwrap(),
                    event_type: "Unknown.Type".into(),
                }),
                Err(DispatchError::malformed("missing field `eventType`")),
            ],
        };

        let mut out = Vec::new();
        write_report(&mut out, &report).unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "handled\ta\tContoso.Items.ItemReceived\n\
             unhandled\tb\tUnknown.Type\n\
             failed\tMalformed envelope: missing field `eventType`\n"
        );
    }
}
