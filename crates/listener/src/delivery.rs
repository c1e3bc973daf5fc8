//! Dispatching a whole delivery and summarising the results.

use eventing::{DispatchError, DispatchOutcome, EventDispatcher, EventEnvelope, RetryPolicy};
use serde::Serialize;
use tracing::{debug, warn};

/// Per-envelope results of one delivery, in delivery order.
#[derive(Debug, Default)]
pub struct DeliveryReport {
    pub results: Vec<Result<DispatchOutcome, DispatchError>>,
}

/// Counts returned to the transport in the webhook response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeliverySummary {
    pub handled: usize,
    pub unhandled: usize,
    pub failed: usize,
}

impl DeliveryReport {
    pub fn summary(&self) -> DeliverySummary {
        let mut summary = DeliverySummary {
            handled: 0,
            unhandled: 0,
            failed: 0,
        };
        for result in &self.results {
            match result {
                Ok(DispatchOutcome::Handled { .. }) => summary.handled += 1,
                Ok(DispatchOutcome::Unhandled { .. }) => summary.unhandled += 1,
                Err(_) => summary.failed += 1,
            }
        }
        summary
    }

    /// The policy the transport should apply to the delivery as a whole.
    ///
    /// `None` when nothing failed. Any retryable failure makes the whole
    /// delivery retryable, since the transport redelivers batches, not
    /// single events.
    pub fn retry_policy(&self) -> Option<RetryPolicy> {
        let mut policy = None;
        for err in self.results.iter().filter_map(|r| r.as_ref().err()) {
            match err.retry_policy() {
                retry @ RetryPolicy::Retryable { .. } => return Some(retry),
                RetryPolicy::NonRetryable => policy = Some(RetryPolicy::NonRetryable),
            }
        }
        policy
    }
}

/// Dispatches each parsed element of a delivery in order.
///
/// Elements that failed to parse are carried into the report unchanged.
/// A failure never stops the remaining elements from being dispatched.
pub async fn deliver(
    dispatcher: &EventDispatcher,
    envelopes: Vec<Result<EventEnvelope, DispatchError>>,
) -> DeliveryReport {
    let mut results = Vec::with_capacity(envelopes.len());
    for envelope in envelopes {
        let result = match envelope {
            Ok(envelope) => dispatcher.dispatch_envelope(envelope).await,
            Err(err) => Err(err),
        };

        match &result {
            Ok(DispatchOutcome::Handled { event_id, event_type }) => {
                debug!(%event_id, %event_type, "event handled");
            }
            Ok(DispatchOutcome::Unhandled { event_id, event_type }) => {
                debug!(%event_id, %event_type, "no handler registered; event ignored");
            }
            Err(err) => {
                warn!(
                    event_type = err.event_type().unwrap_or("<unparsed>"),
                    retryable = err.retry_policy().is_retryable(),
                    error = %err,
                    "event dispatch failed"
                );
            }
        }
        results.push(result);
    }
    DeliveryReport { results }
}
