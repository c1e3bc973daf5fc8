//! Publishing port.
//!
//! [`EventPublisher`] is how producers hand an ordered batch of envelopes to
//! the eventing transport. The HTTP implementation lives in the `publisher`
//! crate; this crate only defines the contract and its error type.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::{EventEnvelope, RetryPolicy};

/// Delivers batches of envelopes to a topic.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publishes `events` as one batch, preserving their order.
    ///
    /// The batch is accepted or rejected as a whole. An empty batch is
    /// rejected with [`PublishError::EmptyBatch`] without contacting the
    /// transport.
    async fn publish_events(&self, events: &[EventEnvelope]) -> Result<(), PublishError>;
}

/// Errors produced while publishing a batch.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PublishError {
    /// There was nothing to publish.
    #[error("Refusing to publish an empty batch")]
    EmptyBatch,

    /// The configured topic endpoint is not a usable URL.
    #[error("Invalid topic endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    /// The batch could not be serialised.
    #[error("Failed to serialise event batch: {message}")]
    Serialization { message: String },

    /// The request never produced an HTTP response (DNS, TLS, timeout, ...).
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// The topic rejected the access key.
    #[error("Topic rejected credentials (HTTP {status})")]
    Unauthorized { status: u16 },

    /// The topic asked the caller to slow down.
    #[error("Topic is throttling requests")]
    Throttled { retry_after: Option<Duration> },

    /// Any other non-success response.
    #[error("Topic rejected the batch (HTTP {status}): {body}")]
    Rejected { status: u16, body: String },
}

impl PublishError {
    /// Whether publishing the same batch again could succeed.
    pub fn retry_policy(&self) -> RetryPolicy {
        match self {
            Self::Transport { .. } => RetryPolicy::Retryable { after: None },
            Self::Throttled { retry_after } => RetryPolicy::Retryable {
                after: *retry_after,
            },
            Self::Rejected { status, .. } if *status >= 500 => {
                RetryPolicy::Retryable { after: None }
            }
            Self::EmptyBatch
            | Self::InvalidEndpoint { .. }
            | Self::Serialization { .. }
            | Self::Unauthorized { .. }
            | Self::Rejected { .. } => RetryPolicy::NonRetryable,
        }
    }
}
