//! Event Grid topic publisher.
//!
//! Implements the [`eventing::EventPublisher`] trait by POSTing envelope
//! batches to a topic's REST endpoint, authenticated with the topic's shared
//! access key.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** HTTP transport, endpoint normalisation, credential
//! headers, and status-code interpretation all live here. The [`eventing`]
//! crate sees only [`eventing::EventPublisher`] and [`eventing::PublishError`].
//!
//! Delivery guarantees (durability, fan-out, retries towards subscribers)
//! belong to the transport. This client makes one attempt per call and
//! reports a [`eventing::RetryPolicy`] through the error so the caller can
//! decide whether to try again.

pub mod batch;
pub mod config;

use std::time::Duration;

use async_trait::async_trait;
use eventing::{EventEnvelope, EventPublisher, PublishError};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::StatusCode;
use tracing::{debug, instrument, warn};

pub use batch::sample_item_batch;
pub use config::{TopicConfig, TopicEndpoint, TopicKey, API_VERSION};

/// Header carrying the topic's shared access key.
pub const SAS_KEY_HEADER: &str = "aeg-sas-key";

/// Longest response body kept in [`PublishError::Rejected`].
const MAX_ERROR_BODY: usize = 1024;

/// Publishes envelope batches to one topic.
#[derive(Debug, Clone)]
pub struct EventGridPublisher {
    http: reqwest::Client,
    config: TopicConfig,
}

impl EventGridPublisher {
    /// Builds a publisher with its own HTTP connection pool.
    pub fn new(config: TopicConfig) -> Result<Self, PublishError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("eventgrid-samples/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PublishError::Transport {
                message: e.to_string(),
            })?;
        Ok(Self { http, config })
    }

    pub fn endpoint(&self) -> &TopicEndpoint {
        &self.config.endpoint
    }
}

#[async_trait]
impl EventPublisher for EventGridPublisher {
    #[instrument(
        name = "publish_events",
        skip_all,
        fields(topic = %self.config.endpoint.host(), batch_size = events.len())
    )]
    async fn publish_events(&self, events: &[EventEnvelope]) -> Result<(), PublishError> {
        if events.is_empty() {
            return Err(PublishError::EmptyBatch);
        }

        let body = serde_json::to_vec(events).map_err(|e| PublishError::Serialization {
            message: e.to_string(),
        })?;

        let response = self
            .http
            .post(self.config.endpoint.publish_url().clone())
            .header(SAS_KEY_HEADER, self.config.access_key.expose())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| PublishError::Transport {
                message: e.to_string(),
            })?;

        let status = response.status();
        if status.is_success() {
            debug!(status = status.as_u16(), "batch accepted");
            return Ok(());
        }

        let retry_after = parse_retry_after(response.headers());
        let body = response.text().await.unwrap_or_default();
        let err = classify_failure(status, retry_after, body);
        warn!(status = status.as_u16(), error = %err, "batch rejected");
        Err(err)
    }
}

/// Maps a non-success response to a [`PublishError`].
fn classify_failure(status: StatusCode, retry_after: Option<Duration>, body: String) -> PublishError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => PublishError::Unauthorized {
            status: status.as_u16(),
        },
        StatusCode::TOO_MANY_REQUESTS => PublishError::Throttled { retry_after },
        _ => PublishError::Rejected {
            status: status.as_u16(),
            body: truncate(body, MAX_ERROR_BODY),
        },
    }
}

/// Reads a delta-seconds `Retry-After` header. HTTP-date values are ignored.
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

fn truncate(mut body: String, max: usize) -> String {
    if body.len() > max {
        let mut cut = max;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    body
}
