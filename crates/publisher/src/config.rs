//! Topic connection settings.
//!
//! Settings are passed explicitly into [`crate::EventGridPublisher::new`];
//! there is no process-wide client.

use std::time::Duration;

use eventing::PublishError;
use reqwest::Url;

/// Event Grid REST API version the publisher speaks.
pub const API_VERSION: &str = "2018-01-01";

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Where and how to publish.
#[derive(Debug, Clone)]
pub struct TopicConfig {
    pub endpoint: TopicEndpoint,
    pub access_key: TopicKey,
    /// Upper bound for one publish request, connection included.
    pub request_timeout: Duration,
}

impl TopicConfig {
    /// Builds a config from a raw endpoint URL and key, with the default timeout.
    pub fn new(endpoint: &str, access_key: impl Into<String>) -> Result<Self, PublishError> {
        Ok(Self {
            endpoint: TopicEndpoint::parse(endpoint)?,
            access_key: TopicKey::new(access_key),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        })
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// A topic's publish URL.
///
/// The portal shows topic endpoints as
/// `https://<topic>.<region>-1.eventgrid.azure.net/api/events`. Only the
/// origin (scheme, host, port) of whatever is configured is kept; the events
/// path and API version are appended here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicEndpoint(Url);

impl TopicEndpoint {
    pub fn parse(raw: &str) -> Result<Self, PublishError> {
        let invalid = |reason: String| PublishError::InvalidEndpoint {
            endpoint: raw.to_string(),
            reason,
        };

        let parsed = Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;
        if !matches!(parsed.scheme(), "https" | "http") {
            return Err(invalid(format!("unsupported scheme '{}'", parsed.scheme())));
        }
        if parsed.host_str().is_none() {
            return Err(invalid("missing host".to_string()));
        }

        // Only the origin survives: credentials in the URL would bypass the
        // key header, and the portal's path and query are replaced anyway.
        let mut url = Url::parse(&parsed.origin().ascii_serialization())
            .map_err(|e| invalid(e.to_string()))?;
        url.set_path("/api/events");
        url.set_query(Some(&format!("api-version={API_VERSION}")));
        Ok(Self(url))
    }

    /// The full URL batches are POSTed to.
    pub fn publish_url(&self) -> &Url {
        &self.0
    }

    /// Host name of the topic, for logging.
    pub fn host(&self) -> &str {
        self.0.host_str().unwrap_or_default()
    }
}

impl std::fmt::Display for TopicEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Shared access key for a topic, sent in the `aeg-sas-key` header.
///
/// Never printed: `Debug` is redacted.
#[derive(Clone)]
pub struct TopicKey(String);

impl TopicKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub(crate) fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for TopicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("TopicKey(<redacted>)")
    }
}
