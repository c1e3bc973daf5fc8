//! Event Grid webhook listener.
//!
//! Receives deliveries from an Event Grid subscription over HTTP and feeds
//! every envelope to an [`eventing::EventDispatcher`].
//!
//! - **Handshake.** Creating a webhook subscription sends a
//!   `Microsoft.EventGrid.SubscriptionValidationEvent`; the listener answers
//!   with the validation code and dispatches nothing.
//! - **Notifications.** The body is a JSON array of envelopes (a single
//!   envelope object is accepted too). Each is dispatched in order; one bad
//!   element does not stop the others.
//!
//! ## Response codes
//!
//! | Delivery result | Status | Transport behaviour |
//! |-----------------|--------|---------------------|
//! | All handled or unhandled | `200` | Delivery complete |
//! | Some failed, none retryable | `400` | Dead-lettered, not retried |
//! | Any retryable failure | `500` | Whole batch redelivered |
//!
//! Unknown event types count as unhandled and never fail a delivery.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** HTTP framing, the handshake, and status-code policy
//! live here. The [`eventing`] crate sees only envelopes.

pub mod config;
pub mod delivery;
pub mod webhook;

use std::future::Future;
use std::sync::Arc;

use eventing::EventDispatcher;
use thiserror::Error;
use tracing::info;

pub use config::{ListenerConfig, DEFAULT_PATH, DEFAULT_PORT};
pub use delivery::{deliver, DeliveryReport, DeliverySummary};
pub use webhook::router;

/// Errors that stop the listener from serving.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// The webhook path cannot be routed.
    #[error("Invalid webhook path '{path}': must start with '/', must not end with '/', and must not contain route parameters")]
    InvalidPath { path: String },

    /// The bind address could not be bound.
    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: std::net::SocketAddr,
        source: std::io::Error,
    },

    /// The server failed while running.
    #[error("Webhook server failed: {0}")]
    Serve(#[source] std::io::Error),
}

/// Binds `config.bind_address()` and serves the webhook until `shutdown`
/// resolves. In-flight deliveries finish before this returns.
pub async fn serve<F>(
    config: ListenerConfig,
    dispatcher: Arc<EventDispatcher>,
    shutdown: F,
) -> Result<(), ListenerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(config.bind_address())
        .await
        .map_err(|source| ListenerError::Bind {
            address: config.bind_address(),
            source,
        })?;
    let local = listener.local_addr().map_err(ListenerError::Serve)?;

    info!(
        address = %local,
        path = config.path(),
        registered_types = dispatcher.len(),
        "webhook listener started"
    );

    let app = router(dispatcher, &config);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(ListenerError::Serve)?;

    info!("webhook listener stopped");
    Ok(())
}
