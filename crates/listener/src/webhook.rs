//! HTTP handlers for the webhook endpoint.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use eventing::payloads::{
    SubscriptionValidationEventData, SubscriptionValidationResponse, SUBSCRIPTION_VALIDATION,
};
use eventing::{
    parse_batch, DispatchError, EventDispatcher, EventEnvelope, EventTypeName, JsonDecoder,
    PayloadDecoder, RetryPolicy,
};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::delivery::{deliver, DeliverySummary};
use crate::ListenerConfig;

/// Header the transport uses to say what kind of request this is.
pub const EVENT_TYPE_HEADER: &str = "aeg-event-type";

/// [`EVENT_TYPE_HEADER`] value for the subscription handshake.
pub const VALIDATION_HEADER_VALUE: &str = "SubscriptionValidation";

#[derive(Clone)]
struct WebhookState {
    dispatcher: Arc<EventDispatcher>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// Builds the webhook router: `POST {path}` for deliveries and
/// `GET {path}/health` for liveness.
pub fn router(dispatcher: Arc<EventDispatcher>, config: &ListenerConfig) -> Router {
    Router::new()
        .route(config.path(), post(receive_events))
        .route(&config.health_path(), get(health))
        .with_state(WebhookState { dispatcher })
}

async fn health() -> &'static str {
    "ok"
}

#[instrument(name = "webhook_delivery", skip_all, fields(batch_size = tracing::field::Empty))]
async fn receive_events(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let envelopes = match parse_batch(&body) {
        Ok(envelopes) => envelopes,
        Err(err) => {
            warn!(error = %err, "rejecting undecodable delivery");
            return error_response(StatusCode::BAD_REQUEST, &err);
        }
    };
    tracing::Span::current().record("batch_size", envelopes.len());

    if is_validation_request(&headers, &envelopes) {
        return validation_response(envelopes);
    }

    let report = deliver(&state.dispatcher, envelopes).await;
    let summary = report.summary();
    let status = match report.retry_policy() {
        None => StatusCode::OK,
        Some(RetryPolicy::Retryable { .. }) => StatusCode::INTERNAL_SERVER_ERROR,
        Some(RetryPolicy::NonRetryable) => StatusCode::BAD_REQUEST,
    };
    info!(
        handled = summary.handled,
        unhandled = summary.unhandled,
        failed = summary.failed,
        status = status.as_u16(),
        "delivery processed"
    );
    (status, Json::<DeliverySummary>(summary)).into_response()
}

/// The header decides when present. Without it, the delivery is a handshake
/// only if its first envelope is the validation event.
fn is_validation_request(
    headers: &HeaderMap,
    envelopes: &[Result<EventEnvelope, DispatchError>],
) -> bool {
    match headers.get(EVENT_TYPE_HEADER) {
        Some(value) => value
            .to_str()
            .is_ok_and(|v| v.eq_ignore_ascii_case(VALIDATION_HEADER_VALUE)),
        None => validation_event(envelopes).is_some(),
    }
}

fn validation_event(envelopes: &[Result<EventEnvelope, DispatchError>]) -> Option<&EventEnvelope> {
    let name = EventTypeName::new(SUBSCRIPTION_VALIDATION)?;
    envelopes
        .first()?
        .as_ref()
        .ok()
        .filter(|e| name.matches(&e.event_type))
}

/// Echoes the validation code to complete the handshake.
fn validation_response(envelopes: Vec<Result<EventEnvelope, DispatchError>>) -> Response {
    let Some(event) = validation_event(&envelopes) else {
        let err = DispatchError::malformed("validation request carries no validation event");
        warn!(error = %err, "rejecting validation request");
        return error_response(StatusCode::BAD_REQUEST, &err);
    };

    let decoded = JsonDecoder::<SubscriptionValidationEventData>::new().decode(&event.data);
    match decoded {
        Ok(data) => {
            info!(
                event_id = %event.id,
                topic = event.topic.as_deref().unwrap_or_default(),
                "completing subscription validation handshake"
            );
            Json(SubscriptionValidationResponse {
                validation_response: data.validation_code,
            })
            .into_response()
        }
        Err(reason) => {
            let err = DispatchError::DecodeFailure {
                event_type: SUBSCRIPTION_VALIDATION.to_string(),
                reason: reason.to_string(),
            };
            warn!(error = %err, "rejecting validation request");
            error_response(StatusCode::BAD_REQUEST, &err)
        }
    }
}

fn error_response(status: StatusCode, err: &DispatchError) -> Response {
    (
        status,
        Json(ErrorBody {
            error: err.to_string(),
        }),
    )
        .into_response()
}
