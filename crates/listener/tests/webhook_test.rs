//! Drives the webhook router in-process with `tower::ServiceExt::oneshot`.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use eventing::payloads::{
    ContosoItemReceivedEventData, StorageBlobCreatedEventData, CONTOSO_ITEM_RECEIVED,
    STORAGE_BLOB_CREATED,
};
use eventing::{handler_fn, EventDispatcher, HandlerError, TypedEvent};
use listener::{router, serve, ListenerConfig};
use serde_json::{json, Value};
use tower::ServiceExt;

#[derive(Clone, Default)]
struct Seen {
    skus: Arc<Mutex<Vec<String>>>,
    urls: Arc<Mutex<Vec<String>>>,
}

fn app(seen: &Seen, fail_items: bool) -> Router {
    let mut dispatcher = EventDispatcher::new();

    let skus = seen.skus.clone();
    dispatcher.register_json::<ContosoItemReceivedEventData, _>(
        CONTOSO_ITEM_RECEIVED,
        handler_fn(move |event: TypedEvent<ContosoItemReceivedEventData>| {
            let skus = skus.clone();
            async move {
                if fail_items {
                    return Err(HandlerError::retryable("inventory store unavailable"));
                }
                skus.lock().unwrap().push(event.data.item_sku);
                Ok(())
            }
        }),
    );

    let urls = seen.urls.clone();
    dispatcher.register_json::<StorageBlobCreatedEventData, _>(
        STORAGE_BLOB_CREATED,
        handler_fn(move |event: TypedEvent<StorageBlobCreatedEventData>| {
            let urls = urls.clone();
            async move {
                urls.lock().unwrap().push(event.data.url);
                Ok(())
            }
        }),
    );

    router(Arc::new(dispatcher), &ListenerConfig::default())
}

fn event(event_type: &str, data: Value) -> Value {
    json!({
        "id": format!("evt-{}", event_type.len()),
        "topic": "/subscriptions/0000/resourceGroups/rg/providers/Microsoft.EventGrid/topics/topicsample",
        "subject": "Door0",
        "eventType": event_type,
        "eventTime": "2024-05-01T10:00:00.1234567Z",
        "data": data,
        "dataVersion": "2.0",
        "metadataVersion": "1"
    })
}

fn delivery(body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/events")
        .header("content-type", "application/json")
        .header("aeg-event-type", "Notification")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn dispatches_every_event_in_the_batch() {
    let seen = Seen::default();
    let body = json!([
        event("contoso.items.itemreceived", json!({"itemSku": "SKU-1"})),
        event(
            "Microsoft.Storage.BlobCreated",
            json!({"url": "https://acct.blob.core.windows.net/samples/eg_1.txt"})
        ),
        event("Unknown.Type", json!({})),
    ]);

    let (status, summary) = send(app(&seen, false), delivery(&body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary, json!({"handled": 2, "unhandled": 1, "failed": 0}));
    assert_eq!(*seen.skus.lock().unwrap(), vec!["SKU-1".to_string()]);
    assert_eq!(
        *seen.urls.lock().unwrap(),
        vec!["https://acct.blob.core.windows.net/samples/eg_1.txt".to_string()]
    );
}

#[tokio::test]
async fn single_envelope_bodies_are_accepted() {
    let seen = Seen::default();
    let body = event(CONTOSO_ITEM_RECEIVED, json!({"itemSku": "SKU-2"}));

    let (status, summary) = send(app(&seen, false), delivery(&body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["handled"], 1);
    assert_eq!(*seen.skus.lock().unwrap(), vec!["SKU-2".to_string()]);
}

#[tokio::test]
async fn completes_the_validation_handshake() {
    let seen = Seen::default();
    let body = json!([event(
        "Microsoft.EventGrid.SubscriptionValidationEvent",
        json!({
            "validationCode": "512d38b6-c7b8-40c8-89fe-f46f9e9622b6",
            "validationUrl": "https://rp-eastus2.eventgrid.azure.net:553/eventsubscriptions/sub/validate?id=512d38b6"
        })
    )]);
    let request = Request::builder()
        .method("POST")
        .uri("/api/events")
        .header("aeg-event-type", "SubscriptionValidation")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap();

    let (status, response) = send(app(&seen, false), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        response,
        json!({"validationResponse": "512d38b6-c7b8-40c8-89fe-f46f9e9622b6"})
    );
}

#[tokio::test]
async fn handshake_is_recognised_without_the_header() {
    let seen = Seen::default();
    let body = json!([event(
        "Microsoft.EventGrid.SubscriptionValidationEvent",
        json!({"validationCode": "abc"})
    )]);
    let request = Request::builder()
        .method("POST")
        .uri("/api/events")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap();

    let (status, response) = send(app(&seen, false), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(response, json!({"validationResponse": "abc"}));
}

#[tokio::test]
async fn validation_events_inside_a_notification_are_dispatched_like_any_other() {
    let seen = Seen::default();
    let body = json!([
        event(CONTOSO_ITEM_RECEIVED, json!({"itemSku": "X"})),
        event(
            "Microsoft.EventGrid.SubscriptionValidationEvent",
            json!({"validationCode": "abc"})
        ),
    ]);

    let (status, summary) = send(app(&seen, false), delivery(&body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary, json!({"handled": 1, "unhandled": 1, "failed": 0}));
    assert_eq!(*seen.skus.lock().unwrap(), vec!["X".to_string()]);
}

#[tokio::test]
async fn only_the_first_element_can_make_a_headerless_handshake() {
    let seen = Seen::default();
    let body = json!([
        event(CONTOSO_ITEM_RECEIVED, json!({"itemSku": "Y"})),
        event(
            "Microsoft.EventGrid.SubscriptionValidationEvent",
            json!({"validationCode": "abc"})
        ),
    ]);
    let request = Request::builder()
        .method("POST")
        .uri("/api/events")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap();

    let (status, summary) = send(app(&seen, false), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["handled"], 1);
    assert_eq!(*seen.skus.lock().unwrap(), vec!["Y".to_string()]);
}

#[tokio::test]
async fn validation_header_without_a_code_is_rejected() {
    let seen = Seen::default();
    let body = json!([event(
        "Microsoft.EventGrid.SubscriptionValidationEvent",
        json!({"unexpected": true})
    )]);
    let request = Request::builder()
        .method("POST")
        .uri("/api/events")
        .header("aeg-event-type", "SubscriptionValidation")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap();

    let (status, response) = send(app(&seen, false), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(response["error"]
        .as_str()
        .unwrap()
        .contains("Microsoft.EventGrid.SubscriptionValidationEvent"));
}

#[tokio::test]
async fn schema_drift_is_a_bad_request() {
    let seen = Seen::default();
    let body = json!([event(STORAGE_BLOB_CREATED, json!({"wrongField": 1}))]);

    let (status, summary) = send(app(&seen, false), delivery(&body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(summary["failed"], 1);
    assert!(seen.urls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn retryable_handler_failures_ask_for_redelivery() {
    let seen = Seen::default();
    let body = json!([
        event(STORAGE_BLOB_CREATED, json!({"wrongField": 1})),
        event(CONTOSO_ITEM_RECEIVED, json!({"itemSku": "SKU-3"})),
    ]);

    let (status, summary) = send(app(&seen, true), delivery(&body)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(summary["failed"], 2);
}

#[tokio::test]
async fn malformed_elements_do_not_block_the_rest() {
    let seen = Seen::default();
    let body = json!([
        {"id": "no-type", "subject": "s", "eventTime": "2024-05-01T10:00:00Z"},
        event(CONTOSO_ITEM_RECEIVED, json!({"itemSku": "SKU-4"})),
    ]);

    let (status, summary) = send(app(&seen, false), delivery(&body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(summary, json!({"handled": 1, "unhandled": 0, "failed": 1}));
    assert_eq!(*seen.skus.lock().unwrap(), vec!["SKU-4".to_string()]);
}

#[tokio::test]
async fn non_json_bodies_are_rejected() {
    let seen = Seen::default();
    let request = Request::builder()
        .method("POST")
        .uri("/api/events")
        .body(Body::from("definitely not json"))
        .unwrap();

    let (status, response) = send(app(&seen, false), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(response["error"]
        .as_str()
        .unwrap()
        .starts_with("Malformed envelope"));
}

#[tokio::test]
async fn health_endpoint_answers() {
    let seen = Seen::default();
    let request = Request::builder()
        .uri("/api/events/health")
        .body(Body::empty())
        .unwrap();

    let response = app(&seen, false).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn serve_stops_on_shutdown() {
    let config = ListenerConfig::new(SocketAddr::from(([127, 0, 0, 1], 0)), "/hooks/grid").unwrap();

    serve(config, Arc::new(EventDispatcher::new()), async {})
        .await
        .unwrap();
}
