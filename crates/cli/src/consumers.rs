//! Handlers for the event types the samples produce.
//!
//! Each handler logs what it received: the blob URL for storage events,
//! the item SKU for custom topic events.

use eventing::payloads::{
    ContosoItemReceivedEventData, StorageBlobCreatedEventData, StorageBlobDeletedEventData,
    CONTOSO_ITEM_RECEIVED, STORAGE_BLOB_CREATED, STORAGE_BLOB_DELETED,
};
use eventing::{handler_fn, EventDispatcher, HandlerError, TypedEvent};
use tracing::info;

/// Builds the dispatcher used by `listen` and `dispatch`.
pub fn sample_dispatcher() -> EventDispatcher {
    let mut dispatcher = EventDispatcher::new();

    dispatcher.register_json::<StorageBlobCreatedEventData, _>(
        STORAGE_BLOB_CREATED,
        handler_fn(|event: TypedEvent<StorageBlobCreatedEventData>| async move {
            on_blob_created(event)
        }),
    );
    dispatcher.register_json::<StorageBlobDeletedEventData, _>(
        STORAGE_BLOB_DELETED,
        handler_fn(|event: TypedEvent<StorageBlobDeletedEventData>| async move {
            on_blob_deleted(event)
        }),
    );
    dispatcher.register_json::<ContosoItemReceivedEventData, _>(
        CONTOSO_ITEM_RECEIVED,
        handler_fn(|event: TypedEvent<ContosoItemReceivedEventData>| async move {
            on_item_received(event)
        }),
    );

    dispatcher
}

fn on_blob_created(event: TypedEvent<StorageBlobCreatedEventData>) -> Result<(), HandlerError> {
    info!(
        event_id = %event.metadata.id,
        subject = %event.metadata.subject,
        blob_url = %event.data.url,
        content_length = event.data.content_length,
        "got BlobCreated event"
    );
    Ok(())
}

fn on_blob_deleted(event: TypedEvent<StorageBlobDeletedEventData>) -> Result<(), HandlerError> {
    info!(
        event_id = %event.metadata.id,
        subject = %event.metadata.subject,
        blob_url = %event.data.url,
        "got BlobDeleted event"
    );
    Ok(())
}

fn on_item_received(event: TypedEvent<ContosoItemReceivedEventData>) -> Result<(), HandlerError> {
    info!(
        event_id = %event.metadata.id,
        subject = %event.metadata.subject,
        item_sku = %event.data.item_sku,
        "got ContosoItemReceived event"
    );
    Ok(())
}
