//! Payload schemas for the event types the samples produce and consume.
//!
//! Only the fields a consumer needs are required; the transport adds fields
//! over time and unknown keys are ignored when decoding.

use serde::{Deserialize, Serialize};

/// Custom topic event raised when an item is received.
pub const CONTOSO_ITEM_RECEIVED: &str = "Contoso.Items.ItemReceived";

/// System event raised by a storage account when a blob is created.
pub const STORAGE_BLOB_CREATED: &str = "Microsoft.Storage.BlobCreated";

/// System event raised by a storage account when a blob is deleted.
pub const STORAGE_BLOB_DELETED: &str = "Microsoft.Storage.BlobDeleted";

/// Handshake event sent when a webhook subscription is created.
pub const SUBSCRIPTION_VALIDATION: &str = "Microsoft.EventGrid.SubscriptionValidationEvent";

/// Data of a [`CONTOSO_ITEM_RECEIVED`] event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContosoItemReceivedEventData {
    pub item_sku: String,
}

impl ContosoItemReceivedEventData {
    pub fn new(item_sku: impl Into<String>) -> Self {
        Self {
            item_sku: item_sku.into(),
        }
    }
}

/// Data of a [`STORAGE_BLOB_CREATED`] event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageBlobCreatedEventData {
    /// URL of the created blob.
    pub url: String,
    /// Storage operation that triggered the event (e.g. `"PutBlob"`).
    #[serde(default)]
    pub api: Option<String>,
    #[serde(default)]
    pub client_request_id: Option<String>,
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(default, rename = "eTag")]
    pub e_tag: Option<String>,
    #[serde(default)]
    pub content_type: Option<String>,
    /// Size of the blob in bytes.
    #[serde(default)]
    pub content_length: Option<u64>,
    #[serde(default)]
    pub blob_type: Option<String>,
    /// Opaque ordering key for events on the same blob name.
    #[serde(default)]
    pub sequencer: Option<String>,
}

/// Data of a [`STORAGE_BLOB_DELETED`] event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageBlobDeletedEventData {
    /// URL of the deleted blob.
    pub url: String,
    #[serde(default)]
    pub api: Option<String>,
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub blob_type: Option<String>,
    #[serde(default)]
    pub sequencer: Option<String>,
}

/// Data of a [`SUBSCRIPTION_VALIDATION`] event.
///
/// The endpoint proves ownership by echoing `validation_code` back in the
/// response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionValidationEventData {
    pub validation_code: String,
    /// Manual validation link, present on newer API versions.
    #[serde(default)]
    pub validation_url: Option<String>,
}

/// Response body completing the subscription validation handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionValidationResponse {
    pub validation_response: String,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn blob_created_tolerates_unknown_fields() {
        let data: StorageBlobCreatedEventData = serde_json::from_value(json!({
            "api": "PutBlockList",
            "eTag": "0x8D4BCC2E4835CD0",
            "contentLength": 524288,
            "url": "https://acct.blob.core.windows.net/samples/eg_1.txt",
            "storageDiagnostics": { "batchId": "b68529f3" }
        }))
        .unwrap();

        assert_eq!(data.api.as_deref(), Some("PutBlockList"));
        assert_eq!(data.e_tag.as_deref(), Some("0x8D4BCC2E4835CD0"));
        assert_eq!(data.content_length, Some(524_288));
    }

    #[test]
    fn blob_created_requires_url() {
        let result = serde_json::from_value::<StorageBlobCreatedEventData>(json!({"wrongField": 1}));
        assert!(result.is_err());
    }

    #[test]
    fn item_sku_uses_camel_case_on_the_wire() {
        let value = serde_json::to_value(ContosoItemReceivedEventData::new("Contoso Item SKU #1")).unwrap();
        assert_eq!(value, json!({"itemSku": "Contoso Item SKU #1"}));
    }
}
