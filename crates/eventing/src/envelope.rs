//! The event envelope: metadata plus an opaque, not-yet-decoded payload.
//!
//! Envelopes are transient. One is built per received (or published) event,
//! consumed once, and dropped. The `data` field stays an untyped
//! [`serde_json::Value`] until the dispatcher has resolved which schema
//! applies; decoding it any earlier would force one payload shape onto events
//! of a different type.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{DataVersion, DispatchError, EventId, Timestamp};

/// One event instance in the transport's JSON schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelope {
    /// Unique identifier of this event.
    pub id: EventId,

    /// Full resource path of the topic the event was published to.
    ///
    /// Filled in by the transport; publishers normally leave it unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,

    /// Free-text path identifying the resource the event is about.
    pub subject: String,

    /// Discriminator naming the payload schema. Compared case-insensitively.
    pub event_type: String,

    /// When the producer says the event happened.
    pub event_time: Timestamp,

    /// Opaque payload; decoded only after the type has been resolved.
    #[serde(default)]
    pub data: Value,

    /// Schema version of `data`.
    #[serde(default)]
    pub data_version: DataVersion,

    /// Schema version of the envelope itself, set by the transport.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata_version: Option<String>,
}

/// Everything in an [`EventEnvelope`] except its payload.
///
/// Handed to handlers alongside the decoded data.
#[derive(Debug, Clone, PartialEq)]
pub struct EventMetadata {
    pub id: EventId,
    pub topic: Option<String>,
    pub subject: String,
    pub event_type: String,
    pub event_time: Timestamp,
    pub data_version: DataVersion,
}

impl EventEnvelope {
    /// Builds an outbound envelope with a random id and the current time.
    ///
    /// The data version defaults to empty; set it with
    /// [`EventEnvelope::with_data_version`].
    pub fn new<T: Serialize>(
        subject: impl Into<String>,
        event_type: impl Into<String>,
        data: &T,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            id: EventId::new_random(),
            topic: None,
            subject: subject.into(),
            event_type: event_type.into(),
            event_time: Timestamp::now(),
            data: serde_json::to_value(data)?,
            data_version: DataVersion::default(),
            metadata_version: None,
        })
    }

    /// Sets the payload schema version.
    pub fn with_data_version(mut self, version: impl Into<String>) -> Self {
        self.data_version = DataVersion::new(version);
        self
    }

    /// Parses and validates one envelope from raw JSON bytes.
    pub fn from_slice(raw: &[u8]) -> Result<Self, DispatchError> {
        let value: Value = serde_json::from_slice(raw).map_err(DispatchError::malformed)?;
        Self::from_value(value)
    }

    /// Parses and validates one envelope from an already parsed JSON value.
    ///
    /// Only a JSON object is an envelope. serde would otherwise accept an
    /// array and read its elements as the fields in declaration order.
    pub fn from_value(value: Value) -> Result<Self, DispatchError> {
        if !value.is_object() {
            return Err(DispatchError::malformed(format!(
                "expected an envelope object, found {}",
                json_kind(&value)
            )));
        }
        let envelope: Self = serde_json::from_value(value).map_err(DispatchError::malformed)?;
        envelope.validated()
    }

    fn validated(self) -> Result<Self, DispatchError> {
        if self.id.is_empty() {
            return Err(DispatchError::malformed("field `id` is empty"));
        }
        if self.event_type.trim().is_empty() {
            return Err(DispatchError::malformed("field `eventType` is empty"));
        }
        Ok(self)
    }

    /// Splits the envelope into its metadata and raw payload.
    pub fn into_parts(self) -> (EventMetadata, Value) {
        let metadata = EventMetadata {
            id: self.id,
            topic: self.topic,
            subject: self.subject,
            event_type: self.event_type,
            event_time: self.event_time,
            data_version: self.data_version,
        };
        (metadata, self.data)
    }
}

/// Parses a delivery body into envelopes.
///
/// The transport delivers a JSON array of envelopes; a single bare envelope
/// object is also accepted. Each element is validated on its own so that one
/// malformed element does not hide the rest of the batch.
///
/// Fails as a whole only when the body is not JSON, or is JSON but neither
/// an array nor an object.
pub fn parse_batch(raw: &[u8]) -> Result<Vec<Result<EventEnvelope, DispatchError>>, DispatchError> {
    let body: Value = serde_json::from_slice(raw).map_err(DispatchError::malformed)?;
    match body {
        Value::Array(items) => Ok(items.into_iter().map(EventEnvelope::from_value).collect()),
        object @ Value::Object(_) => Ok(vec![EventEnvelope::from_value(object)]),
        other => Err(DispatchError::malformed(format!(
            "expected an envelope object or array, found {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn blob_created() -> Value {
        json!({
            "topic": "/subscriptions/0000/resourceGroups/rg/providers/Microsoft.Storage/storageAccounts/acct",
            "subject": "/blobServices/default/containers/samples/blobs/eg_1.txt",
            "eventType": "Microsoft.Storage.BlobCreated",
            "eventTime": "2018-01-25T22:12:19.4556811Z",
            "id": "831e1650-001e-001b-66ab-eeb76e069631",
            "data": { "url": "https://acct.blob.core.windows.net/samples/eg_1.txt" },
            "dataVersion": "",
            "metadataVersion": "1"
        })
    }

    #[test]
    fn parses_a_transport_envelope() {
        let raw = serde_json::to_vec(&blob_created()).unwrap();
        let envelope = EventEnvelope::from_slice(&raw).unwrap();

        assert_eq!(envelope.event_type, "Microsoft.Storage.BlobCreated");
        assert_eq!(envelope.id.as_str(), "831e1650-001e-001b-66ab-eeb76e069631");
        assert_eq!(envelope.metadata_version.as_deref(), Some("1"));
        assert_eq!(
            envelope.data["url"],
            "https://acct.blob.core.windows.net/samples/eg_1.txt"
        );
    }

    #[test]
    fn missing_or_empty_event_type_is_malformed() {
        let mut value = blob_created();
        value["eventType"] = json!("  ");
        assert!(matches!(
            EventEnvelope::from_value(value),
            Err(DispatchError::MalformedEnvelope { .. })
        ));

        let mut value = blob_created();
        value.as_object_mut().unwrap().remove("eventType");
        assert!(matches!(
            EventEnvelope::from_value(value),
            Err(DispatchError::MalformedEnvelope { .. })
        ));
    }

    #[test]
    fn empty_id_is_malformed() {
        let mut value = blob_created();
        value["id"] = json!("");
        assert!(EventEnvelope::from_value(value).is_err());
    }

    #[test]
    fn data_and_data_version_are_optional() {
        let mut value = blob_created();
        let object = value.as_object_mut().unwrap();
        object.remove("data");
        object.remove("dataVersion");

        let envelope = EventEnvelope::from_value(value).unwrap();
        assert_eq!(envelope.data, Value::Null);
        assert_eq!(envelope.data_version.as_str(), "");
    }

    #[test]
    fn outbound_envelopes_serialise_in_camel_case() {
        let envelope = EventEnvelope::new("Door0", "Contoso.Items.ItemReceived", &json!({"itemSku": "A"}))
            .unwrap()
            .with_data_version("2.0");
        let value = serde_json::to_value(&envelope).unwrap();

        assert_eq!(value["eventType"], "Contoso.Items.ItemReceived");
        assert_eq!(value["dataVersion"], "2.0");
        assert_eq!(value["data"]["itemSku"], "A");
        assert!(value.get("topic").is_none());
        assert!(value.get("metadataVersion").is_none());
    }

    #[test]
    fn batches_keep_good_elements_next_to_bad_ones() {
        let raw = serde_json::to_vec(&json!([blob_created(), {"id": "x"}, blob_created()])).unwrap();
        let results = parse_batch(&raw).unwrap();

        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
        assert!(results[2].is_ok());
    }

    #[test]
    fn nested_arrays_in_a_batch_are_malformed_elements() {
        let raw = serde_json::to_vec(&json!([
            ["1", null, "s", "Unknown.Type", "2024-05-01T10:00:00Z"],
            blob_created()
        ]))
        .unwrap();
        let results = parse_batch(&raw).unwrap();

        assert!(matches!(
            &results[0],
            Err(DispatchError::MalformedEnvelope { reason }) if reason.contains("an array")
        ));
        assert!(results[1].is_ok());
    }

    #[test]
    fn a_single_object_is_a_batch_of_one() {
        let raw = serde_json::to_vec(&blob_created()).unwrap();
        assert_eq!(parse_batch(&raw).unwrap().len(), 1);
    }

    #[test]
    fn scalar_bodies_are_rejected() {
        assert!(matches!(
            parse_batch(b"42"),
            Err(DispatchError::MalformedEnvelope { reason }) if reason.contains("a number")
        ));
        assert!(parse_batch(b"not json").is_err());
    }
}
