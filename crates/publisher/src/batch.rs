//! Synthetic batches for the sample custom-topic publisher.

use eventing::payloads::{ContosoItemReceivedEventData, CONTOSO_ITEM_RECEIVED};
use eventing::{EventEnvelope, PublishError};

/// Data version stamped on the sample item events.
pub const SAMPLE_DATA_VERSION: &str = "2.0";

/// Builds `count` [`CONTOSO_ITEM_RECEIVED`] events for `item_sku`.
///
/// Subjects run `Door0`, `Door1`, ... in batch order; every event gets a
/// fresh id and the current time.
pub fn sample_item_batch(count: usize, item_sku: &str) -> Result<Vec<EventEnvelope>, PublishError> {
    let data = ContosoItemReceivedEventData::new(item_sku);
    (0..count)
        .map(|i| {
            EventEnvelope::new(format!("Door{i}"), CONTOSO_ITEM_RECEIVED, &data)
                .map(|event| event.with_data_version(SAMPLE_DATA_VERSION))
                .map_err(|e| PublishError::Serialization {
                    message: e.to_string(),
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn builds_numbered_item_events() {
        let batch = sample_item_batch(5, "Contoso Item SKU #1").unwrap();

        let subjects: Vec<_> = batch.iter().map(|e| e.subject.as_str()).collect();
        assert_eq!(subjects, ["Door0", "Door1", "Door2", "Door3", "Door4"]);
        assert!(batch.iter().all(|e| e.event_type == CONTOSO_ITEM_RECEIVED));
        assert!(batch.iter().all(|e| e.data_version.as_str() == "2.0"));
        assert!(batch
            .iter()
            .all(|e| e.data["itemSku"] == "Contoso Item SKU #1"));

        let ids: HashSet<_> = batch.iter().map(|e| e.id.clone()).collect();
        assert_eq!(ids.len(), 5);
    }

    #[test]
    fn zero_count_is_an_empty_batch() {
        assert!(sample_item_batch(0, "sku").unwrap().is_empty());
    }
}
