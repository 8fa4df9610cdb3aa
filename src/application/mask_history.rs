// Mask-detection history pipeline - fetch and count per-event logs
use crate::application::day_range::fetch_day_partitions;
use crate::application::log_store::LogStore;
use crate::domain::mask::{MaskAggregate, MaskCategory, MaskLogEntry};
use crate::domain::range::DateRange;
use serde_json::Value;
use std::sync::Arc;

pub const MASK_LOG_ROOT: &str = "mask_logs";

#[derive(Clone)]
pub struct MaskHistoryService {
    store: Arc<dyn LogStore>,
}

impl MaskHistoryService {
    pub fn new(store: Arc<dyn LogStore>) -> Self {
        Self { store }
    }

    /// Aggregate detection counts over `range`. Per-day results are
    /// merged with a running sum; days and categories carry no
    /// ordering dependency.
    pub async fn load(&self, range: &DateRange) -> MaskAggregate {
        let partitions = fetch_day_partitions(&self.store, MASK_LOG_ROOT, range).await;

        let mut aggregate = MaskAggregate::default();
        for (_, payload) in partitions {
            if let Some(payload) = payload {
                aggregate.merge(scan_day_partition(&payload));
            }
        }
        tracing::debug!(
            total = aggregate.total_detections,
            mask_on = aggregate.mask_on_count,
            mask_off = aggregate.mask_off_count,
            "mask logs aggregated"
        );
        aggregate
    }
}

/// Count every entry under the partition's known category sub-nodes.
/// Both "no mask" spellings map to the off-category; unknown node
/// names and malformed entries are ignored.
fn scan_day_partition(payload: &Value) -> MaskAggregate {
    let mut aggregate = MaskAggregate::default();
    let Some(nodes) = payload.as_object() else {
        return aggregate;
    };
    for (node_name, entries) in nodes {
        let Some(category) = MaskCategory::from_node_name(node_name) else {
            continue;
        };
        let Some(entries) = entries.as_object() else {
            continue;
        };
        for entry in entries.values() {
            let Ok(entry) = serde_json::from_value::<MaskLogEntry>(entry.clone()) else {
                continue;
            };
            aggregate.record(category, &entry.status);
        }
    }
    aggregate
}
