// Mask detection log domain models
use serde::{Deserialize, Serialize};

/// Canonical detection category. The upstream producer writes the
/// off-category under two different sub-node spellings, so raw node
/// names go through `from_node_name` instead of ad hoc string checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskCategory {
    MaskOn,
    MaskOff,
}

impl MaskCategory {
    /// Map a raw day-partition sub-node name to its category.
    /// Unknown node names are ignored by the scan.
    pub fn from_node_name(name: &str) -> Option<Self> {
        match name {
            "mask" => Some(Self::MaskOn),
            "no mask" | "no_mask" => Some(Self::MaskOff),
            _ => None,
        }
    }

    /// The status label an entry must carry (after trimming and
    /// case-folding) to count toward this category's bucket.
    fn canonical_status(self) -> &'static str {
        match self {
            Self::MaskOn => "mask",
            Self::MaskOff => "no mask",
        }
    }

    pub fn matches_status(self, status: &str) -> bool {
        status.trim().eq_ignore_ascii_case(self.canonical_status())
    }
}

/// One detection event as stored under a category sub-node.
#[derive(Debug, Clone, Deserialize)]
pub struct MaskLogEntry {
    #[serde(default)]
    pub status: String,
    #[allow(dead_code)]
    #[serde(default)]
    pub timestamp: String,
    #[allow(dead_code)]
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Running counts over a date range. `total_detections` counts every
/// entry with a non-empty status, so it can exceed the sum of the two
/// buckets when a status matches neither canonical label.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MaskAggregate {
    pub mask_on_count: u64,
    pub mask_off_count: u64,
    pub total_detections: u64,
}

impl MaskAggregate {
    /// Count one entry found under `category`'s sub-node. Entries with
    /// an empty status are not detections at all.
    pub fn record(&mut self, category: MaskCategory, status: &str) {
        if status.is_empty() {
            return;
        }
        self.total_detections += 1;
        if category.matches_status(status) {
            match category {
                MaskCategory::MaskOn => self.mask_on_count += 1,
                MaskCategory::MaskOff => self.mask_off_count += 1,
            }
        }
    }

    /// Fold another aggregate in. Counting is commutative, so per-day
    /// results can merge in any completion order.
    pub fn merge(&mut self, other: MaskAggregate) {
        self.mask_on_count += other.mask_on_count;
        self.mask_off_count += other.mask_off_count;
        self.total_detections += other.total_detections;
    }

    pub fn mask_on_percent(&self) -> f64 {
        percent_of(self.mask_on_count, self.total_detections)
    }

    pub fn mask_off_percent(&self) -> f64 {
        percent_of(self.mask_off_count, self.total_detections)
    }
}

/// Share of `count` in `total` as a percentage rounded to one decimal
/// place, 0 when there is no data.
fn percent_of(count: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let raw = count as f64 / total as f64 * 100.0;
    (raw * 10.0).round() / 10.0
}
