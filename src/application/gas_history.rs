// Gas-PPM history pipeline - fetch, reconstruct, sort, downsample
use crate::application::day_range::fetch_day_partitions;
use crate::application::log_store::LogStore;
use crate::domain::gas::{gas_field_key, GasPoint};
use crate::domain::range::DateRange;
use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

pub const PPM_LOG_ROOT: &str = "ppm_logs";

// Downsampling kicks in only past both bounds; the exact values are
// part of the observable contract.
const DOWNSAMPLE_SPAN_DAYS: i64 = 2;
const DOWNSAMPLE_POINT_LIMIT: usize = 1000;

const MS_PER_HOUR: i64 = 3_600_000;

/// Reported user-input conditions. These short-circuit before any
/// fetch and carry the user-facing message; they are not faults.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HistoryError {
    #[error("select at least one gas type")]
    EmptyGasSelection,
    #[error("select a valid date range")]
    InvalidRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GasHistory {
    pub points: Vec<GasPoint>,
    pub downsampled: bool,
}

#[derive(Clone)]
pub struct GasHistoryService {
    store: Arc<dyn LogStore>,
}

impl GasHistoryService {
    pub fn new(store: Arc<dyn LogStore>) -> Self {
        Self { store }
    }

    /// Load the time-ordered concentration series for `gases` over
    /// `range`, downsampled to hourly means when the range is long
    /// and the merged series is large.
    pub async fn load(
        &self,
        gases: &[String],
        range: &DateRange,
    ) -> Result<GasHistory, HistoryError> {
        if gases.is_empty() {
            return Err(HistoryError::EmptyGasSelection);
        }
        let symbols: Vec<String> = gases.iter().map(|g| g.to_uppercase()).collect();

        let partitions = fetch_day_partitions(&self.store, PPM_LOG_ROOT, range).await;

        let mut points = Vec::new();
        for (day, payload) in partitions {
            if let Some(payload) = payload {
                extract_day_points(day, &payload, &symbols, &mut points);
            }
        }
        tracing::debug!(total = points.len(), "merged ppm points before sort");

        // Day fetches complete in arbitrary order; chronology is
        // restored here.
        points.sort_by_key(|p| p.timestamp);

        if range.span_days() > DOWNSAMPLE_SPAN_DAYS && points.len() > DOWNSAMPLE_POINT_LIMIT {
            let aggregated = downsample_hourly(points);
            tracing::debug!(total = aggregated.len(), "downsampled to hourly means");
            return Ok(GasHistory {
                points: aggregated,
                downsampled: true,
            });
        }

        Ok(GasHistory {
            points,
            downsampled: false,
        })
    }
}

/// Walk one day partition's hour -> minute -> field-map structure and
/// emit a point per requested symbol found at each minute. Nodes that
/// are not well-formed maps are skipped.
fn extract_day_points(day: NaiveDate, payload: &Value, symbols: &[String], out: &mut Vec<GasPoint>) {
    let Some(hours) = payload.as_object() else {
        tracing::debug!(%day, "day partition is not a map, skipping");
        return;
    };
    for (hour, minutes) in hours {
        let Some(minutes) = minutes.as_object() else {
            continue;
        };
        for (minute, readings) in minutes {
            let Some(readings) = readings.as_object() else {
                continue;
            };
            let Some(timestamp) = reconstruct_timestamp(day, hour, minute) else {
                continue;
            };
            for symbol in symbols {
                let field = gas_field_key(symbol);
                if let Some(value) = readings.get(&field).and_then(Value::as_f64) {
                    out.push(GasPoint::new(timestamp, symbol.clone(), value));
                }
            }
        }
    }
}

/// Combine the day's calendar date with an hour/minute node-key pair
/// into epoch millis, seconds fixed at 0, under the strict
/// `YYYY-MM-DD HH:mm:ss` pattern. Malformed keys yield `None`.
fn reconstruct_timestamp(day: NaiveDate, hour: &str, minute: &str) -> Option<i64> {
    let stamp = format!("{} {}:{}:00", day.format("%Y-%m-%d"), hour, minute);
    let parsed = NaiveDateTime::parse_from_str(&stamp, "%Y-%m-%d %H:%M:%S").ok()?;
    Some(parsed.and_utc().timestamp_millis())
}

/// Replace each (gas, hour-bucket) group with one point at the hour's
/// start whose value is the group's arithmetic mean rounded to two
/// decimals, re-sorted ascending.
fn downsample_hourly(points: Vec<GasPoint>) -> Vec<GasPoint> {
    let mut groups: HashMap<(String, i64), (f64, u32)> = HashMap::new();
    for point in &points {
        let bucket = hour_start_ms(point.timestamp);
        let entry = groups.entry((point.gas.clone(), bucket)).or_insert((0.0, 0));
        entry.0 += point.value;
        entry.1 += 1;
    }

    let mut aggregated: Vec<GasPoint> = groups
        .into_iter()
        .map(|((gas, bucket), (sum, count))| {
            GasPoint::new(bucket, gas, round_2dp(sum / count as f64))
        })
        .collect();
    aggregated.sort_by(|a, b| {
        a.timestamp
            .cmp(&b.timestamp)
            .then_with(|| a.gas.cmp(&b.gas))
    });
    aggregated
}

fn hour_start_ms(timestamp: i64) -> i64 {
    timestamp - timestamp.rem_euclid(MS_PER_HOUR)
}

fn round_2dp(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_store::MockStore;
    use crate::domain::gas::{classify_gas_status, GasStatus};
    use serde_json::json;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn range(start: NaiveDate, end: NaiveDate) -> DateRange {
        DateRange::new(start, end).unwrap()
    }

    /// A day partition with `minutes` readings in each of `hours`
    /// consecutive hours, all carrying the given field.
    fn dense_day(hours: u32, minutes: u32, field: &str, value: f64) -> Value {
        let mut day = serde_json::Map::new();
        for h in 0..hours {
            let mut hour = serde_json::Map::new();
            for m in 0..minutes {
                hour.insert(format!("{m:02}"), json!({ field: value }));
            }
            day.insert(format!("{h:02}"), Value::Object(hour));
        }
        Value::Object(day)
    }

    #[tokio::test]
    async fn test_single_minute_partition_yields_one_point() {
        let store = MockStore::new()
            .with_value(
                "ppm_logs/2024/06/15",
                json!({ "10": { "15": { "C2H5OH_ppm": 1.5 } } }),
            )
            .into_store();
        let service = GasHistoryService::new(store);

        let history = service
            .load(
                &["c2h5oh".to_string()],
                &range(date(2024, 6, 15), date(2024, 6, 15)),
            )
            .await
            .unwrap();

        assert_eq!(history.points.len(), 1);
        let point = &history.points[0];
        assert_eq!(point.gas, "C2H5OH");
        assert_eq!(point.value, 1.5);
        // 2024-06-15 10:15:00 UTC
        assert_eq!(point.timestamp, 1_718_446_500_000);
        assert!(!history.downsampled);
        assert_eq!(classify_gas_status(&point.gas, point.value), GasStatus::Warning);
    }

    #[tokio::test]
    async fn test_empty_gas_selection_performs_no_fetch() {
        let mock = Arc::new(MockStore::new());
        let service = GasHistoryService::new(mock.clone());

        let result = service
            .load(&[], &range(date(2024, 6, 15), date(2024, 6, 16)))
            .await;

        assert_eq!(result, Err(HistoryError::EmptyGasSelection));
        assert_eq!(mock.read_count(), 0);
    }

    #[tokio::test]
    async fn test_output_sorted_when_days_complete_out_of_order() {
        let store = MockStore::new()
            .with_value(
                "ppm_logs/2024/06/15",
                json!({ "08": { "00": { "H2S_ppm": 1.0 }, "30": { "H2S_ppm": 2.0 } } }),
            )
            .with_delay("ppm_logs/2024/06/15", 30)
            .with_value(
                "ppm_logs/2024/06/16",
                json!({ "09": { "10": { "H2S_ppm": 3.0 } } }),
            )
            .into_store();
        let service = GasHistoryService::new(store);

        let history = service
            .load(
                &["H2S".to_string()],
                &range(date(2024, 6, 15), date(2024, 6, 16)),
            )
            .await
            .unwrap();

        let timestamps: Vec<i64> = history.points.iter().map(|p| p.timestamp).collect();
        let mut sorted = timestamps.clone();
        sorted.sort();
        assert_eq!(timestamps, sorted);
        assert_eq!(history.points.len(), 3);
    }

    #[tokio::test]
    async fn test_malformed_nodes_are_skipped() {
        let store = MockStore::new()
            .with_value(
                "ppm_logs/2024/06/15",
                json!({
                    "10": {
                        "00": { "NO2_ppm": 2.0 },
                        "01": "not a map",
                        "02": { "NO2_ppm": "not a number" },
                    },
                    "11": "not a map",
                }),
            )
            .into_store();
        let service = GasHistoryService::new(store);

        let history = service
            .load(
                &["NO2".to_string()],
                &range(date(2024, 6, 15), date(2024, 6, 15)),
            )
            .await
            .unwrap();

        assert_eq!(history.points.len(), 1);
        assert_eq!(history.points[0].value, 2.0);
    }

    #[tokio::test]
    async fn test_three_day_range_over_limit_downsamples() {
        // 3 days x 24h x 20min = 1440 points, limit is 1000.
        let day = dense_day(24, 20, "C2H5OH_ppm", 1.0);
        let store = MockStore::new()
            .with_value("ppm_logs/2024/06/10", day.clone())
            .with_value("ppm_logs/2024/06/11", day.clone())
            .with_value("ppm_logs/2024/06/12", day)
            .into_store();
        let service = GasHistoryService::new(store);

        let history = service
            .load(
                &["C2H5OH".to_string()],
                &range(date(2024, 6, 10), date(2024, 6, 12)),
            )
            .await
            .unwrap();

        assert!(history.downsampled);
        // One mean per hour per day.
        assert_eq!(history.points.len(), 72);
        assert!(history
            .points
            .iter()
            .all(|p| p.timestamp % MS_PER_HOUR == 0));
    }

    #[tokio::test]
    async fn test_two_day_range_over_limit_does_not_downsample() {
        // 2 days x 24h x 21min = 1008 points, still over the limit,
        // but the span bound is "more than 2 days".
        let day = dense_day(24, 21, "C2H5OH_ppm", 1.0);
        let store = MockStore::new()
            .with_value("ppm_logs/2024/06/10", day.clone())
            .with_value("ppm_logs/2024/06/11", day)
            .into_store();
        let service = GasHistoryService::new(store);

        let history = service
            .load(
                &["C2H5OH".to_string()],
                &range(date(2024, 6, 10), date(2024, 6, 11)),
            )
            .await
            .unwrap();

        assert!(!history.downsampled);
        assert_eq!(history.points.len(), 1008);
    }

    #[tokio::test]
    async fn test_three_day_range_under_limit_does_not_downsample() {
        let day = dense_day(2, 5, "C2H5OH_ppm", 1.0);
        let store = MockStore::new()
            .with_value("ppm_logs/2024/06/10", day)
            .into_store();
        let service = GasHistoryService::new(store);

        let history = service
            .load(
                &["C2H5OH".to_string()],
                &range(date(2024, 6, 10), date(2024, 6, 12)),
            )
            .await
            .unwrap();

        assert!(!history.downsampled);
        assert_eq!(history.points.len(), 10);
    }

    #[tokio::test]
    async fn test_identical_requests_yield_identical_output() {
        let day = dense_day(24, 20, "H2S_ppm", 5.0);
        let mock = MockStore::new()
            .with_value("ppm_logs/2024/06/10", day.clone())
            .with_value("ppm_logs/2024/06/11", day.clone())
            .with_value("ppm_logs/2024/06/12", day);
        let service = GasHistoryService::new(mock.into_store());

        let gases = vec!["H2S".to_string()];
        let r = range(date(2024, 6, 10), date(2024, 6, 12));
        let first = service.load(&gases, &r).await.unwrap();
        let second = service.load(&gases, &r).await.unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_hour_bucket_mean_rounds_to_two_decimals() {
        let base = 1_718_445_600_000; // 2024-06-15 10:00:00 UTC
        let points = vec![
            GasPoint::new(base + 60_000, "H2S".to_string(), 10.0),
            GasPoint::new(base + 120_000, "H2S".to_string(), 20.0),
            GasPoint::new(base + 180_000, "H2S".to_string(), 30.0),
        ];
        let aggregated = downsample_hourly(points);
        assert_eq!(aggregated.len(), 1);
        assert_eq!(aggregated[0].timestamp, base);
        assert_eq!(aggregated[0].value, 20.0);

        let uneven = vec![
            GasPoint::new(base, "H2S".to_string(), 1.111),
            GasPoint::new(base + 1, "H2S".to_string(), 2.222),
        ];
        assert_eq!(downsample_hourly(uneven)[0].value, 1.67);
    }

    #[test]
    fn test_downsampling_groups_per_gas() {
        let base = 1_718_445_600_000;
        let points = vec![
            GasPoint::new(base, "H2S".to_string(), 10.0),
            GasPoint::new(base + 1, "NO2".to_string(), 2.0),
            GasPoint::new(base + 2, "H2S".to_string(), 20.0),
        ];
        let aggregated = downsample_hourly(points);
        assert_eq!(aggregated.len(), 2);
        assert_eq!(aggregated[0].gas, "H2S");
        assert_eq!(aggregated[0].value, 15.0);
        assert_eq!(aggregated[1].gas, "NO2");
        assert_eq!(aggregated[1].value, 2.0);
    }

    #[test]
    fn test_reconstruct_timestamp_rejects_malformed_keys() {
        let day = date(2024, 6, 15);
        assert_eq!(
            reconstruct_timestamp(day, "10", "15"),
            Some(1_718_446_500_000)
        );
        assert_eq!(reconstruct_timestamp(day, "25", "00"), None);
        assert_eq!(reconstruct_timestamp(day, "10", "61"), None);
        assert_eq!(reconstruct_timestamp(day, "aa", "00"), None);
    }
}
