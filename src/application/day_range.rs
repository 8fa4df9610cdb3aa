// Day-range fetcher - enumerate calendar days and fan out one read per day
use crate::application::log_store::LogStore;
use crate::domain::range::DateRange;
use chrono::{Datelike, NaiveDate};
use futures::future::join_all;
use serde_json::Value;
use std::sync::Arc;

/// Partition path for one calendar day under `root`. Year is four
/// digits, month and day are zero-padded to two.
pub fn day_partition_path(root: &str, day: NaiveDate) -> String {
    format!(
        "{}/{:04}/{:02}/{:02}",
        root,
        day.year(),
        day.month(),
        day.day()
    )
}

/// Fetch every day partition in `range` concurrently and join on all
/// of them. The result is aligned 1:1 with the enumerated day list;
/// a failed or absent day contributes `None` and never aborts its
/// siblings.
pub async fn fetch_day_partitions(
    store: &Arc<dyn LogStore>,
    root: &str,
    range: &DateRange,
) -> Vec<(NaiveDate, Option<Value>)> {
    let days: Vec<NaiveDate> = range.days().collect();
    tracing::debug!(root, days = days.len(), "fetching day partitions");

    let fetches = days.iter().map(|day| {
        let store = store.clone();
        let path = day_partition_path(root, *day);
        async move {
            match store.read(&path).await {
                Ok(value) => value,
                Err(e) => {
                    tracing::warn!(%path, error = %e, "day fetch failed, treating as empty");
                    None
                }
            }
        }
    });

    let payloads = join_all(fetches).await;
    let fetched = payloads.iter().filter(|p| p.is_some()).count();
    tracing::debug!(root, fetched, "day partitions fetched");

    days.into_iter().zip(payloads).collect()
}
