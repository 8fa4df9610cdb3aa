// HTTP request handlers
use crate::application::gas_history::HistoryError;
use crate::application::live_monitor::{
    DetectionView, GasHistoryView, HistorySelection, LiveReading, MaskSummaryView,
};
use crate::domain::history::HistoryPoint;
use crate::domain::range::DateRange;
use crate::infrastructure::ndjson::stream_from_receiver;
use crate::presentation::app_state::AppState;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Deserialize)]
pub struct HistoryQuery {
    pub gases: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Gas concentration history over a date range, optionally
/// downsampled. Validation failures are reported conditions: the
/// response carries an empty series plus the message, not an HTTP
/// error.
pub async fn gas_history(
    Query(query): Query<HistoryQuery>,
    State(state): State<Arc<AppState>>,
) -> Json<GasHistoryView> {
    let gases = parse_gases(query.gases.as_deref(), &state.gas_catalog);
    let range = match parse_range(
        query.start.as_deref(),
        query.end.as_deref(),
        state.default_history_days,
    ) {
        Ok(range) => range,
        Err(e) => return Json(GasHistoryView::empty_with_message(e.to_string())),
    };

    match state.gas_history_service.load(&gases, &range).await {
        Ok(history) => Json(GasHistoryView {
            points: history.points,
            downsampled: history.downsampled,
            message: None,
        }),
        Err(e) => Json(GasHistoryView::empty_with_message(e.to_string())),
    }
}

/// Mask-detection summary over a date range.
pub async fn mask_history(
    Query(query): Query<HistoryQuery>,
    State(state): State<Arc<AppState>>,
) -> Json<MaskSummaryView> {
    let range = match parse_range(
        query.start.as_deref(),
        query.end.as_deref(),
        state.default_history_days,
    ) {
        Ok(range) => range,
        Err(e) => return Json(MaskSummaryView::empty_with_message(e.to_string())),
    };

    let aggregate = state.mask_history_service.load(&range).await;
    Json(MaskSummaryView::from_aggregate(aggregate))
}

#[derive(Serialize)]
pub struct LiveGasReadout {
    #[serde(flatten)]
    pub reading: LiveReading,
    pub history: Vec<HistoryPoint>,
}

#[derive(Serialize)]
pub struct LiveSensorsResponse {
    pub readings: Vec<LiveGasReadout>,
    pub last_updated: Option<String>,
    pub last_updated_ms: Option<i64>,
}

/// Latest classified gas readings with their sparkline buffers.
pub async fn live_sensors(State(state): State<Arc<AppState>>) -> Json<LiveSensorsResponse> {
    let mut histories = state.live_monitor.history_snapshots().await;

    let (readings, last_updated, last_updated_ms) = match state.live_monitor.sensor_snapshot() {
        Some(snapshot) => {
            let readings = snapshot
                .readings
                .into_iter()
                .map(|reading| {
                    let history = histories.remove(&reading.symbol).unwrap_or_default();
                    LiveGasReadout { reading, history }
                })
                .collect();
            (readings, snapshot.last_updated, snapshot.last_updated_ms)
        }
        None => (Vec::new(), None, None),
    };

    Json(LiveSensorsResponse {
        readings,
        last_updated,
        last_updated_ms,
    })
}

#[derive(Serialize)]
pub struct LiveDetectionResponse {
    pub detection: Option<DetectionView>,
    pub feed_url: String,
}

/// Latest face-detection snapshot plus the external video feed URL.
/// The feed itself is a black box; clients consume it directly and
/// treat unreachability as terminal for their session.
pub async fn live_detection(State(state): State<Arc<AppState>>) -> Json<LiveDetectionResponse> {
    Json(LiveDetectionResponse {
        detection: state.live_monitor.detection_view(),
        feed_url: state.detection_feed_url.clone(),
    })
}

/// Progressive dashboard stream: applies any requested selection,
/// then forwards the current state and every live update as one JSON
/// line each.
pub async fn dashboard_stream(
    Query(query): Query<HistoryQuery>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let selection_requested =
        query.gases.is_some() || query.start.is_some() || query.end.is_some();
    if selection_requested {
        let gases = parse_gases(query.gases.as_deref(), &state.gas_catalog);
        match parse_range(
            query.start.as_deref(),
            query.end.as_deref(),
            state.default_history_days,
        ) {
            Ok(range) => {
                state
                    .live_monitor
                    .set_selection(HistorySelection { gases, range })
                    .await;
            }
            Err(e) => {
                tracing::debug!(error = %e, "ignoring invalid stream selection");
            }
        }
    }

    let rx = state.live_monitor.stream_events().await;
    stream_from_receiver(rx)
}

/// Comma-separated gas list; absent means the full configured
/// catalog, present-but-empty means an empty selection (a reported
/// condition downstream).
fn parse_gases(raw: Option<&str>, catalog: &[String]) -> Vec<String> {
    match raw {
        Some(raw) => raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        None => catalog.to_vec(),
    }
}

/// Both bounds as `YYYY-MM-DD`, or neither for the default trailing
/// window. One missing bound or an unparseable date is an invalid
/// range.
fn parse_range(
    start: Option<&str>,
    end: Option<&str>,
    default_days: u64,
) -> Result<DateRange, HistoryError> {
    match (start, end) {
        (None, None) => Ok(DateRange::trailing_days(default_days)),
        (Some(start), Some(end)) => {
            let start = NaiveDate::parse_from_str(start, "%Y-%m-%d")
                .map_err(|_| HistoryError::InvalidRange)?;
            let end = NaiveDate::parse_from_str(end, "%Y-%m-%d")
                .map_err(|_| HistoryError::InvalidRange)?;
            DateRange::new(start, end).ok_or(HistoryError::InvalidRange)
        }
        _ => Err(HistoryError::InvalidRange),
    }
}
