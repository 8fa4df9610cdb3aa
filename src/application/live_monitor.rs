// Live monitoring - store subscriptions, sparkline buffers, and
// latest-wins history refresh for the dashboard view
use crate::application::gas_history::GasHistoryService;
use crate::application::latest::LatestCell;
use crate::application::log_store::LogStore;
use crate::application::mask_history::MaskHistoryService;
use crate::domain::detection::{DetectionSnapshot, DetectionTag};
use crate::domain::gas::{classify_gas_status, gas_field_key, GasPoint, GasStatus};
use crate::domain::history::{HistoryPoint, ReadingHistory, LIVE_HISTORY_CAPACITY};
use crate::domain::mask::MaskAggregate;
use crate::domain::range::DateRange;
use chrono::{NaiveDateTime, Utc};
use futures::StreamExt;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, watch, RwLock};
use tokio_stream::wrappers::WatchStream;

pub const SENSOR_DATA_PATH: &str = "sensor_data";
pub const FACE_DETECTION_PATH: &str = "face_detection";

const EVENT_CHANNEL_CAPACITY: usize = 100;

/// One gas on the live readout.
#[derive(Debug, Clone, Serialize)]
pub struct LiveReading {
    pub symbol: String,
    pub value: f64,
    pub unit: &'static str,
    pub status: GasStatus,
}

/// Latest value of the `sensor_data` node, classified per gas.
#[derive(Debug, Clone, Serialize)]
pub struct SensorSnapshot {
    pub readings: Vec<LiveReading>,
    pub last_updated: Option<String>,
    pub last_updated_ms: Option<i64>,
}

/// Detection snapshot shaped for presentation.
#[derive(Debug, Clone, Serialize)]
pub struct DetectionView {
    pub current_status: Option<String>,
    pub tag: DetectionTag,
    pub last_updated_ms: Option<i64>,
}

impl From<DetectionSnapshot> for DetectionView {
    fn from(snapshot: DetectionSnapshot) -> Self {
        let tag = snapshot.tag();
        Self {
            current_status: snapshot.current_status,
            tag,
            last_updated_ms: snapshot.last_updated_ms,
        }
    }
}

/// Gas history shaped for presentation: either points or a
/// user-facing message, never both.
#[derive(Debug, Clone, Serialize)]
pub struct GasHistoryView {
    pub points: Vec<GasPoint>,
    pub downsampled: bool,
    pub message: Option<String>,
}

impl GasHistoryView {
    pub fn empty_with_message(message: String) -> Self {
        Self {
            points: Vec::new(),
            downsampled: false,
            message: Some(message),
        }
    }
}

/// Mask counts plus the percentages derived at this boundary.
#[derive(Debug, Clone, Serialize)]
pub struct MaskSummaryView {
    pub mask_on_count: u64,
    pub mask_off_count: u64,
    pub total_detections: u64,
    pub mask_on_percent: f64,
    pub mask_off_percent: f64,
    pub message: Option<String>,
}

impl MaskSummaryView {
    pub fn from_aggregate(aggregate: MaskAggregate) -> Self {
        Self {
            mask_on_count: aggregate.mask_on_count,
            mask_off_count: aggregate.mask_off_count,
            total_detections: aggregate.total_detections,
            mask_on_percent: aggregate.mask_on_percent(),
            mask_off_percent: aggregate.mask_off_percent(),
            message: None,
        }
    }

    pub fn empty_with_message(message: String) -> Self {
        Self {
            message: Some(message),
            ..Self::from_aggregate(MaskAggregate::default())
        }
    }
}

/// The inputs that drive the history pipelines.
#[derive(Debug, Clone)]
pub struct HistorySelection {
    pub gases: Vec<String>,
    pub range: DateRange,
}

/// Progressive-loading message for the dashboard stream.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DashboardEvent {
    Sensors(SensorSnapshot),
    Detection(DetectionView),
    GasHistory(GasHistoryView),
    MaskSummary(MaskSummaryView),
}

pub struct LiveMonitor {
    store: Arc<dyn LogStore>,
    gas_history: GasHistoryService,
    mask_history: MaskHistoryService,
    gas_symbols: Vec<String>,
    histories: RwLock<HashMap<String, ReadingHistory>>,
    selection: RwLock<HistorySelection>,
    sensors: watch::Sender<Option<SensorSnapshot>>,
    detection: watch::Sender<Option<DetectionView>>,
    gas_view: LatestCell<GasHistoryView>,
    mask_view: LatestCell<MaskSummaryView>,
}

impl LiveMonitor {
    pub fn new(
        store: Arc<dyn LogStore>,
        gas_history: GasHistoryService,
        mask_history: MaskHistoryService,
        gas_symbols: Vec<String>,
        default_history_days: u64,
    ) -> Arc<Self> {
        let selection = HistorySelection {
            gases: gas_symbols.clone(),
            range: DateRange::trailing_days(default_history_days),
        };
        let (sensors, _) = watch::channel(None);
        let (detection, _) = watch::channel(None);
        Arc::new(Self {
            store,
            gas_history,
            mask_history,
            gas_symbols,
            histories: RwLock::new(HashMap::new()),
            selection: RwLock::new(selection),
            sensors,
            detection,
            gas_view: LatestCell::new(),
            mask_view: LatestCell::new(),
        })
    }

    /// Spawn the subscription tasks and kick off the initial history
    /// load for the default selection.
    pub fn start(self: &Arc<Self>) {
        let monitor = self.clone();
        tokio::spawn(async move { monitor.run_sensor_subscription().await });
        let monitor = self.clone();
        tokio::spawn(async move { monitor.run_detection_subscription().await });
        let monitor = self.clone();
        tokio::spawn(async move {
            let selection = monitor.selection.read().await.clone();
            monitor.refresh_history(selection);
        });
    }

    async fn run_sensor_subscription(self: Arc<Self>) {
        tracing::info!(path = SENSOR_DATA_PATH, "starting live subscription");
        let mut stream = self.store.subscribe(SENSOR_DATA_PATH);
        while let Some(item) = stream.next().await {
            match item {
                Ok(value) => self.apply_sensor_value(&value).await,
                Err(e) => tracing::warn!(error = %e, "sensor subscription error"),
            }
        }
        // Terminal for this session; the next process start retries.
        tracing::warn!(path = SENSOR_DATA_PATH, "live subscription ended");
    }

    async fn run_detection_subscription(self: Arc<Self>) {
        tracing::info!(path = FACE_DETECTION_PATH, "starting live subscription");
        let mut stream = self.store.subscribe(FACE_DETECTION_PATH);
        while let Some(item) = stream.next().await {
            match item {
                Ok(value) => {
                    let snapshot = DetectionSnapshot::from_value(&value);
                    self.detection.send_replace(Some(snapshot.into()));
                }
                Err(e) => tracing::warn!(error = %e, "detection subscription error"),
            }
        }
        tracing::warn!(path = FACE_DETECTION_PATH, "live subscription ended");
    }

    /// Fold one `sensor_data` value into the per-gas sparkline
    /// buffers and publish the classified snapshot. Gas fields that
    /// are missing or non-numeric are skipped.
    async fn apply_sensor_value(&self, value: &Value) {
        let now_ms = Utc::now().timestamp_millis();
        let mut readings = Vec::with_capacity(self.gas_symbols.len());
        {
            let mut histories = self.histories.write().await;
            for symbol in &self.gas_symbols {
                let field = gas_field_key(symbol);
                let Some(ppm) = value.get(&field).and_then(Value::as_f64) else {
                    continue;
                };
                histories
                    .entry(symbol.clone())
                    .or_insert_with(|| ReadingHistory::new(LIVE_HISTORY_CAPACITY))
                    .push(now_ms, ppm);
                readings.push(LiveReading {
                    symbol: symbol.clone(),
                    value: ppm,
                    unit: "ppm",
                    status: classify_gas_status(symbol, ppm),
                });
            }
        }

        let last_updated = value
            .get("last_updated")
            .and_then(Value::as_str)
            .map(str::to_string);
        let last_updated_ms = last_updated
            .as_deref()
            .and_then(|t| NaiveDateTime::parse_from_str(t, "%Y-%m-%d %H:%M:%S").ok())
            .map(|t| t.and_utc().timestamp_millis());

        self.sensors.send_replace(Some(SensorSnapshot {
            readings,
            last_updated,
            last_updated_ms,
        }));
    }

    /// Change the dashboard selection and reload both histories. The
    /// reloads run in the background and commit latest-wins, so a
    /// superseded reload's result is dropped, not displayed.
    pub async fn set_selection(self: &Arc<Self>, selection: HistorySelection) {
        *self.selection.write().await = selection.clone();
        self.refresh_history(selection);
    }

    fn refresh_history(self: &Arc<Self>, selection: HistorySelection) {
        let generation = self.gas_view.begin();
        let monitor = self.clone();
        let gas_selection = selection.clone();
        tokio::spawn(async move {
            let view = match monitor
                .gas_history
                .load(&gas_selection.gases, &gas_selection.range)
                .await
            {
                Ok(history) => GasHistoryView {
                    points: history.points,
                    downsampled: history.downsampled,
                    message: None,
                },
                Err(e) => GasHistoryView::empty_with_message(e.to_string()),
            };
            monitor.gas_view.commit(generation, view);
        });

        let generation = self.mask_view.begin();
        let monitor = self.clone();
        tokio::spawn(async move {
            let aggregate = monitor.mask_history.load(&selection.range).await;
            monitor
                .mask_view
                .commit(generation, MaskSummaryView::from_aggregate(aggregate));
        });
    }

    pub fn sensor_snapshot(&self) -> Option<SensorSnapshot> {
        self.sensors.borrow().clone()
    }

    pub fn detection_view(&self) -> Option<DetectionView> {
        self.detection.borrow().clone()
    }

    pub fn gas_history_view(&self) -> Option<GasHistoryView> {
        self.gas_view.current()
    }

    pub fn mask_summary_view(&self) -> Option<MaskSummaryView> {
        self.mask_view.current()
    }

    /// Oldest-first sparkline snapshot per gas.
    pub async fn history_snapshots(&self) -> HashMap<String, Vec<HistoryPoint>> {
        self.histories
            .read()
            .await
            .iter()
            .map(|(symbol, history)| (symbol.clone(), history.snapshot()))
            .collect()
    }

    /// Progressive dashboard stream: current state first, then every
    /// update as it arrives, until the receiver is dropped.
    pub async fn stream_events(self: &Arc<Self>) -> mpsc::Receiver<DashboardEvent> {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        if let Some(snapshot) = self.sensor_snapshot() {
            let _ = tx.send(DashboardEvent::Sensors(snapshot)).await;
        }
        if let Some(view) = self.detection_view() {
            let _ = tx.send(DashboardEvent::Detection(view)).await;
        }
        if let Some(view) = self.gas_history_view() {
            let _ = tx.send(DashboardEvent::GasHistory(view)).await;
        }
        if let Some(view) = self.mask_summary_view() {
            let _ = tx.send(DashboardEvent::MaskSummary(view)).await;
        }

        forward(self.sensors.subscribe(), tx.clone(), DashboardEvent::Sensors);
        forward(
            self.detection.subscribe(),
            tx.clone(),
            DashboardEvent::Detection,
        );
        forward(self.gas_view.watch(), tx.clone(), DashboardEvent::GasHistory);
        forward(self.mask_view.watch(), tx, DashboardEvent::MaskSummary);

        rx
    }
}

fn forward<T: Clone + Send + Sync + 'static>(
    rx: watch::Receiver<Option<T>>,
    tx: mpsc::Sender<DashboardEvent>,
    wrap: fn(T) -> DashboardEvent,
) {
    tokio::spawn(async move {
        // Changes only; the stream call seeds current state itself.
        let mut changes = WatchStream::from_changes(rx);
        while let Some(value) = changes.next().await {
            let Some(value) = value else { continue };
            if tx.send(wrap(value)).await.is_err() {
                break;
            }
        }
    });
}
