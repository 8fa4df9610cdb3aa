// Application state for HTTP handlers
use crate::application::gas_history::GasHistoryService;
use crate::application::live_monitor::LiveMonitor;
use crate::application::mask_history::MaskHistoryService;
use std::sync::Arc;

pub struct AppState {
    pub gas_history_service: GasHistoryService,
    pub mask_history_service: MaskHistoryService,
    pub live_monitor: Arc<LiveMonitor>,
    pub gas_catalog: Vec<String>,
    pub default_history_days: u64,
    pub detection_feed_url: String,
}
