// Main entry point - Dependency injection and server setup
mod domain;
mod application;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc};

use axum::{routing::get, Router};
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;

use crate::application::gas_history::GasHistoryService;
use crate::application::live_monitor::LiveMonitor;
use crate::application::log_store::LogStore;
use crate::application::mask_history::MaskHistoryService;
use crate::infrastructure::config::{load_sensors_config, load_store_config};
use crate::infrastructure::firebase_store::FirebaseStore;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    dashboard_stream, gas_history, health_check, live_detection, live_sensors, mask_history,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Load configuration
    let store_config = load_store_config()?;
    let sensors_config = load_sensors_config()?;

    // Create the store client (infrastructure layer)
    let store: Arc<dyn LogStore> = Arc::new(FirebaseStore::new(
        store_config.store.base_url,
        store_config.store.auth_token,
    ));

    // Create services (application layer)
    let gas_history_service = GasHistoryService::new(store.clone());
    let mask_history_service = MaskHistoryService::new(store.clone());
    let live_monitor = LiveMonitor::new(
        store.clone(),
        gas_history_service.clone(),
        mask_history_service.clone(),
        sensors_config.gases.clone(),
        sensors_config.default_history_days,
    );
    live_monitor.start();

    // Create application state
    let state = Arc::new(AppState {
        gas_history_service,
        mask_history_service,
        live_monitor,
        gas_catalog: sensors_config.gases,
        default_history_days: sensors_config.default_history_days,
        detection_feed_url: store_config.store.detection_feed_url,
    });

    // Build router (presentation layer)
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/history/gas", get(gas_history))
        .route("/history/mask", get(mask_history))
        .route("/live/sensors", get(live_sensors))
        .route("/live/detection", get(live_detection))
        .route("/dashboard/stream", get(dashboard_stream))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr: SocketAddr = "0.0.0.0:8080".parse()?;
    println!("Starting airguard-telemetry service on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}
