//! Router construction, shared by the binary and the API tests.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::{api, ui};

pub fn router(state: api::AppState) -> Router {
    Router::new()
        // Health check
        .route("/status", get(api::status_handler))
        // Polled device state
        .route("/api/snapshot", get(api::snapshot_handler))
        // Medicines
        .route(
            "/api/medicines",
            get(api::medicines_handler).post(api::add_medicines_handler),
        )
        .route("/api/medicines/count", post(api::medicine_count_handler))
        .route("/api/medicines/remove", post(api::remove_medicine_handler))
        .route("/api/medicines/reload", post(api::reload_medicines_handler))
        // Schedules
        .route(
            "/api/schedule",
            get(api::schedule_handler).post(api::save_schedule_handler),
        )
        .route("/api/schedule/options", get(api::schedule_options_handler))
        .route("/api/schedule/touch", post(api::schedule_touch_handler))
        // Device actions
        .route("/api/dispense", post(api::dispense_handler))
        .route("/api/drums/clear", post(api::clear_drums_handler))
        // Mode lock and settings
        .route("/api/mode", get(api::mode_handler))
        .route("/api/settings", get(api::settings_handler))
        // SSE events
        .route("/events", get(api::events_handler))
        // Web UI
        .route("/", get(ui::dashboard_page))
        .route("/schedule", get(ui::schedule_page))
        .route("/medicine", get(ui::medicine_page))
        .route("/manual", get(ui::manual_page))
        .route("/settings", get(ui::settings_page))
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
