//! HTTP API handlers

use crate::client::ClientError;
use crate::config::Config;
use crate::console::{ConsoleError, ScheduleSaveOutcome, SharedConsole};
use crate::mode_guard::Mode;
use crate::model::{
    AddCount, DailySchedules, Drum, DrumView, ScheduleEntry, ScheduleOption, ScheduleRequest,
};
use crate::poller::DeviceSnapshot;
use axum::{
    extract::State,
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    Json,
};
use futures::stream::Stream;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub console: SharedConsole,
    pub config: Arc<Config>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(console: SharedConsole, config: Config) -> Self {
        Self {
            console,
            config: Arc::new(config),
            started_at: Instant::now(),
        }
    }
}

/// Error response
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    kind: &'static str,
}

/// Console failure mapped onto an HTTP status.
#[derive(Debug)]
pub struct ApiError(ConsoleError);

impl<E: Into<ConsoleError>> From<E> for ApiError {
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl ApiError {
    fn status_and_kind(&self) -> (StatusCode, &'static str) {
        match &self.0 {
            ConsoleError::Validation(_) => (StatusCode::BAD_REQUEST, "validation"),
            ConsoleError::ModeConflict(_) => (StatusCode::CONFLICT, "mode_conflict"),
            ConsoleError::Backend(ClientError::Rejected { .. } | ClientError::Decode { .. }) => {
                (StatusCode::BAD_GATEWAY, "backend")
            }
            ConsoleError::Backend(ClientError::Transport(_) | ClientError::InvalidUrl(_)) => {
                (StatusCode::SERVICE_UNAVAILABLE, "unreachable")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = self.status_and_kind();
        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
                kind,
            }),
        )
            .into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

fn drum(value: u8) -> Result<Drum, ApiError> {
    Ok(Drum::try_from(value)?)
}

/// Plain acknowledgement carrying the dispenser's response text
#[derive(Serialize)]
pub struct MessageResponse {
    pub ok: bool,
    pub message: String,
}

impl MessageResponse {
    fn ok(message: String) -> Self {
        Self { ok: true, message }
    }
}

// =============================================================================
// Console status
// =============================================================================

/// General status response
#[derive(Serialize)]
pub struct StatusResponse {
    pub service: &'static str,
    pub version: &'static str,
    pub uptime_secs: u64,
    pub backend_url: String,
    pub backend_online: bool,
    pub mode: Option<Mode>,
    pub bus_subscribers: usize,
}

/// GET /status - Service health check
pub async fn status_handler(State(state): State<AppState>) -> Json<StatusResponse> {
    let console = &state.console;
    let snapshot = console.poller().snapshot().await;

    Json(StatusResponse {
        service: "pill-dispenser-console",
        version: env!("PDC_VERSION"),
        uptime_secs: state.started_at.elapsed().as_secs(),
        backend_url: console.client().base_url().to_string(),
        backend_online: snapshot.status.online(),
        mode: console.mode().holder().await,
        bus_subscribers: console.bus().subscriber_count(),
    })
}

/// GET /api/snapshot - Latest result of every poll
pub async fn snapshot_handler(State(state): State<AppState>) -> Json<DeviceSnapshot> {
    Json(state.console.poller().snapshot().await)
}

// =============================================================================
// Medicines
// =============================================================================

/// GET /api/medicines - Both drums with their capacity
pub async fn medicines_handler(State(state): State<AppState>) -> Json<Vec<DrumView>> {
    Json(state.console.drum_views().await)
}

#[derive(Deserialize)]
pub struct AddMedicinesRequest {
    pub drum: u8,
    #[serde(default)]
    pub names: Vec<String>,
}

#[derive(Serialize)]
pub struct AddMedicinesResponse {
    pub ok: bool,
    pub message: String,
    pub drums: Vec<DrumView>,
}

/// POST /api/medicines - Add a batch of medicines to one drum
pub async fn add_medicines_handler(
    State(state): State<AppState>,
    Json(req): Json<AddMedicinesRequest>,
) -> ApiResult<AddMedicinesResponse> {
    let message = state
        .console
        .add_medicines(drum(req.drum)?, &req.names)
        .await?;
    Ok(Json(AddMedicinesResponse {
        ok: true,
        message,
        drums: state.console.drum_views().await,
    }))
}

#[derive(Deserialize)]
pub struct CountRequest {
    pub drum: u8,
    pub count: usize,
}

/// POST /api/medicines/count - Clamp a requested add-count to free slots
pub async fn medicine_count_handler(
    State(state): State<AppState>,
    Json(req): Json<CountRequest>,
) -> ApiResult<AddCount> {
    Ok(Json(
        state
            .console
            .clamp_add_count(drum(req.drum)?, req.count)
            .await,
    ))
}

#[derive(Deserialize)]
pub struct RemoveRequest {
    pub drum: u8,
    pub slot: u8,
}

/// POST /api/medicines/remove - Remove the medicine in one slot
pub async fn remove_medicine_handler(
    State(state): State<AppState>,
    Json(req): Json<RemoveRequest>,
) -> ApiResult<AddMedicinesResponse> {
    let message = state
        .console
        .remove_medicine(drum(req.drum)?, req.slot)
        .await?;
    Ok(Json(AddMedicinesResponse {
        ok: true,
        message,
        drums: state.console.drum_views().await,
    }))
}

/// POST /api/medicines/reload - Fetch the slot map from the dispenser
pub async fn reload_medicines_handler(State(state): State<AppState>) -> ApiResult<Vec<DrumView>> {
    state.console.load_slot_map().await?;
    Ok(Json(state.console.drum_views().await))
}

// =============================================================================
// Schedules
// =============================================================================

/// GET /api/schedule/options - Medicines selectable on the schedule tab
pub async fn schedule_options_handler(State(state): State<AppState>) -> Json<Vec<ScheduleOption>> {
    Json(state.console.schedule_options().await)
}

#[derive(Serialize)]
pub struct ScheduleResponse {
    pub saved: Option<DailySchedules>,
    pub upcoming: Vec<ScheduleEntry>,
}

/// GET /api/schedule - Last saved schedule and upcoming dispenses
pub async fn schedule_handler(State(state): State<AppState>) -> Json<ScheduleResponse> {
    Json(ScheduleResponse {
        saved: state.console.saved_schedules().await,
        upcoming: state.console.upcoming().await,
    })
}

/// POST /api/schedule/touch - Schedule control interaction
pub async fn schedule_touch_handler(State(state): State<AppState>) -> ApiResult<ModeResponse> {
    state.console.touch_schedule().await?;
    Ok(Json(mode_response(&state).await))
}

/// POST /api/schedule - Validate, save, then clear the drums
pub async fn save_schedule_handler(
    State(state): State<AppState>,
    Json(req): Json<ScheduleRequest>,
) -> ApiResult<ScheduleSaveOutcome> {
    Ok(Json(state.console.save_schedules(&req).await?))
}

// =============================================================================
// Device actions
// =============================================================================

#[derive(Deserialize)]
pub struct DispenseRequest {
    pub drum: u8,
    #[serde(default = "default_pills")]
    pub pills: u32,
}

fn default_pills() -> u32 {
    1
}

/// POST /api/dispense - Manual dispense
pub async fn dispense_handler(
    State(state): State<AppState>,
    Json(req): Json<DispenseRequest>,
) -> ApiResult<MessageResponse> {
    let message = state
        .console
        .manual_dispense(drum(req.drum)?, req.pills)
        .await?;
    Ok(Json(MessageResponse::ok(message)))
}

/// POST /api/drums/clear - Clear both drums
pub async fn clear_drums_handler(State(state): State<AppState>) -> ApiResult<MessageResponse> {
    let message = state.console.clear_drums().await?;
    Ok(Json(MessageResponse::ok(message)))
}

// =============================================================================
// Mode and settings
// =============================================================================

#[derive(Serialize)]
pub struct ModeResponse {
    pub holder: Option<Mode>,
    pub timeout_secs: u64,
}

async fn mode_response(state: &AppState) -> ModeResponse {
    let mode = state.console.mode();
    ModeResponse {
        holder: mode.holder().await,
        timeout_secs: mode.timeout().as_secs(),
    }
}

/// GET /api/mode - Current mode lock holder
pub async fn mode_handler(State(state): State<AppState>) -> Json<ModeResponse> {
    Json(mode_response(&state).await)
}

/// GET /api/settings - Effective console settings
pub async fn settings_handler(State(state): State<AppState>) -> Json<Config> {
    Json(state.config.as_ref().clone())
}

// =============================================================================
// Events
// =============================================================================

/// GET /events - SSE stream of bus events
pub async fn events_handler(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.console.bus().subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| {
        match result {
            Ok(event) => match serde_json::to_string(&event) {
                Ok(json) => Some(Ok(Event::default().data(json))),
                Err(_) => None,
            },
            Err(_) => None, // Skip lagged messages
        }
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}
