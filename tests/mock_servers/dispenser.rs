//! Mock pill dispenser for testing
//!
//! Serves the device endpoints the console talks to and records every
//! request, so tests can assert that nothing was sent.

use axum::{
    extract::State,
    http::{Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

/// One request as the device saw it
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub form: HashMap<String, String>,
}

/// Mock dispenser state
struct MockDispenserState {
    /// (drum, slot, pillName)
    slot_map: Vec<(u8, u8, String)>,
    requests: Vec<RecordedRequest>,
    /// path -> (status, body) returned instead of the normal response
    failures: HashMap<String, (u16, String)>,
    delays: HashMap<String, Duration>,
    schedules: Option<Value>,
    status: Value,
    logs: String,
    last_action: Value,
    upcoming: Value,
    dispenser_status: Value,
}

type SharedState = Arc<RwLock<MockDispenserState>>;

/// Mock dispenser server
pub struct MockDispenser {
    addr: SocketAddr,
    state: SharedState,
    handle: JoinHandle<()>,
}

impl MockDispenser {
    /// Start a mock dispenser on a random port
    pub async fn start() -> Self {
        let state = Arc::new(RwLock::new(MockDispenserState {
            slot_map: Vec::new(),
            requests: Vec::new(),
            failures: HashMap::new(),
            delays: HashMap::new(),
            schedules: None,
            status: json!({
                "time": "08:00:00",
                "slotDrum1": 1,
                "slotDrum2": 1,
                "wifi": { "ssid": "PillNet", "rssi": -52 }
            }),
            logs: "boot ok\n".to_string(),
            last_action: json!({ "timestamp": "2026-10-18 07:59", "event": "Startup" }),
            upcoming: json!([]),
            dispenser_status: json!({
                "drums": [
                    { "drum": 1, "isEmpty": false, "fillPercentage": 100.0, "currentSlot": 1, "emptySlots": 0 },
                    { "drum": 2, "isEmpty": true, "fillPercentage": 0.0, "currentSlot": 1, "emptySlots": 7 }
                ]
            }),
        }));

        let app = Router::new().fallback(handle).with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            state,
            handle,
        }
    }

    /// Get the server address
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Assign a medicine to a specific slot
    pub async fn add_medicine(&self, drum: u8, slot: u8, name: &str) {
        let mut state = self.state.write().await;
        state.slot_map.push((drum, slot, name.to_string()));
    }

    /// Fill a drum's slots 1..=count with generated names
    pub async fn fill_drum(&self, drum: u8, count: u8) {
        for slot in 1..=count {
            self.add_medicine(drum, slot, &format!("Pill {}-{}", drum, slot))
                .await;
        }
    }

    /// Make `path` answer with `status` and `body`
    pub async fn fail(&self, path: &str, status: u16, body: &str) {
        let mut state = self.state.write().await;
        state
            .failures
            .insert(path.to_string(), (status, body.to_string()));
    }

    pub async fn recover(&self, path: &str) {
        self.state.write().await.failures.remove(path);
    }

    /// Hold responses to `path` for `delay`
    pub async fn delay(&self, path: &str, delay: Duration) {
        let mut state = self.state.write().await;
        state.delays.insert(path.to_string(), delay);
    }

    pub async fn set_upcoming(&self, upcoming: Value) {
        self.state.write().await.upcoming = upcoming;
    }

    pub async fn set_logs(&self, logs: &str) {
        self.state.write().await.logs = logs.to_string();
    }

    /// Last body received on /setDailySchedules
    pub async fn schedules(&self) -> Option<Value> {
        self.state.read().await.schedules.clone()
    }

    pub async fn requests(&self) -> Vec<RecordedRequest> {
        self.state.read().await.requests.clone()
    }

    /// Request paths in arrival order
    pub async fn paths(&self) -> Vec<String> {
        self.requests().await.into_iter().map(|r| r.path).collect()
    }

    pub async fn count(&self, path: &str) -> usize {
        self.requests()
            .await
            .iter()
            .filter(|r| r.path == path)
            .count()
    }

    /// Last request to `path`
    pub async fn last(&self, path: &str) -> Option<RecordedRequest> {
        self.requests()
            .await
            .into_iter()
            .rev()
            .find(|r| r.path == path)
    }

    /// Wait until `path` has been requested at least `n` times
    pub async fn wait_for(&self, path: &str, n: usize) -> bool {
        for _ in 0..100 {
            if self.count(path).await >= n {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        false
    }

    /// Stop the mock server
    pub async fn stop(self) {
        self.handle.abort();
    }
}

fn parse_form(body: &str) -> HashMap<String, String> {
    url::form_urlencoded::parse(body.as_bytes())
        .into_owned()
        .collect()
}

fn slot_map_json(slot_map: &[(u8, u8, String)]) -> Value {
    Value::Array(
        slot_map
            .iter()
            .map(|(drum, slot, name)| json!({ "drum": drum, "slot": slot, "pillName": name }))
            .collect(),
    )
}

/// Route every request by path
async fn handle(
    State(state): State<SharedState>,
    method: Method,
    uri: Uri,
    body: String,
) -> Response {
    let path = uri.path().to_string();
    let form = parse_form(&body);

    let (failure, delay) = {
        let mut state = state.write().await;
        state.requests.push(RecordedRequest {
            method: method.clone(),
            path: path.clone(),
            form: form.clone(),
        });
        (
            state.failures.get(&path).cloned(),
            state.delays.get(&path).copied(),
        )
    };

    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    if let Some((status, body)) = failure {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return (status, body).into_response();
    }

    let mut state = state.write().await;
    match (method, path.as_str()) {
        (Method::GET, "/getSlotMap") => Json(slot_map_json(&state.slot_map)).into_response(),
        (Method::GET, "/status") => Json(state.status.clone()).into_response(),
        (Method::GET, "/logs") => state.logs.clone().into_response(),
        (Method::GET, "/lastAction") => Json(state.last_action.clone()).into_response(),
        (Method::GET, "/api/upcoming-schedules") => Json(state.upcoming.clone()).into_response(),
        (Method::GET, "/api/dispenser-status") => {
            Json(state.dispenser_status.clone()).into_response()
        }
        (Method::POST, "/addMultipleSlotMapEntries") => {
            let Some(data) = form
                .get("data")
                .and_then(|d| serde_json::from_str::<Value>(d).ok())
            else {
                return (StatusCode::BAD_REQUEST, "Missing data").into_response();
            };
            let drum = data["drum"].as_u64().unwrap_or(0) as u8;
            let names: Vec<String> = data["medicines"]
                .as_array()
                .map(|m| {
                    m.iter()
                        .filter_map(|m| m["pillName"].as_str().map(str::to_string))
                        .collect()
                })
                .unwrap_or_default();
            for name in &names {
                // Device fills the lowest free slot
                let Some(slot) = (1..=7u8).find(|s| {
                    !state
                        .slot_map
                        .iter()
                        .any(|(d, slot, _)| *d == drum && slot == s)
                }) else {
                    return (StatusCode::BAD_REQUEST, "Drum is full").into_response();
                };
                state.slot_map.push((drum, slot, name.clone()));
            }
            format!("Added {} medicines to drum {}", names.len(), drum).into_response()
        }
        (Method::POST, "/removeSlotMapEntry") => {
            let drum: u8 = form.get("drum").and_then(|d| d.parse().ok()).unwrap_or(0);
            let slot: u8 = form.get("slot").and_then(|s| s.parse().ok()).unwrap_or(0);
            let before = state.slot_map.len();
            state
                .slot_map
                .retain(|(d, s, _)| !(*d == drum && *s == slot));
            if state.slot_map.len() == before {
                return (StatusCode::NOT_FOUND, "No medicine in that slot").into_response();
            }
            format!("Removed drum {} slot {}", drum, slot).into_response()
        }
        (Method::POST, "/manualDispense") => format!(
            "Dispensing {} pills from drum {}",
            form.get("pills").map(String::as_str).unwrap_or("?"),
            form.get("drum").map(String::as_str).unwrap_or("?")
        )
        .into_response(),
        (Method::POST, "/setDailySchedules") => {
            state.schedules = form.get("data").and_then(|d| serde_json::from_str(d).ok());
            "Schedules saved".into_response()
        }
        (Method::POST, "/clearDrums") => "Drums cleared".into_response(),
        _ => (StatusCode::NOT_FOUND, "Not found").into_response(),
    }
}
