//! HTTP client for the dispenser backend.
//!
//! The device exposes a small REST-ish API: reads are `GET` returning JSON
//! (or plain text for logs), writes are form-encoded `POST` returning a
//! human-readable text message. A non-2xx status is a failure whose body is
//! the device's own explanation, which is passed through to the user.

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::model::{
    DailySchedules, DeviceStatus, DispenserStatus, Drum, LastAction, MedicineEntry, NewMedicine,
    UpcomingSchedule,
};

pub const GET_SLOT_MAP: &str = "/getSlotMap";
pub const ADD_SLOT_MAP_ENTRIES: &str = "/addMultipleSlotMapEntries";
pub const REMOVE_SLOT_MAP_ENTRY: &str = "/removeSlotMapEntry";
pub const STATUS: &str = "/status";
pub const LOGS: &str = "/logs";
pub const LAST_ACTION: &str = "/lastAction";
pub const MANUAL_DISPENSE: &str = "/manualDispense";
pub const SET_DAILY_SCHEDULES: &str = "/setDailySchedules";
pub const CLEAR_DRUMS: &str = "/clearDrums";
pub const UPCOMING_SCHEDULES: &str = "/api/upcoming-schedules";
pub const DISPENSER_STATUS: &str = "/api/dispenser-status";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Invalid dispenser URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Could not reach the dispenser: {0}")]
    Transport(#[from] reqwest::Error),

    /// Device answered with a non-2xx status; `message` is its response text
    #[error("{message}")]
    Rejected {
        endpoint: &'static str,
        status: u16,
        message: String,
    },

    #[error("Unexpected response from {endpoint}: {source}")]
    Decode {
        endpoint: &'static str,
        source: serde_json::Error,
    },
}

/// Typed access to the dispenser backend. Cheap to clone.
#[derive(Clone)]
pub struct DispenserClient {
    base: Url,
    client: Client,
}

impl DispenserClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let mut base = Url::parse(base_url)?;
        // Url::join replaces the last segment unless the path ends in '/'
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { base, client })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn url(&self, endpoint: &str) -> Result<Url, ClientError> {
        Ok(self.base.join(endpoint.trim_start_matches('/'))?)
    }

    async fn read_text(endpoint: &'static str, response: Response) -> Result<String, ClientError> {
        let status = response.status();
        let body = response.text().await?;
        debug!(endpoint, status = status.as_u16(), "Dispenser response");

        if !status.is_success() {
            return Err(ClientError::Rejected {
                endpoint,
                status: status.as_u16(),
                message: body,
            });
        }
        Ok(body)
    }

    async fn get_text(&self, endpoint: &'static str) -> Result<String, ClientError> {
        let response = self.client.get(self.url(endpoint)?).send().await?;
        Self::read_text(endpoint, response).await
    }

    async fn get_json<T: DeserializeOwned>(&self, endpoint: &'static str) -> Result<T, ClientError> {
        let body = self.get_text(endpoint).await?;
        serde_json::from_str(&body).map_err(|source| ClientError::Decode { endpoint, source })
    }

    async fn post_form(
        &self,
        endpoint: &'static str,
        form: &[(&str, String)],
    ) -> Result<String, ClientError> {
        debug!(endpoint, fields = form.len(), "Dispenser request");
        let response = self
            .client
            .post(self.url(endpoint)?)
            .form(form)
            .send()
            .await?;
        Self::read_text(endpoint, response).await
    }

    pub async fn slot_map(&self) -> Result<Vec<MedicineEntry>, ClientError> {
        self.get_json(GET_SLOT_MAP).await
    }

    pub async fn add_medicines(
        &self,
        drum: Drum,
        medicines: &[NewMedicine],
    ) -> Result<String, ClientError> {
        let data = json!({ "drum": drum, "medicines": medicines });
        self.post_form(ADD_SLOT_MAP_ENTRIES, &[("data", data.to_string())])
            .await
    }

    pub async fn remove_medicine(&self, drum: Drum, slot: u8) -> Result<String, ClientError> {
        self.post_form(
            REMOVE_SLOT_MAP_ENTRY,
            &[("drum", drum.to_string()), ("slot", slot.to_string())],
        )
        .await
    }

    pub async fn status(&self) -> Result<DeviceStatus, ClientError> {
        self.get_json(STATUS).await
    }

    pub async fn logs(&self) -> Result<String, ClientError> {
        self.get_text(LOGS).await
    }

    pub async fn last_action(&self) -> Result<LastAction, ClientError> {
        self.get_json(LAST_ACTION).await
    }

    pub async fn manual_dispense(&self, drum: Drum, pills: u32) -> Result<String, ClientError> {
        self.post_form(
            MANUAL_DISPENSE,
            &[("drum", drum.to_string()), ("pills", pills.to_string())],
        )
        .await
    }

    pub async fn set_daily_schedules(
        &self,
        schedules: &DailySchedules,
    ) -> Result<String, ClientError> {
        self.post_form(SET_DAILY_SCHEDULES, &[("data", schedules_data(schedules))])
            .await
    }

    pub async fn clear_drums(&self) -> Result<String, ClientError> {
        self.post_form(CLEAR_DRUMS, &[]).await
    }

    pub async fn upcoming_schedules(&self) -> Result<Vec<UpcomingSchedule>, ClientError> {
        self.get_json(UPCOMING_SCHEDULES).await
    }

    pub async fn dispenser_status(&self) -> Result<DispenserStatus, ClientError> {
        self.get_json(DISPENSER_STATUS).await
    }
}

/// `data` field of `/setDailySchedules`.
fn schedules_data(schedules: &DailySchedules) -> String {
    json!({ "drum1": schedules.drum1, "drum2": schedules.drum2 }).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_endpoints_under_base_path() {
        let client = DispenserClient::new("http://10.0.0.5/device", Duration::from_secs(1)).unwrap();
        assert_eq!(
            client.url(UPCOMING_SCHEDULES).unwrap().as_str(),
            "http://10.0.0.5/device/api/upcoming-schedules"
        );

        let client = DispenserClient::new("http://192.168.4.1", Duration::from_secs(1)).unwrap();
        assert_eq!(
            client.url(GET_SLOT_MAP).unwrap().as_str(),
            "http://192.168.4.1/getSlotMap"
        );
    }

    #[test]
    fn rejects_invalid_base_url() {
        assert!(matches!(
            DispenserClient::new("not a url", Duration::from_secs(1)),
            Err(ClientError::InvalidUrl(_))
        ));
    }

    #[test]
    fn schedules_data_is_wire_json() {
        use crate::model::{validate_schedules, DrumScheduleInput, ScheduleRequest};

        let schedules = validate_schedules(&ScheduleRequest {
            drum1: DrumScheduleInput::once("09:15"),
            drum2: DrumScheduleInput::twice("08:00", "20:00"),
        })
        .unwrap();
        let data: serde_json::Value = serde_json::from_str(&schedules_data(&schedules)).unwrap();
        assert_eq!(
            data,
            json!({
                "drum1": { "frequency": "once", "times": ["09:15"] },
                "drum2": { "frequency": "twice", "times": ["08:00", "20:00"] }
            })
        );
    }

    #[test]
    fn rejected_displays_device_text() {
        let err = ClientError::Rejected {
            endpoint: MANUAL_DISPENSE,
            status: 400,
            message: "Drum 2 is empty".into(),
        };
        assert_eq!(err.to_string(), "Drum 2 is empty");
    }
}
