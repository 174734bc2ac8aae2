//! Console state and user operations.
//!
//! [`Console`] is the single state object behind every page: the cached slot
//! map, the last saved schedule, the mode guard and the pollers. Handlers get
//! it through the axum state; nothing lives in module-level globals.
//!
//! Every operation validates locally first and returns before contacting the
//! dispenser when the input or the mode lock says no.

use chrono::Local;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::bus::{BusEvent, SharedBus};
use crate::client::{ClientError, DispenserClient};
use crate::mode_guard::{Mode, ModeConflict, ModeGuard};
use crate::model::{
    upcoming_entries, validate_new_medicines, validate_schedules, AddCount, DailySchedules, Drum,
    DrumView, ScheduleEntry, ScheduleOption, ScheduleRequest, SlotMap, ValidationError,
    MAX_SLOTS_PER_DRUM,
};
use crate::poller::{PollKind, Poller};

#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    ModeConflict(#[from] ModeConflict),

    #[error(transparent)]
    Backend(#[from] ClientError),
}

/// Result of the clear-drums step that follows a schedule save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClearOutcome {
    pub ok: bool,
    pub message: String,
}

/// A schedule save always reports both steps. A failed clear does not undo
/// the saved schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduleSaveOutcome {
    pub message: String,
    pub clear: ClearOutcome,
}

pub struct Console {
    client: DispenserClient,
    bus: SharedBus,
    mode: ModeGuard,
    poller: Poller,
    slot_map: RwLock<SlotMap>,
    saved_schedules: RwLock<Option<DailySchedules>>,
}

pub type SharedConsole = Arc<Console>;

/// Startup slot-map load. A failure is logged; the console keeps serving
/// with an empty map until the next reload.
pub async fn initial_load(console: SharedConsole) {
    if let Err(e) = console.load_slot_map().await {
        warn!("Initial slot map load failed: {}", e);
    }
}

impl Console {
    pub fn new(client: DispenserClient, bus: SharedBus, mode: ModeGuard, poller: Poller) -> Self {
        Self {
            client,
            bus,
            mode,
            poller,
            slot_map: RwLock::new(SlotMap::default()),
            saved_schedules: RwLock::new(None),
        }
    }

    pub fn client(&self) -> &DispenserClient {
        &self.client
    }

    pub fn bus(&self) -> &SharedBus {
        &self.bus
    }

    pub fn mode(&self) -> &ModeGuard {
        &self.mode
    }

    pub fn poller(&self) -> &Poller {
        &self.poller
    }

    // =========================================================================
    // Medicines
    // =========================================================================

    /// Replace the cached slot map with the device's.
    pub async fn load_slot_map(&self) -> Result<SlotMap, ConsoleError> {
        let entries = self.client.slot_map().await.map_err(|e| {
            warn!("Failed to load slot map: {}", e);
            e
        })?;
        let map = SlotMap::new(entries);
        *self.slot_map.write().await = map.clone();

        debug!(medicines = map.entries().len(), "Slot map loaded");
        self.bus.publish(BusEvent::SlotMapUpdated {
            medicines: map.entries().to_vec(),
        });
        Ok(map)
    }

    pub async fn slot_map(&self) -> SlotMap {
        self.slot_map.read().await.clone()
    }

    pub async fn drum_views(&self) -> Vec<DrumView> {
        let map = self.slot_map.read().await;
        Drum::ALL.iter().map(|d| map.drum_view(*d)).collect()
    }

    pub async fn clamp_add_count(&self, drum: Drum, requested: usize) -> AddCount {
        self.slot_map.read().await.clamp_add_count(drum, requested)
    }

    /// Add a batch of medicines to `drum`.
    ///
    /// The batch is checked against the cached slot map; nothing is sent if
    /// any name is blank or the drum lacks room for all of them.
    pub async fn add_medicines(&self, drum: Drum, names: &[String]) -> Result<String, ConsoleError> {
        let medicines = {
            let map = self.slot_map.read().await;
            validate_new_medicines(&map, drum, names)
        }
        .map_err(|e| {
            debug!(%drum, "Add medicines rejected: {}", e);
            e
        })?;

        let message = self
            .client
            .add_medicines(drum, &medicines)
            .await
            .map_err(|e| {
                warn!(%drum, "Add medicines failed: {}", e);
                e
            })?;
        info!(%drum, count = medicines.len(), "Medicines added");

        self.reload_slot_map_quietly().await;
        Ok(message)
    }

    pub async fn remove_medicine(&self, drum: Drum, slot: u8) -> Result<String, ConsoleError> {
        if slot == 0 || usize::from(slot) > MAX_SLOTS_PER_DRUM {
            return Err(ValidationError::InvalidSlot(slot).into());
        }

        let message = self
            .client
            .remove_medicine(drum, slot)
            .await
            .map_err(|e| {
                warn!(%drum, slot, "Remove medicine failed: {}", e);
                e
            })?;
        info!(%drum, slot, "Medicine removed");

        self.reload_slot_map_quietly().await;
        Ok(message)
    }

    async fn reload_slot_map_quietly(&self) {
        // The write already succeeded; a stale list is refreshed on next load
        if let Err(e) = self.load_slot_map().await {
            warn!("Slot map reload after update failed: {}", e);
        }
    }

    // =========================================================================
    // Schedules
    // =========================================================================

    pub async fn schedule_options(&self) -> Vec<ScheduleOption> {
        self.slot_map.read().await.schedule_options()
    }

    /// Upcoming dispenses from the last poll, resolved against the slot map.
    pub async fn upcoming(&self) -> Vec<ScheduleEntry> {
        let upcoming = self
            .poller
            .snapshot()
            .await
            .upcoming_schedules
            .data
            .unwrap_or_default();
        let map = self.slot_map.read().await;
        upcoming_entries(&upcoming, &map, Local::now().date_naive())
    }

    pub async fn saved_schedules(&self) -> Option<DailySchedules> {
        self.saved_schedules.read().await.clone()
    }

    /// Any schedule-control interaction (frequency change, time edit).
    pub async fn touch_schedule(&self) -> Result<(), ConsoleError> {
        Ok(self.mode.acquire(Mode::Schedule).await?)
    }

    /// Validate and save both drums' schedules, then clear the drums.
    ///
    /// The clear is only issued after the device accepted the schedule, and
    /// its outcome is reported separately.
    pub async fn save_schedules(
        &self,
        request: &ScheduleRequest,
    ) -> Result<ScheduleSaveOutcome, ConsoleError> {
        self.mode.acquire(Mode::Schedule).await?;

        let schedules = validate_schedules(request).map_err(|e| {
            debug!("Schedule rejected: {}", e);
            e
        })?;

        let message = self
            .client
            .set_daily_schedules(&schedules)
            .await
            .map_err(|e| {
                warn!("Saving schedules failed: {}", e);
                e
            })?;
        info!(
            drum1 = %schedules.drum1.frequency,
            drum2 = %schedules.drum2.frequency,
            "Daily schedules saved"
        );
        *self.saved_schedules.write().await = Some(schedules);
        self.bus.publish(BusEvent::SchedulesSaved);

        let clear = match self.clear_drums().await {
            Ok(message) => ClearOutcome { ok: true, message },
            Err(e) => ClearOutcome {
                ok: false,
                message: e.to_string(),
            },
        };

        Ok(ScheduleSaveOutcome { message, clear })
    }

    // =========================================================================
    // Device actions
    // =========================================================================

    pub async fn manual_dispense(&self, drum: Drum, pills: u32) -> Result<String, ConsoleError> {
        self.mode.acquire(Mode::Manual).await?;

        if pills == 0 {
            return Err(ValidationError::InvalidPillCount.into());
        }

        let message = self
            .client
            .manual_dispense(drum, pills)
            .await
            .map_err(|e| {
                warn!(%drum, pills, "Manual dispense failed: {}", e);
                e
            })?;
        info!(%drum, pills, "Manual dispense sent");

        self.poller.trigger(PollKind::Logs);
        Ok(message)
    }

    pub async fn clear_drums(&self) -> Result<String, ConsoleError> {
        let message = self.client.clear_drums().await.map_err(|e| {
            warn!("Clear drums failed: {}", e);
            e
        })?;
        info!("Drums cleared");
        self.bus.publish(BusEvent::DrumsCleared);

        self.poller.trigger(PollKind::Status);
        Ok(message)
    }
}
