//! Data polled from the dispenser.
//!
//! Shapes follow the device's JSON. Every field is optional or defaulted,
//! and an explicit `null` counts as missing; the console renders what it
//! gets and never rejects a poll for a missing field.

use chrono::{Days, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

use super::schedule::parse_time;
use super::{Drum, SlotMap};

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// `GET /status`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceStatus {
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub slot_drum1: Option<u32>,
    #[serde(default)]
    pub slot_drum2: Option<u32>,
    #[serde(default)]
    pub wifi: Option<serde_json::Value>,
}

/// `GET /lastAction`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastAction {
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub event: Option<String>,
}

/// One element of `GET /api/upcoming-schedules`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpcomingSchedule {
    /// 0 = today, 1 = tomorrow
    #[serde(default, deserialize_with = "null_as_default")]
    pub day: u8,
    #[serde(default, deserialize_with = "null_as_default")]
    pub time: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub medicine: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub drum: u8,
    #[serde(default, deserialize_with = "null_as_default")]
    pub executed: bool,
}

/// `GET /api/dispenser-status`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DispenserStatus {
    #[serde(default, deserialize_with = "null_as_default")]
    pub drums: Vec<DrumFill>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrumFill {
    #[serde(default, deserialize_with = "null_as_default")]
    pub drum: u8,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_empty: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub fill_percentage: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub current_slot: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub empty_slots: u32,
}

/// Medicine referenced by a schedule entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicineRef {
    pub pill_name: String,
    pub drum: u8,
    /// Unknown when the name is no longer in the slot map
    pub slot: Option<u8>,
}

/// A scheduled dispense at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntry {
    pub date_time: NaiveDateTime,
    pub medicine: MedicineRef,
    pub executed: bool,
}

/// Resolve upcoming schedules against the slot map.
///
/// Entries whose time is not a valid `HH:MM` are dropped. The result is
/// ordered by time.
pub fn upcoming_entries(
    upcoming: &[UpcomingSchedule],
    slot_map: &SlotMap,
    today: NaiveDate,
) -> Vec<ScheduleEntry> {
    let mut entries: Vec<ScheduleEntry> = upcoming
        .iter()
        .filter_map(|u| {
            let time = parse_time(&u.time)?;
            let date = today.checked_add_days(Days::new(u64::from(u.day)))?;
            let slot = Drum::try_from(u.drum)
                .ok()
                .and_then(|drum| slot_map.find_slot(drum, &u.medicine));
            Some(ScheduleEntry {
                date_time: date.and_time(time.as_naive()),
                medicine: MedicineRef {
                    pill_name: u.medicine.clone(),
                    drum: u.drum,
                    slot,
                },
                executed: u.executed,
            })
        })
        .collect();
    entries.sort_by_key(|e| e.date_time);
    entries
}
