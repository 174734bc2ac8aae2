//! Slot map and per-drum capacity.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::{Drum, ValidationError, MAX_SLOTS_PER_DRUM};

/// A medicine assigned to a (drum, slot) pair, as returned by `/getSlotMap`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicineEntry {
    pub drum: Drum,
    pub slot: u8,
    pub pill_name: String,
}

/// A new medicine waiting to be assigned a slot by the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMedicine {
    pub pill_name: String,
}

/// Result of clamping a requested add-count to a drum's free slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddCount {
    pub drum: Drum,
    pub requested: usize,
    pub accepted: usize,
    pub available: usize,
    /// Set when `requested` had to be reduced
    pub notice: Option<String>,
}

impl AddCount {
    pub fn clamped(&self) -> bool {
        self.accepted < self.requested
    }
}

/// Everything the medicine tab shows for one drum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DrumView {
    pub drum: Drum,
    /// Sorted by slot; gaps left by removals are kept
    pub entries: Vec<MedicineEntry>,
    pub available_slots: usize,
    pub capacity_label: String,
    pub full: bool,
}

/// One entry of the schedule tab's medicine selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduleOption {
    /// `"drum,slot"`
    pub value: String,
    pub label: String,
    pub drum: Drum,
    pub slot: u8,
}

/// Locally cached copy of the device slot map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SlotMap {
    entries: Vec<MedicineEntry>,
}

impl SlotMap {
    /// Build from backend data. Entries are unique by (drum, slot); later
    /// duplicates are dropped.
    pub fn new(entries: Vec<MedicineEntry>) -> Self {
        let mut seen = HashSet::new();
        let entries = entries
            .into_iter()
            .filter(|e| seen.insert((e.drum, e.slot)))
            .collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[MedicineEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, drum: Drum, slot: u8) -> Option<&MedicineEntry> {
        self.entries
            .iter()
            .find(|e| e.drum == drum && e.slot == slot)
    }

    /// Entries of one drum, sorted by slot.
    pub fn drum_entries(&self, drum: Drum) -> Vec<MedicineEntry> {
        let mut entries: Vec<_> = self
            .entries
            .iter()
            .filter(|e| e.drum == drum)
            .cloned()
            .collect();
        entries.sort_by_key(|e| e.slot);
        entries
    }

    pub fn count(&self, drum: Drum) -> usize {
        self.entries.iter().filter(|e| e.drum == drum).count()
    }

    /// `max(0, 7 - count(drum))`
    pub fn available_slots(&self, drum: Drum) -> usize {
        MAX_SLOTS_PER_DRUM.saturating_sub(self.count(drum))
    }

    pub fn clamp_add_count(&self, drum: Drum, requested: usize) -> AddCount {
        let available = self.available_slots(drum);
        let accepted = requested.min(available);
        let notice = (accepted < requested).then(|| {
            ValidationError::TooManyMedicines {
                drum,
                requested,
                available,
            }
            .to_string()
        });

        AddCount {
            drum,
            requested,
            accepted,
            available,
            notice,
        }
    }

    pub fn drum_view(&self, drum: Drum) -> DrumView {
        let available_slots = self.available_slots(drum);
        DrumView {
            drum,
            entries: self.drum_entries(drum),
            available_slots,
            capacity_label: format!(
                "({} of {} slots available)",
                available_slots, MAX_SLOTS_PER_DRUM
            ),
            full: available_slots == 0,
        }
    }

    /// All medicines sorted by drum, then slot.
    pub fn schedule_options(&self) -> Vec<ScheduleOption> {
        let mut sorted = self.entries.clone();
        sorted.sort_by_key(|e| (e.drum, e.slot));
        sorted
            .into_iter()
            .map(|e| ScheduleOption {
                value: format!("{},{}", e.drum, e.slot),
                label: format!("{} (Drum {}, Slot {})", e.pill_name, e.drum, e.slot),
                drum: e.drum,
                slot: e.slot,
            })
            .collect()
    }

    /// Slot holding `pill_name` on `drum`, if the name is in the map.
    pub fn find_slot(&self, drum: Drum, pill_name: &str) -> Option<u8> {
        self.entries
            .iter()
            .filter(|e| e.drum == drum && e.pill_name == pill_name)
            .map(|e| e.slot)
            .min()
    }
}

/// Validate a batch of new medicine names for `drum`.
///
/// All-or-nothing: one blank name rejects the whole batch. Names are
/// returned trimmed.
pub fn validate_new_medicines(
    slot_map: &SlotMap,
    drum: Drum,
    names: &[String],
) -> Result<Vec<NewMedicine>, ValidationError> {
    if names.is_empty() {
        return Err(ValidationError::NoMedicines);
    }

    let medicines: Vec<NewMedicine> = names
        .iter()
        .map(|name| NewMedicine {
            pill_name: name.trim().to_string(),
        })
        .collect();

    if medicines.iter().any(|m| m.pill_name.is_empty()) {
        return Err(ValidationError::BlankMedicineName);
    }

    let available = slot_map.available_slots(drum);
    if available == 0 {
        return Err(ValidationError::DrumFull { drum });
    }
    if medicines.len() > available {
        return Err(ValidationError::TooManyMedicines {
            drum,
            requested: medicines.len(),
            available,
        });
    }

    Ok(medicines)
}
