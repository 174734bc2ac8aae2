//! Dispenser data model and client-side rules.
//!
//! Everything here is pure: no I/O, no locks. The console feeds it cached
//! backend data and user input, and only sends a request once these rules
//! have accepted it.
//!
//! - [`slots`] - slot map, per-drum capacity, batch-add validation
//! - [`schedule`] - daily schedule validation (`HH:MM`, once/twice)
//! - [`device`] - polled device data and upcoming-schedule entries

pub mod device;
pub mod schedule;
pub mod slots;

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub use device::{
    upcoming_entries, DeviceStatus, DispenserStatus, DrumFill, LastAction, MedicineRef,
    ScheduleEntry, UpcomingSchedule,
};
pub use schedule::{
    parse_time, validate_schedules, DailySchedules, DrumSchedule, DrumScheduleInput, Frequency,
    ScheduleRequest, ScheduleTime,
};
pub use slots::{
    validate_new_medicines, AddCount, DrumView, MedicineEntry, NewMedicine, ScheduleOption,
    SlotMap,
};

/// Number of slots on each drum wheel.
pub const MAX_SLOTS_PER_DRUM: usize = 7;

/// One of the two medicine drums.
///
/// Serialized as the bare integer the device uses (`1` or `2`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Drum {
    One,
    Two,
}

impl Drum {
    pub const ALL: [Drum; 2] = [Drum::One, Drum::Two];

    pub fn number(self) -> u8 {
        match self {
            Self::One => 1,
            Self::Two => 2,
        }
    }
}

impl TryFrom<u8> for Drum {
    type Error = ValidationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::One),
            2 => Ok(Self::Two),
            other => Err(ValidationError::InvalidDrum(other)),
        }
    }
}

impl From<Drum> for u8 {
    fn from(drum: Drum) -> Self {
        drum.number()
    }
}

impl fmt::Display for Drum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// Input rejected before any request reaches the dispenser.
///
/// The `Display` text is what the user sees.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Invalid drum {0}; the dispenser has drums 1 and 2.")]
    InvalidDrum(u8),

    #[error("Invalid slot {0}; slots are numbered 1 to 7.")]
    InvalidSlot(u8),

    #[error("Drum {drum} is full.")]
    DrumFull { drum: Drum },

    #[error("You can only add up to {available} more medicines to this drum.")]
    TooManyMedicines {
        drum: Drum,
        requested: usize,
        available: usize,
    },

    #[error("Please provide a name for all new medicines.")]
    BlankMedicineName,

    #[error("No new medicines to save.")]
    NoMedicines,

    #[error("Please set a time for Drum {drum}.")]
    MissingTime { drum: Drum },

    #[error("Please set both times for Drum {drum}.")]
    MissingTimes { drum: Drum },

    #[error("Invalid time \"{value}\" for Drum {drum}; use HH:MM between 00:00 and 23:59.")]
    InvalidTime { drum: Drum, value: String },

    #[error("The two times for Drum {drum} must be different.")]
    DuplicateTimes { drum: Drum },

    #[error("Please enter a number of pills of at least 1.")]
    InvalidPillCount,
}
