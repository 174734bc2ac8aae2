//! Daily dispense schedule validation.
//!
//! Each drum gets a frequency (`once` or `twice` a day) and one or two
//! `HH:MM` times. Rules are checked in order and the first failure wins:
//!
//! 1. every required time is present
//! 2. every time is `HH:MM` with `HH` in 00..=23 and `MM` in 00..=59
//! 3. for `twice`, the two times differ
//!
//! Drum 1 is validated completely before drum 2.

use chrono::{NaiveTime, Timelike};
use regex::Regex;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::sync::LazyLock;

use super::{Drum, ValidationError};

static TIME_FORMAT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{2}:[0-9]{2}$").expect("time pattern is valid"));

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    #[default]
    Once,
    Twice,
}

impl Frequency {
    pub fn required_times(self) -> usize {
        match self {
            Self::Once => 1,
            Self::Twice => 2,
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Once => write!(f, "once"),
            Self::Twice => write!(f, "twice"),
        }
    }
}

/// A validated time of day, minute precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ScheduleTime(NaiveTime);

impl ScheduleTime {
    pub fn hour(&self) -> u32 {
        self.0.hour()
    }

    pub fn minute(&self) -> u32 {
        self.0.minute()
    }

    pub fn as_naive(&self) -> NaiveTime {
        self.0
    }
}

impl fmt::Display for ScheduleTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%H:%M"))
    }
}

impl Serialize for ScheduleTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Parse an exact `HH:MM` string.
///
/// `"9:30"`, `"24:00"` and `"12:60"` are all rejected.
pub fn parse_time(value: &str) -> Option<ScheduleTime> {
    if !TIME_FORMAT.is_match(value) {
        return None;
    }
    let hour: u32 = value[0..2].parse().ok()?;
    let minute: u32 = value[3..5].parse().ok()?;
    NaiveTime::from_hms_opt(hour, minute, 0).map(ScheduleTime)
}

/// Per-drum schedule as entered in the form, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrumScheduleInput {
    pub frequency: Frequency,
    #[serde(default)]
    pub times: Vec<String>,
}

impl DrumScheduleInput {
    pub fn once(time: &str) -> Self {
        Self {
            frequency: Frequency::Once,
            times: vec![time.to_string()],
        }
    }

    pub fn twice(first: &str, second: &str) -> Self {
        Self {
            frequency: Frequency::Twice,
            times: vec![first.to_string(), second.to_string()],
        }
    }
}

/// Schedule form for both drums.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleRequest {
    pub drum1: DrumScheduleInput,
    pub drum2: DrumScheduleInput,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DrumSchedule {
    pub frequency: Frequency,
    pub times: Vec<ScheduleTime>,
}

/// Validated schedules, serialized exactly as `/setDailySchedules` expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailySchedules {
    pub drum1: DrumSchedule,
    pub drum2: DrumSchedule,
}

impl DailySchedules {
    pub fn get(&self, drum: Drum) -> &DrumSchedule {
        match drum {
            Drum::One => &self.drum1,
            Drum::Two => &self.drum2,
        }
    }
}

fn validate_drum(drum: Drum, input: &DrumScheduleInput) -> Result<DrumSchedule, ValidationError> {
    // Times beyond what the frequency needs are ignored
    let raw: Vec<&str> = (0..input.frequency.required_times())
        .map(|i| input.times.get(i).map(String::as_str).unwrap_or(""))
        .collect();

    if raw.iter().any(|t| t.is_empty()) {
        return Err(match input.frequency {
            Frequency::Once => ValidationError::MissingTime { drum },
            Frequency::Twice => ValidationError::MissingTimes { drum },
        });
    }

    let times = raw
        .iter()
        .map(|t| {
            parse_time(t).ok_or_else(|| ValidationError::InvalidTime {
                drum,
                value: t.to_string(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    if input.frequency == Frequency::Twice && times[0] == times[1] {
        return Err(ValidationError::DuplicateTimes { drum });
    }

    Ok(DrumSchedule {
        frequency: input.frequency,
        times,
    })
}

pub fn validate_schedules(request: &ScheduleRequest) -> Result<DailySchedules, ValidationError> {
    Ok(DailySchedules {
        drum1: validate_drum(Drum::One, &request.drum1)?,
        drum2: validate_drum(Drum::Two, &request.drum2)?,
    })
}
