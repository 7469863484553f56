use std::fmt;
use std::str::FromStr;

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::SHORT_ID_LEN;
use crate::error::ValidationError;

// User identity as issued by the external identity provider.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(pub Uuid);

impl UserId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Leading characters of the id, used in synthesized names and emails.
    pub fn short(&self) -> String {
        self.0.to_string()[..SHORT_ID_LEN].to_string()
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct MedicationId(pub Uuid);

impl MedicationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MedicationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MedicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct DoseLogId(pub Uuid);

impl DoseLogId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DoseLogId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DoseLogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Time of day
// ---------------------------------------------------------------------------

/// A daily wall-clock slot with minute precision.
///
/// Accepts `H:MM` and `HH:MM` (hour 0-23, minute 0-59) and always renders
/// as zero-padded `HH:MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay(NaiveTime);

impl TimeOfDay {
    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(Self)
    }

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

impl FromStr for TimeOfDay {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidTime(s.to_string());

        let (hour, minute) = s.split_once(':').ok_or_else(invalid)?;
        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());

        if hour.is_empty() || hour.len() > 2 || !all_digits(hour) {
            return Err(invalid());
        }
        if minute.len() != 2 || !all_digits(minute) {
            return Err(invalid());
        }

        let hour: u32 = hour.parse().map_err(|_| invalid())?;
        let minute: u32 = minute.parse().map_err(|_| invalid())?;
        if hour > 23 || minute > 59 {
            return Err(invalid());
        }

        Self::new(hour, minute).ok_or_else(invalid)
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimeOfDay> for String {
    fn from(value: TimeOfDay) -> Self {
        value.to_string()
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

// ---------------------------------------------------------------------------
// Dose status
// ---------------------------------------------------------------------------

/// Timing classification of a taken dose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DoseStatus {
    OnTime,
    Late,
    Early,
}

impl DoseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OnTime => "on_time",
            Self::Late => "late",
            Self::Early => "early",
        }
    }
}

impl FromStr for DoseStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "on_time" => Ok(Self::OnTime),
            "late" => Ok(Self::Late),
            "early" => Ok(Self::Early),
            other => Err(ValidationError::UnknownStatus(other.to_string())),
        }
    }
}

impl fmt::Display for DoseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_one_and_two_digit_hours() {
        assert_eq!("7:05".parse::<TimeOfDay>().unwrap(), TimeOfDay::new(7, 5).unwrap());
        assert_eq!("08:30".parse::<TimeOfDay>().unwrap(), TimeOfDay::new(8, 30).unwrap());
        assert_eq!("23:59".parse::<TimeOfDay>().unwrap(), TimeOfDay::new(23, 59).unwrap());
        assert_eq!("0:00".parse::<TimeOfDay>().unwrap(), TimeOfDay::new(0, 0).unwrap());
    }

    #[test]
    fn test_parse_rejects_malformed_times() {
        for bad in ["24:00", "12:60", "7:5", "123:00", "", ":30", "12-30", "ab:cd", "12:3a", " 8:30"] {
            assert!(bad.parse::<TimeOfDay>().is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn test_display_is_zero_padded() {
        assert_eq!(TimeOfDay::new(7, 5).unwrap().to_string(), "07:05");
    }

    #[test]
    fn test_serde_uses_clock_string() {
        let time = TimeOfDay::new(9, 15).unwrap();
        let json = serde_json::to_string(&time).unwrap();
        assert_eq!(json, "\"09:15\"");
        let back: TimeOfDay = serde_json::from_str(&json).unwrap();
        assert_eq!(back, time);
        assert!(serde_json::from_str::<TimeOfDay>("\"25:00\"").is_err());
    }

    #[test]
    fn test_short_id_is_prefix() {
        let id = UserId(Uuid::parse_str("a1b2c3d4-0000-4000-8000-000000000000").unwrap());
        assert_eq!(id.short(), "a1b2c3d4");
    }

    #[test]
    fn test_dose_status_round_trips_through_str() {
        for status in [DoseStatus::OnTime, DoseStatus::Late, DoseStatus::Early] {
            assert_eq!(status.as_str().parse::<DoseStatus>().unwrap(), status);
        }
        assert!("missed".parse::<DoseStatus>().is_err());
    }
}
