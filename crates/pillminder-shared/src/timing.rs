//! Dose timing classification.
//!
//! Compares an actual "taken" instant against the medication's daily slot
//! on the same calendar day and labels it on time, late, or early.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::constants::ON_TIME_WINDOW_MINUTES;
use crate::types::{DoseStatus, TimeOfDay};

const MILLIS_PER_MINUTE: i64 = 60_000;

/// Tunable classification policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingPolicy {
    /// Inclusive on-time window in minutes on either side of the slot.
    pub on_time_window: i64,
}

impl Default for TimingPolicy {
    fn default() -> Self {
        Self {
            on_time_window: ON_TIME_WINDOW_MINUTES,
        }
    }
}

/// Outcome of classifying one dose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoseTiming {
    pub status: DoseStatus,
    /// Signed offset from the slot, rounded to the nearest minute.
    pub minutes: i64,
}

impl DoseTiming {
    /// Short human-readable text for confirmation notifications.
    pub fn describe(&self) -> String {
        match self.status {
            DoseStatus::OnTime => "on time".to_string(),
            DoseStatus::Late => format!("{} min late", self.minutes),
            DoseStatus::Early => format!("{} min early", self.minutes.abs()),
        }
    }
}

/// Classify with the default ±10 minute window.
pub fn classify(scheduled: TimeOfDay, taken_at: NaiveDateTime) -> DoseTiming {
    classify_with(TimingPolicy::default(), scheduled, taken_at)
}

/// Classify `taken_at` (local wall-clock time) against `scheduled` on the
/// taken date.
pub fn classify_with(
    policy: TimingPolicy,
    scheduled: TimeOfDay,
    taken_at: NaiveDateTime,
) -> DoseTiming {
    let slot = taken_at.date().and_time(scheduled.as_naive());
    let diff_ms = (taken_at - slot).num_milliseconds();
    let minutes = round_to_minutes(diff_ms);

    let status = if minutes > policy.on_time_window {
        DoseStatus::Late
    } else if minutes < -policy.on_time_window {
        DoseStatus::Early
    } else {
        DoseStatus::OnTime
    };

    DoseTiming { status, minutes }
}

/// Nearest whole minute; exact halves round toward positive infinity.
fn round_to_minutes(millis: i64) -> i64 {
    (millis + MILLIS_PER_MINUTE / 2).div_euclid(MILLIS_PER_MINUTE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn slot(hour: u32, minute: u32) -> TimeOfDay {
        TimeOfDay::new(hour, minute).unwrap()
    }

    fn at(hour: u32, minute: u32, second: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 14)
            .unwrap()
            .and_hms_opt(hour, minute, second)
            .unwrap()
    }

    #[test]
    fn test_window_boundaries_are_inclusive() {
        let scheduled = slot(8, 0);
        let cases = [
            (at(7, 49, 0), DoseStatus::Early, -11),
            (at(7, 50, 0), DoseStatus::OnTime, -10),
            (at(8, 0, 0), DoseStatus::OnTime, 0),
            (at(8, 10, 0), DoseStatus::OnTime, 10),
            (at(8, 11, 0), DoseStatus::Late, 11),
        ];

        for (taken, status, minutes) in cases {
            let timing = classify(scheduled, taken);
            assert_eq!(timing.status, status, "at {taken}");
            assert_eq!(timing.minutes, minutes, "at {taken}");
        }
    }

    #[test]
    fn test_offset_rounds_to_nearest_minute() {
        let scheduled = slot(8, 0);
        assert_eq!(classify(scheduled, at(8, 10, 29)).minutes, 10);
        assert_eq!(classify(scheduled, at(8, 10, 30)).minutes, 11);
        assert_eq!(classify(scheduled, at(8, 10, 30)).status, DoseStatus::Late);
        // Halves round up, so -10.5 becomes -10 (on time) ...
        assert_eq!(classify(scheduled, at(7, 49, 30)).minutes, -10);
        assert_eq!(classify(scheduled, at(7, 49, 30)).status, DoseStatus::OnTime);
        // ... and anything past it is early.
        assert_eq!(classify(scheduled, at(7, 49, 29)).minutes, -11);
    }

    #[test]
    fn test_slot_is_interpreted_on_taken_date() {
        // A 23:30 dose taken just after midnight counts against today's slot.
        let scheduled = slot(23, 30);
        let timing = classify(scheduled, at(0, 5, 0));
        assert_eq!(timing.status, DoseStatus::Early);
        assert_eq!(timing.minutes, -(23 * 60 + 25));
    }

    #[test]
    fn test_subsecond_offsets_round() {
        let scheduled = slot(12, 0);
        let taken = at(12, 0, 0) + Duration::milliseconds(29_999);
        assert_eq!(classify(scheduled, taken).minutes, 0);
    }

    #[test]
    fn test_custom_policy_widens_window() {
        let policy = TimingPolicy { on_time_window: 30 };
        let timing = classify_with(policy, slot(8, 0), at(8, 25, 0));
        assert_eq!(timing.status, DoseStatus::OnTime);
        assert_eq!(timing.minutes, 25);
    }

    #[test]
    fn test_describe() {
        let late = DoseTiming { status: DoseStatus::Late, minutes: 14 };
        let early = DoseTiming { status: DoseStatus::Early, minutes: -20 };
        let on_time = DoseTiming { status: DoseStatus::OnTime, minutes: -3 };
        assert_eq!(late.describe(), "14 min late");
        assert_eq!(early.describe(), "20 min early");
        assert_eq!(on_time.describe(), "on time");
    }
}
