//! Adherence aggregation over one user's medications and dose logs.

use crate::models::{AdherenceSummary, DoseLogEntry, Medication};
use crate::types::DoseStatus;

/// Fold a user's medications and dose logs into an [`AdherenceSummary`].
///
/// Total over any input: `missed` is floored at zero and the rate is
/// clamped to `0..=100` even when logs outnumber medications.
pub fn summarize(medications: &[Medication], logs: &[DoseLogEntry]) -> AdherenceSummary {
    let total = medications.len();

    let (mut on_time, mut late, mut early) = (0usize, 0usize, 0usize);
    for log in logs {
        match log.status {
            DoseStatus::OnTime => on_time += 1,
            DoseStatus::Late => late += 1,
            DoseStatus::Early => early += 1,
        }
    }

    let taken = on_time + late + early;

    AdherenceSummary {
        total,
        taken,
        on_time,
        late,
        early,
        missed: total.saturating_sub(taken),
        adherence_rate: adherence_rate(taken, total),
    }
}

/// `round(100 * taken / total)` with halves rounding up, in integer math.
fn adherence_rate(taken: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let rate = (200 * taken as u64 + total as u64) / (2 * total as u64);
    rate.min(100) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DoseLogId, MedicationId, TimeOfDay, UserId};
    use chrono::Utc;

    fn medication(user: UserId) -> Medication {
        Medication {
            id: MedicationId::new(),
            user_id: user,
            name: "Aspirin".into(),
            time: TimeOfDay::new(8, 0).unwrap(),
            taken: false,
            taken_at: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    fn log(user: UserId, status: DoseStatus) -> DoseLogEntry {
        DoseLogEntry {
            id: DoseLogId::new(),
            medication_id: MedicationId::new(),
            user_id: user,
            taken_at: Utc::now(),
            scheduled_time: TimeOfDay::new(8, 0).unwrap(),
            status,
            minutes_difference: 0,
        }
    }

    #[test]
    fn test_empty_inputs() {
        assert_eq!(summarize(&[], &[]), AdherenceSummary::default());
    }

    #[test]
    fn test_rate_is_zero_without_medications() {
        let user = UserId::new();
        let logs = vec![log(user, DoseStatus::OnTime), log(user, DoseStatus::Late)];
        let summary = summarize(&[], &logs);
        assert_eq!(summary.taken, 2);
        assert_eq!(summary.missed, 0);
        assert_eq!(summary.adherence_rate, 0);
    }

    #[test]
    fn test_partitions_by_status() {
        let user = UserId::new();
        let meds: Vec<_> = (0..4).map(|_| medication(user)).collect();
        let logs = vec![
            log(user, DoseStatus::OnTime),
            log(user, DoseStatus::Late),
            log(user, DoseStatus::Early),
        ];

        let summary = summarize(&meds, &logs);
        assert_eq!(summary.total, 4);
        assert_eq!(summary.on_time, 1);
        assert_eq!(summary.late, 1);
        assert_eq!(summary.early, 1);
        assert_eq!(summary.taken, 3);
        assert_eq!(summary.missed, 1);
        assert_eq!(summary.adherence_rate, 75);
    }

    #[test]
    fn test_rounding() {
        assert_eq!(adherence_rate(1, 3), 33);
        assert_eq!(adherence_rate(2, 3), 67);
        assert_eq!(adherence_rate(1, 8), 13); // 12.5 rounds up
        assert_eq!(adherence_rate(0, 5), 0);
        assert_eq!(adherence_rate(5, 5), 100);
    }

    #[test]
    fn test_more_logs_than_medications_stays_in_range() {
        let user = UserId::new();
        let meds = vec![medication(user)];
        let logs: Vec<_> = (0..3).map(|_| log(user, DoseStatus::OnTime)).collect();

        let summary = summarize(&meds, &logs);
        assert_eq!(summary.taken, 3);
        assert_eq!(summary.missed, 0);
        assert_eq!(summary.adherence_rate, 100);
    }
}
