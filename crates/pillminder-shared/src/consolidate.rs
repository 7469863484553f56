//! Cross-user consolidation for the administrator view.
//!
//! Merges every patient's medications and dose logs into one
//! [`PatientAggregate`] per patient, ordered by medication count.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::adherence::summarize;
use crate::models::{DoseLogEntry, Medication, PatientAggregate, PatientProfile};
use crate::names::placeholder_profile;
use crate::types::UserId;

/// Result of [`consolidate`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Consolidation {
    /// Aggregates sorted by medication count, descending. Equal counts keep
    /// encounter order.
    pub patients: Vec<PatientAggregate>,
    /// Logs whose owner was neither a known profile nor a medication owner.
    pub dropped_logs: usize,
}

struct Accumulator {
    profile: PatientProfile,
    medications: Vec<Medication>,
    logs: Vec<DoseLogEntry>,
}

impl Accumulator {
    fn new(profile: PatientProfile) -> Self {
        Self {
            profile,
            medications: Vec::new(),
            logs: Vec::new(),
        }
    }
}

/// Build per-patient aggregates.
///
/// The owner map is seeded from `profiles` (first occurrence wins), then
/// extended by any medication owner not yet seen. A log is attached only
/// when its owner is already in the map; the rest are counted in
/// [`Consolidation::dropped_logs`].
pub fn consolidate(
    profiles: Vec<PatientProfile>,
    medications: Vec<Medication>,
    logs: Vec<DoseLogEntry>,
) -> Consolidation {
    let mut order: Vec<Accumulator> = Vec::with_capacity(profiles.len());
    let mut index: HashMap<UserId, usize> = HashMap::with_capacity(profiles.len());

    for profile in profiles {
        if !index.contains_key(&profile.id) {
            index.insert(profile.id, order.len());
            order.push(Accumulator::new(profile));
        }
    }

    for medication in medications {
        let slot = *index.entry(medication.user_id).or_insert_with(|| {
            order.push(Accumulator::new(placeholder_profile(medication.user_id)));
            order.len() - 1
        });
        order[slot].medications.push(medication);
    }

    let mut dropped_logs = 0;
    for log in logs {
        match index.get(&log.user_id) {
            Some(&slot) => order[slot].logs.push(log),
            None => dropped_logs += 1,
        }
    }

    if dropped_logs > 0 {
        warn!(
            dropped_logs,
            "Dose logs without a known owner were left out of the consolidation"
        );
    }

    let mut patients: Vec<PatientAggregate> = order
        .into_iter()
        .map(|acc| {
            let summary = summarize(&acc.medications, &acc.logs);
            PatientAggregate {
                profile: acc.profile,
                medications: acc.medications,
                logs: acc.logs,
                summary,
            }
        })
        .collect();

    // `sort_by` is stable, so equal counts keep encounter order.
    patients.sort_by(|a, b| b.summary.total.cmp(&a.summary.total));

    Consolidation {
        patients,
        dropped_logs,
    }
}
