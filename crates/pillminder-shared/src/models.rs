//! Domain records shared by the store, the services, and the admin view.
//!
//! Every struct derives `Serialize` and `Deserialize` so it can be handed
//! straight to a UI layer.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{DoseLogId, DoseStatus, MedicationId, TimeOfDay, UserId};

// ---------------------------------------------------------------------------
// Medication
// ---------------------------------------------------------------------------

/// A user-scheduled recurring daily dose.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Medication {
    pub id: MedicationId,
    /// Owning user.
    pub user_id: UserId,
    /// Display name, already trimmed.
    pub name: String,
    /// Daily scheduled slot.
    pub time: TimeOfDay,
    /// Whether the dose has been taken today. Cleared by the daily reset.
    pub taken: bool,
    /// When the dose was marked taken, if it currently is.
    pub taken_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Insert payload for a medication. The store assigns the id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewMedication {
    pub user_id: UserId,
    pub name: String,
    pub time: TimeOfDay,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Dose log
// ---------------------------------------------------------------------------

/// Immutable record of one "taken" event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DoseLogEntry {
    pub id: DoseLogId,
    pub medication_id: MedicationId,
    pub user_id: UserId,
    pub taken_at: DateTime<Utc>,
    /// The slot the dose was compared against.
    pub scheduled_time: TimeOfDay,
    pub status: DoseStatus,
    /// Signed offset from the scheduled slot; positive means late.
    pub minutes_difference: i64,
}

/// Insert payload for a dose log. The store assigns the id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewDoseLog {
    pub medication_id: MedicationId,
    pub user_id: UserId,
    pub taken_at: DateTime<Utc>,
    pub scheduled_time: TimeOfDay,
    pub status: DoseStatus,
    pub minutes_difference: i64,
}

// ---------------------------------------------------------------------------
// Adherence
// ---------------------------------------------------------------------------

/// Derived adherence counters. Never persisted.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AdherenceSummary {
    pub total: usize,
    pub taken: usize,
    pub on_time: usize,
    pub late: usize,
    pub early: usize,
    pub missed: usize,
    /// Rounded percentage in `0..=100`.
    pub adherence_rate: u8,
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// A user as reported by the identity provider. Any field but `id` may be
/// missing.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Identity {
    pub id: UserId,
    pub email: Option<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl Identity {
    pub fn new(id: UserId) -> Self {
        Self {
            id,
            email: None,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_metadata(mut self, key: &str, value: impl Into<String>) -> Self {
        self.metadata
            .insert(key.to_string(), serde_json::Value::String(value.into()));
        self
    }

    /// A metadata field as text, ignoring non-string and blank values.
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata
            .get(key)
            .and_then(|value| value.as_str())
            .filter(|value| !value.trim().is_empty())
    }

    /// The email when present and non-blank.
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref().filter(|email| !email.trim().is_empty())
    }
}

/// Display fields resolved for one patient.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PatientProfile {
    pub id: UserId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
}

// ---------------------------------------------------------------------------
// Admin view
// ---------------------------------------------------------------------------

/// Per-patient rollup shown to administrators.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatientAggregate {
    pub profile: PatientProfile,
    pub medications: Vec<Medication>,
    pub logs: Vec<DoseLogEntry>,
    pub summary: AdherenceSummary,
}

/// A medication paired with its owner's profile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OwnedMedication {
    pub medication: Medication,
    pub owner: PatientProfile,
}

/// A dose log paired with its owner's profile and medication name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OwnedDoseLog {
    pub log: DoseLogEntry,
    pub owner: PatientProfile,
    pub medication_name: String,
}
