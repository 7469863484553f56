//! Cross-user reads for administrators.
//!
//! Data-store failures propagate. Identity failures never do: a user who
//! cannot be looked up is shown with a placeholder profile.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{info, warn};

use pillminder_shared::constants::UNKNOWN_MEDICATION_NAME;
use pillminder_shared::names::{placeholder_identity, placeholder_profile, resolve_profile};
use pillminder_shared::{
    consolidate, Consolidation, DoseLogEntry, Identity, Medication, OwnedDoseLog,
    OwnedMedication, PatientProfile, UserId,
};

use crate::error::Result;
use crate::ports::{DataStore, IdentityProvider};

pub struct AdminService {
    identity: Arc<dyn IdentityProvider>,
    store: Arc<dyn DataStore>,
}

impl AdminService {
    pub fn new(identity: Arc<dyn IdentityProvider>, store: Arc<dyn DataStore>) -> Self {
        Self { identity, store }
    }

    /// One aggregate per patient, most medications first.
    ///
    /// Identities come from the bulk user listing. If that is refused, every
    /// owner seen in the data is looked up one at a time instead.
    pub async fn patient_aggregates(&self) -> Result<Consolidation> {
        let (medications, logs) =
            futures::try_join!(self.store.all_medications(), self.store.all_dose_logs())?;
        info!(
            medications = medications.len(),
            logs = logs.len(),
            "Fetched all patient data"
        );

        let identities = match self.identity.list_all_users().await {
            Ok(users) => {
                info!(users = users.len(), "Listed users");
                users
            }
            Err(e) => {
                warn!(error = %e, "User listing failed, looking up owners individually");
                self.lookup_each(owners(&medications, &logs)).await
            }
        };

        let profiles = identities.iter().map(resolve_profile).collect();
        let consolidation = consolidate(profiles, medications, logs);

        info!(
            patients = consolidation.patients.len(),
            dropped_logs = consolidation.dropped_logs,
            "Consolidated patient data"
        );
        Ok(consolidation)
    }

    /// Every medication, newest first, with its owner.
    pub async fn medications_with_owners(&self) -> Result<Vec<OwnedMedication>> {
        let medications = self.store.all_medications().await?;
        let profiles = self
            .profiles_for(medications.iter().map(|m| m.user_id))
            .await;

        Ok(medications
            .into_iter()
            .map(|medication| {
                let owner = profile_of(&profiles, medication.user_id);
                OwnedMedication { medication, owner }
            })
            .collect())
    }

    /// Every dose log, newest first, with its owner and medication name.
    pub async fn dose_logs_with_owners(&self) -> Result<Vec<OwnedDoseLog>> {
        let (logs, medications) =
            futures::try_join!(self.store.all_dose_logs(), self.store.all_medications())?;

        let names: HashMap<_, _> = medications
            .into_iter()
            .map(|m| (m.id, m.name))
            .collect();
        let profiles = self.profiles_for(logs.iter().map(|l| l.user_id)).await;

        Ok(logs
            .into_iter()
            .map(|log| {
                let owner = profile_of(&profiles, log.user_id);
                let medication_name = names
                    .get(&log.medication_id)
                    .cloned()
                    .unwrap_or_else(|| UNKNOWN_MEDICATION_NAME.to_string());
                OwnedDoseLog {
                    log,
                    owner,
                    medication_name,
                }
            })
            .collect())
    }

    async fn profiles_for(
        &self,
        ids: impl Iterator<Item = UserId>,
    ) -> HashMap<UserId, PatientProfile> {
        self.lookup_each(distinct(ids))
            .await
            .iter()
            .map(|identity| (identity.id, resolve_profile(identity)))
            .collect()
    }

    /// Sequential per-user lookups, substituting a placeholder for each
    /// failure.
    async fn lookup_each(&self, ids: Vec<UserId>) -> Vec<Identity> {
        let mut identities = Vec::with_capacity(ids.len());
        for id in ids {
            match self.identity.get_user_by_id(id).await {
                Ok(identity) => identities.push(identity),
                Err(e) => {
                    warn!(user = %id.short(), error = %e, "User lookup failed, using placeholder");
                    identities.push(placeholder_identity(id));
                }
            }
        }
        identities
    }
}

/// Medication owners, then log owners, each once, in encounter order.
fn owners(medications: &[Medication], logs: &[DoseLogEntry]) -> Vec<UserId> {
    distinct(
        medications
            .iter()
            .map(|m| m.user_id)
            .chain(logs.iter().map(|l| l.user_id)),
    )
}

fn distinct(ids: impl Iterator<Item = UserId>) -> Vec<UserId> {
    let mut seen = HashSet::new();
    ids.filter(|id| seen.insert(*id)).collect()
}

fn profile_of(profiles: &HashMap<UserId, PatientProfile>, id: UserId) -> PatientProfile {
    profiles
        .get(&id)
        .cloned()
        .unwrap_or_else(|| placeholder_profile(id))
}
