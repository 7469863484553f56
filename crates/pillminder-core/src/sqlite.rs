//! [`DataStore`] backed by the local SQLite database.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use pillminder_shared::{
    DoseLogEntry, Medication, MedicationId, NewDoseLog, NewMedication, UserId,
};
use pillminder_store::Database;

use crate::error::{CoreError, Result};
use crate::ports::DataStore;

/// Shares one [`Database`] between tasks. Every call takes the lock, runs a
/// single synchronous query, and releases it before returning.
#[derive(Clone)]
pub struct SqliteDataStore {
    db: Arc<Mutex<Database>>,
}

impl SqliteDataStore {
    pub fn new(db: Database) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
        }
    }

    /// Private in-memory database.
    pub fn in_memory() -> Result<Self> {
        Ok(Self::new(Database::open_in_memory()?))
    }

    fn db(&self) -> Result<MutexGuard<'_, Database>> {
        self.db
            .lock()
            .map_err(|_| CoreError::Store("database lock poisoned".into()))
    }
}

#[async_trait]
impl DataStore for SqliteDataStore {
    async fn insert_medication(&self, new: NewMedication) -> Result<Medication> {
        Ok(self.db()?.insert_medication(&new)?)
    }

    async fn medication(&self, user_id: UserId, id: MedicationId) -> Result<Medication> {
        Ok(self.db()?.get_medication(user_id, id)?)
    }

    async fn medications_for_user(&self, user_id: UserId) -> Result<Vec<Medication>> {
        Ok(self.db()?.list_medications_for_user(user_id)?)
    }

    async fn set_medication_taken(
        &self,
        user_id: UserId,
        id: MedicationId,
        taken: bool,
        taken_at: Option<DateTime<Utc>>,
        updated_at: DateTime<Utc>,
    ) -> Result<Medication> {
        Ok(self
            .db()?
            .set_medication_taken(user_id, id, taken, taken_at, updated_at)?)
    }

    async fn reset_medications(
        &self,
        user_id: UserId,
        updated_at: DateTime<Utc>,
    ) -> Result<Vec<Medication>> {
        Ok(self.db()?.reset_medications_for_user(user_id, updated_at)?)
    }

    async fn delete_medication(&self, user_id: UserId, id: MedicationId) -> Result<bool> {
        Ok(self.db()?.delete_medication(user_id, id)?)
    }

    async fn insert_dose_log(&self, new: NewDoseLog) -> Result<DoseLogEntry> {
        Ok(self.db()?.insert_dose_log(&new)?)
    }

    async fn dose_logs_for_medication(
        &self,
        user_id: UserId,
        medication_id: MedicationId,
    ) -> Result<Vec<DoseLogEntry>> {
        Ok(self
            .db()?
            .list_dose_logs_for_medication(user_id, medication_id)?)
    }

    async fn dose_logs_for_user(
        &self,
        user_id: UserId,
        range: Option<(DateTime<Utc>, DateTime<Utc>)>,
    ) -> Result<Vec<DoseLogEntry>> {
        Ok(self.db()?.list_dose_logs_for_user(user_id, range)?)
    }

    async fn delete_dose_logs_for_medication(
        &self,
        user_id: UserId,
        medication_id: MedicationId,
    ) -> Result<usize> {
        Ok(self
            .db()?
            .delete_dose_logs_for_medication(user_id, medication_id)?)
    }

    async fn all_medications(&self) -> Result<Vec<Medication>> {
        Ok(self.db()?.list_all_medications()?)
    }

    async fn all_dose_logs(&self) -> Result<Vec<DoseLogEntry>> {
        Ok(self.db()?.list_all_dose_logs()?)
    }
}
