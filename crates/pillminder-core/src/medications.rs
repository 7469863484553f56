//! Per-user medication use cases.
//!
//! Every call resolves the signed-in user first and only ever touches that
//! user's records.

use std::sync::Arc;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Utc};
use tracing::{info, warn};

use pillminder_shared::{
    classify_with, summarize, AdherenceSummary, DoseLogEntry, DoseTiming, Identity, Medication,
    MedicationId, NewDoseLog, NewMedication, TimeOfDay, TimingPolicy, ValidationError,
};

use crate::config::CoreConfig;
use crate::error::{CoreError, Result};
use crate::ports::{Clock, DataStore, IdentityProvider, NotificationService};
use crate::reminders::{ReminderScheduler, ReminderSettings};

pub struct MedicationService {
    identity: Arc<dyn IdentityProvider>,
    store: Arc<dyn DataStore>,
    clock: Arc<dyn Clock>,
    reminders: ReminderScheduler,
    timing: TimingPolicy,
}

impl MedicationService {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        store: Arc<dyn DataStore>,
        notifications: Arc<dyn NotificationService>,
        clock: Arc<dyn Clock>,
        config: &CoreConfig,
    ) -> Self {
        let reminders =
            ReminderScheduler::new(notifications, clock.clone(), ReminderSettings::from(config));
        Self {
            identity,
            store,
            clock,
            reminders,
            timing: config.timing,
        }
    }

    pub fn reminders(&self) -> &ReminderScheduler {
        &self.reminders
    }

    async fn current_user(&self) -> Result<Identity> {
        self.identity
            .current_user()
            .await?
            .ok_or(CoreError::NotAuthenticated)
    }

    /// Save a medication and schedule its reminders.
    ///
    /// `time` must be `H:MM` or `HH:MM`. A reminder scheduling failure is
    /// logged and does not undo the save.
    pub async fn add_medication(&self, name: &str, time: &str) -> Result<Medication> {
        let user = self.current_user().await?;

        let time: TimeOfDay = time.parse()?;
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyName.into());
        }

        let medication = self
            .store
            .insert_medication(NewMedication {
                user_id: user.id,
                name: name.to_string(),
                time,
                created_at: self.clock.now().with_timezone(&Utc),
            })
            .await?;

        info!(medication = %medication.id, name = %medication.name, %time, "Medication saved");

        if let Err(e) = self.reminders.schedule(&medication).await {
            warn!(
                medication = %medication.id,
                error = %e,
                "Reminder scheduling failed, but the medication was saved"
            );
        }

        Ok(medication)
    }

    /// The user's medications, newest first.
    pub async fn medications(&self) -> Result<Vec<Medication>> {
        let user = self.current_user().await?;
        let medications = self.store.medications_for_user(user.id).await?;
        info!(count = medications.len(), "Retrieved medications");
        Ok(medications)
    }

    /// The user's medications ordered by time of day.
    pub async fn today_schedule(&self) -> Result<Vec<Medication>> {
        let mut medications = self.medications().await?;
        medications.sort_by_key(|m| m.time);
        Ok(medications)
    }

    /// Record that a dose of `medication_id` was just taken.
    pub async fn log_taken(
        &self,
        medication_id: MedicationId,
        scheduled_time: TimeOfDay,
    ) -> Result<(DoseLogEntry, DoseTiming)> {
        let user = self.current_user().await?;
        self.record_dose(&user, medication_id, scheduled_time, self.clock.now())
            .await
    }

    async fn record_dose(
        &self,
        user: &Identity,
        medication_id: MedicationId,
        scheduled_time: TimeOfDay,
        now: DateTime<FixedOffset>,
    ) -> Result<(DoseLogEntry, DoseTiming)> {
        // Ownership check; the insert alone would accept another user's id.
        self.store.medication(user.id, medication_id).await?;

        let timing = classify_with(self.timing, scheduled_time, now.naive_local());
        let entry = self
            .store
            .insert_dose_log(NewDoseLog {
                medication_id,
                user_id: user.id,
                taken_at: now.with_timezone(&Utc),
                scheduled_time,
                status: timing.status,
                minutes_difference: timing.minutes,
            })
            .await?;

        if let Err(e) = self.reminders.confirm_taken(timing).await {
            warn!(error = %e, "Confirmation notification failed");
        }

        info!(
            medication = %medication_id,
            status = %timing.status,
            minutes = timing.minutes,
            "Dose logged"
        );
        Ok((entry, timing))
    }

    /// Mark a medication taken or not taken.
    ///
    /// Marking taken with a `scheduled_time` also logs the dose.
    pub async fn set_taken(
        &self,
        medication_id: MedicationId,
        taken: bool,
        scheduled_time: Option<TimeOfDay>,
    ) -> Result<Medication> {
        let user = self.current_user().await?;
        let now = self.clock.now();
        let now_utc = now.with_timezone(&Utc);

        if taken {
            if let Some(scheduled_time) = scheduled_time {
                self.record_dose(&user, medication_id, scheduled_time, now)
                    .await?;
            }
        }

        let taken_at = taken.then_some(now_utc);
        let medication = self
            .store
            .set_medication_taken(user.id, medication_id, taken, taken_at, now_utc)
            .await?;

        info!(medication = %medication_id, taken, "Medication status updated");
        Ok(medication)
    }

    /// Logs of one medication, newest first.
    pub async fn dose_logs(&self, medication_id: MedicationId) -> Result<Vec<DoseLogEntry>> {
        let user = self.current_user().await?;
        Ok(self
            .store
            .dose_logs_for_medication(user.id, medication_id)
            .await?)
    }

    /// Cancel reminders, then delete the medication and its logs.
    pub async fn delete_medication(&self, medication_id: MedicationId) -> Result<()> {
        let user = self.current_user().await?;
        self.store.medication(user.id, medication_id).await?;

        self.reminders.cancel(medication_id).await?;
        let logs = self
            .store
            .delete_dose_logs_for_medication(user.id, medication_id)
            .await?;
        if !self.store.delete_medication(user.id, medication_id).await? {
            return Err(CoreError::NotFound);
        }

        info!(medication = %medication_id, logs, "Medication deleted");
        Ok(())
    }

    /// Clear the taken state of every medication for a new day.
    pub async fn reset_daily(&self) -> Result<Vec<Medication>> {
        let user = self.current_user().await?;
        let medications = self
            .store
            .reset_medications(user.id, self.clock.now().with_timezone(&Utc))
            .await?;
        info!(count = medications.len(), "Reset medications for new day");
        Ok(medications)
    }

    /// Adherence over every logged dose.
    pub async fn adherence(&self) -> Result<AdherenceSummary> {
        self.adherence_in(None).await
    }

    /// Adherence counting only doses taken on `date` (UTC).
    pub async fn adherence_on(&self, date: NaiveDate) -> Result<AdherenceSummary> {
        let start = date.and_time(NaiveTime::MIN).and_utc();
        self.adherence_in(Some((start, start + Duration::days(1))))
            .await
    }

    async fn adherence_in(
        &self,
        range: Option<(DateTime<Utc>, DateTime<Utc>)>,
    ) -> Result<AdherenceSummary> {
        let user = self.current_user().await?;
        let medications = self.store.medications_for_user(user.id).await?;
        let logs = self.store.dose_logs_for_user(user.id, range).await?;

        let summary = summarize(&medications, &logs);
        info!(
            rate = summary.adherence_rate,
            taken = summary.taken,
            total = summary.total,
            "Adherence computed"
        );
        Ok(summary)
    }
}
