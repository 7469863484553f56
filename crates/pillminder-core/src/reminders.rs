//! Daily reminder scheduling.
//!
//! Every medication owns two pending notifications: a primary at the next
//! occurrence of its slot and a backup one day later. Both are cancelled
//! before being scheduled again, so repeated scheduling never stacks
//! duplicates. Occurrences follow the local wall clock, so a slot keeps
//! its hour across daylight-saving shifts.

use std::sync::Arc;

use chrono::{DateTime, Duration, FixedOffset, LocalResult, NaiveDate, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use pillminder_shared::constants::{BACKUP_KEY_SUFFIX, BACKUP_OFFSET_DAYS, REMINDER_KEY_PREFIX};
use pillminder_shared::{DoseTiming, Medication, MedicationId, TimeOfDay};

use crate::config::CoreConfig;
use crate::error::NotifyError;
use crate::ports::{
    Clock, NotificationContent, NotificationData, NotificationService, ScheduledNotification,
};

/// Notification keys owned by one medication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderKeys {
    pub primary: String,
    pub backup: String,
}

impl ReminderKeys {
    pub fn for_medication(id: MedicationId) -> Self {
        let primary = format!("{REMINDER_KEY_PREFIX}{id}");
        let backup = format!("{primary}{BACKUP_KEY_SUFFIX}");
        Self { primary, backup }
    }
}

/// What [`ReminderScheduler::schedule`] queued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderPlan {
    pub keys: ReminderKeys,
    pub primary_at: DateTime<FixedOffset>,
    pub backup_at: DateTime<FixedOffset>,
}

/// Widest forward shift a zone is expected to make.
const GAP_LOOKBACK_HOURS: i64 = 3;

/// The instant `time` falls on `date` in the clock's zone.
///
/// A slot skipped by a forward shift keeps the offset from before the
/// shift, landing as far past it as the slot was. A slot repeated by a
/// backward shift fires the first time round.
pub fn occurrence_on(clock: &dyn Clock, date: NaiveDate, time: TimeOfDay) -> DateTime<FixedOffset> {
    let local = date.and_time(time.as_naive());
    match clock.resolve_local(local) {
        LocalResult::Single(at) => at,
        LocalResult::Ambiguous(first, _) => first,
        LocalResult::None => {
            let offset = clock
                .resolve_local(local - Duration::hours(GAP_LOOKBACK_HOURS))
                .earliest()
                .map(|before| *before.offset())
                .unwrap_or_else(|| *clock.now().offset());
            at_local(offset, local)
        }
    }
}

/// Next instant at which `time` falls in the clock's zone: today if that is
/// still strictly in the future, otherwise tomorrow.
pub fn next_occurrence(clock: &dyn Clock, time: TimeOfDay) -> DateTime<FixedOffset> {
    let now = clock.now();
    let today = now.date_naive();
    let at = occurrence_on(clock, today, time);
    if at > now {
        at
    } else {
        occurrence_on(clock, today + Duration::days(1), time)
    }
}

fn at_local(offset: FixedOffset, local: NaiveDateTime) -> DateTime<FixedOffset> {
    let utc = local - Duration::seconds(i64::from(offset.local_minus_utc()));
    offset.from_utc_datetime(&utc)
}

/// Text used for reminder and confirmation notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderSettings {
    pub channel_id: String,
    pub reminder_title: String,
    pub confirmation_title: String,
}

impl From<&CoreConfig> for ReminderSettings {
    fn from(config: &CoreConfig) -> Self {
        Self {
            channel_id: config.channel_id.clone(),
            reminder_title: config.reminder_title.clone(),
            confirmation_title: config.confirmation_title.clone(),
        }
    }
}

impl Default for ReminderSettings {
    fn default() -> Self {
        Self::from(&CoreConfig::default())
    }
}

/// Schedules and cancels medication reminders.
#[derive(Clone)]
pub struct ReminderScheduler {
    notifications: Arc<dyn NotificationService>,
    clock: Arc<dyn Clock>,
    settings: ReminderSettings,
}

impl ReminderScheduler {
    pub fn new(
        notifications: Arc<dyn NotificationService>,
        clock: Arc<dyn Clock>,
        settings: ReminderSettings,
    ) -> Self {
        Self {
            notifications,
            clock,
            settings,
        }
    }

    /// Replace any pending reminders for `medication` with a fresh primary
    /// and backup.
    pub async fn schedule(&self, medication: &Medication) -> Result<ReminderPlan, NotifyError> {
        let keys = ReminderKeys::for_medication(medication.id);

        self.notifications.cancel(&keys.primary).await?;
        self.notifications.cancel(&keys.backup).await?;

        let clock = self.clock.as_ref();
        let primary_at = next_occurrence(clock, medication.time);
        let backup_at = occurrence_on(
            clock,
            primary_at.date_naive() + Duration::days(BACKUP_OFFSET_DAYS),
            medication.time,
        );

        let content = self.reminder_content(medication);
        self.notifications
            .schedule_at(&keys.primary, content.clone(), primary_at)
            .await?;
        if let Err(e) = self
            .notifications
            .schedule_at(&keys.backup, content, backup_at)
            .await
        {
            // A lone primary would leave the medication half covered.
            warn!(
                medication = %medication.id,
                error = %e,
                "Backup reminder failed, withdrawing primary"
            );
            if let Err(cancel) = self.notifications.cancel(&keys.primary).await {
                warn!(
                    medication = %medication.id,
                    error = %cancel,
                    "Could not withdraw primary reminder"
                );
            }
            return Err(e);
        }

        info!(
            medication = %medication.id,
            name = %medication.name,
            %primary_at,
            %backup_at,
            "Scheduled reminders"
        );

        Ok(ReminderPlan {
            keys,
            primary_at,
            backup_at,
        })
    }

    /// Cancel both reminders of a medication.
    pub async fn cancel(&self, medication_id: MedicationId) -> Result<(), NotifyError> {
        let keys = ReminderKeys::for_medication(medication_id);
        self.notifications.cancel(&keys.primary).await?;
        self.notifications.cancel(&keys.backup).await?;
        debug!(medication = %medication_id, "Cancelled reminders");
        Ok(())
    }

    /// Deliver an immediate "dose taken" confirmation.
    pub async fn confirm_taken(&self, timing: DoseTiming) -> Result<(), NotifyError> {
        let content = NotificationContent {
            title: self.settings.confirmation_title.clone(),
            body: format!("Taken {}", timing.describe()),
            channel_id: Some(self.settings.channel_id.clone()),
            play_sound: true,
            data: NotificationData::Confirmation {
                status: timing.status,
                minutes: timing.minutes,
            },
        };
        self.notifications.schedule_now(content).await
    }

    /// The whole pending queue, for diagnostics.
    pub async fn pending(&self) -> Result<Vec<ScheduledNotification>, NotifyError> {
        let pending = self.notifications.list_scheduled().await?;
        debug!(count = pending.len(), "Pending notifications");
        Ok(pending)
    }

    fn reminder_content(&self, medication: &Medication) -> NotificationContent {
        NotificationContent {
            title: self.settings.reminder_title.clone(),
            body: format!("Time to take {}", medication.name),
            channel_id: Some(self.settings.channel_id.clone()),
            play_sound: true,
            data: NotificationData::DailyReminder {
                medication_id: medication.id,
                medication_name: medication.name.clone(),
                scheduled_time: medication.time,
            },
        }
    }
}
