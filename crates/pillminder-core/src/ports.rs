//! Collaborator seams.
//!
//! The services in this crate talk to the outside world only through the
//! traits below: who is signed in, where records live, how local
//! notifications are delivered, and what time it is. Each trait is
//! object-safe and held as `Arc<dyn Trait>`.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Local, LocalResult, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use pillminder_shared::{
    DoseLogEntry, DoseStatus, Identity, Medication, MedicationId, NewDoseLog, NewMedication,
    TimeOfDay, UserId,
};

use crate::error::{IdentityError, NotifyError, Result};

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Source of user identities.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// The signed-in user, or `None` when nobody is.
    async fn current_user(&self) -> std::result::Result<Option<Identity>, IdentityError>;

    /// Privileged bulk listing of every user.
    async fn list_all_users(&self) -> std::result::Result<Vec<Identity>, IdentityError>;

    /// Privileged lookup of a single user.
    async fn get_user_by_id(&self, id: UserId) -> std::result::Result<Identity, IdentityError>;
}

// ---------------------------------------------------------------------------
// Data store
// ---------------------------------------------------------------------------

/// Persistence for medications and dose logs.
///
/// Per-user methods only ever touch records owned by `user_id`; a record
/// owned by someone else behaves as if it did not exist.
#[async_trait]
pub trait DataStore: Send + Sync {
    async fn insert_medication(&self, new: NewMedication) -> Result<Medication>;

    async fn medication(&self, user_id: UserId, id: MedicationId) -> Result<Medication>;

    /// Newest first.
    async fn medications_for_user(&self, user_id: UserId) -> Result<Vec<Medication>>;

    async fn set_medication_taken(
        &self,
        user_id: UserId,
        id: MedicationId,
        taken: bool,
        taken_at: Option<DateTime<Utc>>,
        updated_at: DateTime<Utc>,
    ) -> Result<Medication>;

    async fn reset_medications(
        &self,
        user_id: UserId,
        updated_at: DateTime<Utc>,
    ) -> Result<Vec<Medication>>;

    /// Returns `false` when nothing was deleted.
    async fn delete_medication(&self, user_id: UserId, id: MedicationId) -> Result<bool>;

    async fn insert_dose_log(&self, new: NewDoseLog) -> Result<DoseLogEntry>;

    /// Newest first.
    async fn dose_logs_for_medication(
        &self,
        user_id: UserId,
        medication_id: MedicationId,
    ) -> Result<Vec<DoseLogEntry>>;

    /// Newest first, optionally limited to `start <= taken_at < end`.
    async fn dose_logs_for_user(
        &self,
        user_id: UserId,
        range: Option<(DateTime<Utc>, DateTime<Utc>)>,
    ) -> Result<Vec<DoseLogEntry>>;

    async fn delete_dose_logs_for_medication(
        &self,
        user_id: UserId,
        medication_id: MedicationId,
    ) -> Result<usize>;

    /// Privileged: every user's medications, newest first.
    async fn all_medications(&self) -> Result<Vec<Medication>>;

    /// Privileged: every user's dose logs, newest first.
    async fn all_dose_logs(&self) -> Result<Vec<DoseLogEntry>>;
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

/// Typed payload carried by every notification this crate sends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NotificationData {
    DailyReminder {
        medication_id: MedicationId,
        medication_name: String,
        scheduled_time: TimeOfDay,
    },
    Confirmation {
        status: DoseStatus,
        minutes: i64,
    },
}

/// What the user sees, plus the routing payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationContent {
    pub title: String,
    pub body: String,
    pub channel_id: Option<String>,
    pub play_sound: bool,
    pub data: NotificationData,
}

/// An entry in the pending notification queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledNotification {
    pub key: String,
    pub content: NotificationContent,
    pub fire_at: DateTime<FixedOffset>,
}

/// Something the platform reports back about a notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationEvent {
    /// Delivered while the app was listening.
    Received(NotificationContent),
    /// The user tapped it.
    Tapped(NotificationContent),
}

/// How a notification is presented while the app is in the foreground.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresentationOptions {
    pub show_alert: bool,
    pub play_sound: bool,
    pub set_badge: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelImportance {
    Default,
    High,
    Max,
}

/// A platform notification channel (category).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationChannel {
    pub id: String,
    pub name: String,
    pub importance: ChannelImportance,
    /// Alternating wait/vibrate durations in milliseconds.
    pub vibration_pattern: Vec<u64>,
    pub sound: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionStatus {
    Granted,
    Denied,
    Undetermined,
}

/// Local notification facility.
#[async_trait]
pub trait NotificationService: Send + Sync {
    /// Remove a pending notification. Unknown keys are not an error.
    async fn cancel(&self, key: &str) -> std::result::Result<(), NotifyError>;

    /// Queue a notification under `key`, replacing any existing one.
    async fn schedule_at(
        &self,
        key: &str,
        content: NotificationContent,
        fire_at: DateTime<FixedOffset>,
    ) -> std::result::Result<(), NotifyError>;

    /// Deliver a notification immediately.
    async fn schedule_now(&self, content: NotificationContent)
        -> std::result::Result<(), NotifyError>;

    async fn list_scheduled(&self)
        -> std::result::Result<Vec<ScheduledNotification>, NotifyError>;

    async fn set_presentation(
        &self,
        options: PresentationOptions,
    ) -> std::result::Result<(), NotifyError>;

    async fn register_channel(
        &self,
        channel: NotificationChannel,
    ) -> std::result::Result<(), NotifyError>;

    async fn permission_status(&self) -> std::result::Result<PermissionStatus, NotifyError>;

    async fn request_permission(&self) -> std::result::Result<PermissionStatus, NotifyError>;

    /// Stream of received and tapped notifications. Closing the receiver
    /// unsubscribes.
    async fn subscribe(
        &self,
    ) -> std::result::Result<mpsc::Receiver<NotificationEvent>, NotifyError>;
}

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Wall-clock source. The offset is the user's local zone, which decides
/// the calendar day a dose is classified against.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<FixedOffset>;

    /// Interpret a wall-clock reading in the clock's zone, with the offset
    /// in force on that date rather than today's.
    fn resolve_local(&self, local: NaiveDateTime) -> LocalResult<DateTime<FixedOffset>>;
}

/// The host's local time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }

    fn resolve_local(&self, local: NaiveDateTime) -> LocalResult<DateTime<FixedOffset>> {
        Local
            .from_local_datetime(&local)
            .map(|at| at.fixed_offset())
    }
}
