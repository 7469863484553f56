/// Application name
pub const APP_NAME: &str = "pillminder";

/// A dose taken within this many minutes of its scheduled time (either
/// direction, inclusive) is on time.
pub const ON_TIME_WINDOW_MINUTES: i64 = 10;

/// Days between a primary reminder and its backup. Also the rollover applied
/// when today's slot has already passed.
pub const BACKUP_OFFSET_DAYS: i64 = 1;

/// Number of leading id characters used for synthesized patient names.
pub const SHORT_ID_LEN: usize = 8;

/// Notification channel carrying every pill reminder.
pub const REMINDER_CHANNEL_ID: &str = "pill-reminders";

/// Human-readable name of [`REMINDER_CHANNEL_ID`].
pub const REMINDER_CHANNEL_NAME: &str = "Pill Reminders";

/// Notification key prefix; primary reminders use `pill_<id>`.
pub const REMINDER_KEY_PREFIX: &str = "pill_";

/// Suffix appended to the primary key for the backup reminder.
pub const BACKUP_KEY_SUFFIX: &str = "_backup";

/// Default reminder title.
pub const DEFAULT_REMINDER_TITLE: &str = "Time for your medication";

/// Default confirmation title.
pub const DEFAULT_CONFIRMATION_TITLE: &str = "Medication taken";

/// Display name used when an owned dose log's medication no longer exists.
pub const UNKNOWN_MEDICATION_NAME: &str = "Unknown Pill";

/// Email shown when an identity resolves to a name but carries no email.
pub const MISSING_EMAIL: &str = "No email";

/// Domain used for synthesized placeholder emails.
pub const PLACEHOLDER_EMAIL_DOMAIN: &str = "app.com";
