//! # pillminder-core
//!
//! Use cases of the medication-adherence tracker.
//!
//! - **Medications**: per-user add, list, mark taken, delete, daily reset,
//!   and adherence statistics ([`MedicationService`])
//! - **Reminders**: primary and backup local notifications per medication
//!   ([`ReminderScheduler`])
//! - **Notification session**: channel setup, permission request, and the
//!   listener that routes reminder taps ([`NotificationSession`])
//! - **Admin**: cross-patient aggregates and owner-annotated listings
//!   ([`AdminService`])
//!
//! Every external system sits behind a trait in [`ports`]. [`sqlite`] and
//! [`memory`] provide local implementations.

pub mod admin;
pub mod config;
pub mod error;
pub mod medications;
pub mod memory;
pub mod ports;
pub mod reminders;
pub mod session;
pub mod sqlite;
pub mod telemetry;

pub use admin::AdminService;
pub use config::CoreConfig;
pub use error::{CoreError, IdentityError, NotifyError, Result};
pub use medications::MedicationService;
pub use ports::{Clock, DataStore, IdentityProvider, NotificationService, SystemClock};
pub use reminders::{next_occurrence, occurrence_on, ReminderKeys, ReminderPlan, ReminderScheduler};
pub use session::{NotificationSession, ReminderTap};
pub use sqlite::SqliteDataStore;
