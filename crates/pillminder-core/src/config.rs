//! Core configuration loaded from environment variables.
//!
//! All settings have sensible defaults so an embedder can start with zero
//! configuration.

use std::path::PathBuf;

use pillminder_shared::constants::{
    DEFAULT_CONFIRMATION_TITLE, DEFAULT_REMINDER_TITLE, REMINDER_CHANNEL_ID,
};
use pillminder_shared::TimingPolicy;
use pillminder_store::{Database, StoreError};

/// Core configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    /// SQLite database file.
    /// Env: `PILLMINDER_DB_PATH`
    /// Default: the platform data directory (see [`Database::default_path`]).
    pub db_path: Option<PathBuf>,

    /// Dose timing classification window.
    /// Env: `PILLMINDER_ON_TIME_WINDOW` (minutes, non-negative)
    /// Default: `10`
    pub timing: TimingPolicy,

    /// Notification channel for reminders and confirmations.
    /// Env: `PILLMINDER_CHANNEL_ID`
    /// Default: `pill-reminders`
    pub channel_id: String,

    /// Env: `PILLMINDER_REMINDER_TITLE`
    pub reminder_title: String,

    /// Env: `PILLMINDER_CONFIRMATION_TITLE`
    pub confirmation_title: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            timing: TimingPolicy::default(),
            channel_id: REMINDER_CHANNEL_ID.to_string(),
            reminder_title: DEFAULT_REMINDER_TITLE.to_string(),
            confirmation_title: DEFAULT_CONFIRMATION_TITLE.to_string(),
        }
    }
}

impl CoreConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(path) = lookup("PILLMINDER_DB_PATH") {
            if !path.trim().is_empty() {
                config.db_path = Some(PathBuf::from(path));
            }
        }

        if let Some(val) = lookup("PILLMINDER_ON_TIME_WINDOW") {
            match val.trim().parse::<i64>() {
                Ok(minutes) if minutes >= 0 => config.timing.on_time_window = minutes,
                _ => {
                    tracing::warn!(
                        value = %val,
                        "Invalid PILLMINDER_ON_TIME_WINDOW, using default"
                    );
                }
            }
        }

        if let Some(id) = lookup("PILLMINDER_CHANNEL_ID") {
            if id.trim().is_empty() {
                tracing::warn!("Empty PILLMINDER_CHANNEL_ID, using default");
            } else {
                config.channel_id = id;
            }
        }

        if let Some(title) = lookup("PILLMINDER_REMINDER_TITLE") {
            if !title.trim().is_empty() {
                config.reminder_title = title;
            }
        }

        if let Some(title) = lookup("PILLMINDER_CONFIRMATION_TITLE") {
            if !title.trim().is_empty() {
                config.confirmation_title = title;
            }
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter,
        // so we do not store it here.

        config
    }

    /// Open the configured database, or the platform default.
    pub fn open_database(&self) -> Result<Database, StoreError> {
        match &self.db_path {
            Some(path) => Database::open_at(path),
            None => Database::open_default(),
        }
    }
}
