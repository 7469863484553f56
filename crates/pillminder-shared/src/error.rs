use thiserror::Error;

/// Input rejected before it reaches persistence.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid time format: {0:?} (expected HH:MM, hour 0-23, minute 0-59)")]
    InvalidTime(String),

    #[error("Medication name must not be empty")]
    EmptyName,

    #[error("Unknown dose status: {0:?}")]
    UnknownStatus(String),
}
