use thiserror::Error;

use pillminder_shared::ValidationError;
use pillminder_store::StoreError;

/// Failure reported by an [`IdentityProvider`](crate::ports::IdentityProvider).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdentityError {
    #[error("Identity provider unavailable: {0}")]
    Unavailable(String),

    #[error("Operation not permitted: {0}")]
    Forbidden(String),

    #[error("User not found")]
    UserNotFound,
}

/// Failure reported by a [`NotificationService`](crate::ports::NotificationService).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NotifyError {
    #[error("Notification permission denied")]
    PermissionDenied,

    #[error("Notification service unavailable: {0}")]
    Unavailable(String),
}

/// Errors surfaced by the core services.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),

    #[error("Record not found")]
    NotFound,

    #[error("Data store error: {0}")]
    Store(String),

    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),

    #[error("Notification error: {0}")]
    Notification(#[from] NotifyError),
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => CoreError::NotFound,
            other => CoreError::Store(other.to_string()),
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CoreError>;
