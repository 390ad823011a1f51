use thiserror::Error;

use crate::{AppointmentId, UserId};

/// Errors that can occur when interacting with the schedule store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The storage layer rejected a write because it would overlap an
    /// existing non-terminal appointment for the same provider.
    #[error("Overlapping appointment for provider {provider_id}")]
    Overlap { provider_id: UserId },

    /// An update targeted an appointment row that does not exist.
    #[error("Appointment not found: {0}")]
    AppointmentNotFound(AppointmentId),

    /// A transaction was asked to write an appointment for another provider.
    #[error("Transaction for provider {expected} cannot write appointment of provider {actual}")]
    ProviderMismatch { expected: UserId, actual: UserId },

    /// A stored value could not be mapped back into a record.
    #[error("Corrupt record: {0}")]
    Corrupt(String),

    /// The store is unreachable or refused to commit.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
