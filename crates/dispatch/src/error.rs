//! Dispatch error types.

use common::UserId;
use thiserror::Error;

/// Errors that can occur while delivering side effects.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The downstream channel refused the notification.
    #[error("Delivery to {user_id} failed: {reason}")]
    Delivery { user_id: UserId, reason: String },
}

/// Convenience type alias for dispatch results.
pub type Result<T> = std::result::Result<T, DispatchError>;
