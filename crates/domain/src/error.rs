//! Domain error types.

use chrono::NaiveDate;
use common::{AppointmentId, UserId};
use schedule_store::{AppointmentStatus, StoreError};
use thiserror::Error;

/// Errors returned by the scheduling engines.
#[derive(Debug, Error)]
pub enum SchedulingError {
    /// Malformed input rejected before any storage access.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A date that is not `YYYY-MM-DD`.
    #[error("Invalid date format {0:?} (use YYYY-MM-DD)")]
    InvalidDateFormat(String),

    /// A reschedule target whose end is not after its start.
    #[error("Invalid time range: end must be after start")]
    InvalidTimeRange,

    /// The requested interval overlaps an existing appointment.
    #[error("Time slot is not available")]
    SlotUnavailable,

    /// No appointment with this ID exists.
    #[error("Appointment not found: {0}")]
    NotFound(AppointmentId),

    /// The acting user may not perform this action on the appointment.
    #[error("User {user_id} is not allowed to {action} this appointment")]
    Unauthorized {
        user_id: UserId,
        action: &'static str,
    },

    /// The appointment's status does not allow the action.
    #[error("Cannot {action} an appointment that is {current}")]
    InvalidState {
        current: AppointmentStatus,
        action: &'static str,
    },

    /// The provider has no availability window on the date's weekday.
    #[error("Provider {provider_id} is not available on {date}")]
    ProviderUnavailable { provider_id: UserId, date: NaiveDate },

    /// The underlying store failed.
    #[error("Storage error: {0}")]
    Storage(StoreError),
}

impl From<StoreError> for SchedulingError {
    fn from(e: StoreError) -> Self {
        match e {
            // The exclusion constraint caught what the overlap query would have.
            StoreError::Overlap { .. } => SchedulingError::SlotUnavailable,
            other => SchedulingError::Storage(other),
        }
    }
}

/// Convenience type alias for scheduling results.
pub type Result<T> = std::result::Result<T, SchedulingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_overlap_becomes_slot_unavailable() {
        let err: SchedulingError = StoreError::Overlap {
            provider_id: UserId::new(),
        }
        .into();
        assert!(matches!(err, SchedulingError::SlotUnavailable));
    }

    #[test]
    fn other_store_errors_are_storage() {
        let err: SchedulingError = StoreError::Unavailable("down".into()).into();
        assert!(matches!(err, SchedulingError::Storage(_)));
    }

    #[test]
    fn invalid_state_message_names_status() {
        let err = SchedulingError::InvalidState {
            current: AppointmentStatus::Completed,
            action: "cancel",
        };
        assert_eq!(
            err.to_string(),
            "Cannot cancel an appointment that is COMPLETED"
        );
    }
}
