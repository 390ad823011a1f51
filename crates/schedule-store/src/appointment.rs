//! Appointment records and their status state machine.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{AppointmentId, StoreError, TimeRange, UserId};

/// The status of an appointment in its lifecycle.
///
/// State transitions:
/// ```text
/// Pending ──┬──► Confirmed ──► Cancelled
///           │        ▲
///           │        └── (reschedule)
///           └──────────────► Cancelled
///
/// Completed  (set by an external process; terminal)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppointmentStatus {
    /// Booked, awaiting confirmation.
    #[default]
    Pending,

    /// Confirmed by a reschedule or by the provider.
    Confirmed,

    /// Cancelled by the customer or provider (terminal state).
    Cancelled,

    /// The appointment took place (terminal state).
    Completed,
}

impl AppointmentStatus {
    /// Statuses that still occupy the provider's schedule.
    pub const NON_TERMINAL: [AppointmentStatus; 2] =
        [AppointmentStatus::Pending, AppointmentStatus::Confirmed];

    /// Returns true if this is a terminal state (no further transitions possible).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Cancelled | AppointmentStatus::Completed
        )
    }

    /// Returns true if an appointment in this state blocks its time range.
    pub fn occupies_schedule(&self) -> bool {
        !self.is_terminal()
    }

    /// Returns true if the appointment can be cancelled in this state.
    pub fn can_cancel(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Pending | AppointmentStatus::Confirmed
        )
    }

    /// Returns true if the appointment can be moved in this state.
    pub fn can_reschedule(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Pending | AppointmentStatus::Confirmed
        )
    }

    /// Returns the status name as stored and serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "PENDING",
            AppointmentStatus::Confirmed => "CONFIRMED",
            AppointmentStatus::Cancelled => "CANCELLED",
            AppointmentStatus::Completed => "COMPLETED",
        }
    }
}

impl std::fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(AppointmentStatus::Pending),
            "CONFIRMED" => Ok(AppointmentStatus::Confirmed),
            "CANCELLED" => Ok(AppointmentStatus::Cancelled),
            "COMPLETED" => Ok(AppointmentStatus::Completed),
            other => Err(StoreError::Corrupt(format!(
                "unknown appointment status {other:?}"
            ))),
        }
    }
}

/// A reservation of a provider's time by a customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: AppointmentId,
    pub customer_id: UserId,
    pub provider_id: UserId,
    pub service_type: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// Creates a new pending appointment with a fresh ID.
    pub fn pending(
        customer_id: UserId,
        provider_id: UserId,
        service_type: impl Into<String>,
        range: TimeRange,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: AppointmentId::new(),
            customer_id,
            provider_id,
            service_type: service_type.into(),
            start: range.start,
            end: range.end,
            status: AppointmentStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns the `[start, end)` interval of the appointment.
    pub fn range(&self) -> TimeRange {
        TimeRange::new(self.start, self.end)
    }

    /// Returns the UTC calendar date the appointment starts on.
    pub fn date(&self) -> NaiveDate {
        self.start.date_naive()
    }

    /// Returns true if the user is the customer or the provider.
    pub fn involves(&self, user_id: UserId) -> bool {
        self.customer_id == user_id || self.provider_id == user_id
    }

    /// Returns true if this appointment blocks `range` for its provider.
    pub fn blocks(&self, range: &TimeRange) -> bool {
        self.status.occupies_schedule() && self.range().overlaps(range)
    }
}
