use chrono::{DateTime, Utc};
use common::{AppointmentId, UserId};
use serde::{Deserialize, Serialize};

/// Realtime events published after a booking mutation commits.
///
/// Serialized with an `event` tag, e.g.
/// `{"event":"new_booking","provider_id":"...","slot":"..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BookingEvent {
    NewBooking {
        appointment_id: AppointmentId,
        provider_id: UserId,
        customer_id: UserId,
        slot: DateTime<Utc>,
    },
    AppointmentCancelled {
        appointment_id: AppointmentId,
        provider_id: UserId,
        slot: DateTime<Utc>,
    },
    AppointmentRescheduled {
        appointment_id: AppointmentId,
        provider_id: UserId,
        previous_slot: DateTime<Utc>,
        slot: DateTime<Utc>,
    },
}

impl BookingEvent {
    /// The wire name carried in the `event` field.
    pub fn name(&self) -> &'static str {
        match self {
            BookingEvent::NewBooking { .. } => "new_booking",
            BookingEvent::AppointmentCancelled { .. } => "appointment_cancelled",
            BookingEvent::AppointmentRescheduled { .. } => "appointment_rescheduled",
        }
    }

    /// The provider whose schedule changed.
    pub fn provider_id(&self) -> UserId {
        match self {
            BookingEvent::NewBooking { provider_id, .. }
            | BookingEvent::AppointmentCancelled { provider_id, .. }
            | BookingEvent::AppointmentRescheduled { provider_id, .. } => *provider_id,
        }
    }

    pub fn appointment_id(&self) -> AppointmentId {
        match self {
            BookingEvent::NewBooking { appointment_id, .. }
            | BookingEvent::AppointmentCancelled { appointment_id, .. }
            | BookingEvent::AppointmentRescheduled { appointment_id, .. } => *appointment_id,
        }
    }
}
