//! Scheduling commands.

use chrono::{DateTime, Utc};
use common::{AppointmentId, UserId};

/// Command to book a new appointment.
///
/// `provider_id` is kept as the raw client string so that a malformed ID is
/// reported as invalid input rather than a deserialization failure.
#[derive(Debug, Clone)]
pub struct BookAppointment {
    pub customer_id: UserId,
    pub provider_id: String,
    pub service_type: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl BookAppointment {
    pub fn new(
        customer_id: UserId,
        provider_id: impl Into<String>,
        service_type: impl Into<String>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Self {
        Self {
            customer_id,
            provider_id: provider_id.into(),
            service_type: service_type.into(),
            start,
            end,
        }
    }
}

/// Command to cancel an appointment.
#[derive(Debug, Clone, Copy)]
pub struct CancelAppointment {
    pub appointment_id: AppointmentId,
    /// The customer or provider requesting the cancellation.
    pub acting_user: UserId,
}

impl CancelAppointment {
    pub fn new(appointment_id: AppointmentId, acting_user: UserId) -> Self {
        Self {
            appointment_id,
            acting_user,
        }
    }
}

/// Command to move an appointment to a new interval.
#[derive(Debug, Clone, Copy)]
pub struct RescheduleAppointment {
    pub appointment_id: AppointmentId,
    /// Must be the appointment's customer.
    pub acting_user: UserId,
    pub new_start: DateTime<Utc>,
    pub new_end: DateTime<Utc>,
}

impl RescheduleAppointment {
    pub fn new(
        appointment_id: AppointmentId,
        acting_user: UserId,
        new_start: DateTime<Utc>,
        new_end: DateTime<Utc>,
    ) -> Self {
        Self {
            appointment_id,
            acting_user,
            new_start,
            new_end,
        }
    }
}

/// Command to set a provider's window for one day of the week.
#[derive(Debug, Clone)]
pub struct SetAvailability {
    pub provider_id: UserId,
    /// 0 = Sunday .. 6 = Saturday.
    pub day_of_week: u8,
    /// Wall-clock `HH:MM`, interpreted in UTC.
    pub start: String,
    pub end: String,
}

impl SetAvailability {
    pub fn new(
        provider_id: UserId,
        day_of_week: u8,
        start: impl Into<String>,
        end: impl Into<String>,
    ) -> Self {
        Self {
            provider_id,
            day_of_week,
            start: start.into(),
            end: end.into(),
        }
    }
}
