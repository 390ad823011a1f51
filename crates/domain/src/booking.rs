//! Appointment lifecycle: book, cancel, reschedule.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{NaiveDate, Utc};
use common::{AppointmentId, TimeRange, UserId};
use dispatch::{BookingEvent, Notification, NotificationRelay, RealtimeBroadcaster};
use schedule_store::{Appointment, AppointmentStatus, AppointmentStore, AppointmentTransaction};
use slot_cache::{SlotCache, slot_key, with_timeout};
use tracing::{info, warn};

use crate::commands::{BookAppointment, CancelAppointment, RescheduleAppointment};
use crate::config::SchedulingConfig;
use crate::error::{Result, SchedulingError};

/// Sent to the customer after a successful booking.
pub const CUSTOMER_BOOKED_MESSAGE: &str = "Your appointment is confirmed!";

/// Sent to the provider after a successful booking.
pub const PROVIDER_BOOKED_MESSAGE: &str = "You have a new booking!";

/// Longest accepted service type, in characters. Matches the stored column width.
pub const MAX_SERVICE_TYPE_LEN: usize = 50;

/// Owns every appointment mutation.
///
/// Each mutation runs inside a transaction scoped to the appointment's
/// provider, so an overlap check and the write that follows it cannot
/// interleave with another mutation for the same provider. Cache
/// invalidation, notifications and realtime events happen only after commit
/// and never fail the request.
pub struct BookingEngine<S, C> {
    store: S,
    cache: C,
    notifier: Arc<dyn NotificationRelay>,
    broadcaster: Arc<dyn RealtimeBroadcaster>,
    cache_timeout: Duration,
}

impl<S, C> BookingEngine<S, C>
where
    S: AppointmentStore,
    C: SlotCache,
{
    pub fn new(
        store: S,
        cache: C,
        notifier: Arc<dyn NotificationRelay>,
        broadcaster: Arc<dyn RealtimeBroadcaster>,
    ) -> Self {
        Self {
            store,
            cache,
            notifier,
            broadcaster,
            cache_timeout: SchedulingConfig::default().cache_timeout,
        }
    }

    /// Bounds each post-commit cache invalidation.
    pub fn with_cache_timeout(mut self, timeout: Duration) -> Self {
        self.cache_timeout = timeout;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Books a new pending appointment.
    #[tracing::instrument(skip(self))]
    pub async fn book(&self, cmd: BookAppointment) -> Result<Appointment> {
        let started = Instant::now();

        if cmd.end <= cmd.start {
            return Err(SchedulingError::InvalidInput(
                "end time must be after start time".to_string(),
            ));
        }
        if cmd.start < Utc::now() {
            return Err(SchedulingError::InvalidInput(
                "cannot book appointments in the past".to_string(),
            ));
        }
        let provider_id: UserId = cmd
            .provider_id
            .parse()
            .map_err(|_| SchedulingError::InvalidInput("invalid provider ID".to_string()))?;
        if cmd.service_type.trim().is_empty() {
            return Err(SchedulingError::InvalidInput(
                "service type is required".to_string(),
            ));
        }
        if cmd.service_type.chars().count() > MAX_SERVICE_TYPE_LEN {
            return Err(SchedulingError::InvalidInput(format!(
                "service type must be at most {MAX_SERVICE_TYPE_LEN} characters"
            )));
        }

        let range = TimeRange::new(cmd.start, cmd.end);
        let appointment =
            Appointment::pending(cmd.customer_id, provider_id, cmd.service_type, range);

        let mut tx = self.store.begin(provider_id).await?;
        if tx.has_overlap(range).await? {
            abandon(tx).await;
            metrics::counter!("booking_conflicts_total").increment(1);
            return Err(SchedulingError::SlotUnavailable);
        }
        tx.create(&appointment).await?;
        tx.commit().await?;

        metrics::counter!("bookings_total").increment(1);
        metrics::histogram!("booking_duration_seconds").record(started.elapsed().as_secs_f64());
        info!(appointment_id = %appointment.id, %provider_id, "Appointment booked");

        self.invalidate(provider_id, appointment.date()).await;
        self.notifier.enqueue(Notification::new(
            appointment.customer_id,
            CUSTOMER_BOOKED_MESSAGE,
        ));
        self.notifier.enqueue(Notification::new(provider_id, PROVIDER_BOOKED_MESSAGE));
        self.broadcaster.publish(BookingEvent::NewBooking {
            appointment_id: appointment.id,
            provider_id,
            customer_id: appointment.customer_id,
            slot: appointment.start,
        });

        Ok(appointment)
    }

    /// Cancels an appointment on behalf of its customer or provider.
    #[tracing::instrument(skip(self))]
    pub async fn cancel(&self, cmd: CancelAppointment) -> Result<Appointment> {
        let (mut tx, mut appointment) = self.open(cmd.appointment_id).await?;

        if !appointment.involves(cmd.acting_user) {
            return Err(SchedulingError::Unauthorized {
                user_id: cmd.acting_user,
                action: "cancel",
            });
        }
        if !appointment.status.can_cancel() {
            return Err(SchedulingError::InvalidState {
                current: appointment.status,
                action: "cancel",
            });
        }

        appointment.status = AppointmentStatus::Cancelled;
        appointment.updated_at = Utc::now();
        tx.update(&appointment).await?;
        tx.commit().await?;

        info!(appointment_id = %appointment.id, "Appointment cancelled");

        self.invalidate(appointment.provider_id, appointment.date()).await;
        self.broadcaster.publish(BookingEvent::AppointmentCancelled {
            appointment_id: appointment.id,
            provider_id: appointment.provider_id,
            slot: appointment.start,
        });

        Ok(appointment)
    }

    /// Moves an appointment to `[new_start, new_end)` and confirms it.
    ///
    /// The overlap check covers every non-terminal appointment of the
    /// provider, the moved one included: a target interval that intersects
    /// the appointment's current interval is reported as unavailable.
    #[tracing::instrument(skip(self))]
    pub async fn reschedule(&self, cmd: RescheduleAppointment) -> Result<Appointment> {
        let (mut tx, mut appointment) = self.open(cmd.appointment_id).await?;

        if appointment.customer_id != cmd.acting_user {
            return Err(SchedulingError::Unauthorized {
                user_id: cmd.acting_user,
                action: "reschedule",
            });
        }
        if !appointment.status.can_reschedule() {
            return Err(SchedulingError::InvalidState {
                current: appointment.status,
                action: "reschedule",
            });
        }

        let target = TimeRange::new(cmd.new_start, cmd.new_end);
        if !target.is_valid() {
            return Err(SchedulingError::InvalidTimeRange);
        }

        if tx.has_overlap(target).await? {
            abandon(tx).await;
            metrics::counter!("booking_conflicts_total").increment(1);
            return Err(SchedulingError::SlotUnavailable);
        }

        let previous_slot = appointment.start;
        let previous_date = appointment.date();
        appointment.start = target.start;
        appointment.end = target.end;
        appointment.status = AppointmentStatus::Confirmed;
        appointment.updated_at = Utc::now();
        tx.update(&appointment).await?;
        tx.commit().await?;

        info!(appointment_id = %appointment.id, "Appointment rescheduled");

        self.invalidate(appointment.provider_id, previous_date).await;
        if appointment.date() != previous_date {
            self.invalidate(appointment.provider_id, appointment.date()).await;
        }
        self.broadcaster.publish(BookingEvent::AppointmentRescheduled {
            appointment_id: appointment.id,
            provider_id: appointment.provider_id,
            previous_slot,
            slot: appointment.start,
        });

        Ok(appointment)
    }

    /// Loads an appointment visible to `acting_user` (its customer or provider).
    #[tracing::instrument(skip(self))]
    pub async fn get_appointment(
        &self,
        appointment_id: AppointmentId,
        acting_user: UserId,
    ) -> Result<Appointment> {
        let appointment = self
            .store
            .find_by_id(appointment_id)
            .await?
            .ok_or(SchedulingError::NotFound(appointment_id))?;

        if !appointment.involves(acting_user) {
            return Err(SchedulingError::Unauthorized {
                user_id: acting_user,
                action: "view",
            });
        }
        Ok(appointment)
    }

    /// Opens a transaction on the appointment's provider and re-reads the
    /// appointment inside it.
    async fn open(
        &self,
        appointment_id: AppointmentId,
    ) -> Result<(Box<dyn AppointmentTransaction>, Appointment)> {
        let provider_id = self
            .store
            .find_by_id(appointment_id)
            .await?
            .ok_or(SchedulingError::NotFound(appointment_id))?
            .provider_id;

        let mut tx = self.store.begin(provider_id).await?;
        let appointment = tx
            .find_by_id(appointment_id)
            .await?
            .ok_or(SchedulingError::NotFound(appointment_id))?;
        Ok((tx, appointment))
    }

    async fn invalidate(&self, provider_id: UserId, date: NaiveDate) {
        let key = slot_key(provider_id, date);
        if let Err(e) = with_timeout(self.cache_timeout, self.cache.delete(&key)).await {
            warn!(key = %key, error = %e, "Slot cache invalidation failed");
        }
    }
}

/// Rolls back a transaction whose outcome is already decided.
async fn abandon(tx: Box<dyn AppointmentTransaction>) {
    if let Err(e) = tx.rollback().await {
        warn!(error = %e, "Rollback failed");
    }
}
