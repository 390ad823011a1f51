use async_trait::async_trait;
use chrono::{Days, NaiveDate, NaiveTime};

use crate::{
    Appointment, AppointmentId, AvailabilityWindow, DayOfWeek, Result, TimeRange, UserId,
};

/// Returns `[date 00:00, next day 00:00)` in UTC.
pub fn day_bounds(date: NaiveDate) -> TimeRange {
    let start = date.and_time(NaiveTime::MIN).and_utc();
    let end = date
        .checked_add_days(Days::new(1))
        .map(|next| next.and_time(NaiveTime::MIN).and_utc())
        .unwrap_or(start + chrono::Duration::days(1));
    TimeRange::new(start, end)
}

/// Core trait for appointment storage.
///
/// Overlap queries use half-open interval semantics and only consider
/// non-terminal appointments (see [`crate::AppointmentStatus::NON_TERMINAL`]).
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    /// Opens a transaction scoped to one provider's schedule.
    ///
    /// Implementations serialize transactions for the same provider, so an
    /// overlap check followed by a write inside one transaction cannot race
    /// with another transaction for that provider. Dropping the transaction
    /// without committing discards its writes.
    async fn begin(&self, provider_id: UserId) -> Result<Box<dyn AppointmentTransaction>>;

    /// Retrieves an appointment by ID.
    async fn find_by_id(&self, id: AppointmentId) -> Result<Option<Appointment>>;

    /// Overwrites an existing appointment outside of any transaction.
    async fn update(&self, appointment: &Appointment) -> Result<()>;

    /// Returns true if a non-terminal appointment of the provider overlaps `range`.
    async fn has_overlap(&self, provider_id: UserId, range: TimeRange) -> Result<bool>;

    /// Lists non-terminal appointments of the provider starting on `date`, ordered by start.
    async fn list_for_provider_on_date(
        &self,
        provider_id: UserId,
        date: NaiveDate,
    ) -> Result<Vec<Appointment>>;
}

/// A unit of work against one provider's appointments.
#[async_trait]
pub trait AppointmentTransaction: Send {
    /// The provider whose schedule this transaction holds.
    fn provider_id(&self) -> UserId;

    /// Returns true if a non-terminal appointment of the provider overlaps `range`,
    /// including writes made earlier in this transaction.
    async fn has_overlap(&mut self, range: TimeRange) -> Result<bool>;

    /// Retrieves an appointment, including writes made earlier in this transaction.
    async fn find_by_id(&mut self, id: AppointmentId) -> Result<Option<Appointment>>;

    /// Inserts a new appointment.
    async fn create(&mut self, appointment: &Appointment) -> Result<()>;

    /// Overwrites an existing appointment.
    async fn update(&mut self, appointment: &Appointment) -> Result<()>;

    /// Makes all writes visible atomically.
    async fn commit(self: Box<Self>) -> Result<()>;

    /// Discards all writes.
    async fn rollback(self: Box<Self>) -> Result<()>;
}

/// Storage for provider weekly availability windows.
#[async_trait]
pub trait ProviderScheduleStore: Send + Sync {
    /// Retrieves the window for a provider on a day of the week.
    async fn get_window(
        &self,
        provider_id: UserId,
        day_of_week: DayOfWeek,
    ) -> Result<Option<AvailabilityWindow>>;

    /// Creates or replaces the window for `(provider, day_of_week)`.
    async fn set_window(&self, window: &AvailabilityWindow) -> Result<()>;

    /// Lists all windows of a provider ordered by day of week.
    async fn list_windows(&self, provider_id: UserId) -> Result<Vec<AvailabilityWindow>>;
}
