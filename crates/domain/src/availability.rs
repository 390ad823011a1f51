//! Free-slot queries and availability windows.

use chrono::{DateTime, Utc};
use common::{TimeRange, UserId};
use schedule_store::{
    Appointment, AppointmentStore, AvailabilityWindow, DayOfWeek, ProviderScheduleStore,
};
use slot_cache::{SlotCache, decode_slots, encode_slots, slot_key, with_timeout};
use tracing::{debug, warn};

use crate::commands::SetAvailability;
use crate::config::SchedulingConfig;
use crate::error::{Result, SchedulingError};
use crate::slots::{generate_free_slots, parse_clock, parse_date};

/// Computes free slots, reading through the slot cache.
///
/// The cache is best-effort: unreachable, slow or undecodable entries count
/// as a miss and the slots are recomputed from the store. A miss that reads
/// the store just before a concurrent booking commits can write its list
/// after that booking's invalidation; the stale entry lives until its TTL.
pub struct AvailabilityEngine<S, C> {
    store: S,
    cache: C,
    config: SchedulingConfig,
}

impl<S, C> AvailabilityEngine<S, C>
where
    S: AppointmentStore + ProviderScheduleStore,
    C: SlotCache,
{
    pub fn new(store: S, cache: C, config: SchedulingConfig) -> Self {
        Self {
            store,
            cache,
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    /// Returns the free slot start times for `provider_id` on `date` (`YYYY-MM-DD`).
    #[tracing::instrument(skip(self))]
    pub async fn get_free_slots(
        &self,
        provider_id: UserId,
        date: &str,
    ) -> Result<Vec<DateTime<Utc>>> {
        let date = parse_date(date)?;
        let key = slot_key(provider_id, date);

        if let Some(slots) = self.read_cache(&key).await {
            metrics::counter!("slot_cache_hits_total").increment(1);
            return Ok(slots);
        }
        metrics::counter!("slot_cache_misses_total").increment(1);

        let window = self
            .store
            .get_window(provider_id, DayOfWeek::of(date))
            .await?
            .ok_or(SchedulingError::ProviderUnavailable { provider_id, date })?;

        let booked: Vec<TimeRange> = self
            .store
            .list_for_provider_on_date(provider_id, date)
            .await?
            .iter()
            .map(Appointment::range)
            .collect();

        let slots = generate_free_slots(window.on(date), &booked, self.config.slot_duration);
        self.write_cache(&key, &slots).await;

        Ok(slots)
    }

    /// Creates or replaces the provider's window for one day of the week.
    ///
    /// Cached slot lists for that weekday are not invalidated; they age out
    /// within the cache TTL.
    #[tracing::instrument(skip(self))]
    pub async fn set_availability(&self, cmd: SetAvailability) -> Result<AvailabilityWindow> {
        let day_of_week = DayOfWeek::new(cmd.day_of_week).ok_or_else(|| {
            SchedulingError::InvalidInput(format!(
                "day_of_week must be between 0 and 6, got {}",
                cmd.day_of_week
            ))
        })?;
        let start = parse_clock(&cmd.start)?;
        let end = parse_clock(&cmd.end)?;

        let window = AvailabilityWindow::new(cmd.provider_id, day_of_week, start, end);
        if !window.is_valid() {
            return Err(SchedulingError::InvalidInput(
                "end time must be after start time".to_string(),
            ));
        }

        self.store.set_window(&window).await?;
        debug!(provider_id = %cmd.provider_id, day = %day_of_week, "Availability updated");
        Ok(window)
    }

    /// Lists the provider's weekly windows ordered by day.
    #[tracing::instrument(skip(self))]
    pub async fn list_availability(&self, provider_id: UserId) -> Result<Vec<AvailabilityWindow>> {
        Ok(self.store.list_windows(provider_id).await?)
    }

    async fn read_cache(&self, key: &str) -> Option<Vec<DateTime<Utc>>> {
        match with_timeout(self.config.cache_timeout, self.cache.get(key)).await {
            Ok(Some(bytes)) => match decode_slots(&bytes) {
                Ok(slots) => Some(slots),
                Err(e) => {
                    warn!(key = %key, error = %e, "Discarding undecodable slot cache entry");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(key = %key, error = %e, "Slot cache read failed, treating as miss");
                None
            }
        }
    }

    async fn write_cache(&self, key: &str, slots: &[DateTime<Utc>]) {
        let bytes = match encode_slots(slots) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to encode slots for cache");
                return;
            }
        };
        let write = self.cache.set(key, bytes, self.config.cache_ttl);
        if let Err(e) = with_timeout(self.config.cache_timeout, write).await {
            warn!(key = %key, error = %e, "Slot cache write failed");
        }
    }
}
