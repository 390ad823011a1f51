use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use crate::{
    Appointment, AppointmentId, AvailabilityWindow, DayOfWeek, Result, StoreError, TimeRange,
    UserId,
    store::{AppointmentStore, AppointmentTransaction, ProviderScheduleStore, day_bounds},
};

#[derive(Debug, Default)]
struct CallCounters {
    list_for_date: AtomicUsize,
    get_window: AtomicUsize,
}

#[derive(Debug, Default)]
struct Faults {
    fail_on_commit: AtomicBool,
    unavailable: AtomicBool,
}

/// In-memory schedule store for testing and single-process runs.
///
/// Provides the same interface and transaction guarantees as the PostgreSQL
/// implementation: transactions hold a per-provider lock until they commit or
/// are dropped, and their writes stay invisible to other readers until commit.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    appointments: Arc<RwLock<HashMap<AppointmentId, Appointment>>>,
    windows: Arc<RwLock<HashMap<(UserId, DayOfWeek), AvailabilityWindow>>>,
    provider_locks: Arc<Mutex<HashMap<UserId, Arc<Mutex<()>>>>>,
    counters: Arc<CallCounters>,
    faults: Arc<Faults>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of appointments stored.
    pub async fn appointment_count(&self) -> usize {
        self.appointments.read().await.len()
    }

    /// Returns how many times `list_for_provider_on_date` was called.
    pub fn list_calls(&self) -> usize {
        self.counters.list_for_date.load(Ordering::SeqCst)
    }

    /// Returns how many times `get_window` was called.
    pub fn window_lookups(&self) -> usize {
        self.counters.get_window.load(Ordering::SeqCst)
    }

    /// Configures every subsequent commit to fail.
    pub fn set_fail_on_commit(&self, fail: bool) {
        self.faults.fail_on_commit.store(fail, Ordering::SeqCst);
    }

    /// Configures every subsequent operation to fail as if the store were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.faults.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Inserts or replaces an appointment directly, bypassing overlap checks.
    ///
    /// Used to seed states that only external processes produce, such as
    /// completed appointments.
    pub async fn insert_raw(&self, appointment: Appointment) {
        self.appointments
            .write()
            .await
            .insert(appointment.id, appointment);
    }

    /// Clears all appointments and windows.
    pub async fn clear(&self) {
        self.appointments.write().await.clear();
        self.windows.write().await.clear();
    }

    fn check_available(&self) -> Result<()> {
        if self.faults.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "in-memory store marked unavailable".to_string(),
            ));
        }
        Ok(())
    }

    async fn provider_lock(&self, provider_id: UserId) -> Arc<Mutex<()>> {
        let mut locks = self.provider_locks.lock().await;
        locks
            .entry(provider_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

#[async_trait]
impl AppointmentStore for InMemoryStore {
    async fn begin(&self, provider_id: UserId) -> Result<Box<dyn AppointmentTransaction>> {
        self.check_available()?;
        let guard = self.provider_lock(provider_id).await.lock_owned().await;

        Ok(Box::new(InMemoryTransaction {
            provider_id,
            store: self.clone(),
            staged: HashMap::new(),
            _guard: guard,
        }))
    }

    async fn find_by_id(&self, id: AppointmentId) -> Result<Option<Appointment>> {
        self.check_available()?;
        Ok(self.appointments.read().await.get(&id).cloned())
    }

    async fn update(&self, appointment: &Appointment) -> Result<()> {
        self.check_available()?;
        let mut store = self.appointments.write().await;
        match store.get_mut(&appointment.id) {
            Some(existing) => {
                *existing = appointment.clone();
                existing.updated_at = Utc::now();
                Ok(())
            }
            None => Err(StoreError::AppointmentNotFound(appointment.id)),
        }
    }

    async fn has_overlap(&self, provider_id: UserId, range: TimeRange) -> Result<bool> {
        self.check_available()?;
        let store = self.appointments.read().await;
        Ok(store
            .values()
            .any(|a| a.provider_id == provider_id && a.blocks(&range)))
    }

    async fn list_for_provider_on_date(
        &self,
        provider_id: UserId,
        date: NaiveDate,
    ) -> Result<Vec<Appointment>> {
        self.counters.list_for_date.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;

        let bounds = day_bounds(date);
        let store = self.appointments.read().await;
        let mut appointments: Vec<_> = store
            .values()
            .filter(|a| {
                a.provider_id == provider_id
                    && a.status.occupies_schedule()
                    && a.start >= bounds.start
                    && a.start < bounds.end
            })
            .cloned()
            .collect();
        appointments.sort_by_key(|a| a.start);
        Ok(appointments)
    }
}

#[async_trait]
impl ProviderScheduleStore for InMemoryStore {
    async fn get_window(
        &self,
        provider_id: UserId,
        day_of_week: DayOfWeek,
    ) -> Result<Option<AvailabilityWindow>> {
        self.counters.get_window.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        Ok(self
            .windows
            .read()
            .await
            .get(&(provider_id, day_of_week))
            .cloned())
    }

    async fn set_window(&self, window: &AvailabilityWindow) -> Result<()> {
        self.check_available()?;
        self.windows
            .write()
            .await
            .insert((window.provider_id, window.day_of_week), window.clone());
        Ok(())
    }

    async fn list_windows(&self, provider_id: UserId) -> Result<Vec<AvailabilityWindow>> {
        self.check_available()?;
        let windows = self.windows.read().await;
        let mut result: Vec<_> = windows
            .values()
            .filter(|w| w.provider_id == provider_id)
            .cloned()
            .collect();
        result.sort_by_key(|w| w.day_of_week);
        Ok(result)
    }
}

/// Transaction over an [`InMemoryStore`], holding the provider lock.
struct InMemoryTransaction {
    provider_id: UserId,
    store: InMemoryStore,
    staged: HashMap<AppointmentId, Appointment>,
    _guard: OwnedMutexGuard<()>,
}

impl InMemoryTransaction {
    fn check_scope(&self, appointment: &Appointment) -> Result<()> {
        if appointment.provider_id != self.provider_id {
            return Err(StoreError::ProviderMismatch {
                expected: self.provider_id,
                actual: appointment.provider_id,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl AppointmentTransaction for InMemoryTransaction {
    fn provider_id(&self) -> UserId {
        self.provider_id
    }

    async fn has_overlap(&mut self, range: TimeRange) -> Result<bool> {
        self.store.check_available()?;
        if self
            .staged
            .values()
            .any(|a| a.provider_id == self.provider_id && a.blocks(&range))
        {
            return Ok(true);
        }

        let store = self.store.appointments.read().await;
        Ok(store.values().any(|a| {
            a.provider_id == self.provider_id
                && !self.staged.contains_key(&a.id)
                && a.blocks(&range)
        }))
    }

    async fn find_by_id(&mut self, id: AppointmentId) -> Result<Option<Appointment>> {
        self.store.check_available()?;
        if let Some(staged) = self.staged.get(&id) {
            return Ok(Some(staged.clone()));
        }
        Ok(self.store.appointments.read().await.get(&id).cloned())
    }

    async fn create(&mut self, appointment: &Appointment) -> Result<()> {
        self.check_scope(appointment)?;
        self.staged.insert(appointment.id, appointment.clone());
        Ok(())
    }

    async fn update(&mut self, appointment: &Appointment) -> Result<()> {
        self.check_scope(appointment)?;
        let exists = self.staged.contains_key(&appointment.id)
            || self
                .store
                .appointments
                .read()
                .await
                .contains_key(&appointment.id);
        if !exists {
            return Err(StoreError::AppointmentNotFound(appointment.id));
        }

        let mut updated = appointment.clone();
        updated.updated_at = Utc::now();
        self.staged.insert(updated.id, updated);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let InMemoryTransaction {
            store,
            staged,
            _guard,
            ..
        } = *self;

        store.check_available()?;
        if store.faults.fail_on_commit.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "commit rejected by in-memory store".to_string(),
            ));
        }

        store.appointments.write().await.extend(staged);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AppointmentStatus;
    use chrono::{DateTime, Duration, NaiveTime, TimeZone};

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 1, 7, h, m, 0).unwrap()
    }

    fn appointment(provider: UserId, h: u32, m: u32, minutes: i64) -> Appointment {
        Appointment::pending(
            UserId::new(),
            provider,
            "Haircut",
            TimeRange::starting_at(at(h, m), Duration::minutes(minutes)),
        )
    }

    async fn commit_new(store: &InMemoryStore, appt: &Appointment) {
        let mut tx = store.begin(appt.provider_id).await.unwrap();
        tx.create(appt).await.unwrap();
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn committed_appointment_is_visible() {
        let store = InMemoryStore::new();
        let provider = UserId::new();
        let appt = appointment(provider, 9, 0, 30);

        commit_new(&store, &appt).await;

        let found = store.find_by_id(appt.id).await.unwrap();
        assert_eq!(found, Some(appt));
        assert_eq!(store.appointment_count().await, 1);
    }

    #[tokio::test]
    async fn uncommitted_writes_are_invisible_and_dropped() {
        let store = InMemoryStore::new();
        let provider = UserId::new();
        let appt = appointment(provider, 9, 0, 30);

        {
            let mut tx = store.begin(provider).await.unwrap();
            tx.create(&appt).await.unwrap();
            assert!(tx.has_overlap(appt.range()).await.unwrap());
            assert!(store.find_by_id(appt.id).await.unwrap().is_none());
            tx.rollback().await.unwrap();
        }

        assert_eq!(store.appointment_count().await, 0);
    }

    #[tokio::test]
    async fn failed_commit_leaves_no_trace() {
        let store = InMemoryStore::new();
        let provider = UserId::new();
        let appt = appointment(provider, 9, 0, 30);
        store.set_fail_on_commit(true);

        let mut tx = store.begin(provider).await.unwrap();
        tx.create(&appt).await.unwrap();
        assert!(matches!(
            tx.commit().await,
            Err(StoreError::Unavailable(_))
        ));
        assert_eq!(store.appointment_count().await, 0);
    }

    #[tokio::test]
    async fn overlap_uses_half_open_intervals() {
        let store = InMemoryStore::new();
        let provider = UserId::new();
        commit_new(&store, &appointment(provider, 9, 0, 30)).await;

        let adjacent = TimeRange::new(at(9, 30), at(10, 0));
        let overlapping = TimeRange::new(at(9, 15), at(9, 45));
        assert!(!store.has_overlap(provider, adjacent).await.unwrap());
        assert!(store.has_overlap(provider, overlapping).await.unwrap());
        assert!(!store.has_overlap(UserId::new(), overlapping).await.unwrap());
    }

    #[tokio::test]
    async fn cancelled_appointments_do_not_overlap() {
        let store = InMemoryStore::new();
        let provider = UserId::new();
        let mut appt = appointment(provider, 9, 0, 30);
        commit_new(&store, &appt).await;

        appt.status = AppointmentStatus::Cancelled;
        store.update(&appt).await.unwrap();

        assert!(!store.has_overlap(provider, appt.range()).await.unwrap());
    }

    #[tokio::test]
    async fn list_for_date_filters_by_start_and_status() {
        let store = InMemoryStore::new();
        let provider = UserId::new();
        let late = appointment(provider, 15, 0, 30);
        let early = appointment(provider, 9, 0, 30);
        let mut cancelled = appointment(provider, 11, 0, 30);
        cancelled.status = AppointmentStatus::Cancelled;
        let next_day = Appointment::pending(
            UserId::new(),
            provider,
            "Haircut",
            TimeRange::starting_at(
                Utc.with_ymd_and_hms(2030, 1, 8, 9, 0, 0).unwrap(),
                Duration::minutes(30),
            ),
        );

        for appt in [&late, &early, &next_day] {
            commit_new(&store, appt).await;
        }
        store.insert_raw(cancelled).await;

        let listed = store
            .list_for_provider_on_date(provider, NaiveDate::from_ymd_opt(2030, 1, 7).unwrap())
            .await
            .unwrap();
        assert_eq!(listed, vec![early, late]);
        assert_eq!(store.list_calls(), 1);
    }

    #[tokio::test]
    async fn update_of_missing_appointment_fails() {
        let store = InMemoryStore::new();
        let appt = appointment(UserId::new(), 9, 0, 30);
        assert!(matches!(
            store.update(&appt).await,
            Err(StoreError::AppointmentNotFound(id)) if id == appt.id
        ));
    }

    #[tokio::test]
    async fn transaction_rejects_other_providers() {
        let store = InMemoryStore::new();
        let mut tx = store.begin(UserId::new()).await.unwrap();
        let result = tx.create(&appointment(UserId::new(), 9, 0, 30)).await;
        assert!(matches!(result, Err(StoreError::ProviderMismatch { .. })));
    }

    #[tokio::test]
    async fn transactions_for_same_provider_are_serialized() {
        let store = InMemoryStore::new();
        let provider = UserId::new();

        let first = store.begin(provider).await.unwrap();
        let blocked = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            store.begin(provider),
        )
        .await;
        assert!(blocked.is_err());

        // Other providers are not blocked.
        assert!(store.begin(UserId::new()).await.is_ok());

        drop(first);
        assert!(store.begin(provider).await.is_ok());
    }

    #[tokio::test]
    async fn window_upsert_replaces_same_day() {
        let store = InMemoryStore::new();
        let provider = UserId::new();
        let nine = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
        let five = NaiveTime::from_hms_opt(17, 0, 0).unwrap();
        let noon = NaiveTime::from_hms_opt(12, 0, 0).unwrap();

        store
            .set_window(&AvailabilityWindow::new(provider, DayOfWeek::MONDAY, nine, five))
            .await
            .unwrap();
        store
            .set_window(&AvailabilityWindow::new(provider, DayOfWeek::MONDAY, nine, noon))
            .await
            .unwrap();

        let window = store
            .get_window(provider, DayOfWeek::MONDAY)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(window.end, noon);
        assert_eq!(store.list_windows(provider).await.unwrap().len(), 1);
        assert!(
            store
                .get_window(provider, DayOfWeek::SUNDAY)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn unavailable_store_fails_reads() {
        let store = InMemoryStore::new();
        store.set_unavailable(true);
        assert!(matches!(
            store.find_by_id(AppointmentId::new()).await,
            Err(StoreError::Unavailable(_))
        ));
    }
}
