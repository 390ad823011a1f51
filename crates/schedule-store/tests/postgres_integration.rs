//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p schedule-store --test postgres_integration -- --test-threads=1
//! ```

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use schedule_store::{
    Appointment, AppointmentStatus, AppointmentStore, AvailabilityWindow, DayOfWeek,
    PostgresStore, ProviderScheduleStore, StoreError, TimeRange, UserId,
};
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();

            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_scheduling_tables.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();

            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and cleared tables
async fn get_test_store() -> PostgresStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE appointments, availability_windows")
        .execute(&pool)
        .await
        .unwrap();

    PostgresStore::new(pool)
}

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

async fn commit_new(store: &PostgresStore, appt: &Appointment) {
    let mut tx = store.begin(appt.provider_id).await.unwrap();
    tx.create(appt).await.unwrap();
    tx.commit().await.unwrap();
}

#[tokio::test]
async fn create_and_find_appointment() {
    let store = get_test_store().await;
    let appt = appointment(UserId::new(), 9, 0, 30);

    commit_new(&store, &appt).await;

    let found = store.find_by_id(appt.id).await.unwrap().unwrap();
    assert_eq!(found.id, appt.id);
    assert_eq!(found.provider_id, appt.provider_id);
    assert_eq!(found.start, appt.start);
    assert_eq!(found.end, appt.end);
    assert_eq!(found.status, AppointmentStatus::Pending);
}

#[tokio::test]
async fn rolled_back_insert_is_discarded() {
    let store = get_test_store().await;
    let appt = appointment(UserId::new(), 9, 0, 30);

    let mut tx = store.begin(appt.provider_id).await.unwrap();
    tx.create(&appt).await.unwrap();
    assert!(tx.has_overlap(appt.range()).await.unwrap());
    tx.rollback().await.unwrap();

    assert!(store.find_by_id(appt.id).await.unwrap().is_none());
}

#[tokio::test]
async fn overlap_query_is_half_open() {
    let store = get_test_store().await;
    let provider = UserId::new();
    commit_new(&store, &appointment(provider, 9, 0, 30)).await;

    assert!(
        !store
            .has_overlap(provider, TimeRange::new(at(9, 30), at(10, 0)))
            .await
            .unwrap()
    );
    assert!(
        store
            .has_overlap(provider, TimeRange::new(at(9, 15), at(9, 45)))
            .await
            .unwrap()
    );
}

#[tokio::test]
async fn exclusion_constraint_reports_overlap() {
    let store = get_test_store().await;
    let provider = UserId::new();
    let first = appointment(provider, 9, 0, 30);
    let mut second = appointment(provider, 10, 0, 30);
    commit_new(&store, &first).await;
    commit_new(&store, &second).await;

    // Bypass the overlap check and move the second onto the first.
    second.start = at(9, 15);
    second.end = at(9, 45);
    let result = store.update(&second).await;

    assert!(matches!(result, Err(StoreError::Overlap { provider_id }) if provider_id == provider));
}

#[tokio::test]
async fn concurrent_overlapping_transactions_admit_one() {
    let store = get_test_store().await;
    let provider = UserId::new();

    let mut handles = Vec::new();
    for _ in 0..5 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            let appt = appointment(provider, 9, 0, 60);
            let mut tx = store.begin(provider).await.unwrap();
            if tx.has_overlap(appt.range()).await.unwrap() {
                tx.rollback().await.unwrap();
                return false;
            }
            tx.create(&appt).await.unwrap();
            tx.commit().await.unwrap();
            true
        }));
    }

    let mut committed = 0;
    for handle in handles {
        if handle.await.unwrap() {
            committed += 1;
        }
    }
    assert_eq!(committed, 1);

    let day = NaiveDate::from_ymd_opt(2030, 1, 7).unwrap();
    let listed = store.list_for_provider_on_date(provider, day).await.unwrap();
    assert_eq!(listed.len(), 1);
}

#[tokio::test]
async fn cancelled_appointments_are_not_listed() {
    let store = get_test_store().await;
    let provider = UserId::new();
    let mut appt = appointment(provider, 9, 0, 30);
    commit_new(&store, &appt).await;

    appt.status = AppointmentStatus::Cancelled;
    store.update(&appt).await.unwrap();

    let day = NaiveDate::from_ymd_opt(2030, 1, 7).unwrap();
    assert!(
        store
            .list_for_provider_on_date(provider, day)
            .await
            .unwrap()
            .is_empty()
    );
    assert!(!store.has_overlap(provider, appt.range()).await.unwrap());
}

#[tokio::test]
async fn window_upsert_replaces_existing_day() {
    let store = get_test_store().await;
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
    assert_eq!(window.start, nine);
    assert_eq!(window.end, noon);
    assert_eq!(store.list_windows(provider).await.unwrap().len(), 1);
}

#[tokio::test]
async fn missing_window_is_none() {
    let store = get_test_store().await;
    let window = store
        .get_window(UserId::new(), DayOfWeek::SATURDAY)
        .await
        .unwrap();
    assert!(window.is_none());
}
