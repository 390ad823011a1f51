use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime, Utc};
use sqlx::{
    PgPool, Postgres, Row, Transaction,
    postgres::{PgPoolOptions, PgRow},
};
use uuid::Uuid;

use crate::{
    Appointment, AppointmentId, AvailabilityWindow, DayOfWeek, Result, StoreError, TimeRange,
    UserId,
    store::{AppointmentStore, AppointmentTransaction, ProviderScheduleStore, day_bounds},
};

/// Name of the exclusion constraint guarding against overlapping appointments.
const NO_OVERLAP_CONSTRAINT: &str = "appointments_no_overlap";

const APPOINTMENT_COLUMNS: &str =
    "id, customer_id, provider_id, service_type, start_time, end_time, status, created_at, updated_at";

/// PostgreSQL-backed schedule store implementation.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL schedule store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects a new pool to `url`.
    ///
    /// Waiting for a connection (and so for a provider transaction) is
    /// bounded by `acquire_timeout`; a timeout surfaces as a database error.
    pub async fn connect(
        url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_appointment(row: PgRow) -> Result<Appointment> {
        let status: String = row.try_get("status")?;

        Ok(Appointment {
            id: AppointmentId::from_uuid(row.try_get::<Uuid, _>("id")?),
            customer_id: UserId::from_uuid(row.try_get::<Uuid, _>("customer_id")?),
            provider_id: UserId::from_uuid(row.try_get::<Uuid, _>("provider_id")?),
            service_type: row.try_get("service_type")?,
            start: row.try_get("start_time")?,
            end: row.try_get("end_time")?,
            status: status.parse()?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_window(row: PgRow) -> Result<AvailabilityWindow> {
        let day: i16 = row.try_get("day_of_week")?;
        let day_of_week = u8::try_from(day)
            .ok()
            .and_then(DayOfWeek::new)
            .ok_or_else(|| StoreError::Corrupt(format!("day_of_week out of range: {day}")))?;

        Ok(AvailabilityWindow {
            provider_id: UserId::from_uuid(row.try_get::<Uuid, _>("provider_id")?),
            day_of_week,
            start: row.try_get::<NaiveTime, _>("start_time")?,
            end: row.try_get::<NaiveTime, _>("end_time")?,
        })
    }
}

/// Key for the transaction-scoped advisory lock guarding one provider's schedule.
fn provider_lock_key(provider_id: UserId) -> i64 {
    let (high, low) = provider_id.as_uuid().as_u64_pair();
    (high ^ low) as i64
}

/// Maps a write error, turning exclusion-constraint violations into overlaps.
fn map_write_error(provider_id: UserId, e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.constraint() == Some(NO_OVERLAP_CONSTRAINT)
    {
        return StoreError::Overlap { provider_id };
    }
    StoreError::Database(e)
}

#[async_trait]
impl AppointmentStore for PostgresStore {
    #[tracing::instrument(skip(self))]
    async fn begin(&self, provider_id: UserId) -> Result<Box<dyn AppointmentTransaction>> {
        let mut tx = self.pool.begin().await?;

        // Held until commit or rollback.
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(provider_lock_key(provider_id))
            .execute(&mut *tx)
            .await?;

        Ok(Box::new(PostgresTransaction { tx, provider_id }))
    }

    async fn find_by_id(&self, id: AppointmentId) -> Result<Option<Appointment>> {
        let row = sqlx::query(&format!(
            "SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_appointment).transpose()
    }

    async fn update(&self, appointment: &Appointment) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE appointments
            SET start_time = $2, end_time = $3, status = $4, updated_at = $5
            WHERE id = $1
            "#,
        )
        .bind(appointment.id.as_uuid())
        .bind(appointment.start)
        .bind(appointment.end)
        .bind(appointment.status.as_str())
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(appointment.provider_id, e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::AppointmentNotFound(appointment.id));
        }
        Ok(())
    }

    async fn has_overlap(&self, provider_id: UserId, range: TimeRange) -> Result<bool> {
        let overlap: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM appointments
                WHERE provider_id = $1
                  AND status IN ('PENDING', 'CONFIRMED')
                  AND start_time < $3 AND end_time > $2
            )
            "#,
        )
        .bind(provider_id.as_uuid())
        .bind(range.start)
        .bind(range.end)
        .fetch_one(&self.pool)
        .await?;

        Ok(overlap)
    }

    async fn list_for_provider_on_date(
        &self,
        provider_id: UserId,
        date: NaiveDate,
    ) -> Result<Vec<Appointment>> {
        let bounds = day_bounds(date);
        let rows = sqlx::query(&format!(
            r#"
            SELECT {APPOINTMENT_COLUMNS}
            FROM appointments
            WHERE provider_id = $1
              AND start_time >= $2 AND start_time < $3
              AND status IN ('PENDING', 'CONFIRMED')
            ORDER BY start_time ASC
            "#
        ))
        .bind(provider_id.as_uuid())
        .bind(bounds.start)
        .bind(bounds.end)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_appointment).collect()
    }
}

#[async_trait]
impl ProviderScheduleStore for PostgresStore {
    async fn get_window(
        &self,
        provider_id: UserId,
        day_of_week: DayOfWeek,
    ) -> Result<Option<AvailabilityWindow>> {
        let row = sqlx::query(
            r#"
            SELECT provider_id, day_of_week, start_time, end_time
            FROM availability_windows
            WHERE provider_id = $1 AND day_of_week = $2
            "#,
        )
        .bind(provider_id.as_uuid())
        .bind(i16::from(day_of_week.number()))
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_window).transpose()
    }

    async fn set_window(&self, window: &AvailabilityWindow) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO availability_windows (provider_id, day_of_week, start_time, end_time, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (provider_id, day_of_week) DO UPDATE SET
                start_time = EXCLUDED.start_time,
                end_time = EXCLUDED.end_time,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(window.provider_id.as_uuid())
        .bind(i16::from(window.day_of_week.number()))
        .bind(window.start)
        .bind(window.end)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_windows(&self, provider_id: UserId) -> Result<Vec<AvailabilityWindow>> {
        let rows = sqlx::query(
            r#"
            SELECT provider_id, day_of_week, start_time, end_time
            FROM availability_windows
            WHERE provider_id = $1
            ORDER BY day_of_week ASC
            "#,
        )
        .bind(provider_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_window).collect()
    }
}

/// A database transaction holding the provider's advisory lock.
struct PostgresTransaction {
    tx: Transaction<'static, Postgres>,
    provider_id: UserId,
}

impl PostgresTransaction {
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
impl AppointmentTransaction for PostgresTransaction {
    fn provider_id(&self) -> UserId {
        self.provider_id
    }

    async fn has_overlap(&mut self, range: TimeRange) -> Result<bool> {
        let overlap: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM appointments
                WHERE provider_id = $1
                  AND status IN ('PENDING', 'CONFIRMED')
                  AND start_time < $3 AND end_time > $2
            )
            "#,
        )
        .bind(self.provider_id.as_uuid())
        .bind(range.start)
        .bind(range.end)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(overlap)
    }

    async fn find_by_id(&mut self, id: AppointmentId) -> Result<Option<Appointment>> {
        let row = sqlx::query(&format!(
            "SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = $1 FOR UPDATE"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(PostgresStore::row_to_appointment).transpose()
    }

    async fn create(&mut self, appointment: &Appointment) -> Result<()> {
        self.check_scope(appointment)?;

        sqlx::query(
            r#"
            INSERT INTO appointments (id, customer_id, provider_id, service_type, start_time, end_time, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(appointment.id.as_uuid())
        .bind(appointment.customer_id.as_uuid())
        .bind(appointment.provider_id.as_uuid())
        .bind(&appointment.service_type)
        .bind(appointment.start)
        .bind(appointment.end)
        .bind(appointment.status.as_str())
        .bind(appointment.created_at)
        .bind(appointment.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_write_error(self.provider_id, e))?;

        Ok(())
    }

    async fn update(&mut self, appointment: &Appointment) -> Result<()> {
        self.check_scope(appointment)?;

        let result = sqlx::query(
            r#"
            UPDATE appointments
            SET start_time = $2, end_time = $3, status = $4, updated_at = $5
            WHERE id = $1
            "#,
        )
        .bind(appointment.id.as_uuid())
        .bind(appointment.start)
        .bind(appointment.end)
        .bind(appointment.status.as_str())
        .bind(Utc::now())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_write_error(self.provider_id, e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::AppointmentNotFound(appointment.id));
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let provider_id = self.provider_id;
        self.tx
            .commit()
            .await
            .map_err(|e| map_write_error(provider_id, e))
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_key_is_stable_per_provider() {
        let provider = UserId::new();
        assert_eq!(provider_lock_key(provider), provider_lock_key(provider));
    }
}
