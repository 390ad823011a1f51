//! Persistence for appointments and provider availability windows.
//!
//! Two implementations share the same traits: [`InMemoryStore`] for tests and
//! single-process runs, and [`PostgresStore`] backed by sqlx.

pub mod appointment;
pub mod availability;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use appointment::{Appointment, AppointmentStatus};
pub use availability::{AvailabilityWindow, DayOfWeek};
pub use common::{AppointmentId, TimeRange, UserId};
pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use store::{AppointmentStore, AppointmentTransaction, ProviderScheduleStore, day_bounds};
