//! Scheduling domain layer.
//!
//! This crate provides the two engines callers talk to:
//! - [`AvailabilityEngine`] computes free slots for a provider on a date,
//!   reading through the slot cache, and stores weekly availability windows
//! - [`BookingEngine`] owns the appointment lifecycle (book, cancel,
//!   reschedule) and enforces the no-double-booking invariant inside a
//!   provider-scoped store transaction

pub mod availability;
pub mod booking;
pub mod commands;
pub mod config;
pub mod error;
pub mod slots;

pub use availability::AvailabilityEngine;
pub use booking::{
    BookingEngine, CUSTOMER_BOOKED_MESSAGE, MAX_SERVICE_TYPE_LEN, PROVIDER_BOOKED_MESSAGE,
};
pub use commands::{BookAppointment, CancelAppointment, RescheduleAppointment, SetAvailability};
pub use config::SchedulingConfig;
pub use error::{Result, SchedulingError};
pub use slots::{generate_free_slots, parse_clock, parse_date};
