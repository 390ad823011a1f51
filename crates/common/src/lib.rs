//! Shared types for the scheduling engine.

pub mod range;
pub mod types;

pub use range::TimeRange;
pub use types::{AppointmentId, InvalidId, UserId};
