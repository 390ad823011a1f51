//! Appointment booking, lookup, cancellation and rescheduling endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::{AppointmentId, UserId};
use domain::{BookAppointment, CancelAppointment, RescheduleAppointment};
use schedule_store::{Appointment, AppointmentStatus};
use serde::{Deserialize, Serialize};

use crate::auth::ActingUser;
use crate::error::ApiError;
use crate::{AppState, CacheBackend, ScheduleBackend};

// -- Request types --

#[derive(Debug, Deserialize)]
pub struct BookRequest {
    pub provider_id: String,
    pub service_type: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct RescheduleRequest {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

// -- Response types --

#[derive(Debug, Serialize)]
pub struct AppointmentResponse {
    pub id: AppointmentId,
    pub customer_id: UserId,
    pub provider_id: UserId,
    pub service_type: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Appointment> for AppointmentResponse {
    fn from(a: Appointment) -> Self {
        Self {
            id: a.id,
            customer_id: a.customer_id,
            provider_id: a.provider_id,
            service_type: a.service_type,
            start_time: a.start,
            end_time: a.end,
            status: a.status,
            created_at: a.created_at,
            updated_at: a.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

// -- Handlers --

/// POST /appointments: book an appointment as the acting customer.
#[tracing::instrument(skip(state))]
pub async fn book<S: ScheduleBackend, C: CacheBackend>(
    State(state): State<Arc<AppState<S, C>>>,
    ActingUser(customer_id): ActingUser,
    Json(req): Json<BookRequest>,
) -> Result<(StatusCode, Json<AppointmentResponse>), ApiError> {
    let cmd = BookAppointment::new(
        customer_id,
        req.provider_id,
        req.service_type,
        req.start_time,
        req.end_time,
    );
    let appointment = state.booking.book(cmd).await?;

    Ok((StatusCode::CREATED, Json(appointment.into())))
}

/// GET /appointments/:id: load an appointment the acting user takes part in.
#[tracing::instrument(skip(state))]
pub async fn get<S: ScheduleBackend, C: CacheBackend>(
    State(state): State<Arc<AppState<S, C>>>,
    ActingUser(user_id): ActingUser,
    Path(id): Path<String>,
) -> Result<Json<AppointmentResponse>, ApiError> {
    let appointment_id = parse_appointment_id(&id)?;
    let appointment = state
        .booking
        .get_appointment(appointment_id, user_id)
        .await?;

    Ok(Json(appointment.into()))
}

/// POST /appointments/:id/cancel: cancel as the customer or the provider.
#[tracing::instrument(skip(state))]
pub async fn cancel<S: ScheduleBackend, C: CacheBackend>(
    State(state): State<Arc<AppState<S, C>>>,
    ActingUser(user_id): ActingUser,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let appointment_id = parse_appointment_id(&id)?;
    state
        .booking
        .cancel(CancelAppointment::new(appointment_id, user_id))
        .await?;

    Ok(Json(MessageResponse {
        message: "Appointment cancelled",
    }))
}

/// POST /appointments/:id/reschedule: move the appointment as its customer.
#[tracing::instrument(skip(state))]
pub async fn reschedule<S: ScheduleBackend, C: CacheBackend>(
    State(state): State<Arc<AppState<S, C>>>,
    ActingUser(user_id): ActingUser,
    Path(id): Path<String>,
    Json(req): Json<RescheduleRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let appointment_id = parse_appointment_id(&id)?;
    state
        .booking
        .reschedule(RescheduleAppointment::new(
            appointment_id,
            user_id,
            req.start_time,
            req.end_time,
        ))
        .await?;

    Ok(Json(MessageResponse {
        message: "Appointment rescheduled",
    }))
}

fn parse_appointment_id(id: &str) -> Result<AppointmentId, ApiError> {
    id.parse()
        .map_err(|_| ApiError::BadRequest("invalid ID format".to_string()))
}
