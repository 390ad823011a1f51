//! Provider availability and free-slot endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use chrono::{DateTime, Utc};
use common::UserId;
use domain::SetAvailability;
use schedule_store::AvailabilityWindow;
use serde::{Deserialize, Serialize};

use crate::auth::ActingUser;
use crate::error::ApiError;
use crate::{AppState, CacheBackend, ScheduleBackend};

// -- Request types --

#[derive(Debug, Deserialize)]
pub struct SetAvailabilityRequest {
    /// 0 = Sunday .. 6 = Saturday.
    pub day_of_week: u8,
    /// `HH:MM`, UTC.
    pub start_time: String,
    pub end_time: String,
}

#[derive(Debug, Deserialize)]
pub struct SlotsQuery {
    #[serde(default)]
    pub date: String,
}

// -- Response types --

#[derive(Debug, Serialize)]
pub struct WindowResponse {
    pub provider_id: UserId,
    pub day_of_week: u8,
    pub start_time: String,
    pub end_time: String,
}

impl From<AvailabilityWindow> for WindowResponse {
    fn from(w: AvailabilityWindow) -> Self {
        Self {
            provider_id: w.provider_id,
            day_of_week: w.day_of_week.number(),
            start_time: w.start.format("%H:%M").to_string(),
            end_time: w.end.format("%H:%M").to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SlotsResponse {
    pub provider_id: UserId,
    pub date: String,
    pub slots: Vec<DateTime<Utc>>,
}

// -- Handlers --

/// PUT /providers/availability: set the acting provider's window for one weekday.
#[tracing::instrument(skip(state))]
pub async fn set_availability<S: ScheduleBackend, C: CacheBackend>(
    State(state): State<Arc<AppState<S, C>>>,
    ActingUser(provider_id): ActingUser,
    Json(req): Json<SetAvailabilityRequest>,
) -> Result<Json<WindowResponse>, ApiError> {
    let window = state
        .availability
        .set_availability(SetAvailability::new(
            provider_id,
            req.day_of_week,
            req.start_time,
            req.end_time,
        ))
        .await?;

    Ok(Json(window.into()))
}

/// GET /providers/:id/availability: list a provider's weekly windows.
#[tracing::instrument(skip(state))]
pub async fn list_availability<S: ScheduleBackend, C: CacheBackend>(
    State(state): State<Arc<AppState<S, C>>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<WindowResponse>>, ApiError> {
    let provider_id = parse_provider_id(&id)?;
    let windows = state.availability.list_availability(provider_id).await?;

    Ok(Json(windows.into_iter().map(Into::into).collect()))
}

/// GET /providers/:id/slots?date=YYYY-MM-DD: free slot start times.
#[tracing::instrument(skip(state))]
pub async fn slots<S: ScheduleBackend, C: CacheBackend>(
    State(state): State<Arc<AppState<S, C>>>,
    Path(id): Path<String>,
    Query(query): Query<SlotsQuery>,
) -> Result<Json<SlotsResponse>, ApiError> {
    let provider_id = parse_provider_id(&id)?;
    let slots = state
        .availability
        .get_free_slots(provider_id, &query.date)
        .await?;

    Ok(Json(SlotsResponse {
        provider_id,
        date: query.date,
        slots,
    }))
}

fn parse_provider_id(id: &str) -> Result<UserId, ApiError> {
    id.parse()
        .map_err(|_| ApiError::BadRequest("Invalid provider ID".to_string()))
}
