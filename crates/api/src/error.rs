//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::SchedulingError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// No usable acting-user identity on the request.
    Unauthenticated(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Error raised by a scheduling engine.
    Scheduling(SchedulingError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Unauthenticated(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Scheduling(err) => scheduling_error_to_response(err),
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn scheduling_error_to_response(err: SchedulingError) -> (StatusCode, String) {
    match &err {
        SchedulingError::InvalidInput(_)
        | SchedulingError::InvalidDateFormat(_)
        | SchedulingError::InvalidTimeRange => (StatusCode::BAD_REQUEST, err.to_string()),
        SchedulingError::Unauthorized { .. } => (StatusCode::FORBIDDEN, err.to_string()),
        SchedulingError::NotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
        SchedulingError::SlotUnavailable | SchedulingError::InvalidState { .. } => {
            (StatusCode::CONFLICT, err.to_string())
        }
        SchedulingError::ProviderUnavailable { .. } => {
            (StatusCode::UNPROCESSABLE_ENTITY, err.to_string())
        }
        SchedulingError::Storage(_) => {
            tracing::error!(error = %err, "internal server error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
        }
    }
}

impl From<SchedulingError> for ApiError {
    fn from(err: SchedulingError) -> Self {
        ApiError::Scheduling(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{AppointmentId, UserId};
    use schedule_store::{AppointmentStatus, StoreError};

    fn status_of(err: SchedulingError) -> StatusCode {
        ApiError::from(err).into_response().status()
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_of(SchedulingError::InvalidInput("x".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(SchedulingError::InvalidDateFormat("x".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(SchedulingError::InvalidTimeRange),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(SchedulingError::Unauthorized {
                user_id: UserId::new(),
                action: "cancel"
            }),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_of(SchedulingError::NotFound(AppointmentId::new())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(SchedulingError::SlotUnavailable),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(SchedulingError::InvalidState {
                current: AppointmentStatus::Cancelled,
                action: "cancel"
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(SchedulingError::ProviderUnavailable {
                provider_id: UserId::new(),
                date: chrono::NaiveDate::from_ymd_opt(2030, 1, 6).unwrap(),
            }),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(SchedulingError::Storage(StoreError::Unavailable(
                "down".into()
            ))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_unauthenticated_is_401() {
        let response = ApiError::Unauthenticated("missing".into()).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
