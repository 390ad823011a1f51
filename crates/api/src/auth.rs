//! Acting-user identity supplied by the upstream auth layer.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use common::UserId;

use crate::error::ApiError;

/// Header carrying the authenticated user's ID.
pub const USER_ID_HEADER: &str = "x-user-id";

/// The user on whose behalf the request acts.
#[derive(Debug, Clone, Copy)]
pub struct ActingUser(pub UserId);

impl<S> FromRequestParts<S> for ActingUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or_else(|| ApiError::Unauthenticated(format!("missing {USER_ID_HEADER} header")))?;

        value
            .to_str()
            .ok()
            .and_then(|raw| raw.parse::<UserId>().ok())
            .map(ActingUser)
            .ok_or_else(|| ApiError::Unauthenticated(format!("invalid {USER_ID_HEADER} header")))
    }
}
