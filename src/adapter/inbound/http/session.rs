//! Caller identification.
//!
//! Authentication happens upstream. The authenticated user id arrives in the
//! `x-user-id` header and is resolved against the user table on every
//! request.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use super::error::ApiError;
use crate::application::Services;
use crate::domain::context::RequestContext;

/// Header carrying the authenticated user id.
pub const USER_HEADER: &str = "x-user-id";

/// The resolved caller of a request.
#[derive(Debug, Clone)]
pub struct Session(pub RequestContext);

impl FromRequestParts<Services> for Session {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        services: &Services,
    ) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or(ApiError::Unauthorized)?;

        services
            .request_context(user_id)
            .await?
            .map(Session)
            .ok_or(ApiError::Unauthorized)
    }
}
