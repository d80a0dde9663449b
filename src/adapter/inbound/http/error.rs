//! Mapping of service errors onto HTTP responses.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::{error, warn};

use crate::error::{CryptoError, Error, LlmError};

const INTERNAL_ERROR: &str = "Internal server error";

/// Error returned by every handler, rendered as JSON `{"error": ...}`.
#[derive(Debug)]
pub enum ApiError {
    /// No caller could be identified.
    Unauthorized,
    Service(Error),
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        Self::Service(error)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Service(Error::BadRequest(rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Service(Error::BadRequest(rejection.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::Service(Error::BadRequest(rejection.body_text()))
    }
}

/// Status code for a service error.
#[must_use]
pub fn status_of(error: &Error) -> StatusCode {
    match error {
        Error::Forbidden(_) => StatusCode::FORBIDDEN,
        Error::QuotaExceeded(_) => StatusCode::TOO_MANY_REQUESTS,
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::BadRequest(_) | Error::Validation(_) | Error::Domain(_) | Error::Json(_) => {
            StatusCode::BAD_REQUEST
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Message shown to the client. Storage and transport details stay in the
/// logs.
fn public_message(error: &Error) -> String {
    match error {
        Error::Llm(LlmError::MissingApiKey) => LlmError::MissingApiKey.to_string(),
        Error::Crypto(CryptoError::MissingKey | CryptoError::InvalidKeyLength) => {
            INTERNAL_ERROR.to_string()
        }
        Error::Crypto(_) => "Failed to decrypt the organization API key".to_string(),
        Error::Forbidden(message) | Error::QuotaExceeded(message) | Error::BadRequest(message) => {
            message.clone()
        }
        Error::Validation(_) | Error::Domain(_) | Error::Json(_) | Error::NotFound(_) => {
            error.to_string()
        }
        _ => INTERNAL_ERROR.to_string(),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "Unauthorized" })),
            )
                .into_response(),
            Self::Service(error) => {
                let status = status_of(&error);
                if status.is_server_error() {
                    error!(error = %error, "Request failed");
                } else {
                    warn!(status = status.as_u16(), error = %error, "Request rejected");
                }

                let body = match &error {
                    Error::Validation(errors) => {
                        json!({ "error": public_message(&error), "errors": errors })
                    }
                    _ => json!({ "error": public_message(&error) }),
                };
                (status, Json(body)).into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::FieldErrors;

    #[test]
    fn service_errors_map_to_statuses() {
        assert_eq!(
            status_of(&Error::Forbidden("no".into())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_of(&Error::QuotaExceeded("limit".into())),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            status_of(&Error::NotFound("conversation")),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(&FieldErrors::form("bad").into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(&LlmError::MissingApiKey.into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(&Error::Database("locked".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn storage_details_are_not_exposed() {
        let message = public_message(&Error::Database("no such table: users".into()));
        assert_eq!(message, INTERNAL_ERROR);
    }

    #[test]
    fn missing_api_key_message_is_shown() {
        let message = public_message(&LlmError::MissingApiKey.into());
        assert!(message.contains("API key not configured"));
    }
}
