//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use livecast_firestore::RepositoryError;

use crate::form::FormError;
use crate::identity::IdentityError;
use crate::session::SessionError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// Form and input validation. The message is shown verbatim.
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    ServiceUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    Repository(#[from] RepositoryError),

    #[error("{0}")]
    Identity(#[from] IdentityError),
}

impl ApiError {
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::ServiceUnavailable(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Repository(e) => repository_status(e),
            ApiError::Identity(e) => identity_status(e),
        }
    }
}

fn repository_status(e: &RepositoryError) -> StatusCode {
    match e {
        RepositoryError::NotInitialized => StatusCode::SERVICE_UNAVAILABLE,
        RepositoryError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        e if e.is_not_found() => StatusCode::NOT_FOUND,
        RepositoryError::Store(_) => StatusCode::BAD_GATEWAY,
    }
}

fn identity_status(e: &IdentityError) -> StatusCode {
    match e {
        IdentityError::InvalidCredentials | IdentityError::UserDisabled => StatusCode::UNAUTHORIZED,
        IdentityError::EmailExists => StatusCode::CONFLICT,
        IdentityError::WeakPassword | IdentityError::InvalidEmail => StatusCode::BAD_REQUEST,
        IdentityError::TooManyAttempts => StatusCode::TOO_MANY_REQUESTS,
        IdentityError::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
        IdentityError::Provider(_) | IdentityError::Network(_) => StatusCode::BAD_GATEWAY,
    }
}

impl From<FormError> for ApiError {
    fn from(e: FormError) -> Self {
        match e {
            FormError::Save(inner) => ApiError::Repository(inner),
            other => ApiError::Validation(other.to_string()),
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::NotInitialized => ApiError::ServiceUnavailable(e.to_string()),
            SessionError::PasswordMismatch | SessionError::WeakPassword => {
                ApiError::Validation(e.to_string())
            }
            SessionError::Identity(inner) => ApiError::Identity(inner),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Don't expose internal error details in production
        let detail = match &self {
            ApiError::Internal(_) => {
                if std::env::var("ENVIRONMENT").unwrap_or_default() == "production" {
                    "An internal error occurred".to_string()
                } else {
                    self.to_string()
                }
            }
            _ => self.to_string(),
        };

        (status, Json(ErrorResponse { detail })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use livecast_firestore::FirestoreError;

    #[test]
    fn test_repository_status_mapping() {
        assert_eq!(
            ApiError::from(RepositoryError::NotInitialized).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ApiError::from(RepositoryError::InvalidInput("bad".into())).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(RepositoryError::Store(FirestoreError::not_found("streams/x"))).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(RepositoryError::Store(FirestoreError::unavailable("down"))).status_code(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_validation_message_is_verbatim() {
        let err = ApiError::from(FormError::TitleRequired);
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Title is required");
    }

    #[test]
    fn test_session_errors() {
        assert_eq!(
            ApiError::from(SessionError::NotInitialized).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        let mismatch = ApiError::from(SessionError::PasswordMismatch);
        assert_eq!(mismatch.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(mismatch.to_string(), "Passwords do not match");
        assert_eq!(
            ApiError::from(SessionError::Identity(IdentityError::EmailExists)).status_code(),
            StatusCode::CONFLICT
        );
    }
}
