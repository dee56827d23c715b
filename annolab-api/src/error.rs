//! API error type
//!
//! Every handler returns [`ApiResult`]; failures render as
//! `{"statusCode": n, "error": {"code": "...", "message": "..."}}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Non-standard status returned when a login is attempted before the
/// account's email address has been confirmed. Clients key off it to show
/// the "check your inbox" screen.
pub const EMAIL_NOT_VERIFIED_STATUS: u16 = 450;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Missing or invalid credentials (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated but not allowed (403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Conflict (409), e.g. email already registered
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Login refused until the email address is verified (450)
    #[error("Email not verified: {0}")]
    EmailNotVerified(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Common error: {0}")]
    Common(#[from] annolab_common::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::EmailNotVerified(_) => StatusCode::from_u16(EMAIL_NOT_VERIFIED_STATUS)
                .unwrap_or(StatusCode::FORBIDDEN),
            ApiError::Internal(_) | ApiError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Database(err) => database_status(err),
            ApiError::Common(err) => match err {
                annolab_common::Error::NotFound(_) => StatusCode::NOT_FOUND,
                annolab_common::Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
                annolab_common::Error::Database(db) => database_status(db),
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::EmailNotVerified(_) => "EMAIL_NOT_VERIFIED",
            ApiError::Internal(_) | ApiError::Other(_) => "INTERNAL_ERROR",
            ApiError::Database(_) => "DATABASE_ERROR",
            ApiError::Common(_) => "COMMON_ERROR",
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::BadRequest(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::Conflict(msg)
            | ApiError::EmailNotVerified(msg) => msg.clone(),
            ApiError::Common(annolab_common::Error::NotFound(msg))
            | ApiError::Common(annolab_common::Error::InvalidInput(msg)) => msg.clone(),
            ApiError::Database(sqlx::Error::RowNotFound) => "Resource not found".to_string(),
            ApiError::Database(err) if err.as_database_error().is_some() => {
                match database_status(err) {
                    StatusCode::CONFLICT => "Resource already exists".to_string(),
                    StatusCode::BAD_REQUEST => "Referenced resource does not exist".to_string(),
                    _ => "Internal server error".to_string(),
                }
            }
            // Internal details stay in the log
            _ => "Internal server error".to_string(),
        }
    }
}

fn database_status(err: &sqlx::Error) -> StatusCode {
    match err {
        sqlx::Error::RowNotFound => StatusCode::NOT_FOUND,
        sqlx::Error::Database(db) if db.is_unique_violation() => StatusCode::CONFLICT,
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }

        let body = Json(json!({
            "statusCode": status.as_u16(),
            "error": {
                "code": self.code(),
                "message": self.message(),
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers and services
pub type ApiResult<T> = Result<T, ApiError>;
