// src/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// Global Application Error Enum.
/// Centralizes error handling and mapping to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    // 500 Internal Server Error
    InternalServerError(String),

    // 400 Bad Request
    BadRequest(String),

    // 401 Unauthorized - the request carried no usable identity
    AuthenticationMissing(String),

    // 403 Forbidden - a gate denied access. Echoes the actor's role and the
    // unmet precondition for operator diagnosis, never resource data.
    AuthorizationDenied { role: String, reason: String },

    // 404 Not Found
    NotFound(String),

    // 503 Service Unavailable - the store did not acknowledge a read or
    // write. The user must see "not saved", never a false success.
    PersistenceUnavailable(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for AppError {}

/// Implements `IntoResponse` for `AppError`.
/// Converts the error into a JSON response with appropriate HTTP status code.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal Server Error" }),
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            AppError::AuthenticationMissing(msg) => {
                (StatusCode::UNAUTHORIZED, json!({ "error": msg }))
            }
            AppError::AuthorizationDenied { role, reason } => (
                StatusCode::FORBIDDEN,
                json!({
                    "error": "access_denied",
                    "role": role,
                    "reason": reason,
                }),
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, json!({ "error": msg })),
            AppError::PersistenceUnavailable(msg) => {
                tracing::error!("Persistence unavailable: {}", msg);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    json!({ "error": "Your changes were not saved. Please try again." }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

/// Converts `sqlx::Error` into `AppError::PersistenceUnavailable`.
/// Allows using `?` operator on database queries.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::PersistenceUnavailable(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(err.to_string())
    }
}
