//! # Error Handling
//!
//! Custom error types and their conversion to HTTP responses.
//!
//! ## HTTP Status Code Mapping:
//! - Internal/ConfigError → 500 (Internal Server Error)
//! - BadRequest → 400 (Bad Request)
//! - SessionGeneration → 500, with the fixed relay body shape
//!
//! ## JSON Response Formats:
//! Most errors use a consistent envelope:
//! ```json
//! {
//!   "error": {
//!     "type": "internal_error",
//!     "message": "...",
//!     "timestamp": "2025-01-01T12:00:00Z"
//!   }
//! }
//! ```
//!
//! `SessionGeneration` is the exception: the browser client parses the
//! relay's failure body literally, so it keeps the exact shape
//! `{"error": "Error generating session", "details": "..."}`.

use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use std::fmt;

use crate::realtime::SessionError;

#[derive(Debug)]
pub enum AppError {
    /// Internal server errors
    Internal(String),

    /// Client sent invalid or malformed data
    BadRequest(String),

    /// Configuration file or environment variable problems
    ConfigError(String),

    /// The credential relay could not mint a client credential. Carries the
    /// human-readable detail for the client's `details` field.
    SessionGeneration(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            AppError::SessionGeneration(msg) => write!(f, "Error generating session: {}", msg),
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        // The relay failure shape is part of the client contract; the
        // generic envelope covers everything else.
        if let AppError::SessionGeneration(details) = self {
            return HttpResponse::InternalServerError().json(json!({
                "error": "Error generating session",
                "details": details,
            }));
        }

        let (status, error_type, message) = match self {
            AppError::Internal(msg) => (
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                msg.clone(),
            ),
            AppError::BadRequest(msg) => (
                actix_web::http::StatusCode::BAD_REQUEST,
                "bad_request",
                msg.clone(),
            ),
            AppError::ConfigError(msg) => (
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                "config_error",
                msg.clone(),
            ),
            AppError::SessionGeneration(_) => unreachable!(),
        };

        HttpResponse::build(status).json(json!({
            "error": {
                "type": error_type,
                "message": message,
                "timestamp": chrono::Utc::now().to_rfc3339()
            }
        }))
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(format!("JSON parsing error: {}", err))
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

/// Session establishment failures surface through the relay endpoint with
/// their message as the `details` field.
impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        AppError::SessionGeneration(err.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;
