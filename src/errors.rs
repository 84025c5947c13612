use crate::services::{validation::ValidationError, weather_service::ServiceError};
use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// HTTP-facing error: a status, a human-readable reason and, for
/// validation failures, the offending body field.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
    pub field: Option<&'static str>,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
            field: None,
        }
    }

    /// Shortcut for a 500 Internal Server Error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    /// Shortcut for 404 Not Found
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }

    /// 422 naming the rejected field.
    pub fn validation(err: &ValidationError) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: err.reason.to_string(),
            field: Some(err.field),
        }
    }

    /// Map a service failure, prefixing downstream errors with `context`.
    ///
    /// Validation errors become 422, missing objects 404, everything else 500.
    pub fn from_service(err: ServiceError, context: &str) -> Self {
        match err {
            ServiceError::Validation(e) => Self::validation(&e),
            ServiceError::NotFound(key) => Self::not_found(format!("File '{}' not found", key)),
            other => Self::internal(format!("{}: {}", context, other)),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = match self.field {
            Some(field) => Json(json!({
                "detail": [{
                    "loc": ["body", field],
                    "msg": self.message,
                    "type": "value_error"
                }]
            })),
            None => Json(json!({ "detail": self.message })),
        };

        (self.status, body).into_response()
    }
}

/// Unparseable or incomplete JSON bodies keep axum's status (400/415/422).
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::new(rejection.status(), rejection.body_text())
    }
}
