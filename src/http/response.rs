//! Error envelope and the service's HTTP error type.
//!
//! Every rejection the service produces has the same JSON shape:
//!
//! ```text
//! { "success": false, "error": "<message>", "code": "<CODE>", "details": ... }
//! ```
//!
//! `details` is omitted, not `null`, when there is nothing to add.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

/// Machine-readable error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    MissingHeader,
    Unauthorized,
    RateLimited,
    NotFound,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::MissingHeader => "MISSING_HEADER",
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::RateLimited => "RATE_LIMITED",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

/// Body of every error response.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorEnvelope {
    pub success: bool,
    pub error: String,
    pub code: ErrorCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// Build an error response with the uniform envelope.
pub fn error_response(
    status: StatusCode,
    error: impl Into<String>,
    code: ErrorCode,
    details: Option<Value>,
) -> Response {
    let body = ErrorEnvelope {
        success: false,
        error: error.into(),
        code,
        details,
    };
    (status, Json(body)).into_response()
}

/// Marker left on a 500 response so the terminal error handler can log the
/// failure and decide whether to expose its message.
#[derive(Debug, Clone)]
pub struct InternalFailure {
    pub message: String,
}

/// Errors surfaced to HTTP callers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Missing required header: {0}")]
    MissingHeader(&'static str),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Rate limit exceeded")]
    RateLimited {
        window_ms: u64,
        max_requests: u32,
        retry_after_seconds: u64,
    },

    #[error("Route not found")]
    NotFound { path: String },

    /// Unexpected failure. The message never reaches the client directly;
    /// see [`crate::http::middleware::error_handler`].
    #[error("Internal Server Error")]
    Internal(String),
}

impl ApiError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ApiError::MissingHeader(_) => ErrorCode::MissingHeader,
            ApiError::Unauthorized => ErrorCode::Unauthorized,
            ApiError::RateLimited { .. } => ErrorCode::RateLimited,
            ApiError::NotFound { .. } => ErrorCode::NotFound,
            ApiError::Internal(_) => ErrorCode::InternalError,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingHeader(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn details(&self) -> Option<Value> {
        match self {
            ApiError::MissingHeader(name) => Some(json!({ "header": name })),
            ApiError::Unauthorized => None,
            ApiError::RateLimited {
                window_ms,
                max_requests,
                retry_after_seconds,
            } => Some(json!({
                "windowMs": window_ms,
                "maxRequests": max_requests,
                "retryAfterSeconds": retry_after_seconds,
            })),
            ApiError::NotFound { path } => Some(json!({ "path": path })),
            // Redacted here; the error handler adds it back outside production.
            ApiError::Internal(_) => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response =
            error_response(self.status(), self.to_string(), self.code(), self.details());

        match self {
            ApiError::RateLimited {
                retry_after_seconds,
                ..
            } => {
                response
                    .headers_mut()
                    .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_seconds));
            }
            ApiError::Internal(message) => {
                response.extensions_mut().insert(InternalFailure { message });
            }
            _ => {}
        }

        response
    }
}
