//! Terminal error handling.
//!
//! Route handlers report unexpected failures as [`ApiError::Internal`], and
//! panics are converted into the same shape by [`panic_response`]. Both
//! leave an [`InternalFailure`] marker on the response. This middleware is
//! the only place that reads the marker: it logs the failure with the
//! request's identity and decides whether the message reaches the client.
//!
//! A response without the marker is already complete and passes through
//! untouched.

use std::any::Any;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::config::Environment;
use crate::http::request::{header_str, path_with_query, X_CORRELATION_ID, X_USER_ID};
use crate::http::response::{error_response, ApiError, ErrorCode, InternalFailure};

pub async fn error_handler(
    State(environment): State<Environment>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let path = path_with_query(request.uri()).to_string();
    let correlation_id = header_str(request.headers(), &X_CORRELATION_ID).map(str::to_string);
    let user_id = header_str(request.headers(), &X_USER_ID).map(str::to_string);

    let mut response = next.run(request).await;
    let Some(failure) = response.extensions_mut().remove::<InternalFailure>() else {
        return response;
    };

    tracing::error!(
        method = %method,
        path = %path,
        correlation_id = correlation_id.as_deref().unwrap_or("-"),
        user_id = user_id.as_deref().unwrap_or("-"),
        error = %failure.message,
        "http_error"
    );

    if environment.is_production() {
        return response;
    }

    let mut rendered = error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal Server Error",
        ErrorCode::InternalError,
        Some(json!({ "message": failure.message })),
    );
    // Keep anything outer layers already attached, such as the echoed
    // correlation id.
    for (name, value) in response.headers() {
        if !rendered.headers().contains_key(name) {
            rendered.headers_mut().insert(name.clone(), value.clone());
        }
    }
    rendered
}

/// Turn a caught panic into an internal failure.
pub fn panic_response(payload: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "handler panicked".to_string()
    };
    ApiError::Internal(message).into_response()
}
