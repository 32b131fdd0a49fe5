//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → headers.rs (hardening headers added on the way out)
//!     → validation.rs (correlation id, API key, user id)
//!     → rate_limit.rs (fixed window per user or client IP)
//!     → Pass to routes
//! ```
//!
//! # Design Decisions
//! - Fail closed: reject on any security check failure
//! - Rejections are terminal responses, never errors propagated inward
//! - Health probes and CORS preflights skip both stages
//! - Every rejection is logged and counted through [`reject`]

use axum::{
    extract::Request,
    http::Method,
    response::{IntoResponse, Response},
};

use crate::http::request::path_with_query;
use crate::http::response::ApiError;
use crate::observability::metrics;

pub mod client_ip;
pub mod headers;
pub mod rate_limit;
pub mod validation;

pub use rate_limit::{Clock, ManualClock, RateLimiter, SystemClock};
pub use validation::{HeaderValidator, RequestContext};

/// Base path of the unauthenticated health probes.
pub const HEALTH_PATH: &str = "/api/health";

/// `/api/health` itself or anything below it.
pub fn is_health_path(path: &str) -> bool {
    path == HEALTH_PATH
        || path
            .strip_prefix(HEALTH_PATH)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Requests that bypass header validation and rate limiting.
pub fn is_exempt(method: &Method, path: &str) -> bool {
    *method == Method::OPTIONS || is_health_path(path)
}

/// Terminal response for a request a security stage refused.
pub(crate) fn reject(err: ApiError, request: &Request) -> Response {
    tracing::warn!(
        method = %request.method(),
        path = %path_with_query(request.uri()),
        code = err.code().as_str(),
        "request_rejected"
    );
    metrics::record_rejection(err.code());
    err.into_response()
}
