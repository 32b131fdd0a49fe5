//! Request header names and accessors.
//!
//! # Responsibilities
//! - Name the headers the security pipeline reads and writes
//! - Read optional header values without panicking on non-UTF-8 input
//!
//! # Design Decisions
//! - A header that is present but empty counts as missing
//! - Values that are not visible ASCII count as missing

use axum::http::{HeaderMap, HeaderName, Uri};

/// Caller-supplied identifier echoed on the response and attached to logs.
pub const X_CORRELATION_ID: HeaderName = HeaderName::from_static("x-correlation-id");

/// Shared secret presented by API clients.
pub const X_API_KEY: HeaderName = HeaderName::from_static("x-api-key");

/// Caller identity; the rate-limit key when API keys are in use.
pub const X_USER_ID: HeaderName = HeaderName::from_static("x-user-id");

pub const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
pub const X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// Non-empty string value of `name`, if any.
pub fn header_str<'a>(headers: &'a HeaderMap, name: &HeaderName) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
}

/// Request path including the query string, as clients sent it.
pub fn path_with_query(uri: &Uri) -> &str {
    uri.path_and_query()
        .map_or_else(|| uri.path(), |path_and_query| path_and_query.as_str())
}
