//! CORS policy built from the configured origin list.

use axum::http::{header, HeaderName, HeaderValue, Method};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::http::request::{X_API_KEY, X_CORRELATION_ID, X_USER_ID};

const ALLOWED_METHODS: [Method; 5] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::OPTIONS,
];

const ALLOWED_HEADERS: [HeaderName; 5] = [
    header::CONTENT_TYPE,
    header::AUTHORIZATION,
    X_API_KEY,
    X_USER_ID,
    X_CORRELATION_ID,
];

/// Origins allowed to make cross-origin requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowedOrigins {
    Any,
    List(Vec<HeaderValue>),
}

/// Parse `CORS_ORIGINS`. An empty list or a `*` entry allows any origin.
/// Entries that are not valid header values are skipped; config validation
/// reports them before the server starts.
pub fn parse_origins(raw: &str) -> AllowedOrigins {
    let entries: Vec<&str> = raw
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .collect();

    if entries.is_empty() || entries.contains(&"*") {
        return AllowedOrigins::Any;
    }

    AllowedOrigins::List(
        entries
            .into_iter()
            .filter_map(|origin| HeaderValue::from_str(origin).ok())
            .collect(),
    )
}

pub fn cors_layer(origins: &AllowedOrigins) -> CorsLayer {
    let allow_origin = match origins {
        AllowedOrigins::Any => AllowOrigin::from(Any),
        AllowedOrigins::List(list) => AllowOrigin::list(list.iter().cloned()),
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(ALLOWED_METHODS)
        .allow_headers(ALLOWED_HEADERS)
}
