//! Route table.
//!
//! # Responsibilities
//! - Register the health and root handlers
//! - Answer unmatched routes with the 404 envelope
//! - Describe the registered routes for diagnostics
//!
//! # Design Decisions
//! - The table is a static list kept next to the registrations; it is
//!   logged at debug level on startup instead of being read back from the
//!   router

use std::time::{Duration, Instant};

use axum::{http::Uri, routing::get, Router};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use crate::http::request::path_with_query;
use crate::http::response::ApiError;
use crate::security::HEALTH_PATH;

pub mod health;
pub mod root;

pub const ROOT: &str = "/";
pub const HEALTH: &str = HEALTH_PATH;
pub const HEALTH_READY: &str = "/api/health/ready";
pub const HEALTH_LIVE: &str = "/api/health/live";

/// One registered route.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct RouteInfo {
    pub method: &'static str,
    pub path: &'static str,
}

pub const ROUTES: [RouteInfo; 4] = [
    RouteInfo { method: "GET", path: HEALTH },
    RouteInfo { method: "GET", path: HEALTH_READY },
    RouteInfo { method: "GET", path: HEALTH_LIVE },
    RouteInfo { method: "GET", path: ROOT },
];

/// State shared by the handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    started_at: Instant,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
        }
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

/// Handlers and the not-found fallback. Middleware is added by the server.
///
/// A known path hit with an unregistered method is answered like an unknown
/// path: 404 with the JSON envelope.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(HEALTH, get(health::health))
        .route(HEALTH_READY, get(health::ready))
        .route(HEALTH_LIVE, get(health::live))
        .route(ROOT, get(root::root))
        .fallback(not_found)
        .method_not_allowed_fallback(not_found)
        .with_state(state)
}

pub fn log_routes() {
    tracing::debug!(
        total_routes = ROUTES.len(),
        routes = ?ROUTES,
        "routes_registered"
    );
}

/// Fallback for unmatched routes. Reports the path with its query string.
pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound {
        path: path_with_query(&uri).to_string(),
    }
}

/// RFC 3339 UTC timestamp with millisecond precision.
pub fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
