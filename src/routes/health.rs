//! Health probes. Exempt from header validation and rate limiting.

use axum::{extract::State, Json};
use serde::Serialize;

use super::{timestamp, AppState};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// Seconds since the process started serving.
    pub uptime: f64,
    pub timestamp: String,
}

/// Probe response without uptime.
#[derive(Debug, Serialize)]
pub struct ProbeResponse {
    pub status: &'static str,
    pub timestamp: String,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime: state.uptime().as_secs_f64(),
        timestamp: timestamp(),
    })
}

pub async fn ready() -> Json<ProbeResponse> {
    Json(ProbeResponse {
        status: "ready",
        timestamp: timestamp(),
    })
}

pub async fn live() -> Json<ProbeResponse> {
    Json(ProbeResponse {
        status: "alive",
        timestamp: timestamp(),
    })
}
