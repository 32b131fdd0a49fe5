//! Service metadata endpoint.

use axum::Json;
use serde::Serialize;

use super::timestamp;
use crate::config::{SERVICE_MESSAGE, SERVICE_NAME, SERVICE_VERSION};

#[derive(Debug, Serialize)]
pub struct Endpoints {
    pub health: &'static str,
    pub ready: &'static str,
    pub live: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub message: &'static str,
    pub status: &'static str,
    pub timestamp: String,
    pub endpoints: Endpoints,
}

pub async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        name: SERVICE_NAME,
        version: SERVICE_VERSION,
        message: SERVICE_MESSAGE,
        status: "ok",
        timestamp: timestamp(),
        endpoints: Endpoints {
            health: super::HEALTH,
            ready: super::HEALTH_READY,
            live: super::HEALTH_LIVE,
        },
    })
}
