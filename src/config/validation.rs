//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde and the env loader handle syntax)
//! - Validate value ranges (window > 0, port != 0)
//! - Reject origins that cannot be sent as a header value
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServiceConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use axum::http::HeaderValue;
use thiserror::Error;

use crate::config::schema::ServiceConfig;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Check a loaded configuration, collecting every failure.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.host.trim().is_empty() {
        errors.push(ValidationError::new("server.host", "must not be empty"));
    }
    if config.server.port == 0 {
        errors.push(ValidationError::new(
            "server.port",
            "must be between 1 and 65535",
        ));
    }
    if config.server.shutdown_timeout_ms == 0 {
        errors.push(ValidationError::new(
            "server.shutdown_timeout_ms",
            "must be a positive integer",
        ));
    }
    if config.server.body_limit_bytes == 0 {
        errors.push(ValidationError::new(
            "server.body_limit_bytes",
            "must be a positive integer",
        ));
    }

    if config.security.window_ms == 0 {
        errors.push(ValidationError::new(
            "security.window_ms",
            "must be a positive integer",
        ));
    }
    if config.security.max_requests == 0 {
        errors.push(ValidationError::new(
            "security.max_requests",
            "must be a positive integer",
        ));
    }
    if config
        .security
        .api_key_secret
        .as_deref()
        .is_some_and(|secret| secret.trim().is_empty())
    {
        errors.push(ValidationError::new(
            "security.api_key_secret",
            "must not be empty when set",
        ));
    }

    for origin in config.cors.origins.split(',').map(str::trim) {
        if origin.is_empty() || origin == "*" {
            continue;
        }
        if HeaderValue::from_str(origin).is_err() {
            errors.push(ValidationError::new(
                "cors.origins",
                format!("{origin:?} is not a valid origin"),
            ));
        }
    }

    if let Some(addr) = &config.observability.metrics_address {
        if addr.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::new(
                "observability.metrics_address",
                format!("{addr:?} is not a socket address"),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
