//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the global subscriber from config
//! - Provide the service root span and per-request spans
//! - Log one `http_request` event per completed request
//!
//! Request spans are opened by the outermost `TraceLayer`, so every event
//! logged while a request is in flight carries the service identity and
//! request fields, including rejections from the security stages.
//!
//! # Design Decisions
//! - JSON for production, pretty output for local development
//! - `RUST_LOG` overrides the configured level when set
//! - Warnings and errors go to stderr, everything else to stdout

use std::time::Instant;

use axum::{extract::Request, middleware::Next, response::Response};
use tracing::{Level, Span};
use tracing_subscriber::{
    fmt::writer::MakeWriterExt, layer::SubscriberExt, util::SubscriberInitExt, util::TryInitError,
    EnvFilter,
};

use crate::config::{LogFormat, ObservabilityConfig, SERVICE_NAME, SERVICE_VERSION};
use crate::http::request::{header_str, path_with_query, X_CORRELATION_ID, X_USER_ID};
use crate::observability::metrics;

/// Install the global subscriber. Fails if one is already set.
pub fn init_logging(config: &ObservabilityConfig) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str()));

    let writer = std::io::stderr
        .with_max_level(Level::WARN)
        .or_else(std::io::stdout);

    let registry = tracing_subscriber::registry().with(filter);
    match config.log_format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_writer(writer),
            )
            .try_init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().pretty().with_writer(writer))
            .try_init(),
    }
}

/// Root span carrying the service identity on every event.
pub fn service_span() -> Span {
    tracing::info_span!("service", service = SERVICE_NAME, version = SERVICE_VERSION)
}

/// Span for one request. Identity headers are recorded when present.
///
/// Connection tasks spawned by `axum::serve` do not inherit [`service_span`],
/// so the service identity is repeated here.
pub fn request_span(request: &Request) -> Span {
    tracing::info_span!(
        "http_request",
        service = SERVICE_NAME,
        version = SERVICE_VERSION,
        method = %request.method(),
        path = %path_with_query(request.uri()),
        correlation_id = header_str(request.headers(), &X_CORRELATION_ID).unwrap_or("-"),
        user_id = header_str(request.headers(), &X_USER_ID).unwrap_or("-"),
    )
}

/// Wraps the handler and logs once the response is ready.
///
/// Sits inside the security stages, so only admitted requests reach it.
/// Rejections are logged by the stage that rejects them. The event lands in
/// whatever request span is current.
pub async fn request_logger(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    let elapsed = start.elapsed();
    let status = response.status().as_u16();
    tracing::info!(
        status,
        duration_ms = elapsed.as_secs_f64() * 1000.0,
        "http_request"
    );
    metrics::record_request(method.as_str(), status, elapsed);

    response
}
