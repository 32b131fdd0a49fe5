//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with all handlers
//! - Wire up middleware in pipeline order
//! - Bind server to listener
//! - Drain in-flight requests on shutdown, bounded by a timeout
//!
//! # Middleware Order (outermost first)
//! ```text
//! request span → CORS → security headers → header validation → rate limit
//!      → body limit → request logger → error handler → panic guard → routes
//! ```

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    middleware::{from_fn, from_fn_with_state},
    Router,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::{catch_panic::CatchPanicLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

use crate::config::ServiceConfig;
use crate::http::cors::{cors_layer, parse_origins};
use crate::http::middleware::{error_handler, panic_response};
use crate::lifecycle::Shutdown;
use crate::observability::logging::{request_logger, request_span};
use crate::routes::{self, AppState};
use crate::security::{
    headers,
    rate_limit::{rate_limit_middleware, RateLimitState},
    validation::{header_validation_middleware, ValidationState},
    Clock, RateLimiter, SystemClock,
};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("in-flight requests did not finish within {timeout_ms} ms")]
    ForcedShutdown { timeout_ms: u64 },
}

/// HTTP server for the service.
pub struct HttpServer {
    router: Router,
    config: ServiceConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ServiceConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Same as [`HttpServer::new`] with the rate limiter reading `clock`.
    pub fn with_clock(config: ServiceConfig, clock: Arc<dyn Clock>) -> Self {
        let router = build_router(&config, clock);
        routes::log_routes();
        Self { router, config }
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` is triggered.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        tracing::info!(
            url = %format!("http://{addr}"),
            host = %addr.ip(),
            port = addr.port(),
            "listening"
        );

        let timeout = Duration::from_millis(self.config.server.shutdown_timeout_ms);
        serve(self.router, listener, shutdown, timeout).await
    }
}

/// Build the full middleware pipeline around the route table.
pub fn build_router(config: &ServiceConfig, clock: Arc<dyn Clock>) -> Router {
    let security = &config.security;
    let hops = config.server.trust_proxy_hops;

    let validation = Arc::new(ValidationState::new(security.api_key_secret.clone(), hops));
    let limiter = RateLimiter::with_clock(security.window_ms, security.max_requests, clock);
    let rate_limit = Arc::new(RateLimitState::new(
        limiter,
        validation.validator.requires_api_key(),
        hops,
    ));

    // `layer` wraps everything added before it, so the innermost goes first.
    let router = routes::router(AppState::new())
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(from_fn_with_state(config.server.environment, error_handler))
        .layer(from_fn(request_logger))
        .layer(RequestBodyLimitLayer::new(config.server.body_limit_bytes))
        .layer(from_fn_with_state(rate_limit, rate_limit_middleware))
        .layer(from_fn_with_state(validation, header_validation_middleware));

    let router = if security.response_headers {
        headers::harden(router)
    } else {
        router
    };

    router
        .layer(cors_layer(&parse_origins(&config.cors.origins)))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(request_span)
                .on_request(())
                .on_response(())
                .on_failure(()),
        )
}

/// Serve `router` until `shutdown` fires, then give in-flight requests
/// `timeout` to finish. The lifecycle ends `Terminated` either way.
pub async fn serve(
    router: Router,
    listener: TcpListener,
    shutdown: Shutdown,
    timeout: Duration,
) -> Result<(), ServerError> {
    let app = router.into_make_service_with_connect_info::<SocketAddr>();

    let graceful = shutdown.clone();
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move { graceful.draining().await })
        .into_future();

    let deadline = async {
        shutdown.draining().await;
        tokio::time::sleep(timeout).await;
    };

    let result = tokio::select! {
        result = server => result.map_err(ServerError::from),
        () = deadline => {
            let timeout_ms = timeout.as_millis() as u64;
            tracing::error!(timeout_ms, "shutdown_forced");
            Err(ServerError::ForcedShutdown { timeout_ms })
        }
    };

    shutdown.terminate();
    result
}
