//! Startup orchestration.
//!
//! # Responsibilities
//! - Log the redacted configuration
//! - Bind the listener and begin accepting traffic
//! - Hand the server to the shutdown coordinator
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Config is validated before this point; startup never re-reads it

use std::io;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::ServiceConfig;
use crate::http::server::{HttpServer, ServerError};

use super::{signals, Shutdown};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Server(#[from] ServerError),
}

/// Run the service until a shutdown signal arrives and the drain finishes.
pub async fn start(config: ServiceConfig) -> Result<(), StartupError> {
    let shutdown = Shutdown::new();
    signals::spawn_signal_handler(shutdown.clone());
    start_with(config, shutdown).await
}

/// Same as [`start`] with an externally owned shutdown coordinator.
pub async fn start_with(config: ServiceConfig, shutdown: Shutdown) -> Result<(), StartupError> {
    let summary = config.summary();
    tracing::info!(
        host = %summary.host,
        port = summary.port,
        environment = %summary.environment,
        log_level = summary.log_level.as_str(),
        cors_origins = %summary.cors_origins,
        rate_limit_window_ms = summary.rate_limit_window_ms,
        rate_limit_max_requests = summary.rate_limit_max_requests,
        api_key_auth_enabled = summary.api_key_auth_enabled,
        "startup"
    );

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(source) => {
            tracing::error!(
                code = ?source.kind(),
                message = %source,
                "server_error"
            );
            return Err(StartupError::Bind { addr, source });
        }
    };

    let server = HttpServer::new(config);
    match server.run(listener, shutdown).await {
        Ok(()) => {
            tracing::info!("shutdown_complete");
            Ok(())
        }
        Err(ServerError::Io(err)) => {
            tracing::error!(code = ?err.kind(), message = %err, "server_error");
            Err(ServerError::Io(err).into())
        }
        Err(err) => Err(err.into()),
    }
}
