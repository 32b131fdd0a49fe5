//! HTTP service scaffold library.
//!
//! A small service with a request-security pipeline in front of its routes:
//! header validation (correlation id, optional API key and user id), a
//! fixed-window rate limiter, a uniform JSON error envelope and a
//! signal-driven graceful shutdown.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routes;
pub mod security;

pub use config::schema::ServiceConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
