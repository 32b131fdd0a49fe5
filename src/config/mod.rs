//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! defaults (schema.rs)
//!     → optional TOML file (loader.rs)
//!     → environment variables, `.env` included (loader.rs)
//!     → validation.rs (semantic checks)
//!     → ServiceConfig (validated, immutable)
//!     → handed to the middleware and server at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no reload path
//! - All fields have defaults to allow an empty environment
//! - Validation separates syntactic (serde/parse) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    CorsConfig, Environment, LogFormat, LogLevel, ObservabilityConfig, SecurityConfig,
    ServerConfig, ServiceConfig,
};

/// Service name reported by the root endpoint and attached to every log line.
pub const SERVICE_NAME: &str = env!("CARGO_PKG_NAME");

/// Service version reported by the root endpoint.
pub const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Greeting returned by the root endpoint.
pub const SERVICE_MESSAGE: &str = "Service is running";
