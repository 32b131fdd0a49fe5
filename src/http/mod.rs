//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware order, graceful drain)
//!     → cors.rs (preflight and origin checks)
//!     → [security pipeline] (see crate::security)
//!     → middleware/ (terminal error handling)
//!     → [routes]
//!     → response.rs (error envelope) → Send to client
//! ```

pub mod cors;
pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use response::{ApiError, ErrorCode};
pub use server::HttpServer;
