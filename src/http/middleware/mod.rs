//! Axum middleware owned by the HTTP layer.
//!
//! The security stages live in [`crate::security`]; this module holds the
//! innermost handler that turns internal failures into responses.

pub mod error_handler;

pub use error_handler::{error_handler, panic_response};
