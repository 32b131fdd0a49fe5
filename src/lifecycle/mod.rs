//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Config summary → Bind listener → Serve
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     Running → Draining (stop accepting, finish in-flight)
//!             → Terminated (drained, or forced after the timeout)
//! ```
//!
//! # Design Decisions
//! - Explicit state held in a watch channel, no global flags
//! - Shutdown has timeout: forced exit after deadline

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::{LifecycleState, Shutdown};
