//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load settings → Load + normalize fleet → Persist → Render HAProxy → Launch workers
//!
//! Shutdown (shutdown.rs):
//!     Signal received → SIGTERM workers → Grace period → Kill stragglers → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: every config artifact is written before any worker starts
//! - Fail fast: any startup error is fatal
//! - Shutdown has timeout: forced kill after deadline

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{prepare, Prepared, StartupError, StartupOptions};
