//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!
//! Consumers:
//!     → stderr (operator terminal, journald)
//! ```

pub mod logging;

pub use logging::init_logging;
