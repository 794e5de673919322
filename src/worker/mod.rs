//! Worker subsystem.
//!
//! # Data Flow
//! ```text
//! Normalized services
//!     → supervisor.rs (take the first min(len, max_workers))
//!     → spec.rs (ten launch parameters per service)
//!     → launcher.rs (child process command line)
//!     → supervisor.rs (spawn, then join until exit or shutdown)
//! ```
//!
//! # Design Decisions
//! - One OS process per service, never restarted
//! - A failed launch is reported, not propagated

pub mod launcher;
pub mod spec;
pub mod supervisor;

pub use launcher::{ProxyClientCommand, WorkerCommand};
pub use spec::{LaunchError, LocalEndpoint, WorkerSpec};
pub use supervisor::{pool_size, Fleet, Outcome, Supervisor, WorkerExit};
