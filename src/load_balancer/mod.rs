//! Load balancer configuration subsystem.
//!
//! # Data Flow
//! ```text
//! Launched endpoints + admin password
//!     → haproxy.rs (fill the fixed sections, one backend server per endpoint)
//!     → document.rs (ordered sections/options)
//!     → text (section header, then "    <option> <value>" lines)
//!     → haproxy.cfg (temp file + rename)
//! ```
//!
//! # Design Decisions
//! - The fronting balancer is an external HAProxy; this crate only renders its config
//! - Round robin across all launched workers
//! - Backend numbering follows launch order

pub mod document;
pub mod haproxy;

pub use document::Document;
pub use haproxy::RenderError;
