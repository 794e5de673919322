//! Multi-instance proxy client launcher.
//!
//! Reads one fleet document describing N proxy services, normalizes it,
//! starts one proxy client process per service and renders an HAProxy config
//! that round-robins across the started clients.

pub mod config;
pub mod lifecycle;
pub mod load_balancer;
pub mod observability;
pub mod worker;

pub use config::schema::{FleetConfig, LauncherSettings};
pub use lifecycle::Shutdown;
pub use worker::Supervisor;
