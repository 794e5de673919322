//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! gui-config.json (JSON)
//!     → loader.rs (parse & deserialize)
//!     → normalize.rs (drop bad servers, fill defaults)
//!         → ports.rs (sequential local port counter)
//!         → credential.rs (admin password when unset)
//!     → loader.rs (persist normalized document)
//!     → FleetConfig (read-only from here on)
//!
//! fleet.toml (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → LauncherSettings
//! ```
//!
//! # Design Decisions
//! - All settings fields have defaults to allow minimal files
//! - Validation separates syntactic (serde) from semantic checks
//! - Unknown fleet fields are carried through untouched

pub mod credential;
pub mod loader;
pub mod normalize;
pub mod ports;
pub mod schema;
pub mod validation;

pub use loader::ConfigError;
pub use normalize::normalize;
pub use schema::FleetConfig;
pub use schema::LauncherSettings;
pub use schema::ServiceEndpoint;
