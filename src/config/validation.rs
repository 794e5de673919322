//! Launcher settings validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (pool bound > 0, program set)
//! - Check that HAProxy bind addresses parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: LauncherSettings → Result<(), Vec<ValidationError>>
//! - Runs before settings are accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::LauncherSettings;

/// A single semantic problem with the launcher settings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("worker.program must not be empty")]
    EmptyProgram,

    #[error("worker.max_concurrency must be at least 1")]
    ZeroConcurrency,

    #[error("{field} is not a socket address: {value}")]
    BadBindAddress { field: &'static str, value: String },
}

/// Validate settings, collecting every error found.
pub fn validate_settings(settings: &LauncherSettings) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if settings.worker.program.trim().is_empty() {
        errors.push(ValidationError::EmptyProgram);
    }
    if settings.worker.max_concurrency == 0 {
        errors.push(ValidationError::ZeroConcurrency);
    }

    let binds = [
        ("haproxy.stats_bind", &settings.haproxy.stats_bind),
        ("haproxy.frontend_bind", &settings.haproxy.frontend_bind),
    ];
    for (field, value) in binds {
        if value.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::BadBindAddress {
                field,
                value: value.clone(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
