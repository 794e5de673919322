//! Startup orchestration.
//!
//! # Responsibilities
//! - Load and normalize the fleet document
//! - Persist the normalized document back in place
//! - Pick the launch set and render the HAProxy document for it
//!
//! # Design Decisions
//! - Fail fast: a missing fleet document is fatal
//! - Runs once, single-threaded, before any worker exists
//! - The HAProxy backend and the launched workers come from the same slice

use std::path::PathBuf;

use thiserror::Error;

use crate::config::loader::{load_fleet, save_fleet};
use crate::config::schema::{LauncherSettings, DEFAULT_MAX_CONCURRENCY};
use crate::config::{normalize, ConfigError, FleetConfig, ServiceEndpoint};
use crate::load_balancer::{haproxy, Document, RenderError};
use crate::worker::{pool_size, LocalEndpoint};

/// Errors that abort startup.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Inputs for one startup pass.
#[derive(Debug, Clone)]
pub struct StartupOptions {
    /// Fleet document to read (and write back when `persist` is set).
    pub fleet_path: PathBuf,
    pub persist: bool,
    pub max_workers: usize,
}

impl Default for StartupOptions {
    fn default() -> Self {
        Self {
            fleet_path: PathBuf::from("gui-config.json"),
            persist: true,
            max_workers: DEFAULT_MAX_CONCURRENCY,
        }
    }
}

/// Everything needed to start the fleet.
#[derive(Debug, Clone)]
pub struct Prepared {
    /// The normalized fleet document.
    pub fleet: FleetConfig,
    /// Services that get a worker, in launch order.
    pub launch: Vec<ServiceEndpoint>,
    /// HAProxy document fronting `launch`.
    pub document: Document,
}

impl Prepared {
    pub fn endpoints(&self) -> Vec<LocalEndpoint> {
        self.launch.iter().filter_map(LocalEndpoint::of).collect()
    }
}

/// Load, normalize, persist and render.
pub fn prepare(options: &StartupOptions, settings: &LauncherSettings) -> Result<Prepared, StartupError> {
    let raw = match load_fleet(&options.fleet_path) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::error!(path = %options.fleet_path.display(), error = %e, "Cannot read fleet configuration");
            None
        }
    };

    let fleet = normalize(raw, options.max_workers)?;

    if options.persist {
        save_fleet(&fleet, &options.fleet_path)?;
        tracing::info!(path = %options.fleet_path.display(), "Normalized fleet configuration saved");
    }

    let count = pool_size(fleet.configs.len(), options.max_workers);
    let launch = fleet.configs[..count].to_vec();
    if launch.is_empty() {
        tracing::warn!("No usable services in fleet configuration");
    }

    let endpoints: Vec<LocalEndpoint> = launch.iter().filter_map(LocalEndpoint::of).collect();
    let password = fleet.local_auth_password.as_deref().unwrap_or_default();
    let document = haproxy::build(&endpoints, password, &settings.haproxy);

    Ok(Prepared {
        fleet,
        launch,
        document,
    })
}
