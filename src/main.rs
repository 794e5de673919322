//! proxy-fleet
//!
//! Launches a pool of local proxy clients and renders the HAProxy config that
//! fronts them.
//!
//! # Architecture Overview
//!
//! ```text
//!   gui-config.json ──▶ config::normalize ──▶ gui-config.json (normalized)
//!                              │
//!                              ▼
//!                     first min(N, max_workers) services
//!                        │                      │
//!                        ▼                      ▼
//!           load_balancer::haproxy     worker::Supervisor
//!                        │                      │
//!                        ▼                      ▼
//!                   haproxy.cfg        proxy client × N (127.0.0.1:1080..)
//!                                               │
//!                                               ▼
//!                                  join until exit or SIGINT/SIGTERM
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};

use proxy_fleet::config::loader::load_settings;
use proxy_fleet::config::validation::validate_settings;
use proxy_fleet::config::{ConfigError, LauncherSettings};
use proxy_fleet::lifecycle::{prepare, signals, Shutdown, StartupError, StartupOptions};
use proxy_fleet::load_balancer::haproxy;
use proxy_fleet::observability::init_logging;
use proxy_fleet::worker::{ProxyClientCommand, Supervisor};

#[derive(Parser)]
#[command(name = "proxy-fleet", version)]
#[command(about = "Run one proxy client per configured service behind HAProxy", long_about = None)]
struct Cli {
    /// Fleet document (normalized in place unless --no-persist)
    #[arg(short, long, default_value = "gui-config.json")]
    config: PathBuf,

    /// Launcher settings (TOML)
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// Maximum number of workers to launch
    #[arg(long)]
    max_workers: Option<usize>,

    /// Where to write the HAProxy config
    #[arg(long)]
    haproxy_out: Option<PathBuf>,

    /// Do not write the normalized fleet document back
    #[arg(long)]
    no_persist: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Clone, Copy)]
enum Commands {
    /// Normalize, write the HAProxy config and run the workers
    Run,
    /// Print the HAProxy config for the current fleet without launching anything
    Render,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let loaded = match &cli.settings {
        Some(path) => load_settings(path),
        None => Ok(LauncherSettings::default()),
    };
    let level = cli
        .log_level
        .clone()
        .or_else(|| loaded.as_ref().ok().map(|s| s.observability.log_level.clone()))
        .unwrap_or_else(|| "info".to_string());
    init_logging(&level);

    let settings = match loaded.and_then(|s| apply_overrides(s, &cli)) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!(error = %e, "Invalid launcher settings");
            std::process::exit(1);
        }
    };

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        program = %settings.worker.program,
        max_workers = settings.worker.max_concurrency,
        "proxy-fleet starting"
    );

    let command = cli.command.unwrap_or(Commands::Run);
    let options = StartupOptions {
        fleet_path: cli.config.clone(),
        persist: !cli.no_persist && matches!(command, Commands::Run),
        max_workers: settings.worker.max_concurrency,
    };

    let prepared = match prepare(&options, &settings) {
        Ok(prepared) => prepared,
        Err(StartupError::Config(e)) => {
            tracing::error!(error = %e, "Fatal configuration error");
            std::process::exit(1);
        }
        Err(e) => return Err(e.into()),
    };

    if let Commands::Render = command {
        print!("{}", prepared.document);
        return Ok(());
    }

    haproxy::write_to_path(&prepared.document, &settings.haproxy.output)?;

    let shutdown = Arc::new(Shutdown::new());
    let stop = shutdown.subscribe();
    tokio::spawn(signals::watch(shutdown.clone()));

    let supervisor = Supervisor::new(
        ProxyClientCommand::from_settings(&settings.worker),
        settings.worker.max_concurrency,
        Duration::from_secs(settings.worker.shutdown_grace_secs),
    );
    let fleet = supervisor.launch(&prepared.launch);
    tracing::info!(workers = fleet.running(), "Supervising workers");

    let exits = fleet.wait_all(stop).await;
    let clean = exits.iter().filter(|e| e.is_clean()).count();
    tracing::info!(clean, abnormal = exits.len() - clean, "All workers stopped");

    Ok(())
}

fn apply_overrides(mut settings: LauncherSettings, cli: &Cli) -> Result<LauncherSettings, ConfigError> {
    if let Some(max) = cli.max_workers {
        settings.worker.max_concurrency = max;
    }
    if let Some(path) = &cli.haproxy_out {
        settings.haproxy.output = path.clone();
    }
    if let Some(level) = &cli.log_level {
        settings.observability.log_level = level.clone();
    }
    validate_settings(&settings).map_err(ConfigError::Validation)?;
    Ok(settings)
}
