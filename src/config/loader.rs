//! Configuration loading from and saving to disk.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::config::schema::{FleetConfig, LauncherSettings};
use crate::config::validation::{validate_settings, ValidationError};

/// Error type for configuration loading and normalization.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),

    /// The fleet document was absent or could not be parsed.
    #[error("fleet configuration is missing")]
    Missing,

    /// The port counter ran past 65535 while an entry still needed a port.
    #[error("no local port left to assign to service {server}")]
    PortsExhausted { server: String },
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Read the JSON fleet document.
pub fn load_fleet(path: &Path) -> Result<FleetConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config = serde_json::from_str(&content)?;
    Ok(config)
}

/// Write the fleet document back as 4-space indented JSON.
///
/// The previous document stays intact if the write fails.
pub fn save_fleet(config: &FleetConfig, path: &Path) -> Result<(), ConfigError> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    config.serialize(&mut ser)?;

    replace_file(path, |file| file.write_all(&buf))?;
    Ok(())
}

/// Replace `path` with whatever `write` produces.
///
/// Output goes to a sibling `<name>.tmp` that is synced and renamed over
/// `path`. On failure the temporary file is removed and `path` is untouched.
pub fn replace_file<F>(path: &Path, write: F) -> io::Result<()>
where
    F: FnOnce(&mut fs::File) -> io::Result<()>,
{
    let tmp = tmp_path(path);
    let result = fs::File::create(&tmp)
        .and_then(|mut file| {
            write(&mut file)?;
            file.flush()?;
            file.sync_all()
        })
        .and_then(|()| fs::rename(&tmp, path));

    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Load and validate launcher settings from a TOML file.
pub fn load_settings(path: &Path) -> Result<LauncherSettings, ConfigError> {
    let content = fs::read_to_string(path)?;
    let settings: LauncherSettings = toml::from_str(&content)?;

    validate_settings(&settings).map_err(ConfigError::Validation)?;

    Ok(settings)
}
