//! HAProxy configuration for the launched fleet.
//!
//! # Layout
//! ```text
//! global                 process limits, chroot, stats socket
//! defaults               tcp mode, timeouts, retries, round robin
//! listen admin_stats     stats page guarded by admin:<password>
//! frontend ss-in         rendezvous address clients connect to
//! backend ss-out         one `server <i>` line per launched worker
//! ```

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::loader::replace_file;
use crate::config::schema::HaproxySettings;
use crate::load_balancer::document::Document;
use crate::worker::spec::LocalEndpoint;

pub const GLOBAL: &str = "global";
pub const DEFAULTS: &str = "defaults";
pub const ADMIN_STATS: &str = "listen admin_stats";
pub const FRONTEND: &str = "frontend ss-in";
pub const BACKEND: &str = "backend ss-out";

/// Failure to write the rendered config.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Build the HAProxy document fronting `endpoints`.
///
/// `endpoints` must be the launched subset, in launch order; backend servers
/// are numbered by their position.
pub fn build(endpoints: &[LocalEndpoint], admin_password: &str, settings: &HaproxySettings) -> Document {
    let mut doc = Document::new();
    let runtime_dir = settings.runtime_dir.trim_end_matches('/');

    doc.add_section(GLOBAL);
    doc.set(GLOBAL, "nbproc", "2")
        .set(GLOBAL, "chroot", settings.runtime_dir.as_str())
        .set(GLOBAL, "pidfile", format!("{runtime_dir}/haproxy.pid"))
        .set(GLOBAL, "stats socket", format!("{runtime_dir}/haproxy_stats"))
        .set(GLOBAL, "user", settings.user.as_str())
        .set(GLOBAL, "group", settings.group.as_str())
        .set(GLOBAL, "ulimit-n", "51200")
        .set(GLOBAL, "maxconn", "8192");

    doc.add_section(DEFAULTS);
    doc.set(DEFAULTS, "log", "global")
        .set(DEFAULTS, "mode", "tcp")
        .set(DEFAULTS, "retries", "3")
        .set(DEFAULTS, "option", "abortonclose")
        .set(DEFAULTS, "maxconn", "8192")
        .set(DEFAULTS, "timeout connect", "5000ms")
        .set(DEFAULTS, "timeout client", "30000ms")
        .set(DEFAULTS, "timeout server", "30000ms")
        .set(DEFAULTS, "balance", "roundrobin");

    doc.add_section(ADMIN_STATS);
    doc.set(ADMIN_STATS, "bind", settings.stats_bind.as_str())
        .set(ADMIN_STATS, "mode", "http")
        .set(ADMIN_STATS, "option", "httplog")
        .set(ADMIN_STATS, "maxconn", "10")
        .set(ADMIN_STATS, "stats refresh", "30s")
        .set(ADMIN_STATS, "uri", "/haproxy")
        .set(ADMIN_STATS, "realm", "Haproxy")
        .set(ADMIN_STATS, "auth", format!("admin:{admin_password}"))
        .set(ADMIN_STATS, "hide-version", "")
        .set(ADMIN_STATS, "admin", "if TRUE");

    doc.add_section(FRONTEND);
    doc.set(FRONTEND, "bind", settings.frontend_bind.as_str())
        .set(FRONTEND, "default_backend", "ss-out");

    doc.add_section(BACKEND);
    doc.set(BACKEND, "mode", "tcp")
        .set(BACKEND, "balance", "roundrobin")
        .set(BACKEND, "option", "tcplog");
    for (i, endpoint) in endpoints.iter().enumerate() {
        doc.set(BACKEND, &format!("server {i}"), endpoint.to_string());
    }

    doc
}

/// Write the document to `path`.
///
/// The text goes to a sibling temporary file first and is renamed into place,
/// so a failed write never leaves a partial config under `path`.
pub fn write_to_path(doc: &Document, path: &Path) -> Result<(), RenderError> {
    replace_file(path, |file| doc.write_to(file)).map_err(|source| RenderError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    tracing::info!(path = %path.display(), "HAProxy config written");
    Ok(())
}
