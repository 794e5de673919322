//! Configuration schema definitions.
//!
//! Two documents live here:
//! - [`FleetConfig`]: the JSON service list the launcher reads, normalizes and
//!   writes back (`gui-config.json`).
//! - [`LauncherSettings`]: the optional TOML file controlling how workers are
//!   started and where the HAProxy config goes.

use std::path::PathBuf;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Default first port handed out by the allocator.
pub const DEFAULT_LOCAL_PORT: u16 = 1080;

/// Default upper bound on concurrently launched workers.
pub const DEFAULT_MAX_CONCURRENCY: usize = 5;

/// Root of the fleet document.
///
/// Fields the launcher does not understand are kept in `extra` so that
/// persisting the normalized document does not lose them.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct FleetConfig {
    /// First port used when assigning `local_port`.
    #[serde(rename = "localPort", default, skip_serializing_if = "Option::is_none")]
    pub local_port: Option<u16>,

    /// Credential for the HAProxy stats page.
    #[serde(rename = "localAuthPassword", default, skip_serializing_if = "Option::is_none")]
    pub local_auth_password: Option<String>,

    /// Ordered service list. Order drives port allocation and backend numbering.
    ///
    /// Entries that cannot be read as a service are dropped here with a
    /// warning; the rest of the document still loads.
    #[serde(default, deserialize_with = "services_or_skip")]
    pub configs: Vec<ServiceEndpoint>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One proxy service to run.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ServiceEndpoint {
    /// Remote host. Must be an IP literal to survive normalization.
    ///
    /// Non-string values are kept as their JSON text so normalization drops
    /// the entry like any other bad address.
    #[serde(default, deserialize_with = "server_text")]
    pub server: String,

    #[serde(default, deserialize_with = "port")]
    pub server_port: u16,

    #[serde(default)]
    pub password: String,

    #[serde(default)]
    pub method: String,

    #[serde(default)]
    pub protocol: String,

    #[serde(rename = "protocolparam", default)]
    pub protocol_param: String,

    #[serde(default)]
    pub obfs: String,

    #[serde(rename = "obfsparam", default)]
    pub obfs_param: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_address: Option<String>,

    #[serde(default, deserialize_with = "optional_port", skip_serializing_if = "Option::is_none")]
    pub local_port: Option<u16>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn services_or_skip<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<ServiceEndpoint>, D::Error> {
    let raw = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(raw
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| match serde_json::from_value(entry) {
            Ok(service) => Some(service),
            Err(e) => {
                tracing::warn!(index, error = %e, "Dropping service: malformed entry");
                None
            }
        })
        .collect())
}

fn server_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(server) => server,
        other => other.to_string(),
    })
}

/// Ports may be written as numbers or numeric strings.
fn port_value(value: &Value) -> Option<u16> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn port<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u16, D::Error> {
    let value = Value::deserialize(deserializer)?;
    port_value(&value).ok_or_else(|| D::Error::custom(format!("invalid port {value}")))
}

fn optional_port<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u16>, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        value => port_value(&value)
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("invalid port {value}"))),
    }
}

impl ServiceEndpoint {
    /// Create an endpoint with only the remote side filled in.
    pub fn new(server: impl Into<String>, server_port: u16) -> Self {
        Self {
            server: server.into(),
            server_port,
            ..Self::default()
        }
    }
}

/// Root of the launcher settings file.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct LauncherSettings {
    pub worker: WorkerSettings,
    pub haproxy: HaproxySettings,
    pub observability: ObservabilityConfig,
}

/// How worker processes are started.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkerSettings {
    /// Executable for the proxy client.
    pub program: String,

    /// Arguments placed before the per-service flags (e.g. a script path).
    pub args: Vec<String>,

    /// Upper bound on launched workers.
    pub max_concurrency: usize,

    /// How long workers get to exit on their own after a shutdown signal.
    pub shutdown_grace_secs: u64,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            program: "python3".to_string(),
            args: vec!["shadowsocks/local.py".to_string()],
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            shutdown_grace_secs: 5,
        }
    }
}

/// Fixed parts of the generated HAProxy config.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HaproxySettings {
    /// Destination of the rendered config.
    pub output: PathBuf,

    /// HAProxy chroot; pidfile and stats socket live here too.
    pub runtime_dir: String,

    pub user: String,

    pub group: String,

    /// Admin/stats page address.
    pub stats_bind: String,

    /// Rendezvous address clients connect to.
    pub frontend_bind: String,
}

impl Default for HaproxySettings {
    fn default() -> Self {
        Self {
            output: PathBuf::from("haproxy.cfg"),
            runtime_dir: "/root/proxy/".to_string(),
            user: "root".to_string(),
            group: "root".to_string(),
            stats_bind: "0.0.0.0:1111".to_string(),
            frontend_bind: "127.0.0.1:8388".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fleet_field_names() {
        let raw = r#"{
            "localPort": 2000,
            "configs": [{
                "server": "1.2.3.4",
                "server_port": 8388,
                "password": "secret",
                "method": "aes-256-cfb",
                "protocol": "auth_sha1_v4",
                "protocolparam": "p",
                "obfs": "tls1.2_ticket_auth",
                "obfsparam": "o",
                "remarks": "home"
            }],
            "index": 3
        }"#;
        let config: FleetConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(config.local_port, Some(2000));
        assert_eq!(config.local_auth_password, None);
        assert_eq!(config.extra.get("index"), Some(&Value::from(3)));

        let svc = &config.configs[0];
        assert_eq!(svc.protocol_param, "p");
        assert_eq!(svc.obfs_param, "o");
        assert_eq!(svc.local_port, None);
        assert_eq!(svc.extra.get("remarks"), Some(&Value::from("home")));
    }

    #[test]
    fn test_unknown_fields_survive_roundtrip() {
        let raw = r#"{"configs": [{"server": "::1", "enable": true}], "shareOverLan": false}"#;
        let config: FleetConfig = serde_json::from_str(raw).unwrap();
        let out = serde_json::to_value(&config).unwrap();
        assert_eq!(out["shareOverLan"], Value::from(false));
        assert_eq!(out["configs"][0]["enable"], Value::from(true));
        assert!(out.get("localPort").is_none());
    }

    #[test]
    fn test_bad_server_value_kept_as_text() {
        let raw = r#"{"configs": [
            {"server": null, "server_port": 8388},
            {"server": 1234},
            {"server_port": "8389"}
        ]}"#;
        let config: FleetConfig = serde_json::from_str(raw).unwrap();
        let servers: Vec<_> = config.configs.iter().map(|s| s.server.as_str()).collect();
        assert_eq!(servers, vec!["null", "1234", ""]);
        assert_eq!(config.configs[2].server_port, 8389);
    }

    #[test]
    fn test_malformed_entries_skipped() {
        let raw = r#"{"configs": [
            "not an object",
            {"server": "1.2.3.4", "server_port": 70000},
            {"server": "5.6.7.8", "server_port": 443, "local_port": null}
        ]}"#;
        let config: FleetConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(config.configs.len(), 1);
        assert_eq!(config.configs[0].server, "5.6.7.8");
        assert_eq!(config.configs[0].local_port, None);
    }

    #[test]
    fn test_null_configs_is_empty() {
        let config: FleetConfig = serde_json::from_str(r#"{"configs": null}"#).unwrap();
        assert!(config.configs.is_empty());
    }

    #[test]
    fn test_settings_defaults() {
        let settings: LauncherSettings = toml::from_str("").unwrap();
        assert_eq!(settings.worker.max_concurrency, DEFAULT_MAX_CONCURRENCY);
        assert_eq!(settings.haproxy.stats_bind, "0.0.0.0:1111");
        assert_eq!(settings.haproxy.frontend_bind, "127.0.0.1:8388");
        assert_eq!(settings.observability.log_level, "info");
    }
}
