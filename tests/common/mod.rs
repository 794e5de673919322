//! Shared utilities for integration tests.

use std::path::PathBuf;

use serde_json::{json, Value};
use tempfile::TempDir;

/// A service object as the GUI writes it, without local bind fields.
pub fn service(server: &str, server_port: u16) -> Value {
    json!({
        "server": server,
        "server_port": server_port,
        "password": "secret",
        "method": "aes-256-cfb",
        "protocol": "auth_aes128_md5",
        "protocolparam": "",
        "obfs": "tls1.2_ticket_auth",
        "obfsparam": "cloudflare.com",
        "remarks": format!("node {}", server)
    })
}

/// Write `doc` as `gui-config.json` in a fresh temp dir.
pub fn write_fleet(doc: &Value) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gui-config.json");
    std::fs::write(&path, serde_json::to_string_pretty(doc).unwrap()).unwrap();
    (dir, path)
}

/// `n` services on 10.0.0.1.. with consecutive remote ports.
#[allow(dead_code)]
pub fn services(n: u16) -> Vec<Value> {
    (0..n).map(|i| service(&format!("10.0.0.{}", i + 1), 8388 + i)).collect()
}
