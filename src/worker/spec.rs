//! Per-worker launch parameters.

use std::fmt;

use thiserror::Error;

use crate::config::schema::ServiceEndpoint;

/// Errors raised while preparing or starting a worker.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("service {server} has no local bind address/port; normalize the fleet first")]
    Unnormalized { server: String },

    #[error("failed to spawn worker for {endpoint}: {source}")]
    Spawn {
        endpoint: LocalEndpoint,
        #[source]
        source: std::io::Error,
    },
}

/// Local address a worker binds, as it appears in the HAProxy backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalEndpoint {
    pub address: String,
    pub port: u16,
}

impl LocalEndpoint {
    pub fn new(address: impl Into<String>, port: u16) -> Self {
        Self {
            address: address.into(),
            port,
        }
    }

    /// The bind address of a normalized service.
    pub fn of(service: &ServiceEndpoint) -> Option<Self> {
        let address = service.local_address.as_deref()?;
        Some(Self::new(address, service.local_port?))
    }
}

impl fmt::Display for LocalEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.address, self.port)
    }
}

/// The ten parameters handed to one proxy worker.
#[derive(Clone, PartialEq, Eq)]
pub struct WorkerSpec {
    pub server: String,
    pub server_port: u16,
    pub password: Vec<u8>,
    pub local: LocalEndpoint,
    pub method: String,
    pub protocol: String,
    pub protocol_param: String,
    pub obfs: String,
    pub obfs_param: String,
}

impl fmt::Debug for WorkerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerSpec")
            .field("server", &self.server)
            .field("server_port", &self.server_port)
            .field("password", &"<redacted>")
            .field("local", &self.local)
            .field("method", &self.method)
            .field("protocol", &self.protocol)
            .field("protocol_param", &self.protocol_param)
            .field("obfs", &self.obfs)
            .field("obfs_param", &self.obfs_param)
            .finish()
    }
}

impl TryFrom<&ServiceEndpoint> for WorkerSpec {
    type Error = LaunchError;

    fn try_from(service: &ServiceEndpoint) -> Result<Self, Self::Error> {
        let local = LocalEndpoint::of(service).ok_or_else(|| LaunchError::Unnormalized {
            server: service.server.clone(),
        })?;

        Ok(Self {
            server: service.server.clone(),
            server_port: service.server_port,
            password: service.password.as_bytes().to_vec(),
            local,
            method: service.method.clone(),
            protocol: service.protocol.clone(),
            protocol_param: service.protocol_param.clone(),
            obfs: service.obfs.clone(),
            obfs_param: service.obfs_param.clone(),
        })
    }
}
