//! Fleet document normalization.
//!
//! # Responsibilities
//! - Fill `localPort` and `localAuthPassword` defaults
//! - Drop services whose `server` is not an IP literal
//! - Give every retained service a local bind address and port
//!
//! # Design Decisions
//! - Produces a new ordered list with a fold; nothing is removed mid-iteration
//! - The port counter is a local [`PortAllocator`], not shared state
//! - The pool bound never truncates the list; the supervisor caps launches

use std::net::IpAddr;

use crate::config::credential::generate_admin_password;
use crate::config::loader::ConfigError;
use crate::config::ports::PortAllocator;
use crate::config::schema::{FleetConfig, ServiceEndpoint, DEFAULT_LOCAL_PORT};

/// Local bind address for services whose server is an IPv4 literal.
pub const LOOPBACK_V4: &str = "127.0.0.1";

/// Local bind address for services whose server is an IPv6 literal.
pub const LOOPBACK_V6: &str = "::1";

/// Normalize the fleet document.
///
/// `None` stands for an absent or unparseable document and yields
/// [`ConfigError::Missing`]. `pool_bound` is the number of workers the caller
/// intends to launch; it is only used for logging.
pub fn normalize(config: Option<FleetConfig>, pool_bound: usize) -> Result<FleetConfig, ConfigError> {
    let mut config = config.ok_or(ConfigError::Missing)?;

    let start = *config.local_port.get_or_insert(DEFAULT_LOCAL_PORT);
    if config.local_auth_password.is_none() {
        config.local_auth_password = Some(generate_admin_password());
        tracing::debug!("Generated admin credential for stats page");
    }

    let mut ports = PortAllocator::new(start);
    let services = std::mem::take(&mut config.configs);
    let total = services.len();

    config.configs = services
        .into_iter()
        .filter_map(|service| match service.server.parse::<IpAddr>() {
            Ok(ip) => Some((ip, service)),
            Err(_) => {
                tracing::warn!(server = %service.server, "Dropping service: server is not an IP address");
                None
            }
        })
        .try_fold(Vec::with_capacity(total), |mut kept, (ip, service)| {
            kept.push(fill_local_bind(service, ip, &mut ports)?);
            Ok::<_, ConfigError>(kept)
        })?;

    for port in ports.collisions() {
        tracing::warn!(port, "Explicit local_port collides with an auto-assigned port");
    }

    if config.configs.len() > pool_bound {
        tracing::debug!(
            services = config.configs.len(),
            pool_bound,
            "More services than the worker bound; extra services will not be launched"
        );
    }

    tracing::info!(
        retained = config.configs.len(),
        dropped = total - config.configs.len(),
        first_port = start,
        "Fleet configuration normalized"
    );

    Ok(config)
}

fn fill_local_bind(
    mut service: ServiceEndpoint,
    ip: IpAddr,
    ports: &mut PortAllocator,
) -> Result<ServiceEndpoint, ConfigError> {
    if service.local_address.is_none() {
        let loopback = if ip.is_ipv6() { LOOPBACK_V6 } else { LOOPBACK_V4 };
        service.local_address = Some(loopback.to_string());
    }

    let port = ports
        .resolve(service.local_port)
        .ok_or_else(|| ConfigError::PortsExhausted {
            server: service.server.clone(),
        })?;
    service.local_port = Some(port);

    Ok(service)
}
