//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber once per process
//! - Resolve the log filter from `RUST_LOG`, falling back to configuration
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - Human-readable fmt output on stderr; stdout stays free for `render`

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when neither `RUST_LOG` nor a usable level is given.
const FALLBACK_FILTER: &str = "proxy_fleet=info";

/// Build the filter directive for a configured level such as `debug`.
pub fn filter_directive(level: &str) -> String {
    let level = level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => format!("proxy_fleet={level}"),
        _ => FALLBACK_FILTER.to_string(),
    }
}

/// Install the global subscriber. Later calls are no-ops.
pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| filter_directive(level).into());

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_directive() {
        assert_eq!(filter_directive("DEBUG"), "proxy_fleet=debug");
        assert_eq!(filter_directive(" warn "), "proxy_fleet=warn");
        assert_eq!(filter_directive("loud"), FALLBACK_FILTER);
    }
}
