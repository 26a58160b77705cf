//! Tracing initialisation for docqa binaries.
//!
//! Both initialisers read the filter from `RUST_LOG` (default `info`) and are
//! safe to call more than once: only the first call installs a subscriber.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

const DEFAULT_FILTER: &str = "info";

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install a human-readable subscriber writing to stderr.
///
/// Returns `false` if a global subscriber was already installed.
pub fn init_telemetry(service_name: &str) -> bool {
    let installed = tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init()
        .is_ok();
    if installed {
        tracing::debug!(service = service_name, "telemetry initialized");
    }
    installed
}

/// Install a JSON subscriber writing one object per line to stderr.
///
/// Returns `false` if a global subscriber was already installed.
pub fn init_json_telemetry(service_name: &str) -> bool {
    let installed = tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().json().with_writer(std::io::stderr).with_current_span(false))
        .try_init()
        .is_ok();
    if installed {
        tracing::debug!(service = service_name, "json telemetry initialized");
    }
    installed
}

/// Dispatch to the initialiser for `format`.
pub fn init_with_format(service_name: &str, format: LogFormat) -> bool {
    match format {
        LogFormat::Text => init_telemetry(service_name),
        LogFormat::Json => init_json_telemetry(service_name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_initialisation_is_a_no_op() {
        let first = init_telemetry("docqa-test");
        let second = init_json_telemetry("docqa-test");
        // Another test binary may already own the global subscriber.
        assert!(!second || !first);
        assert!(!init_with_format("docqa-test", LogFormat::Text));
    }
}
