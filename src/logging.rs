//! Structured logging setup
//!
//! Installs a `tracing` subscriber writing to stderr. `RUST_LOG` takes
//! precedence over the level passed in.

use crate::{Error, Result};
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter directive used when `RUST_LOG` is unset
pub fn default_directive(level: &str) -> String {
    format!("{}={}", env!("CARGO_PKG_NAME"), level.to_lowercase())
}

/// Install the global subscriber
///
/// Quiet mode drops the uptime timer and uses the compact formatter. Fails
/// if a global subscriber is already installed.
pub fn setup_logging(level: &str, quiet: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(level)));

    let installed = if quiet {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_timer(fmt::time::uptime())
                    .with_writer(std::io::stderr),
            )
            .try_init()
    };

    installed.map_err(|e| Error::configuration(format!("cannot install logger: {}", e)))?;

    debug!("Logging initialized at level: {}", level);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive() {
        assert_eq!(default_directive("INFO"), "bufr_ingester=info");
        assert_eq!(default_directive("debug"), "bufr_ingester=debug");
    }

    #[test]
    fn test_second_install_fails() {
        let _ = setup_logging("warn", true);
        assert!(matches!(
            setup_logging("warn", false),
            Err(Error::Configuration { .. })
        ));
    }
}
