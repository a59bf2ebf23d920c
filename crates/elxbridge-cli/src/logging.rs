//! Logging setup.

use anyhow::{anyhow, Context, Result};
use tracing_subscriber::EnvFilter;

/// Default filter when neither `RUST_LOG` nor `--log-level` is given.
pub const DEFAULT_LEVEL: &str = "info";

/// Installs a stderr subscriber. `RUST_LOG` takes precedence over
/// `base_level`.
pub fn setup_logging(base_level: &str) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(base_level))
        .with_context(|| format!("Invalid log filter: {}", base_level))?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("Logger initialization failed: {}", e))
}
