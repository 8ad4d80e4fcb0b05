//! Logging initialization

use tracing_subscriber::EnvFilter;

/// Initialize logging based on verbosity level, unless `quiet` is set.
///
/// `RUST_LOG` overrides the verbosity-derived level if present, matching
/// `tracing-subscriber`'s usual precedence.
pub fn init_logging(verbosity: u8, quiet: bool) -> anyhow::Result<()> {
    let default_level = if quiet {
        "error"
    } else {
        match verbosity {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))
}
