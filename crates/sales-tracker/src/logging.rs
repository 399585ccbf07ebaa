//! Tracing setup
//!
//! Diagnostics go to stderr so report output on stdout (tables, `--json`)
//! stays clean for piping.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::constants;

/// Install the global subscriber. `RUST_LOG` wins over `--verbose`.
pub fn initialize(verbose: bool) -> anyhow::Result<()> {
    let fallback = if verbose {
        constants::VERBOSE_LOG_FILTER
    } else {
        constants::DEFAULT_LOG_FILTER
    };
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| fallback.into());

    tracing_subscriber::registry()
        .with(EnvFilter::try_new(&log_level)?)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init()?;

    tracing::debug!(filter = %log_level, "tracing initialized");
    Ok(())
}
