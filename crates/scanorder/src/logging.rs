//! Process-wide log setup.
//!
//! Library code logs through both `log` and `tracing`; `init_tracing` routes
//! the `log` records into the same subscriber so one filter governs both.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::{Result, ScanOrderError};

/// Installs the global subscriber. `level` is used when `RUST_LOG` is unset.
/// Fails if a subscriber or logger is already installed.
pub fn init_tracing(level: &str, json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| ScanOrderError::Logging(format!("invalid log filter '{}': {}", level, e)))?;

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        let subscriber = registry.with(fmt::layer().json().with_current_span(true));
        tracing::subscriber::set_global_default(subscriber)
            .map_err(|e| ScanOrderError::Logging(e.to_string()))?;
    } else {
        let subscriber = registry.with(fmt::layer().with_target(false));
        tracing::subscriber::set_global_default(subscriber)
            .map_err(|e| ScanOrderError::Logging(e.to_string()))?;
    }

    tracing_log::LogTracer::init().map_err(|e| ScanOrderError::Logging(e.to_string()))?;

    Ok(())
}
