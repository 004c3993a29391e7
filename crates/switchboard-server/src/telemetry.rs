//! Logging setup for Switchboard Server.
//!
//! # Configuration
//!
//! Environment variables:
//! - `RUST_LOG`: Log filter (default: info, debug for switchboard crates)
//!
//! The output format comes from [`ServerConfig::log_format`](crate::config::ServerConfig).

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogFormat;

const DEFAULT_FILTER: &str = "info,switchboard_server=debug,switchboard_registry=debug";

/// Initialize the global tracing subscriber.
///
/// Can only succeed once per process.
pub fn init(format: LogFormat) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Build the log filter from RUST_LOG or default
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    match format {
        LogFormat::Pretty => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_file(true)
                .with_line_number(true)
                .pretty();

            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .try_init()?;
        }
        LogFormat::Json => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .with_target(true)
                .json()
                .with_current_span(true);

            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .try_init()?;
        }
    }

    tracing::info!(format = ?format, "Telemetry initialized");

    Ok(())
}
