use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use switchboard_server::{server, telemetry, LogFormat, ServerConfig};

/// Switchboard Server - live connection registry with broadcast
#[derive(Parser)]
#[command(name = "switchboard-server")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a TOML config file (default: ./switchboard.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on, overrides the config file
    #[arg(short, long)]
    bind: Option<SocketAddr>,

    /// Log output format, overrides the config file
    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config =
        ServerConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(bind) = cli.bind {
        config.bind_addr = bind;
    }
    if let Some(log_format) = cli.log_format {
        config.log_format = log_format;
    }

    telemetry::init(config.log_format).map_err(|e| anyhow::anyhow!(e))?;

    info!("Switchboard Server starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    server::start(config).await?;

    Ok(())
}
