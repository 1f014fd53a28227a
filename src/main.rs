//! Sample web application host.
//!
//! Serves the sample assets, counter hub and widget API on the configured
//! reservation until interrupted.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

use webapp_host::config::{load_config, HostConfig};
use webapp_host::lifecycle::wait_for_signal;
use webapp_host::observability::{logging, metrics};
use webapp_host::sample;

#[derive(Parser, Debug)]
#[command(name = "webapp-host", version, about = "Self-hosted web application server")]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, env = "WEBAPP_HOST_CONFIG")]
    config: Option<PathBuf>,

    /// Address reservation to listen on, e.g. http://+:8655/
    #[arg(short, long)]
    reservation: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => HostConfig::default(),
    };
    if let Some(reservation) = cli.reservation {
        config.listener.reservation = reservation;
    }

    logging::init(&config.observability);
    tracing::info!("webapp-host v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics exporter");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let server = sample::build_server(&config)?;
    let handle = server.start().await?;
    tracing::info!(address = %handle.local_addr(), "Started, press Ctrl-C to stop");

    wait_for_signal().await;
    handle.stop();
    handle.stopped().await;

    tracing::info!("Shutdown complete");
    Ok(())
}
