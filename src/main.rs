//! Process bootstrap: CLI, logging, configuration, listener.
//!
//! Deliberately thin; everything interesting lives in the library.

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use web_relay::config::load_config;
use web_relay::{HttpServer, RelayConfig, Shutdown};

#[derive(Parser)]
#[command(name = "web-relay", about = "Transport-level web-traffic relay")]
struct Cli {
    /// Path to a TOML configuration file. Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the configured listen port.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    web_relay::observability::logging::init("web_relay=info,tower_http=info");

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => RelayConfig::default(),
    };
    if let Some(port) = cli.port {
        config.port = port;
    }

    tracing::info!(
        port = config.port,
        prefix = %config.relay.prefix,
        routes = config.routes,
        local = config.local,
        "Configuration loaded"
    );
    if config.challenge {
        let usernames: Vec<&str> = config.users.keys().map(String::as_str).collect();
        tracing::info!(?usernames, "Password protection is enabled");
    }

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => web_relay::observability::metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(("0.0.0.0", config.port)).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config);
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
