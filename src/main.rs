//! apigate demo server.
//!
//! Serves the in-memory notes API from `notes.rs`.
//!
//! ```text
//! apigate --config apigate.toml --port 8080
//! ```

mod notes;

use anyhow::Context;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;

use apigate::config::{load_config, ServerConfig};
use apigate::lifecycle::signals;
use apigate::observability::{init_tracing, metrics};

#[derive(Parser)]
#[command(name = "apigate")]
#[command(about = "Schema-driven JSON API server (notes demo)", long_about = None)]
struct Cli {
    /// TOML config file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen on 0.0.0.0:<port> instead of the configured bind address.
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => ServerConfig::default(),
    };

    init_tracing(&config.observability)?;
    tracing::info!("apigate v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let bind: SocketAddr = match cli.port {
        Some(port) => SocketAddr::from(([0, 0, 0, 0], port)),
        None => config
            .listener
            .bind_address
            .parse()
            .context("invalid listener.bind_address")?,
    };
    let listener = TcpListener::bind(bind).await?;

    let server = notes::server(&config, notes::Notes::default())?;
    let handle = server.serve(listener).await?;
    tracing::info!(address = %handle.local_addr(), "Listening for connections");

    signals::ctrl_c().await;
    handle.shutdown().await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
