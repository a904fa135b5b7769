#![forbid(unsafe_code)]
//! ProvChain node: ledger plus HTTP API

use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use provchain::api::run_api_server;
use provchain::config::{load_config, DEFAULT_CONFIG_PATH};
use provchain::node::Node;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: String,
    /// Port to listen on (overrides network.port)
    #[arg(long)]
    port: Option<u16>,
    /// Peer URL to register at startup; may be repeated
    #[arg(long = "peer")]
    peers: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = load_config(&cli.config)?;
    if let Some(port) = cli.port {
        config.network.port = port;
    }
    config.network.bootstrap_peers.extend(cli.peers);

    let addr: SocketAddr = format!("{}:{}", config.network.host, config.network.port).parse()?;
    let node = Arc::new(Node::new(config)?);
    let registered = node.bootstrap().await;
    tracing::info!(peers = registered, "bootstrap peers registered");

    let shutdown_node = node.clone();
    let shutdown = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            return;
        }
        tracing::info!("shutting down");
        shutdown_node.shutdown();
    };

    run_api_server(node, addr, shutdown).await
}
