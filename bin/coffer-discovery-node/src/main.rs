//! Coffer discovery node
//!
//! Soft-state registry of live nodes: heartbeats land here, a background
//! sweeper expires silent entries, and lookups return the live storage set.

mod service;

use anyhow::Result;
use clap::Parser;
use coffer_common::Config;
use coffer_discovery::{NodeRegistry, PeerList};
use service::AppState;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "coffer-discovery-node")]
#[command(about = "Coffer discovery/registry daemon")]
#[command(version)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "coffer.toml")]
    config: String,

    /// Node identity
    #[arg(long, env = "NODE_ID", default_value = "discovery")]
    node_id: String,

    /// Listen port
    #[arg(long, env = "DISCOVERY_PORT", default_value = "8000")]
    port: u16,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load_or_default(&args.config)?;

    info!("Starting Coffer discovery service");

    let registry = Arc::new(NodeRegistry::new());
    let state = Arc::new(AppState {
        node_id: args.node_id.as_str().into(),
        registry: registry.clone(),
        peers: Arc::new(PeerList::default()),
    });

    // Expire entries that stopped heartbeating
    tokio::spawn(registry.run_sweeper(
        Duration::from_secs(config.timing.stale_ttl_secs),
        coffer_discovery::SWEEP_INTERVAL,
    ));

    let app = service::router(state);
    let addr: SocketAddr = format!("0.0.0.0:{}", args.port).parse()?;
    info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            warn!("Shutting down...");
        })
        .await?;

    info!("Discovery service shut down gracefully");
    Ok(())
}
