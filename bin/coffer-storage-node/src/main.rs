//! Coffer storage node
//!
//! Owns a shard repository on the local filesystem, serves the shard HTTP
//! protocol, and heartbeats into discovery with current free space.

mod service;

use anyhow::Result;
use clap::Parser;
use coffer_common::{Config, NodeType};
use coffer_discovery::{DiscoveryClient, PeerList, Registration, run_gossip};
use coffer_shardfs::ShardRepo;
use service::AppState;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "coffer-storage-node")]
#[command(about = "Coffer storage node daemon")]
#[command(version)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "coffer.toml")]
    config: String,

    /// Node identity
    #[arg(long, env = "NODE_ID")]
    node_id: String,

    /// Node role; must be "storage" for this daemon
    #[arg(long, env = "NODE_TYPE", default_value = "storage")]
    node_type: NodeType,

    /// Listen port
    #[arg(long, env = "STORAGE_PORT", default_value = "9102")]
    port: u16,

    /// Address advertised to discovery (how other nodes reach this one)
    #[arg(long)]
    advertise_addr: Option<String>,

    /// Shard store base path (overrides config)
    #[arg(long)]
    data_dir: Option<String>,

    /// Discovery service base URL (overrides config)
    #[arg(long, env = "DISCOVERY_URL")]
    discovery_url: Option<String>,

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

    if args.node_type != NodeType::Storage {
        anyhow::bail!("NODE_TYPE must be 'storage' for the storage node daemon");
    }

    let config = Config::load_or_default(&args.config)?;
    let base_path = args
        .data_dir
        .map(Into::into)
        .unwrap_or_else(|| config.shard_store_base_path.clone());
    let discovery_url = args
        .discovery_url
        .unwrap_or_else(|| config.discovery_url.clone());

    info!("Starting Coffer storage node");
    info!("Node id: {}", args.node_id);
    info!("Shard store: {}", base_path.display());
    info!("Discovery: {}", discovery_url);

    let state = Arc::new(AppState {
        node_id: args.node_id.as_str().into(),
        repo: ShardRepo::new(base_path, args.node_id.clone()),
        peers: Arc::new(PeerList::default()),
    });

    let advertise = args.advertise_addr.unwrap_or_else(|| {
        format!("http://127.0.0.1:{}", args.port)
    });
    info!("Advertising at: {}", advertise);

    // Heartbeat into discovery with current free space
    let discovery = Arc::new(DiscoveryClient::new(
        discovery_url,
        Duration::from_secs(config.timing.discovery_timeout_secs),
    )?);
    let heartbeat_state = state.clone();
    let heartbeat_interval = Duration::from_secs(config.timing.heartbeat_secs);
    tokio::spawn(discovery.run_heartbeat(
        move || Registration {
            node_id: heartbeat_state.node_id.clone(),
            node_type: NodeType::Storage,
            address: advertise.clone(),
            free_space: heartbeat_state.repo.available_bytes().ok(),
        },
        heartbeat_interval,
    ));

    // Gossip participant
    let gossip_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timing.discovery_timeout_secs))
        .build()?;
    tokio::spawn(run_gossip(
        state.peers.clone(),
        gossip_client,
        Duration::from_secs(config.timing.gossip_secs),
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

    info!("Storage node shut down gracefully");
    Ok(())
}
