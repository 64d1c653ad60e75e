//! Coffer construction node
//!
//! Runs the ingest and retrieval pipelines behind the `/process` and
//! `/reconstruct` front door. The AEAD key is validated at startup; a bad
//! key aborts the process before it can serve a single request.

mod service;

use anyhow::Result;
use clap::Parser;
use coffer_common::{Config, NodeType};
use coffer_discovery::{DiscoveryClient, PeerList, Registration, run_gossip};
use coffer_engine::{Engine, TaskLedger};
use coffer_meta::MetaStore;
use service::AppState;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "coffer-construction-node")]
#[command(about = "Coffer ingest/retrieval front door")]
#[command(version)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "coffer.toml")]
    config: String,

    /// Node identity
    #[arg(long, env = "NODE_ID")]
    node_id: String,

    /// Node role; must be "construction" for this daemon
    #[arg(long, env = "NODE_TYPE", default_value = "construction")]
    node_type: NodeType,

    /// Listen port (overrides the configured server address)
    #[arg(long, env = "CONSTRUCTION_PORT")]
    port: Option<u16>,

    /// Address advertised to discovery
    #[arg(long)]
    advertise_addr: Option<String>,

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

    if args.node_type != NodeType::Construction {
        anyhow::bail!("NODE_TYPE must be 'construction' for the construction node daemon");
    }

    let config = Config::load_or_default(&args.config)?;
    // Fatal on a missing or malformed key
    let key = config.encryption_key_bytes()?;
    let discovery_url = args
        .discovery_url
        .unwrap_or_else(|| config.discovery_url.clone());
    let listen = args
        .port
        .map(|p| format!("0.0.0.0:{p}"))
        .unwrap_or_else(|| config.server_address.clone());

    info!("Starting Coffer construction node");
    info!("Node id: {}", args.node_id);
    info!(
        "Erasure coding: k={} m={}",
        config.ec_data_shards, config.ec_parity_shards
    );
    info!("Metadata store: {}", config.database.display());
    info!("Discovery: {}", discovery_url);

    let meta = Arc::new(MetaStore::open(&config.database)?);
    let discovery = Arc::new(DiscoveryClient::new(
        discovery_url,
        Duration::from_secs(config.timing.discovery_timeout_secs),
    )?);
    let engine = Arc::new(Engine::new(
        meta,
        discovery.clone(),
        &key,
        config.erasure_params(),
        &config.timing,
    )?);

    let state = Arc::new(AppState {
        node_id: args.node_id.as_str().into(),
        engine,
        tasks: Arc::new(TaskLedger::new()),
        peers: Arc::new(PeerList::default()),
    });

    let advertise = args.advertise_addr.unwrap_or_else(|| {
        let port = listen.rsplit(':').next().unwrap_or("8081");
        format!("http://127.0.0.1:{port}")
    });
    info!("Advertising at: {}", advertise);

    let node_id = state.node_id.clone();
    tokio::spawn(discovery.run_heartbeat(
        move || Registration {
            node_id: node_id.clone(),
            node_type: NodeType::Construction,
            address: advertise.clone(),
            free_space: None,
        },
        Duration::from_secs(config.timing.heartbeat_secs),
    ));

    let gossip_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timing.discovery_timeout_secs))
        .build()?;
    tokio::spawn(run_gossip(
        state.peers.clone(),
        gossip_client,
        Duration::from_secs(config.timing.gossip_secs),
    ));

    let app = service::router(state);
    let addr: SocketAddr = listen.parse()?;
    info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            warn!("Shutting down...");
        })
        .await?;

    info!("Construction node shut down gracefully");
    Ok(())
}
