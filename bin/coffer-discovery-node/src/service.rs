//! Discovery HTTP service

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use coffer_common::NodeId;
use coffer_discovery::{NodeRegistry, Peer, PeerList, Registration};
use serde_json::json;
use std::sync::Arc;

/// Shared state of the discovery service
pub struct AppState {
    pub node_id: NodeId,
    pub registry: Arc<NodeRegistry>,
    pub peers: Arc<PeerList>,
}

async fn register(
    State(state): State<Arc<AppState>>,
    Json(reg): Json<Registration>,
) -> impl IntoResponse {
    state.registry.register(reg);
    Json(json!({ "status": "registered" }))
}

async fn nodes(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.registry.nodes())
}

async fn lookup(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let addresses: Vec<_> = state
        .registry
        .storage_nodes()
        .into_iter()
        .map(|n| json!({ "address": n.address }))
        .collect();
    Json(addresses)
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn info(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "node_id": state.node_id,
        "node_type": "discovery",
        "time": chrono::Utc::now().to_rfc3339(),
    }))
}

async fn gossip_register(
    State(state): State<Arc<AppState>>,
    Json(peer): Json<Peer>,
) -> impl IntoResponse {
    state.peers.register(peer);
    StatusCode::OK
}

async fn gossip_peers(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.peers.peers())
}

/// Build the discovery router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/nodes", get(nodes))
        .route("/lookup", get(lookup))
        .route("/health", get(health))
        .route("/info", get(info))
        .route("/gossip/register", post(gossip_register))
        .route("/gossip/peers", get(gossip_peers))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}
