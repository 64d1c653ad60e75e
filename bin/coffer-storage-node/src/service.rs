//! Storage node HTTP service
//!
//! Serves the shard protocol for this node's own namespace only; there is
//! no cross-node fan-out at the storage layer.

use axum::Router;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post, put};
use coffer_common::{Error, NodeId, ObjectId, VersionId};
use coffer_discovery::{Peer, PeerList};
use coffer_shardfs::ShardRepo;
use serde_json::json;
use std::sync::Arc;

/// Shared state of the storage node service
pub struct AppState {
    pub node_id: NodeId,
    pub repo: ShardRepo,
    pub peers: Arc<PeerList>,
}

/// Error wrapper mapping the common taxonomy onto HTTP responses
struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

fn parse_key(
    object_id: String,
    version_id: String,
) -> Result<(ObjectId, VersionId), ApiError> {
    let object_id = ObjectId::new(object_id).map_err(Error::from)?;
    let version_id = VersionId::new(version_id).map_err(Error::from)?;
    Ok((object_id, version_id))
}

async fn put_shard(
    State(state): State<Arc<AppState>>,
    Path((object_id, version_id, index)): Path<(String, String, usize)>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let (object_id, version_id) = parse_key(object_id, version_id)?;
    state.repo.put(&object_id, &version_id, index, &body).await?;
    Ok((StatusCode::CREATED, Json(json!({ "status": "success" }))))
}

async fn get_shard(
    State(state): State<Arc<AppState>>,
    Path((object_id, version_id, index)): Path<(String, String, usize)>,
) -> Result<impl IntoResponse, ApiError> {
    let (object_id, version_id) = parse_key(object_id, version_id)?;
    let data = state.repo.get(&object_id, &version_id, index).await?;
    Ok((
        StatusCode::OK,
        [(axum::http::header::CONTENT_TYPE, "application/octet-stream")],
        data,
    ))
}

async fn delete_shard(
    State(state): State<Arc<AppState>>,
    Path((object_id, version_id, index)): Path<(String, String, usize)>,
) -> Result<impl IntoResponse, ApiError> {
    let (object_id, version_id) = parse_key(object_id, version_id)?;
    state.repo.delete(&object_id, &version_id, index).await?;
    Ok(Json(json!({ "status": "deleted" })))
}

async fn verify_shard(
    State(state): State<Arc<AppState>>,
    Path((object_id, version_id, index)): Path<(String, String, usize)>,
) -> Result<impl IntoResponse, ApiError> {
    let (object_id, version_id) = parse_key(object_id, version_id)?;
    let exists = state.repo.exists(&object_id, &version_id, index).await?;
    Ok(Json(json!({ "exists": exists })))
}

async fn diskspace(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let available = state.repo.available_bytes()?;
    Ok(Json(json!({
        "available_bytes": available,
        "available_gb": available as f64 / (1024.0 * 1024.0 * 1024.0),
    })))
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn info(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "node_id": state.node_id,
        "node_type": "storage",
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

/// Build the storage node router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/shards/{object_id}/{version_id}/{shard_index}",
            put(put_shard).get(get_shard).delete(delete_shard),
        )
        .route(
            "/verify/{object_id}/{version_id}/{shard_index}",
            get(verify_shard),
        )
        .route("/diskspace", get(diskspace))
        .route("/health", get(health))
        .route("/info", get(info))
        .route("/gossip/register", post(gossip_register))
        .route("/gossip/peers", get(gossip_peers))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}
