//! Construction node HTTP service
//!
//! The front door for ingest and retrieval. `/process` is asynchronous:
//! the caller gets the allocated version id immediately and the pipeline
//! runs in the background; progress surfaces through the task ledger and
//! the metadata listings.

use axum::Router;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{delete, get, post};
use coffer_common::{BucketId, Error, NodeId, ObjectId, VersionId};
use coffer_discovery::{Peer, PeerList};
use coffer_engine::{Engine, TaskLedger, TaskState};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::warn;

/// Shared state of the construction node service
pub struct AppState {
    pub node_id: NodeId,
    pub engine: Arc<Engine>,
    pub tasks: Arc<TaskLedger>,
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

fn required_header(headers: &HeaderMap, name: &str) -> Result<String, ApiError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
        .ok_or_else(|| ApiError(Error::bad_request(format!("missing required header {name}"))))
}

async fn process(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let object_id = ObjectId::new(required_header(&headers, "X-Object-ID")?)
        .map_err(Error::from)?;
    let bucket_id = BucketId::new(required_header(&headers, "X-Bucket-ID")?)
        .map_err(Error::from)?;
    let filename = required_header(&headers, "X-Filename")?;

    // The bucket must exist before we promise a version id
    if !state.engine.meta().bucket_exists(&bucket_id)? {
        return Err(ApiError(Error::BucketNotFound(bucket_id.to_string())));
    }

    let version_id = VersionId::generate();
    if !state.tasks.submit(&bucket_id, &object_id, &version_id) {
        return Err(ApiError(Error::bad_request(format!(
            "object {object_id} already has a write in flight"
        ))));
    }

    let worker_state = state.clone();
    let worker_version = version_id.clone();
    let worker_object = object_id.clone();
    tokio::spawn(async move {
        if !worker_state.tasks.claim(&worker_object) {
            return;
        }
        let result = worker_state
            .engine
            .store_data_with_version(
                &bucket_id,
                &worker_object,
                &worker_version,
                &filename,
                &body,
            )
            .await;
        match result {
            Ok(_) => worker_state.tasks.complete(&worker_object),
            Err(e) => {
                warn!(object_id = %worker_object, error = %e, "background ingest failed");
                worker_state.tasks.fail(&worker_object, e.to_string());
            }
        }
    });

    Ok(Json(json!({
        "object_id": object_id,
        "version_id": version_id,
        "status": "processing started",
    })))
}

async fn task_status(
    State(state): State<Arc<AppState>>,
    Path(object_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let object_id = ObjectId::new(object_id).map_err(Error::from)?;
    let status = state.tasks.status(&object_id).ok_or_else(|| {
        ApiError(Error::ObjectNotFound {
            bucket: String::new(),
            object: object_id.to_string(),
        })
    })?;
    let (stage, error) = match &status.state {
        TaskState::Pending => ("pending", None),
        TaskState::Running => ("running", None),
        TaskState::Completed => ("completed", None),
        TaskState::Failed(e) => ("failed", Some(e.clone())),
    };
    Ok(Json(json!({
        "object_id": status.object_id,
        "version_id": status.version_id,
        "status": stage,
        "error": error,
    })))
}

#[derive(Debug, Deserialize)]
struct ReconstructRequest {
    bucket_id: String,
    object_id: String,
    /// Absent means the object's latest version
    version_id: Option<String>,
}

async fn reconstruct(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ReconstructRequest>,
) -> Result<Response, ApiError> {
    let bucket_id = BucketId::new(req.bucket_id).map_err(Error::from)?;
    let object_id = ObjectId::new(req.object_id).map_err(Error::from)?;

    let (payload, filename, version_id) = match req.version_id {
        Some(version_id) => {
            let version_id = VersionId::new(version_id).map_err(Error::from)?;
            let (payload, filename) = state
                .engine
                .retrieve_data(&bucket_id, &object_id, &version_id)
                .await?;
            (payload, filename, version_id)
        }
        None => {
            state
                .engine
                .retrieve_latest(&bucket_id, &object_id)
                .await?
        }
    };

    Ok((
        StatusCode::OK,
        [
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={filename}"),
            ),
            (
                header::CONTENT_TYPE,
                "application/octet-stream".to_string(),
            ),
            (
                header::HeaderName::from_static("x-version-id"),
                version_id.to_string(),
            ),
        ],
        payload,
    )
        .into_response())
}

#[derive(Debug, Deserialize)]
struct VersionsQuery {
    bucket_id: String,
    object_id: String,
}

async fn list_versions(
    State(state): State<Arc<AppState>>,
    Query(query): Query<VersionsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let bucket_id = BucketId::new(query.bucket_id).map_err(Error::from)?;
    let object_id = ObjectId::new(query.object_id).map_err(Error::from)?;
    if !state.engine.meta().bucket_exists(&bucket_id)? {
        return Err(ApiError(Error::BucketNotFound(bucket_id.to_string())));
    }

    let versions: Vec<_> = state
        .engine
        .list_version_records(&object_id)?
        .into_iter()
        .filter(|r| r.bucket_id == bucket_id)
        .map(|r| {
            json!({
                "version_id": r.version_id,
                "created_at": r.metadata.creation_date,
                "shard_locations": r.metadata.shard_locations,
            })
        })
        .collect();
    Ok(Json(versions))
}

#[derive(Debug, Deserialize)]
struct CreateBucketRequest {
    bucket_id: String,
    owner: String,
}

async fn create_bucket(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateBucketRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let bucket_id = BucketId::new(req.bucket_id).map_err(Error::from)?;
    let bucket = state.engine.meta().create_bucket(&bucket_id, &req.owner)?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "bucket_id": bucket.bucket_id,
            "owner": bucket.owner,
            "created_at": bucket.created_at,
        })),
    ))
}

#[derive(Debug, Deserialize)]
struct OwnerQuery {
    owner: String,
}

async fn list_buckets(
    State(state): State<Arc<AppState>>,
    Query(query): Query<OwnerQuery>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.engine.list_buckets(&query.owner)?))
}

async fn list_objects(
    State(state): State<Arc<AppState>>,
    Path(bucket_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let bucket_id = BucketId::new(bucket_id).map_err(Error::from)?;
    Ok(Json(state.engine.list_objects(&bucket_id)?))
}

async fn delete_bucket(
    State(state): State<Arc<AppState>>,
    Path(bucket_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let bucket_id = BucketId::new(bucket_id).map_err(Error::from)?;
    state.engine.delete_bucket(&bucket_id).await?;
    Ok(Json(json!({ "status": "deleted" })))
}

async fn delete_object(
    State(state): State<Arc<AppState>>,
    Path((bucket_id, object_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let bucket_id = BucketId::new(bucket_id).map_err(Error::from)?;
    let object_id = ObjectId::new(object_id).map_err(Error::from)?;
    state.engine.delete_object(&bucket_id, &object_id).await?;
    Ok(Json(json!({ "status": "deleted" })))
}

async fn delete_version(
    State(state): State<Arc<AppState>>,
    Path((bucket_id, object_id, version_id)): Path<(String, String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let bucket_id = BucketId::new(bucket_id).map_err(Error::from)?;
    let object_id = ObjectId::new(object_id).map_err(Error::from)?;
    let version_id = VersionId::new(version_id).map_err(Error::from)?;
    state
        .engine
        .delete_version(&bucket_id, &object_id, &version_id)
        .await?;
    Ok(Json(json!({ "status": "deleted" })))
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn info(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "node_id": state.node_id,
        "node_type": "construction",
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

/// Build the construction node router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/process", post(process))
        .route("/tasks/{object_id}", get(task_status))
        .route("/reconstruct", post(reconstruct))
        .route("/versions", get(list_versions))
        .route("/buckets", post(create_bucket).get(list_buckets))
        .route("/buckets/{bucket_id}", delete(delete_bucket))
        .route("/buckets/{bucket_id}/objects", get(list_objects))
        .route(
            "/buckets/{bucket_id}/objects/{object_id}",
            delete(delete_object),
        )
        .route(
            "/buckets/{bucket_id}/objects/{object_id}/versions/{version_id}",
            delete(delete_version),
        )
        .route("/health", get(health))
        .route("/info", get(info))
        .route("/gossip/register", post(gossip_register))
        .route("/gossip/peers", get(gossip_peers))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}
