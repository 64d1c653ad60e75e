//! End-to-end pipeline tests against an in-process cluster
//!
//! Spins real storage nodes (axum over `ShardRepo`) and a real discovery
//! service on ephemeral ports, then drives the engine through them.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, put};
use axum::Router;
use coffer_common::{Error, ErasureParams, TimingConfig, VersionId};
use coffer_discovery::{DiscoveryClient, NodeEntry, NodeRegistry};
use coffer_engine::Engine;
use coffer_meta::MetaStore;
use coffer_shardfs::ShardRepo;
use std::sync::Arc;
use std::time::Duration;

async fn put_shard(
    State(repo): State<Arc<ShardRepo>>,
    Path((object_id, version_id, index)): Path<(String, String, usize)>,
    body: Bytes,
) -> StatusCode {
    match repo
        .put(&object_id.into(), &version_id.into(), index, &body)
        .await
    {
        Ok(()) => StatusCode::CREATED,
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn get_shard(
    State(repo): State<Arc<ShardRepo>>,
    Path((object_id, version_id, index)): Path<(String, String, usize)>,
) -> Response {
    match repo
        .get(&object_id.into(), &version_id.into(), index)
        .await
    {
        Ok(bytes) => (StatusCode::OK, bytes).into_response(),
        Err(e) if e.is_not_found() => StatusCode::NOT_FOUND.into_response(),
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

async fn delete_shard(
    State(repo): State<Arc<ShardRepo>>,
    Path((object_id, version_id, index)): Path<(String, String, usize)>,
) -> StatusCode {
    match repo
        .delete(&object_id.into(), &version_id.into(), index)
        .await
    {
        Ok(()) => StatusCode::OK,
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

struct StorageNode {
    address: String,
    name: String,
    dir: tempfile::TempDir,
}

impl StorageNode {
    fn shard_file(&self, object: &str, version: &VersionId, index: usize) -> std::path::PathBuf {
        self.dir
            .path()
            .join(&self.name)
            .join(format!("{object}-v({version})_shard_{index}"))
    }
}

async fn spawn_storage_node(name: &str) -> StorageNode {
    let dir = tempfile::tempdir().unwrap();
    let repo = Arc::new(ShardRepo::new(dir.path(), name));
    let app = Router::new()
        .route(
            "/shards/{object_id}/{version_id}/{index}",
            put(put_shard).get(get_shard).delete(delete_shard),
        )
        .with_state(repo);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    StorageNode {
        address: format!("http://{addr}"),
        name: name.to_string(),
        dir,
    }
}

async fn lookup(State(registry): State<Arc<NodeRegistry>>) -> Json<Vec<serde_json::Value>> {
    Json(
        registry
            .storage_nodes()
            .into_iter()
            .map(|n| serde_json::json!({ "address": n.address }))
            .collect(),
    )
}

async fn spawn_discovery(registry: Arc<NodeRegistry>) -> String {
    let app = Router::new()
        .route("/lookup", get(lookup))
        .with_state(registry);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

struct Cluster {
    engine: Engine,
    meta: Arc<MetaStore>,
    discovery_url: String,
    nodes: Vec<StorageNode>,
    _meta_dir: tempfile::TempDir,
}

const KEY: [u8; 32] = [42u8; 32];

fn fast_timing() -> TimingConfig {
    TimingConfig {
        shard_timeout_secs: 5,
        shard_attempts: 1,
        retry_backoff_secs: 0,
        ..TimingConfig::default()
    }
}

async fn cluster(node_count: usize) -> Cluster {
    let mut nodes = Vec::new();
    let registry = Arc::new(NodeRegistry::new());
    for i in 0..node_count {
        let node = spawn_storage_node(&format!("node-{i}")).await;
        registry.insert(NodeEntry {
            node_id: format!("node-{i}").as_str().into(),
            node_type: coffer_common::NodeType::Storage,
            address: node.address.clone(),
            last_seen: i64::MAX / 2,
            free_bytes: None,
        });
        nodes.push(node);
    }
    let discovery_url = spawn_discovery(registry).await;

    let meta_dir = tempfile::tempdir().unwrap();
    let meta = Arc::new(MetaStore::open(meta_dir.path().join("meta.redb")).unwrap());
    let discovery = Arc::new(
        DiscoveryClient::new(discovery_url.clone(), Duration::from_secs(5)).unwrap(),
    );
    let engine = Engine::new(
        meta.clone(),
        discovery,
        &KEY,
        ErasureParams::EC_4_2,
        &fast_timing(),
    )
    .unwrap();

    Cluster {
        engine,
        meta,
        discovery_url,
        nodes,
        _meta_dir: meta_dir,
    }
}

#[tokio::test]
async fn test_happy_write_and_read() {
    let cluster = cluster(6).await;
    cluster.meta.create_bucket(&"b1".into(), "alice").unwrap();

    let receipt = cluster
        .engine
        .store_data(&"b1".into(), &"obj-A".into(), "a.txt", b"hello")
        .await
        .unwrap();

    assert_eq!(receipt.shard_locations.len(), 6);
    assert_eq!(receipt.proofs.len(), 6);
    let distinct: std::collections::HashSet<_> = receipt.shard_locations.values().collect();
    assert_eq!(distinct.len(), 6);

    let (payload, filename) = cluster
        .engine
        .retrieve_data(&"b1".into(), &"obj-A".into(), &receipt.version_id)
        .await
        .unwrap();
    assert_eq!(payload, b"hello");
    assert_eq!(filename, "a.txt");
}

#[tokio::test]
async fn test_erasure_tolerance_boundary() {
    let cluster = cluster(6).await;
    cluster.meta.create_bucket(&"b1".into(), "alice").unwrap();
    let receipt = cluster
        .engine
        .store_data(&"b1".into(), &"obj-A".into(), "a.txt", b"hello")
        .await
        .unwrap();

    // Losing any m = 2 shards is tolerated
    for node in &cluster.nodes[..2] {
        for index in 0..6 {
            let path = node.shard_file("obj-A", &receipt.version_id, index);
            if path.exists() {
                std::fs::remove_file(path).unwrap();
            }
        }
    }
    let (payload, _) = cluster
        .engine
        .retrieve_data(&"b1".into(), &"obj-A".into(), &receipt.version_id)
        .await
        .unwrap();
    assert_eq!(payload, b"hello");

    // Losing m + 1 is not
    for index in 0..6 {
        let path = cluster.nodes[2].shard_file("obj-A", &receipt.version_id, index);
        if path.exists() {
            std::fs::remove_file(path).unwrap();
        }
    }
    let err = cluster
        .engine
        .retrieve_data(&"b1".into(), &"obj-A".into(), &receipt.version_id)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::InsufficientShards {
            missing: 3,
            required: 4
        }
    ));
}

#[tokio::test]
async fn test_versioning_and_latest() {
    let cluster = cluster(6).await;
    cluster.meta.create_bucket(&"b1".into(), "alice").unwrap();

    let v1 = cluster
        .engine
        .store_data(&"b1".into(), &"obj-A".into(), "a.txt", b"v1-bytes")
        .await
        .unwrap()
        .version_id;
    let v2 = cluster
        .engine
        .store_data(&"b1".into(), &"obj-A".into(), "a.txt", b"v2-bytes")
        .await
        .unwrap()
        .version_id;
    assert_ne!(v1, v2);

    let versions = cluster.engine.list_versions(&"obj-A".into()).unwrap();
    assert_eq!(versions, vec![v1.clone(), v2.clone()]);
    assert_eq!(
        cluster.meta.get_latest_version(&"obj-A".into()).unwrap(),
        Some(v2.clone())
    );

    let (bytes, _) = cluster
        .engine
        .retrieve_data(&"b1".into(), &"obj-A".into(), &v1)
        .await
        .unwrap();
    assert_eq!(bytes, b"v1-bytes");
    let (bytes, _) = cluster
        .engine
        .retrieve_data(&"b1".into(), &"obj-A".into(), &v2)
        .await
        .unwrap();
    assert_eq!(bytes, b"v2-bytes");
}

#[tokio::test]
async fn test_delete_bucket_cascades() {
    let cluster = cluster(6).await;
    cluster.meta.create_bucket(&"b1".into(), "alice").unwrap();
    let receipt = cluster
        .engine
        .store_data(&"b1".into(), &"obj-A".into(), "a.txt", b"doomed")
        .await
        .unwrap();

    cluster.engine.delete_bucket(&"b1".into()).await.unwrap();

    let err = cluster
        .engine
        .retrieve_data(&"b1".into(), &"obj-A".into(), &receipt.version_id)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::VersionNotFound { .. }));

    // Every reachable node dropped its shard
    for node in &cluster.nodes {
        for index in 0..6 {
            assert!(!node.shard_file("obj-A", &receipt.version_id, index).exists());
        }
    }
}

#[tokio::test]
async fn test_wrong_key_is_integrity_failure() {
    let cluster = cluster(6).await;
    cluster.meta.create_bucket(&"b1".into(), "alice").unwrap();
    let receipt = cluster
        .engine
        .store_data(&"b1".into(), &"obj-A".into(), "a.txt", b"secret")
        .await
        .unwrap();

    let other_key = [7u8; 32];
    let discovery = Arc::new(
        DiscoveryClient::new(cluster.discovery_url.clone(), Duration::from_secs(5)).unwrap(),
    );
    let swapped = Engine::new(
        cluster.meta.clone(),
        discovery,
        &other_key,
        ErasureParams::EC_4_2,
        &fast_timing(),
    )
    .unwrap();

    let err = swapped
        .retrieve_data(&"b1".into(), &"obj-A".into(), &receipt.version_id)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::IntegrityFailure));
}

#[tokio::test]
async fn test_insufficient_nodes() {
    // k + m - 1 live nodes cannot host a write
    let cluster = cluster(5).await;
    cluster.meta.create_bucket(&"b1".into(), "alice").unwrap();
    let err = cluster
        .engine
        .store_data(&"b1".into(), &"obj-A".into(), "a.txt", b"hello")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::InsufficientNodes {
            available: 5,
            required: 6
        }
    ));
}

#[tokio::test]
async fn test_store_into_missing_bucket() {
    let cluster = cluster(6).await;
    let err = cluster
        .engine
        .store_data(&"nope".into(), &"obj-A".into(), "a.txt", b"hello")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::BucketNotFound(_)));
}

#[tokio::test]
async fn test_empty_payload_round_trips() {
    let cluster = cluster(6).await;
    cluster.meta.create_bucket(&"b1".into(), "alice").unwrap();
    let receipt = cluster
        .engine
        .store_data(&"b1".into(), &"empty".into(), "empty.bin", b"")
        .await
        .unwrap();
    let (payload, filename) = cluster
        .engine
        .retrieve_data(&"b1".into(), &"empty".into(), &receipt.version_id)
        .await
        .unwrap();
    assert!(payload.is_empty());
    assert_eq!(filename, "empty.bin");
}

#[tokio::test]
async fn test_delete_version_recomputes_latest() {
    let cluster = cluster(6).await;
    cluster.meta.create_bucket(&"b1".into(), "alice").unwrap();
    let v1 = cluster
        .engine
        .store_data(&"b1".into(), &"obj-A".into(), "a.txt", b"one")
        .await
        .unwrap()
        .version_id;
    let v2 = cluster
        .engine
        .store_data(&"b1".into(), &"obj-A".into(), "a.txt", b"two")
        .await
        .unwrap()
        .version_id;

    cluster
        .engine
        .delete_version(&"b1".into(), &"obj-A".into(), &v2)
        .await
        .unwrap();
    assert_eq!(
        cluster.meta.get_latest_version(&"obj-A".into()).unwrap(),
        Some(v1.clone())
    );

    // The surviving version still reads back
    let (bytes, _) = cluster
        .engine
        .retrieve_data(&"b1".into(), &"obj-A".into(), &v1)
        .await
        .unwrap();
    assert_eq!(bytes, b"one");
}
