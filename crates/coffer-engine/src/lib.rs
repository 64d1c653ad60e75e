//! The Coffer storage engine
//!
//! Wires the codec, erasure coder, proof builder, metadata store, and
//! discovery fabric into the three pipelines: ingest (store), retrieval
//! (reconstruct), and deletion. Constructed once at startup and shared
//! behind an `Arc`; nothing here is a global.

pub mod delete;
pub mod ingest;
pub mod retrieve;
pub mod tasks;
pub mod transport;

pub use ingest::StoreReceipt;
pub use tasks::{TaskLedger, TaskState, TaskStatus};
pub use transport::{RETRY_BACKOFF, SHARD_ATTEMPTS, SHARD_TIMEOUT, ShardTransport};

use coffer_codec::Sealer;
use coffer_common::{BucketId, ErasureParams, ObjectId, Result, TimingConfig, VersionId};
use coffer_discovery::DiscoveryClient;
use coffer_erasure::ErasureCodec;
use coffer_meta::{MetaStore, VersionRecord};
use std::sync::Arc;
use std::time::Duration;

/// The storage engine shared by the construction node's handlers
pub struct Engine {
    meta: Arc<MetaStore>,
    discovery: Arc<DiscoveryClient>,
    transport: ShardTransport,
    sealer: Sealer,
    codec: ErasureCodec,
    params: ErasureParams,
}

impl Engine {
    /// Build an engine from its parts
    ///
    /// `key` is the raw AEAD key (already hex-decoded and length-checked by
    /// config loading); an invalid length is still rejected here.
    pub fn new(
        meta: Arc<MetaStore>,
        discovery: Arc<DiscoveryClient>,
        key: &[u8],
        params: ErasureParams,
        timing: &TimingConfig,
    ) -> Result<Self> {
        Ok(Self {
            meta,
            discovery,
            transport: ShardTransport::new(
                Duration::from_secs(timing.shard_timeout_secs),
                timing.shard_attempts,
                Duration::from_secs(timing.retry_backoff_secs),
            )?,
            sealer: Sealer::new(key)?,
            codec: ErasureCodec::new(params)?,
            params,
        })
    }

    /// Erasure parameters in effect
    #[must_use]
    pub fn params(&self) -> ErasureParams {
        self.params
    }

    /// The metadata store
    #[must_use]
    pub fn meta(&self) -> &MetaStore {
        &self.meta
    }

    pub(crate) fn discovery(&self) -> &DiscoveryClient {
        &self.discovery
    }

    pub(crate) fn transport(&self) -> &ShardTransport {
        &self.transport
    }

    pub(crate) fn sealer(&self) -> &Sealer {
        &self.sealer
    }

    pub(crate) fn codec(&self) -> &ErasureCodec {
        &self.codec
    }

    // ---- listing pass-throughs ----

    /// Bucket ids owned by `owner`
    pub fn list_buckets(&self, owner: &str) -> Result<Vec<BucketId>> {
        self.meta.list_buckets(owner)
    }

    /// Object ids in a bucket
    pub fn list_objects(&self, bucket_id: &BucketId) -> Result<Vec<ObjectId>> {
        self.meta.list_objects(bucket_id)
    }

    /// Version ids of an object, in insertion order
    pub fn list_versions(&self, object_id: &ObjectId) -> Result<Vec<VersionId>> {
        self.meta.list_object_versions(object_id)
    }

    /// Full version rows of an object, in insertion order
    pub fn list_version_records(&self, object_id: &ObjectId) -> Result<Vec<VersionRecord>> {
        self.meta.list_version_records(object_id)
    }
}
