//! The ingest pipeline
//!
//! compress -> seal -> erasure-encode -> Merkle tree -> node lookup ->
//! parallel shard upload -> metadata commit. The commit is the
//! linearization point; everything before it is invisible to readers, and
//! uploads stranded by a failed commit are orphans for GC to reclaim.

use crate::Engine;
use bytes::Bytes;
use chrono::Utc;
use coffer_common::{BucketId, Error, ObjectId, Result, VersionId, shard_key};
use coffer_meta::VersionMetadata;
use coffer_proof::MerkleTree;
use futures::future::try_join_all;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

/// Result of a successful store
#[derive(Clone, Debug)]
pub struct StoreReceipt {
    pub version_id: VersionId,
    /// `shard_<i>` -> storage node base address
    pub shard_locations: BTreeMap<String, String>,
    /// Hex-encoded inclusion proof per shard, index order
    pub proofs: Vec<String>,
}

fn file_format(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_string()
}

impl Engine {
    /// Store a payload as a fresh version of `(bucket, object)`
    pub async fn store_data(
        &self,
        bucket_id: &BucketId,
        object_id: &ObjectId,
        filename: &str,
        payload: &[u8],
    ) -> Result<StoreReceipt> {
        let version_id = VersionId::generate();
        self.store_data_with_version(bucket_id, object_id, &version_id, filename, payload)
            .await
    }

    /// Store a payload under a caller-chosen version id
    ///
    /// Used by the asynchronous front door, which hands the version id to
    /// the caller before processing completes.
    pub async fn store_data_with_version(
        &self,
        bucket_id: &BucketId,
        object_id: &ObjectId,
        version_id: &VersionId,
        filename: &str,
        payload: &[u8],
    ) -> Result<StoreReceipt> {
        if !self.meta().bucket_exists(bucket_id)? {
            return Err(Error::BucketNotFound(bucket_id.to_string()));
        }

        let compressed = coffer_codec::compress(payload)?;
        let sealed = self.sealer().seal(&compressed)?;
        let shards = self.codec().encode(&sealed)?;
        let tree = MerkleTree::build(&shards)?;

        let total = self.codec().total_shards();
        let targets = self.select_storage_nodes(total).await?;

        // One upload task per shard; any shard exhausting its retry budget
        // fails the whole ingest (all-or-nothing per version).
        let uploads = shards.iter().enumerate().map(|(index, shard)| {
            let node = targets[index].clone();
            let data = Bytes::from(shard.clone());
            async move {
                self.transport()
                    .put_shard(&node, object_id, version_id, index, data)
                    .await
                    .map_err(|e| Error::UploadFailed {
                        shard: index,
                        reason: e.to_string(),
                    })
            }
        });
        try_join_all(uploads).await?;

        let mut shard_locations = BTreeMap::new();
        let mut proof_map = BTreeMap::new();
        let mut proofs = Vec::with_capacity(total);
        for index in 0..total {
            let proof = tree.proof(index)?.to_hex();
            shard_locations.insert(shard_key(index), targets[index].clone());
            proof_map.insert(shard_key(index), proof.clone());
            proofs.push(proof);
        }

        let metadata = VersionMetadata {
            bucket_id: bucket_id.clone(),
            object_id: object_id.clone(),
            version_id: version_id.clone(),
            filename: filename.to_string(),
            filesize_bytes: payload.len() as u64,
            format: file_format(filename),
            creation_date: Utc::now().to_rfc3339(),
            shard_locations: shard_locations.clone(),
            proofs: proof_map,
        };

        let root_version = self
            .meta()
            .get_root_version(object_id)?
            .unwrap_or_else(|| version_id.clone());

        self.meta().add_object(bucket_id, object_id, filename)?;
        self.meta()
            .add_version(
                bucket_id,
                object_id,
                version_id,
                &root_version,
                &metadata,
                Some(&sealed),
            )
            .map_err(|e| match e {
                Error::VersionExists(_) | Error::BucketNotFound(_) => e,
                other => Error::MetadataCommitFailed(other.to_string()),
            })?;

        info!(
            %bucket_id,
            %object_id,
            %version_id,
            shards = total,
            bytes = payload.len(),
            "object stored across storage nodes"
        );

        Ok(StoreReceipt {
            version_id: version_id.clone(),
            shard_locations,
            proofs,
        })
    }

    /// Pick `needed` distinct live storage nodes, in lookup order
    async fn select_storage_nodes(&self, needed: usize) -> Result<Vec<String>> {
        let nodes = self.discovery().lookup_storage_nodes().await?;
        let mut distinct = Vec::with_capacity(nodes.len());
        for node in nodes {
            if !distinct.contains(&node) {
                distinct.push(node);
            }
        }
        if distinct.len() < needed {
            return Err(Error::InsufficientNodes {
                available: distinct.len(),
                required: needed,
            });
        }
        distinct.truncate(needed);
        Ok(distinct)
    }
}
