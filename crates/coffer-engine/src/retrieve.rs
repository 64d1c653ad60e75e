//! The retrieval pipeline
//!
//! metadata lookup -> parallel shard fetch -> erasure reconstruction ->
//! open -> decompress. Individual shard failures are tolerated up to the
//! parity budget; retrieval mutates nothing, so retries have no observable
//! side effects.

use crate::Engine;
use coffer_common::{BucketId, Error, ObjectId, Result, VersionId, parse_shard_key};
use futures::future::join_all;
use tracing::{info, warn};

impl Engine {
    /// Reconstruct a stored version, returning its bytes and filename
    pub async fn retrieve_data(
        &self,
        _bucket_id: &BucketId,
        object_id: &ObjectId,
        version_id: &VersionId,
    ) -> Result<(Vec<u8>, String)> {
        let metadata = self.meta().get_object_metadata(object_id, version_id)?;

        let total = self.codec().total_shards();
        let required = self.codec().data_shards();
        let mut shards: Vec<Option<Vec<u8>>> = vec![None; total];

        let fetches = metadata.shard_locations.iter().map(|(key, node)| {
            let index = parse_shard_key(key);
            async move {
                let Some(index) = index else {
                    warn!(%key, "placement entry has an invalid shard key");
                    return None;
                };
                if index >= total {
                    warn!(index, total, "placement entry index out of range");
                    return None;
                }
                match self
                    .transport()
                    .get_shard(node, object_id, version_id, index)
                    .await
                {
                    Ok(bytes) => Some((index, bytes)),
                    Err(e) => {
                        warn!(shard = index, %node, error = %e, "shard fetch failed");
                        None
                    }
                }
            }
        });

        for fetched in join_all(fetches).await.into_iter().flatten() {
            let (index, bytes) = fetched;
            shards[index] = Some(bytes);
        }

        let present = shards.iter().filter(|s| s.is_some()).count();
        let missing = total - present;
        if missing > 0 {
            info!(%object_id, %version_id, missing, "retrieval proceeding with missing shards");
        }
        if present < required {
            return Err(Error::InsufficientShards { missing, required });
        }

        let sealed = self.codec().decode(&shards)?;
        let compressed = self.sealer().open(&sealed)?;
        let payload = coffer_codec::decompress(&compressed)?;

        let filename = self.meta().get_object(object_id)?.filename;

        info!(%object_id, %version_id, bytes = payload.len(), "object reconstructed");
        Ok((payload, filename))
    }

    /// Retrieve the latest version of an object
    pub async fn retrieve_latest(
        &self,
        bucket_id: &BucketId,
        object_id: &ObjectId,
    ) -> Result<(Vec<u8>, String, VersionId)> {
        let version_id = self
            .meta()
            .get_latest_version(object_id)?
            .ok_or_else(|| Error::VersionNotFound {
                object: object_id.to_string(),
                version: "latest".to_string(),
            })?;
        let (payload, filename) = self
            .retrieve_data(bucket_id, object_id, &version_id)
            .await?;
        Ok((payload, filename, version_id))
    }
}
