//! Deletion and garbage collection
//!
//! Shard deletion is best-effort: a node that is down keeps orphan shards,
//! and the metadata row is removed regardless. Individual shard failures
//! are logged and ignored.

use crate::Engine;
use coffer_common::{BucketId, ObjectId, Result, VersionId, parse_shard_key};
use coffer_meta::VersionMetadata;
use futures::future::join_all;
use tracing::{info, warn};

impl Engine {
    /// Fan out best-effort shard deletes for one version's placement map
    async fn delete_shards(
        &self,
        object_id: &ObjectId,
        version_id: &VersionId,
        metadata: &VersionMetadata,
    ) {
        let deletes = metadata.shard_locations.iter().map(|(key, node)| {
            let index = parse_shard_key(key);
            async move {
                let Some(index) = index else {
                    warn!(%key, "placement entry has an invalid shard key");
                    return;
                };
                if let Err(e) = self
                    .transport()
                    .delete_shard(node, object_id, version_id, index)
                    .await
                {
                    warn!(shard = index, %node, error = %e, "shard delete failed");
                }
            }
        });
        join_all(deletes).await;
    }

    /// Delete one version: its shards, then its metadata row
    pub async fn delete_version(
        &self,
        bucket_id: &BucketId,
        object_id: &ObjectId,
        version_id: &VersionId,
    ) -> Result<()> {
        let metadata = self.meta().get_object_metadata(object_id, version_id)?;
        self.delete_shards(object_id, version_id, &metadata).await;
        self.meta().delete_version(bucket_id, object_id, version_id)?;
        info!(%bucket_id, %object_id, %version_id, "version deleted");
        Ok(())
    }

    /// Delete an object: every version's shards, then all its rows
    pub async fn delete_object(&self, bucket_id: &BucketId, object_id: &ObjectId) -> Result<()> {
        // Surfaces ObjectNotFound before any shard traffic
        let object = self.meta().get_object(object_id)?;
        if object.bucket_id != *bucket_id {
            return Err(coffer_common::Error::ObjectNotFound {
                bucket: bucket_id.to_string(),
                object: object_id.to_string(),
            });
        }

        for record in self.meta().list_version_records(object_id)? {
            self.delete_shards(object_id, &record.version_id, &record.metadata)
                .await;
        }
        self.meta().delete_object(bucket_id, object_id)?;
        info!(%bucket_id, %object_id, "object deleted");
        Ok(())
    }

    /// Delete a bucket: every object, then the bucket row
    pub async fn delete_bucket(&self, bucket_id: &BucketId) -> Result<()> {
        for object_id in self.meta().list_objects(bucket_id)? {
            self.delete_object(bucket_id, &object_id).await?;
        }
        self.meta().delete_bucket(bucket_id)?;
        info!(%bucket_id, "bucket deleted");
        Ok(())
    }
}
