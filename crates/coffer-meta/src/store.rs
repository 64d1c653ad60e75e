//! The metadata store
//!
//! All persistent records live here: buckets, objects, versions (with their
//! placement maps and proofs as a JSON document per row), and the optional
//! sealed-payload cache. Every public operation is a single redb
//! transaction, so each is atomic with respect to concurrent callers; the
//! ingest pipeline relies on `add_version` being the linearization point of
//! a write.

use crate::tables::{BUCKETS, COUNTERS, OBJECTS, VERSION_BLOBS, VERSION_SEQ, VERSIONS};
use crate::types::{Bucket, ObjectRecord, VersionMetadata, VersionRecord};
use coffer_common::{BucketId, Error, ObjectId, Result, VersionId};
use redb::{Database, ReadableTable};
use std::fmt::Display;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

fn db_err(e: impl Display) -> Error {
    Error::metadata(e.to_string())
}

fn ser_err(e: impl Display) -> Error {
    Error::Serialization(e.to_string())
}

fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

fn decode_bucket(raw: &[u8]) -> Result<Bucket> {
    bincode::deserialize(raw).map_err(ser_err)
}

fn decode_object(raw: &[u8]) -> Result<ObjectRecord> {
    bincode::deserialize(raw).map_err(ser_err)
}

fn decode_version(raw: &[u8]) -> Result<VersionRecord> {
    serde_json::from_slice(raw).map_err(ser_err)
}

/// Durable metadata store backed by redb
pub struct MetaStore {
    db: Database,
}

impl MetaStore {
    /// Open (or create) the store at the given path
    ///
    /// All tables are created up front so later read transactions never
    /// observe a missing table.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = Database::create(path.as_ref()).map_err(db_err)?;
        let txn = db.begin_write().map_err(db_err)?;
        {
            txn.open_table(BUCKETS).map_err(db_err)?;
            txn.open_table(OBJECTS).map_err(db_err)?;
            txn.open_table(VERSIONS).map_err(db_err)?;
            txn.open_table(VERSION_BLOBS).map_err(db_err)?;
            txn.open_table(COUNTERS).map_err(db_err)?;
        }
        txn.commit().map_err(db_err)?;
        debug!(path = %path.as_ref().display(), "metadata store opened");
        Ok(Self { db })
    }

    // ---- buckets ----

    /// Insert a new bucket row
    pub fn create_bucket(&self, bucket_id: &BucketId, owner: &str) -> Result<Bucket> {
        let txn = self.db.begin_write().map_err(db_err)?;
        let bucket = {
            let mut buckets = txn.open_table(BUCKETS).map_err(db_err)?;
            if buckets.get(bucket_id.as_str()).map_err(db_err)?.is_some() {
                return Err(Error::BucketAlreadyExists(bucket_id.to_string()));
            }
            let bucket = Bucket {
                bucket_id: bucket_id.clone(),
                owner: owner.to_string(),
                created_at: now(),
            };
            let raw = bincode::serialize(&bucket).map_err(ser_err)?;
            buckets
                .insert(bucket_id.as_str(), raw.as_slice())
                .map_err(db_err)?;
            bucket
        };
        txn.commit().map_err(db_err)?;
        Ok(bucket)
    }

    /// Fetch a bucket row
    pub fn get_bucket(&self, bucket_id: &BucketId) -> Result<Bucket> {
        let txn = self.db.begin_read().map_err(db_err)?;
        let buckets = txn.open_table(BUCKETS).map_err(db_err)?;
        let guard = buckets
            .get(bucket_id.as_str())
            .map_err(db_err)?
            .ok_or_else(|| Error::BucketNotFound(bucket_id.to_string()))?;
        decode_bucket(guard.value())
    }

    /// True if the bucket exists
    pub fn bucket_exists(&self, bucket_id: &BucketId) -> Result<bool> {
        match self.get_bucket(bucket_id) {
            Ok(_) => Ok(true),
            Err(Error::BucketNotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// List bucket ids owned by `owner`, in key order
    pub fn list_buckets(&self, owner: &str) -> Result<Vec<BucketId>> {
        let txn = self.db.begin_read().map_err(db_err)?;
        let buckets = txn.open_table(BUCKETS).map_err(db_err)?;
        let mut out = Vec::new();
        for entry in buckets.iter().map_err(db_err)? {
            let (_, v) = entry.map_err(db_err)?;
            let bucket = decode_bucket(v.value())?;
            if bucket.owner == owner {
                out.push(bucket.bucket_id);
            }
        }
        Ok(out)
    }

    /// Remove an empty bucket row
    ///
    /// Deletion/GC empties the bucket first; a bucket that still owns
    /// objects is rejected.
    pub fn delete_bucket(&self, bucket_id: &BucketId) -> Result<()> {
        let txn = self.db.begin_write().map_err(db_err)?;
        {
            let objects = txn.open_table(OBJECTS).map_err(db_err)?;
            for entry in objects.iter().map_err(db_err)? {
                let (_, v) = entry.map_err(db_err)?;
                if decode_object(v.value())?.bucket_id == *bucket_id {
                    return Err(Error::bad_request(format!(
                        "bucket {bucket_id} is not empty"
                    )));
                }
            }
            let mut buckets = txn.open_table(BUCKETS).map_err(db_err)?;
            if buckets
                .remove(bucket_id.as_str())
                .map_err(db_err)?
                .is_none()
            {
                return Err(Error::BucketNotFound(bucket_id.to_string()));
            }
        }
        txn.commit().map_err(db_err)?;
        Ok(())
    }

    // ---- objects ----

    /// Insert an object row if it does not already exist (idempotent)
    pub fn add_object(
        &self,
        bucket_id: &BucketId,
        object_id: &ObjectId,
        filename: &str,
    ) -> Result<()> {
        let txn = self.db.begin_write().map_err(db_err)?;
        {
            let buckets = txn.open_table(BUCKETS).map_err(db_err)?;
            if buckets.get(bucket_id.as_str()).map_err(db_err)?.is_none() {
                return Err(Error::BucketNotFound(bucket_id.to_string()));
            }
            let mut objects = txn.open_table(OBJECTS).map_err(db_err)?;
            if objects.get(object_id.as_str()).map_err(db_err)?.is_some() {
                return Ok(());
            }
            let record = ObjectRecord {
                object_id: object_id.clone(),
                bucket_id: bucket_id.clone(),
                filename: filename.to_string(),
                latest_version: None,
            };
            let raw = bincode::serialize(&record).map_err(ser_err)?;
            objects
                .insert(object_id.as_str(), raw.as_slice())
                .map_err(db_err)?;
        }
        txn.commit().map_err(db_err)?;
        Ok(())
    }

    /// Fetch an object row
    pub fn get_object(&self, object_id: &ObjectId) -> Result<ObjectRecord> {
        let txn = self.db.begin_read().map_err(db_err)?;
        let objects = txn.open_table(OBJECTS).map_err(db_err)?;
        let guard = objects
            .get(object_id.as_str())
            .map_err(db_err)?
            .ok_or_else(|| Error::ObjectNotFound {
                bucket: String::new(),
                object: object_id.to_string(),
            })?;
        decode_object(guard.value())
    }

    /// List object ids in a bucket, in key order
    pub fn list_objects(&self, bucket_id: &BucketId) -> Result<Vec<ObjectId>> {
        let txn = self.db.begin_read().map_err(db_err)?;
        {
            let buckets = txn.open_table(BUCKETS).map_err(db_err)?;
            if buckets.get(bucket_id.as_str()).map_err(db_err)?.is_none() {
                return Err(Error::BucketNotFound(bucket_id.to_string()));
            }
        }
        let objects = txn.open_table(OBJECTS).map_err(db_err)?;
        let mut out = Vec::new();
        for entry in objects.iter().map_err(db_err)? {
            let (_, v) = entry.map_err(db_err)?;
            let record = decode_object(v.value())?;
            if record.bucket_id == *bucket_id {
                out.push(record.object_id);
            }
        }
        Ok(out)
    }

    // ---- versions ----

    /// Insert a version row and move the object's latest-version pointer
    ///
    /// This is the linearization point of a write: before this commits the
    /// version does not exist for readers. The optional ciphertext blob is
    /// persisted alongside the row and removed with it.
    pub fn add_version(
        &self,
        bucket_id: &BucketId,
        object_id: &ObjectId,
        version_id: &VersionId,
        root_version: &VersionId,
        metadata: &VersionMetadata,
        ciphertext: Option<&[u8]>,
    ) -> Result<VersionRecord> {
        let txn = self.db.begin_write().map_err(db_err)?;
        let record = {
            let buckets = txn.open_table(BUCKETS).map_err(db_err)?;
            if buckets.get(bucket_id.as_str()).map_err(db_err)?.is_none() {
                return Err(Error::BucketNotFound(bucket_id.to_string()));
            }

            let mut versions = txn.open_table(VERSIONS).map_err(db_err)?;
            let key = (object_id.as_str(), version_id.as_str());
            if versions.get(key).map_err(db_err)?.is_some() {
                return Err(Error::VersionExists(version_id.to_string()));
            }

            let mut objects = txn.open_table(OBJECTS).map_err(db_err)?;
            let mut object = match objects.get(object_id.as_str()).map_err(db_err)? {
                Some(guard) => decode_object(guard.value())?,
                None => ObjectRecord {
                    object_id: object_id.clone(),
                    bucket_id: bucket_id.clone(),
                    filename: metadata.filename.clone(),
                    latest_version: None,
                },
            };

            let mut counters = txn.open_table(COUNTERS).map_err(db_err)?;
            let seq = counters
                .get(VERSION_SEQ)
                .map_err(db_err)?
                .map(|g| g.value())
                .unwrap_or(0)
                + 1;
            counters.insert(VERSION_SEQ, seq).map_err(db_err)?;

            let record = VersionRecord {
                version_id: version_id.clone(),
                object_id: object_id.clone(),
                bucket_id: bucket_id.clone(),
                root_version: root_version.clone(),
                seq,
                created_at: now(),
                metadata: metadata.clone(),
            };
            let raw = serde_json::to_vec(&record).map_err(ser_err)?;
            versions.insert(key, raw.as_slice()).map_err(db_err)?;

            if let Some(blob) = ciphertext {
                let mut blobs = txn.open_table(VERSION_BLOBS).map_err(db_err)?;
                blobs.insert(key, blob).map_err(db_err)?;
            }

            object.latest_version = Some(version_id.clone());
            let raw = bincode::serialize(&object).map_err(ser_err)?;
            objects
                .insert(object_id.as_str(), raw.as_slice())
                .map_err(db_err)?;
            record
        };
        txn.commit().map_err(db_err)?;
        debug!(%object_id, %version_id, seq = record.seq, "version committed");
        Ok(record)
    }

    /// Fetch one version row
    pub fn get_version(&self, object_id: &ObjectId, version_id: &VersionId) -> Result<VersionRecord> {
        let txn = self.db.begin_read().map_err(db_err)?;
        let versions = txn.open_table(VERSIONS).map_err(db_err)?;
        let guard = versions
            .get((object_id.as_str(), version_id.as_str()))
            .map_err(db_err)?
            .ok_or_else(|| Error::VersionNotFound {
                object: object_id.to_string(),
                version: version_id.to_string(),
            })?;
        decode_version(guard.value())
    }

    /// Fetch the metadata document of one version
    pub fn get_object_metadata(
        &self,
        object_id: &ObjectId,
        version_id: &VersionId,
    ) -> Result<VersionMetadata> {
        Ok(self.get_version(object_id, version_id)?.metadata)
    }

    /// The object's latest version id, if any versions exist
    pub fn get_latest_version(&self, object_id: &ObjectId) -> Result<Option<VersionId>> {
        Ok(self.get_object(object_id)?.latest_version)
    }

    /// The root version for a new write: the current latest, if any
    pub fn get_root_version(&self, object_id: &ObjectId) -> Result<Option<VersionId>> {
        match self.get_object(object_id) {
            Ok(record) => Ok(record.latest_version),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// All version rows of an object, in insertion order
    pub fn list_version_records(&self, object_id: &ObjectId) -> Result<Vec<VersionRecord>> {
        let txn = self.db.begin_read().map_err(db_err)?;
        let versions = txn.open_table(VERSIONS).map_err(db_err)?;
        let mut records = Vec::new();
        for entry in versions.range((object_id.as_str(), "")..).map_err(db_err)? {
            let (k, v) = entry.map_err(db_err)?;
            if k.value().0 != object_id.as_str() {
                break;
            }
            records.push(decode_version(v.value())?);
        }
        records.sort_by_key(|r| r.seq);
        Ok(records)
    }

    /// Version ids of an object, in insertion order
    pub fn list_object_versions(&self, object_id: &ObjectId) -> Result<Vec<VersionId>> {
        Ok(self
            .list_version_records(object_id)?
            .into_iter()
            .map(|r| r.version_id)
            .collect())
    }

    /// The cached sealed payload for a version, if one was stored
    pub fn get_cached_ciphertext(
        &self,
        object_id: &ObjectId,
        version_id: &VersionId,
    ) -> Result<Option<Vec<u8>>> {
        let txn = self.db.begin_read().map_err(db_err)?;
        let blobs = txn.open_table(VERSION_BLOBS).map_err(db_err)?;
        Ok(blobs
            .get((object_id.as_str(), version_id.as_str()))
            .map_err(db_err)?
            .map(|g| g.value().to_vec()))
    }

    /// Remove a version row and recompute the object's latest version
    ///
    /// The new latest is the most recently inserted remaining version, or
    /// none.
    pub fn delete_version(
        &self,
        bucket_id: &BucketId,
        object_id: &ObjectId,
        version_id: &VersionId,
    ) -> Result<()> {
        let txn = self.db.begin_write().map_err(db_err)?;
        {
            let mut versions = txn.open_table(VERSIONS).map_err(db_err)?;
            let key = (object_id.as_str(), version_id.as_str());
            let record = {
                let removed = versions.remove(key).map_err(db_err)?;
                let Some(guard) = removed else {
                    return Err(Error::VersionNotFound {
                        object: object_id.to_string(),
                        version: version_id.to_string(),
                    });
                };
                decode_version(guard.value())?
            };
            if record.bucket_id != *bucket_id {
                return Err(Error::VersionNotFound {
                    object: object_id.to_string(),
                    version: version_id.to_string(),
                });
            }

            let mut blobs = txn.open_table(VERSION_BLOBS).map_err(db_err)?;
            blobs.remove(key).map_err(db_err)?;

            // Recompute latest as the remaining version with the highest seq
            let mut latest: Option<(u64, VersionId)> = None;
            for entry in versions.range((object_id.as_str(), "")..).map_err(db_err)? {
                let (k, v) = entry.map_err(db_err)?;
                if k.value().0 != object_id.as_str() {
                    break;
                }
                let remaining = decode_version(v.value())?;
                if latest.as_ref().is_none_or(|(seq, _)| remaining.seq > *seq) {
                    latest = Some((remaining.seq, remaining.version_id));
                }
            }

            let mut objects = txn.open_table(OBJECTS).map_err(db_err)?;
            let existing = {
                objects
                    .get(object_id.as_str())
                    .map_err(db_err)?
                    .map(|guard| decode_object(guard.value()))
                    .transpose()?
            };
            if let Some(mut object) = existing {
                object.latest_version = latest.map(|(_, id)| id);
                let raw = bincode::serialize(&object).map_err(ser_err)?;
                objects
                    .insert(object_id.as_str(), raw.as_slice())
                    .map_err(db_err)?;
            }
        }
        txn.commit().map_err(db_err)?;
        Ok(())
    }

    /// Remove all versions of an object, then the object row
    pub fn delete_object(&self, bucket_id: &BucketId, object_id: &ObjectId) -> Result<()> {
        let txn = self.db.begin_write().map_err(db_err)?;
        {
            let mut objects = txn.open_table(OBJECTS).map_err(db_err)?;
            let object = {
                let guard = objects.get(object_id.as_str()).map_err(db_err)?;
                let Some(guard) = guard else {
                    return Err(Error::ObjectNotFound {
                        bucket: bucket_id.to_string(),
                        object: object_id.to_string(),
                    });
                };
                decode_object(guard.value())?
            };
            if object.bucket_id != *bucket_id {
                return Err(Error::ObjectNotFound {
                    bucket: bucket_id.to_string(),
                    object: object_id.to_string(),
                });
            }

            let mut versions = txn.open_table(VERSIONS).map_err(db_err)?;
            let mut version_ids = Vec::new();
            for entry in versions.range((object_id.as_str(), "")..).map_err(db_err)? {
                let (k, _) = entry.map_err(db_err)?;
                let (obj, ver) = k.value();
                if obj != object_id.as_str() {
                    break;
                }
                version_ids.push(ver.to_string());
            }
            let mut blobs = txn.open_table(VERSION_BLOBS).map_err(db_err)?;
            for ver in &version_ids {
                versions
                    .remove((object_id.as_str(), ver.as_str()))
                    .map_err(db_err)?;
                blobs
                    .remove((object_id.as_str(), ver.as_str()))
                    .map_err(db_err)?;
            }

            objects.remove(object_id.as_str()).map_err(db_err)?;
        }
        txn.commit().map_err(db_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn store() -> (tempfile::TempDir, MetaStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = MetaStore::open(dir.path().join("meta.redb")).unwrap();
        (dir, store)
    }

    fn metadata(bucket: &str, object: &str, version: &str) -> VersionMetadata {
        let mut shard_locations = BTreeMap::new();
        let mut proofs = BTreeMap::new();
        for i in 0..6 {
            shard_locations.insert(format!("shard_{i}"), format!("http://node-{i}:9100"));
            proofs.insert(format!("shard_{i}"), "ab".repeat(32));
        }
        VersionMetadata {
            bucket_id: bucket.into(),
            object_id: object.into(),
            version_id: version.into(),
            filename: "a.txt".into(),
            filesize_bytes: 5,
            format: "txt".into(),
            creation_date: "2026-01-01T00:00:00Z".into(),
            shard_locations,
            proofs,
        }
    }

    fn add(store: &MetaStore, bucket: &str, object: &str, version: &str) -> VersionRecord {
        let meta = metadata(bucket, object, version);
        store
            .add_version(
                &bucket.into(),
                &object.into(),
                &version.into(),
                &version.into(),
                &meta,
                None,
            )
            .unwrap()
    }

    #[test]
    fn test_bucket_lifecycle() {
        let (_dir, store) = store();
        store.create_bucket(&"b1".into(), "alice").unwrap();
        assert!(matches!(
            store.create_bucket(&"b1".into(), "alice"),
            Err(Error::BucketAlreadyExists(_))
        ));
        assert_eq!(store.get_bucket(&"b1".into()).unwrap().owner, "alice");

        store.create_bucket(&"b2".into(), "alice").unwrap();
        store.create_bucket(&"c1".into(), "bob").unwrap();
        let mine = store.list_buckets("alice").unwrap();
        assert_eq!(mine, vec![BucketId::from("b1"), BucketId::from("b2")]);

        store.delete_bucket(&"b2".into()).unwrap();
        assert!(matches!(
            store.delete_bucket(&"b2".into()),
            Err(Error::BucketNotFound(_))
        ));
    }

    #[test]
    fn test_delete_nonempty_bucket_rejected() {
        let (_dir, store) = store();
        store.create_bucket(&"b1".into(), "alice").unwrap();
        store.add_object(&"b1".into(), &"o1".into(), "a.txt").unwrap();
        assert!(store.delete_bucket(&"b1".into()).is_err());
    }

    #[test]
    fn test_add_object_idempotent() {
        let (_dir, store) = store();
        store.create_bucket(&"b1".into(), "alice").unwrap();
        store.add_object(&"b1".into(), &"o1".into(), "a.txt").unwrap();
        store.add_object(&"b1".into(), &"o1".into(), "other.txt").unwrap();
        // First filename wins; the second call is a no-op
        assert_eq!(store.get_object(&"o1".into()).unwrap().filename, "a.txt");

        assert!(matches!(
            store.add_object(&"nope".into(), &"o2".into(), "x"),
            Err(Error::BucketNotFound(_))
        ));
    }

    #[test]
    fn test_version_insert_and_latest() {
        let (_dir, store) = store();
        store.create_bucket(&"b1".into(), "alice").unwrap();

        add(&store, "b1", "o1", "v1");
        assert_eq!(
            store.get_latest_version(&"o1".into()).unwrap(),
            Some(VersionId::from("v1"))
        );

        add(&store, "b1", "o1", "v2");
        assert_eq!(
            store.get_latest_version(&"o1".into()).unwrap(),
            Some(VersionId::from("v2"))
        );

        // Duplicate version id is rejected
        let meta = metadata("b1", "o1", "v2");
        assert!(matches!(
            store.add_version(&"b1".into(), &"o1".into(), &"v2".into(), &"v1".into(), &meta, None),
            Err(Error::VersionExists(_))
        ));

        let versions = store.list_object_versions(&"o1".into()).unwrap();
        assert_eq!(versions, vec![VersionId::from("v1"), VersionId::from("v2")]);
    }

    #[test]
    fn test_version_metadata_round_trip() {
        let (_dir, store) = store();
        store.create_bucket(&"b1".into(), "alice").unwrap();
        add(&store, "b1", "o1", "v1");

        let meta = store
            .get_object_metadata(&"o1".into(), &"v1".into())
            .unwrap();
        assert_eq!(meta.shard_locations.len(), 6);
        assert_eq!(meta.proofs.len(), 6);
        let keys: Vec<_> = meta.shard_locations.keys().cloned().collect();
        assert_eq!(keys, (0..6).map(|i| format!("shard_{i}")).collect::<Vec<_>>());

        assert!(matches!(
            store.get_object_metadata(&"o1".into(), &"nope".into()),
            Err(Error::VersionNotFound { .. })
        ));
    }

    #[test]
    fn test_delete_version_recomputes_latest() {
        let (_dir, store) = store();
        store.create_bucket(&"b1".into(), "alice").unwrap();
        add(&store, "b1", "o1", "v1");
        add(&store, "b1", "o1", "v2");
        add(&store, "b1", "o1", "v3");

        // Deleting the latest falls back to the previous insert
        store
            .delete_version(&"b1".into(), &"o1".into(), &"v3".into())
            .unwrap();
        assert_eq!(
            store.get_latest_version(&"o1".into()).unwrap(),
            Some(VersionId::from("v2"))
        );

        // Deleting a middle version leaves latest alone
        store
            .delete_version(&"b1".into(), &"o1".into(), &"v1".into())
            .unwrap();
        assert_eq!(
            store.get_latest_version(&"o1".into()).unwrap(),
            Some(VersionId::from("v2"))
        );

        store
            .delete_version(&"b1".into(), &"o1".into(), &"v2".into())
            .unwrap();
        assert_eq!(store.get_latest_version(&"o1".into()).unwrap(), None);

        assert!(matches!(
            store.delete_version(&"b1".into(), &"o1".into(), &"v2".into()),
            Err(Error::VersionNotFound { .. })
        ));
    }

    #[test]
    fn test_delete_object_cascades() {
        let (_dir, store) = store();
        store.create_bucket(&"b1".into(), "alice").unwrap();
        add(&store, "b1", "o1", "v1");
        add(&store, "b1", "o1", "v2");

        store.delete_object(&"b1".into(), &"o1".into()).unwrap();
        assert!(store.get_object(&"o1".into()).is_err());
        assert!(matches!(
            store.get_version(&"o1".into(), &"v1".into()),
            Err(Error::VersionNotFound { .. })
        ));
        // Bucket is now empty and removable
        store.delete_bucket(&"b1".into()).unwrap();
    }

    #[test]
    fn test_ciphertext_cache() {
        let (_dir, store) = store();
        store.create_bucket(&"b1".into(), "alice").unwrap();
        let meta = metadata("b1", "o1", "v1");
        store
            .add_version(
                &"b1".into(),
                &"o1".into(),
                &"v1".into(),
                &"v1".into(),
                &meta,
                Some(b"sealed-bytes"),
            )
            .unwrap();
        assert_eq!(
            store.get_cached_ciphertext(&"o1".into(), &"v1".into()).unwrap(),
            Some(b"sealed-bytes".to_vec())
        );

        store
            .delete_version(&"b1".into(), &"o1".into(), &"v1".into())
            .unwrap();
        assert_eq!(
            store.get_cached_ciphertext(&"o1".into(), &"v1".into()).unwrap(),
            None
        );
    }

    #[test]
    fn test_root_version_chain() {
        let (_dir, store) = store();
        store.create_bucket(&"b1".into(), "alice").unwrap();
        assert_eq!(store.get_root_version(&"o1".into()).unwrap(), None);
        add(&store, "b1", "o1", "v1");
        assert_eq!(
            store.get_root_version(&"o1".into()).unwrap(),
            Some(VersionId::from("v1"))
        );
    }

    #[test]
    fn test_list_objects_scoped_to_bucket() {
        let (_dir, store) = store();
        store.create_bucket(&"b1".into(), "alice").unwrap();
        store.create_bucket(&"b2".into(), "alice").unwrap();
        add(&store, "b1", "o1", "v1");
        add(&store, "b2", "o2", "v2");

        assert_eq!(
            store.list_objects(&"b1".into()).unwrap(),
            vec![ObjectId::from("o1")]
        );
        assert!(matches!(
            store.list_objects(&"zzz".into()),
            Err(Error::BucketNotFound(_))
        ));
    }

    #[test]
    fn test_persistence_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meta.redb");
        {
            let store = MetaStore::open(&path).unwrap();
            store.create_bucket(&"b1".into(), "alice").unwrap();
            add(&store, "b1", "o1", "v1");
        }
        let store = MetaStore::open(&path).unwrap();
        assert_eq!(
            store.get_latest_version(&"o1".into()).unwrap(),
            Some(VersionId::from("v1"))
        );
    }
}
