//! Filesystem shard repository
//!
//! One repository per storage node. Shards are whole files under
//! `<base>/<location>/<object_id>-v(<version_id>)_shard_<index>`, where
//! `location` is the owning node's id. Writes go to a unique temp file and
//! are renamed into place, so concurrent writers of the same key (same
//! content by construction) cannot produce torn reads.

use coffer_common::{Error, ObjectId, Result, VersionId};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;
use uuid::Uuid;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

/// Shard repository rooted at a base directory
pub struct ShardRepo {
    base: PathBuf,
    location: String,
}

impl ShardRepo {
    /// Create a repository for the given logical location (the node id)
    pub fn new(base: impl Into<PathBuf>, location: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            location: location.into(),
        }
    }

    /// Base directory of this repository
    #[must_use]
    pub fn base(&self) -> &Path {
        &self.base
    }

    fn dir(&self) -> PathBuf {
        self.base.join(&self.location)
    }

    fn shard_path(&self, object_id: &ObjectId, version_id: &VersionId, index: usize) -> PathBuf {
        self.dir()
            .join(format!("{object_id}-v({version_id})_shard_{index}"))
    }

    /// Write a shard, creating parent directories; overwrite is allowed
    pub async fn put(
        &self,
        object_id: &ObjectId,
        version_id: &VersionId,
        index: usize,
        data: &[u8],
    ) -> Result<()> {
        let dir = self.dir();
        fs::create_dir_all(&dir).await?;
        #[cfg(unix)]
        fs::set_permissions(&dir, std::fs::Permissions::from_mode(0o755)).await?;

        let path = self.shard_path(object_id, version_id, index);
        let tmp = dir.join(format!(".tmp-{}", Uuid::new_v4()));
        fs::write(&tmp, data).await?;
        #[cfg(unix)]
        fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o644)).await?;
        fs::rename(&tmp, &path).await?;
        debug!(%object_id, %version_id, index, bytes = data.len(), "shard stored");
        Ok(())
    }

    /// Read a shard's bytes
    pub async fn get(
        &self,
        object_id: &ObjectId,
        version_id: &VersionId,
        index: usize,
    ) -> Result<Vec<u8>> {
        let path = self.shard_path(object_id, version_id, index);
        match fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(Error::ShardNotFound {
                object: object_id.to_string(),
                version: version_id.to_string(),
                shard: index,
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove a shard; removing an absent shard is success
    pub async fn delete(
        &self,
        object_id: &ObjectId,
        version_id: &VersionId,
        index: usize,
    ) -> Result<()> {
        let path = self.shard_path(object_id, version_id, index);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// True if the shard file is present
    pub async fn exists(
        &self,
        object_id: &ObjectId,
        version_id: &VersionId,
        index: usize,
    ) -> Result<bool> {
        let path = self.shard_path(object_id, version_id, index);
        match fs::metadata(&path).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Bytes available on the volume backing this repository
    pub fn available_bytes(&self) -> Result<u64> {
        let probe = if self.base.exists() {
            self.base.clone()
        } else {
            PathBuf::from(".")
        };
        let stat = nix::sys::statvfs::statvfs(&probe)
            .map_err(|e| Error::transport(format!("statvfs failed: {e}")))?;
        Ok(stat.blocks_available() as u64 * stat.fragment_size() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> (tempfile::TempDir, ShardRepo) {
        let dir = tempfile::tempdir().unwrap();
        let repo = ShardRepo::new(dir.path(), "node-1");
        (dir, repo)
    }

    #[tokio::test]
    async fn test_put_get_round_trip() {
        let (_dir, repo) = repo();
        let (obj, ver) = (ObjectId::from("obj-A"), VersionId::from("v1"));
        repo.put(&obj, &ver, 0, b"shard zero").await.unwrap();
        assert_eq!(repo.get(&obj, &ver, 0).await.unwrap(), b"shard zero");
    }

    #[tokio::test]
    async fn test_file_layout() {
        let (dir, repo) = repo();
        let (obj, ver) = (ObjectId::from("obj-A"), VersionId::from("v1"));
        repo.put(&obj, &ver, 3, b"x").await.unwrap();
        assert!(
            dir.path()
                .join("node-1")
                .join("obj-A-v(v1)_shard_3")
                .is_file()
        );
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let (_dir, repo) = repo();
        let err = repo
            .get(&"obj".into(), &"v".into(), 0)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_overwrite_allowed() {
        let (_dir, repo) = repo();
        let (obj, ver) = (ObjectId::from("o"), VersionId::from("v"));
        repo.put(&obj, &ver, 0, b"first").await.unwrap();
        repo.put(&obj, &ver, 0, b"second").await.unwrap();
        assert_eq!(repo.get(&obj, &ver, 0).await.unwrap(), b"second");
    }

    #[tokio::test]
    async fn test_delete_idempotent() {
        let (_dir, repo) = repo();
        let (obj, ver) = (ObjectId::from("o"), VersionId::from("v"));
        repo.put(&obj, &ver, 0, b"bytes").await.unwrap();
        assert!(repo.exists(&obj, &ver, 0).await.unwrap());

        repo.delete(&obj, &ver, 0).await.unwrap();
        assert!(!repo.exists(&obj, &ver, 0).await.unwrap());
        // Second delete is still success
        repo.delete(&obj, &ver, 0).await.unwrap();
    }

    #[tokio::test]
    async fn test_shards_keyed_by_version() {
        let (_dir, repo) = repo();
        let obj = ObjectId::from("o");
        repo.put(&obj, &"v1".into(), 0, b"one").await.unwrap();
        repo.put(&obj, &"v2".into(), 0, b"two").await.unwrap();
        assert_eq!(repo.get(&obj, &"v1".into(), 0).await.unwrap(), b"one");
        assert_eq!(repo.get(&obj, &"v2".into(), 0).await.unwrap(), b"two");
    }

    #[test]
    fn test_available_bytes_nonzero() {
        let (_dir, repo) = repo();
        assert!(repo.available_bytes().unwrap() > 0);
    }
}
