//! Metadata row types

use coffer_common::{BucketId, ObjectId, VersionId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A bucket row
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    pub bucket_id: BucketId,
    pub owner: String,
    /// Creation time, epoch seconds
    pub created_at: i64,
}

/// An object row
///
/// `latest_version`, when set, always references an existing version of
/// this object; it is recomputed on version deletion.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRecord {
    pub object_id: ObjectId,
    pub bucket_id: BucketId,
    pub filename: String,
    pub latest_version: Option<VersionId>,
}

/// The immutable metadata document stored with each version
///
/// `shard_locations` and `proofs` both carry exactly `k + m` entries keyed
/// `shard_0 .. shard_{k+m-1}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionMetadata {
    pub bucket_id: BucketId,
    pub object_id: ObjectId,
    pub version_id: VersionId,
    pub filename: String,
    pub filesize_bytes: u64,
    /// Filename extension without the leading dot, may be empty
    pub format: String,
    /// RFC3339 creation timestamp
    pub creation_date: String,
    /// `shard_<i>` -> storage node base address
    pub shard_locations: BTreeMap<String, String>,
    /// `shard_<i>` -> hex-encoded Merkle sibling path
    pub proofs: BTreeMap<String, String>,
}

/// A version row
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
    pub version_id: VersionId,
    pub object_id: ObjectId,
    pub bucket_id: BucketId,
    /// The object's latest version at insert time (self for the first)
    pub root_version: VersionId,
    /// Store-wide insertion sequence; orders versions and decides latest
    pub seq: u64,
    /// Insertion time, epoch seconds
    pub created_at: i64,
    pub metadata: VersionMetadata,
}
