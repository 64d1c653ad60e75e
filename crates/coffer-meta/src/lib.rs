//! Metadata storage for Coffer
//!
//! Maps `(bucket, object, version)` to shard placements and proofs, and
//! tracks each object's latest version. Backed by a single redb database.

pub mod store;
pub mod tables;
pub mod types;

pub use store::MetaStore;
pub use types::{Bucket, ObjectRecord, VersionMetadata, VersionRecord};
