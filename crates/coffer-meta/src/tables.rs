//! Redb table definitions for persistent metadata storage.

use redb::TableDefinition;

/// Bucket rows, bincode-encoded, keyed by bucket id
pub const BUCKETS: TableDefinition<&str, &[u8]> = TableDefinition::new("buckets");

/// Object rows, bincode-encoded, keyed by object id
pub const OBJECTS: TableDefinition<&str, &[u8]> = TableDefinition::new("objects");

/// Version rows as JSON documents, keyed by (object id, version id)
pub const VERSIONS: TableDefinition<(&str, &str), &[u8]> = TableDefinition::new("versions");

/// Optional sealed-payload cache, keyed by (object id, version id)
pub const VERSION_BLOBS: TableDefinition<(&str, &str), &[u8]> =
    TableDefinition::new("version_blobs");

/// Store-wide counters; holds the version insertion sequence
pub const COUNTERS: TableDefinition<&str, u64> = TableDefinition::new("counters");

/// Counter key for the version insertion sequence
pub const VERSION_SEQ: &str = "version_seq";
