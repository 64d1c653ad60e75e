//! Core type definitions for Coffer
//!
//! Identifiers are caller-visible strings (buckets and objects are named by
//! the caller, versions and nodes by us), wrapped in newtypes so they cannot
//! be mixed up across call sites.

use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Errors that can occur when creating an identifier
#[derive(Debug, Clone, thiserror::Error)]
pub enum IdError {
    #[error("identifier cannot be empty")]
    Empty,
    #[error("identifier cannot exceed 256 bytes")]
    TooLong,
    #[error("identifier contains invalid character: {0:?}")]
    InvalidChar(char),
}

/// Shared validation for caller-supplied identifiers.
///
/// Identifiers end up in file names and URL path segments, so path
/// separators and control characters are rejected.
fn validate_id(id: &str) -> Result<(), IdError> {
    if id.is_empty() {
        return Err(IdError::Empty);
    }
    if id.len() > 256 {
        return Err(IdError::TooLong);
    }
    for c in id.chars() {
        if c == '/' || c == '\\' || c.is_control() {
            return Err(IdError::InvalidChar(c));
        }
    }
    Ok(())
}

macro_rules! string_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, From, Into)]
        #[display("{_0}")]
        pub struct $name(String);

        impl $name {
            /// Create a new validated identifier
            pub fn new(id: impl Into<String>) -> Result<Self, IdError> {
                let id = id.into();
                validate_id(&id)?;
                Ok(Self(id))
            }

            /// Create without validation (internal use only)
            #[must_use]
            pub fn new_unchecked(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the identifier as a string slice
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({:?})"), self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

string_id! {
    /// Name of a bucket (a container owning a set of objects)
    BucketId
}

string_id! {
    /// Identifier of a logical object within a bucket
    ObjectId
}

string_id! {
    /// Identifier of one immutable version of an object
    VersionId
}

string_id! {
    /// Identifier of a node in the cluster
    NodeId
}

impl VersionId {
    /// Generate a fresh random version identifier
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl NodeId {
    /// Generate a fresh random node identifier
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

/// Role a node plays in the cluster
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    /// Runs the ingest and retrieval pipelines
    Construction,
    /// Owns shard bytes on a local filesystem
    Storage,
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Construction => write!(f, "construction"),
            Self::Storage => write!(f, "storage"),
        }
    }
}

impl std::str::FromStr for NodeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "construction" => Ok(Self::Construction),
            "storage" => Ok(Self::Storage),
            other => Err(format!("unknown node type: {other}")),
        }
    }
}

/// Erasure coding parameters, fixed for the lifetime of a deployment
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErasureParams {
    /// Number of data shards (k)
    pub data_shards: u8,
    /// Number of parity shards (m)
    pub parity_shards: u8,
}

impl ErasureParams {
    /// Create new erasure parameters
    #[must_use]
    pub const fn new(data_shards: u8, parity_shards: u8) -> Self {
        Self {
            data_shards,
            parity_shards,
        }
    }

    /// Total number of shards (k + m)
    #[must_use]
    pub fn total_shards(&self) -> usize {
        self.data_shards as usize + self.parity_shards as usize
    }

    /// Default 4+2 configuration
    pub const EC_4_2: Self = Self::new(4, 2);
}

impl Default for ErasureParams {
    fn default() -> Self {
        Self::EC_4_2
    }
}

/// Key of one shard placement entry, `shard_<index>`
#[must_use]
pub fn shard_key(index: usize) -> String {
    format!("shard_{index}")
}

/// Parse a `shard_<index>` placement key back to its index
#[must_use]
pub fn parse_shard_key(key: &str) -> Option<usize> {
    key.strip_prefix("shard_")?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_ids() {
        assert!(BucketId::new("b1").is_ok());
        assert!(ObjectId::new("obj-A").is_ok());
        assert!(BucketId::new("with space and.dots").is_ok());
    }

    #[test]
    fn test_invalid_ids() {
        assert!(BucketId::new("").is_err());
        assert!(BucketId::new("a/b").is_err());
        assert!(ObjectId::new("a\\b").is_err());
        assert!(ObjectId::new("a\nb").is_err());
        assert!(BucketId::new("x".repeat(300)).is_err());
    }

    #[test]
    fn test_version_id_generate_unique() {
        assert_ne!(VersionId::generate(), VersionId::generate());
    }

    #[test]
    fn test_node_type_round_trip() {
        assert_eq!("storage".parse::<NodeType>().unwrap(), NodeType::Storage);
        assert_eq!(NodeType::Construction.to_string(), "construction");
        assert!("gateway".parse::<NodeType>().is_err());
    }

    #[test]
    fn test_erasure_params() {
        let ec = ErasureParams::EC_4_2;
        assert_eq!(ec.total_shards(), 6);
    }

    #[test]
    fn test_shard_key_round_trip() {
        assert_eq!(shard_key(3), "shard_3");
        assert_eq!(parse_shard_key("shard_3"), Some(3));
        assert_eq!(parse_shard_key("shard_x"), None);
        assert_eq!(parse_shard_key("proof_3"), None);
    }
}
