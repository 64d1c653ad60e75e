//! Common types and utilities for Coffer
//!
//! This crate provides the shared identifier newtypes, the error taxonomy,
//! and node configuration used by every other Coffer crate.

pub mod config;
pub mod error;
pub mod types;

pub use config::{Config, TimingConfig};
pub use error::{Error, Result};
pub use types::{
    BucketId, ErasureParams, IdError, NodeId, NodeType, ObjectId, VersionId, parse_shard_key,
    shard_key,
};
