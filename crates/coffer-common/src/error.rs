//! Error types for Coffer
//!
//! This module defines the common error taxonomy used throughout the system.

use crate::types::IdError;
use thiserror::Error;

/// Common result type for Coffer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for Coffer
#[derive(Debug, Error)]
pub enum Error {
    // Input errors
    #[error("bucket not found: {0}")]
    BucketNotFound(String),

    #[error("object not found: {bucket}/{object}")]
    ObjectNotFound { bucket: String, object: String },

    #[error("version not found: {object}@{version}")]
    VersionNotFound { object: String, version: String },

    #[error("bucket already exists: {0}")]
    BucketAlreadyExists(String),

    #[error("version already exists: {0}")]
    VersionExists(String),

    #[error("shard not found: {object}@{version} shard {shard}")]
    ShardNotFound {
        object: String,
        version: String,
        shard: usize,
    },

    #[error("invalid identifier: {0}")]
    InvalidId(#[from] IdError),

    #[error("bad request: {0}")]
    BadRequest(String),

    // Capacity errors
    #[error("insufficient storage nodes: have {available}, need {required}")]
    InsufficientNodes { available: usize, required: usize },

    #[error("insufficient shards for reconstruction: missing {missing}, need {required}")]
    InsufficientShards { missing: usize, required: usize },

    // Pipeline errors
    #[error("upload failed for shard {shard}: {reason}")]
    UploadFailed { shard: usize, reason: String },

    #[error("compression failed: {0}")]
    CompressionFailed(String),

    #[error("decompression failed: {0}")]
    DecompressionFailed(String),

    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    // Integrity errors
    #[error("integrity failure: ciphertext failed authentication")]
    IntegrityFailure,

    #[error("erasure coding error: {0}")]
    ErasureCoding(String),

    // Metadata errors
    #[error("metadata commit failed: {0}")]
    MetadataCommitFailed(String),

    #[error("metadata store error: {0}")]
    Metadata(String),

    // Transient I/O errors
    #[error("disk I/O error: {0}")]
    DiskIo(#[from] std::io::Error),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("request timeout")]
    Timeout,

    // Fatal errors
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Create a bad request error
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    /// Create a configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a metadata store error
    pub fn metadata(msg: impl Into<String>) -> Self {
        Self::Metadata(msg.into())
    }

    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Check if this is a retryable error
    ///
    /// Capacity errors clear as cluster state changes; transport errors and
    /// timeouts may succeed on a later attempt. Integrity errors never do.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout
                | Self::Transport(_)
                | Self::InsufficientNodes { .. }
                | Self::InsufficientShards { .. }
        )
    }

    /// Check if this is a not found error
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::BucketNotFound(_)
                | Self::ObjectNotFound { .. }
                | Self::VersionNotFound { .. }
                | Self::ShardNotFound { .. }
        )
    }

    /// HTTP status code for API responses
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::BadRequest(_) | Self::InvalidId(_) => 400,

            Self::BucketNotFound(_)
            | Self::ObjectNotFound { .. }
            | Self::VersionNotFound { .. }
            | Self::ShardNotFound { .. } => 404,

            Self::BucketAlreadyExists(_) | Self::VersionExists(_) => 409,

            Self::IntegrityFailure
            | Self::ErasureCoding(_)
            | Self::CompressionFailed(_)
            | Self::DecompressionFailed(_)
            | Self::EncryptionFailed(_)
            | Self::MetadataCommitFailed(_)
            | Self::Metadata(_)
            | Self::DiskIo(_)
            | Self::Serialization(_) => 500,

            Self::InsufficientNodes { .. }
            | Self::InsufficientShards { .. }
            | Self::UploadFailed { .. }
            | Self::Transport(_)
            | Self::Timeout
            | Self::Configuration(_) => 503,
        }
    }
}
