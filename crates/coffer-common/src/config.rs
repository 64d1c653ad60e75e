//! Configuration for Coffer nodes
//!
//! One TOML file is shared by all node roles; each binary reads the subset
//! it needs and merges CLI/env overrides on top (CLI wins).

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration for a Coffer node
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Listen address for the construction front door
    #[serde(default = "default_server_address")]
    pub server_address: String,

    /// Root directory for shard files on a storage node
    #[serde(default = "default_shard_store_base_path")]
    pub shard_store_base_path: PathBuf,

    /// Hex-encoded AEAD key (16, 24, or 32 bytes once decoded)
    #[serde(default)]
    pub encryption_key: String,

    /// Path to the metadata store
    #[serde(default = "default_database")]
    pub database: PathBuf,

    /// Legacy fallback list of logical shard locations
    #[serde(default, rename = "shardLocations")]
    pub shard_locations: Vec<String>,

    /// Base URL of the discovery service
    #[serde(default = "default_discovery_url")]
    pub discovery_url: String,

    /// Erasure coding data shards (k)
    #[serde(default = "default_data_shards")]
    pub ec_data_shards: u8,

    /// Erasure coding parity shards (m)
    #[serde(default = "default_parity_shards")]
    pub ec_parity_shards: u8,

    /// Cluster timing knobs
    #[serde(default)]
    pub timing: TimingConfig,
}

/// Heartbeat, gossip and retry timing
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Interval between discovery heartbeats (seconds)
    #[serde(default = "default_heartbeat_secs")]
    pub heartbeat_secs: u64,

    /// Interval between gossip pulls (seconds)
    #[serde(default = "default_gossip_secs")]
    pub gossip_secs: u64,

    /// Registry entries older than this are swept (seconds)
    #[serde(default = "default_stale_ttl_secs")]
    pub stale_ttl_secs: u64,

    /// Deadline for a single shard PUT/GET/DELETE (seconds)
    #[serde(default = "default_shard_timeout_secs")]
    pub shard_timeout_secs: u64,

    /// Deadline for discovery calls (seconds)
    #[serde(default = "default_discovery_timeout_secs")]
    pub discovery_timeout_secs: u64,

    /// Attempts per shard operation before giving up
    #[serde(default = "default_shard_attempts")]
    pub shard_attempts: u32,

    /// Initial backoff between shard retries (seconds); doubles per attempt
    #[serde(default = "default_backoff_secs")]
    pub retry_backoff_secs: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            heartbeat_secs: default_heartbeat_secs(),
            gossip_secs: default_gossip_secs(),
            stale_ttl_secs: default_stale_ttl_secs(),
            shard_timeout_secs: default_shard_timeout_secs(),
            discovery_timeout_secs: default_discovery_timeout_secs(),
            shard_attempts: default_shard_attempts(),
            retry_backoff_secs: default_backoff_secs(),
        }
    }
}

fn default_server_address() -> String {
    "0.0.0.0:8081".to_string()
}

fn default_shard_store_base_path() -> PathBuf {
    PathBuf::from("./data")
}

fn default_database() -> PathBuf {
    PathBuf::from("./metadata.redb")
}

fn default_discovery_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_data_shards() -> u8 {
    4
}

fn default_parity_shards() -> u8 {
    2
}

fn default_heartbeat_secs() -> u64 {
    30
}

fn default_gossip_secs() -> u64 {
    10
}

fn default_stale_ttl_secs() -> u64 {
    120
}

fn default_shard_timeout_secs() -> u64 {
    30
}

fn default_discovery_timeout_secs() -> u64 {
    5
}

fn default_shard_attempts() -> u32 {
    3
}

fn default_backoff_secs() -> u64 {
    1
}

impl Default for Config {
    fn default() -> Self {
        toml::from_str("").expect("empty config populates all defaults")
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        toml::from_str(&raw)
            .map_err(|e| Error::configuration(format!("failed to parse config: {e}")))
    }

    /// Load from the given path if it exists, defaults otherwise
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Decode and validate the AEAD key
    ///
    /// A key that is absent, not hex, or of a length other than 16/24/32
    /// bytes is a fatal configuration error.
    pub fn encryption_key_bytes(&self) -> Result<Vec<u8>> {
        if self.encryption_key.is_empty() {
            return Err(Error::configuration("encryption key not configured"));
        }
        let key = hex::decode(&self.encryption_key)
            .map_err(|e| Error::configuration(format!("encryption key is not valid hex: {e}")))?;
        match key.len() {
            16 | 24 | 32 => Ok(key),
            n => Err(Error::configuration(format!(
                "encryption key must be 16, 24, or 32 bytes, got {n}"
            ))),
        }
    }

    /// Erasure parameters from config
    #[must_use]
    pub fn erasure_params(&self) -> crate::types::ErasureParams {
        crate::types::ErasureParams::new(self.ec_data_shards, self.ec_parity_shards)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.ec_data_shards, 4);
        assert_eq!(config.ec_parity_shards, 2);
        assert_eq!(config.timing.heartbeat_secs, 30);
        assert_eq!(config.timing.stale_ttl_secs, 120);
        assert_eq!(config.database, PathBuf::from("./metadata.redb"));
    }

    #[test]
    fn test_load_partial_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            f,
            "encryption_key = \"000102030405060708090a0b0c0d0e0f\"\ndatabase = \"/tmp/meta.redb\""
        )
        .unwrap();
        let config = Config::load(f.path()).unwrap();
        assert_eq!(config.database, PathBuf::from("/tmp/meta.redb"));
        assert_eq!(config.encryption_key_bytes().unwrap().len(), 16);
        // Untouched fields keep their defaults
        assert_eq!(config.ec_data_shards, 4);
    }

    #[test]
    fn test_key_validation() {
        let mut config = Config::default();
        assert!(config.encryption_key_bytes().is_err());

        config.encryption_key = "zz".into();
        assert!(config.encryption_key_bytes().is_err());

        // 15 bytes: wrong length
        config.encryption_key = "00".repeat(15);
        assert!(config.encryption_key_bytes().is_err());

        for len in [16, 24, 32] {
            config.encryption_key = "ab".repeat(len);
            assert_eq!(config.encryption_key_bytes().unwrap().len(), len);
        }
    }

    #[test]
    fn test_load_missing_file_defaults() {
        let config = Config::load_or_default("/nonexistent/coffer.toml").unwrap();
        assert_eq!(config.timing.gossip_secs, 10);
    }
}
