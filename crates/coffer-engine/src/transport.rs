//! HTTP transport to storage nodes
//!
//! One shared client with a per-request deadline. Each shard operation has
//! a small retry budget with exponential backoff; not-found responses are
//! terminal and never retried.

use bytes::Bytes;
use coffer_common::{Error, ObjectId, Result, VersionId};
use serde::Deserialize;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Default deadline for one shard request
pub const SHARD_TIMEOUT: Duration = Duration::from_secs(30);

/// Default attempts per shard operation
pub const SHARD_ATTEMPTS: u32 = 3;

/// Default initial backoff between attempts; doubles each retry
pub const RETRY_BACKOFF: Duration = Duration::from_secs(1);

#[derive(Debug, Deserialize)]
struct VerifyResponse {
    exists: bool,
}

/// Client for the storage-node shard protocol
pub struct ShardTransport {
    http: reqwest::Client,
    attempts: u32,
    backoff: Duration,
}

impl ShardTransport {
    /// Create a transport with the given deadline and retry budget
    pub fn new(timeout: Duration, attempts: u32, backoff: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::transport(e.to_string()))?;
        Ok(Self {
            http,
            attempts: attempts.max(1),
            backoff,
        })
    }

    fn shard_url(node: &str, object_id: &ObjectId, version_id: &VersionId, index: usize) -> String {
        format!(
            "{}/shards/{object_id}/{version_id}/{index}",
            node.trim_end_matches('/')
        )
    }

    /// Retry an operation on transport errors, backing off between attempts
    async fn with_retries<T, F, Fut>(&self, what: &str, op: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut delay = self.backoff;
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_not_found() => return Err(e),
                Err(e) if attempt >= self.attempts => return Err(e),
                Err(e) => {
                    warn!(attempt, error = %e, "{what} failed, retrying");
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                    attempt += 1;
                }
            }
        }
    }

    /// Upload one shard
    pub async fn put_shard(
        &self,
        node: &str,
        object_id: &ObjectId,
        version_id: &VersionId,
        index: usize,
        data: Bytes,
    ) -> Result<()> {
        let url = Self::shard_url(node, object_id, version_id, index);
        self.with_retries("shard upload", || {
            let data = data.clone();
            let url = url.clone();
            async move {
                let resp = self
                    .http
                    .put(&url)
                    .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
                    .body(data)
                    .send()
                    .await
                    .map_err(|e| Error::transport(e.to_string()))?;
                if resp.status().is_success() {
                    Ok(())
                } else {
                    Err(Error::transport(format!(
                        "storage node returned {} for {url}",
                        resp.status()
                    )))
                }
            }
        })
        .await
    }

    /// Download one shard
    pub async fn get_shard(
        &self,
        node: &str,
        object_id: &ObjectId,
        version_id: &VersionId,
        index: usize,
    ) -> Result<Vec<u8>> {
        let url = Self::shard_url(node, object_id, version_id, index);
        self.with_retries("shard download", || {
            let url = url.clone();
            async move {
                let resp = self
                    .http
                    .get(&url)
                    .send()
                    .await
                    .map_err(|e| Error::transport(e.to_string()))?;
                if resp.status() == reqwest::StatusCode::NOT_FOUND {
                    return Err(Error::ShardNotFound {
                        object: object_id.to_string(),
                        version: version_id.to_string(),
                        shard: index,
                    });
                }
                if !resp.status().is_success() {
                    return Err(Error::transport(format!(
                        "storage node returned {} for {url}",
                        resp.status()
                    )));
                }
                let body = resp
                    .bytes()
                    .await
                    .map_err(|e| Error::transport(e.to_string()))?;
                Ok(body.to_vec())
            }
        })
        .await
    }

    /// Delete one shard; a missing shard counts as deleted
    pub async fn delete_shard(
        &self,
        node: &str,
        object_id: &ObjectId,
        version_id: &VersionId,
        index: usize,
    ) -> Result<()> {
        let url = Self::shard_url(node, object_id, version_id, index);
        self.with_retries("shard delete", || {
            let url = url.clone();
            async move {
                let resp = self
                    .http
                    .delete(&url)
                    .send()
                    .await
                    .map_err(|e| Error::transport(e.to_string()))?;
                if resp.status().is_success() || resp.status() == reqwest::StatusCode::NOT_FOUND {
                    Ok(())
                } else {
                    Err(Error::transport(format!(
                        "storage node returned {} for {url}",
                        resp.status()
                    )))
                }
            }
        })
        .await
    }

    /// Ask a storage node whether it holds a shard
    pub async fn verify_shard(
        &self,
        node: &str,
        object_id: &ObjectId,
        version_id: &VersionId,
        index: usize,
    ) -> Result<bool> {
        let url = format!(
            "{}/verify/{object_id}/{version_id}/{index}",
            node.trim_end_matches('/')
        );
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::transport(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(Error::transport(format!(
                "storage node returned {} for {url}",
                resp.status()
            )));
        }
        let body: VerifyResponse = resp
            .json()
            .await
            .map_err(|e| Error::transport(e.to_string()))?;
        Ok(body.exists)
    }
}
