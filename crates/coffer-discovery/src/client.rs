//! Client side of the discovery protocol
//!
//! Used by storage and construction nodes to heartbeat themselves into the
//! registry, and by the ingest pipeline to find live storage nodes.

use crate::registry::{NodeEntry, Registration};
use coffer_common::{Error, Result};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Default deadline for discovery calls
pub const DISCOVERY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
struct LookupEntry {
    address: String,
}

/// HTTP client for a discovery endpoint
pub struct DiscoveryClient {
    http: reqwest::Client,
    base_url: String,
}

impl DiscoveryClient {
    /// Create a client for the discovery service at `base_url`
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::transport(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Post one heartbeat
    pub async fn register(&self, reg: &Registration) -> Result<()> {
        let url = format!("{}/register", self.base_url);
        let resp = self
            .http
            .post(&url)
            .json(reg)
            .send()
            .await
            .map_err(|e| Error::transport(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(Error::transport(format!(
                "discovery register returned {}",
                resp.status()
            )));
        }
        Ok(())
    }

    /// Addresses of currently live storage nodes
    pub async fn lookup_storage_nodes(&self) -> Result<Vec<String>> {
        let url = format!("{}/lookup", self.base_url);
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::transport(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(Error::transport(format!(
                "discovery lookup returned {}",
                resp.status()
            )));
        }
        let entries: Vec<LookupEntry> = resp
            .json()
            .await
            .map_err(|e| Error::transport(e.to_string()))?;
        Ok(entries.into_iter().map(|e| e.address).collect())
    }

    /// The full registry contents
    pub async fn nodes(&self) -> Result<Vec<NodeEntry>> {
        let url = format!("{}/nodes", self.base_url);
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::transport(e.to_string()))?;
        resp.json().await.map_err(|e| Error::transport(e.to_string()))
    }

    /// Heartbeat loop; `make` rebuilds the registration each beat so
    /// free-space reporting stays current
    pub async fn run_heartbeat<F>(self: Arc<Self>, make: F, interval: Duration)
    where
        F: Fn() -> Registration + Send + Sync + 'static,
    {
        loop {
            let reg = make();
            match self.register(&reg).await {
                Ok(()) => debug!(node_id = %reg.node_id, "heartbeat sent"),
                Err(e) => warn!(node_id = %reg.node_id, error = %e, "heartbeat failed"),
            }
            tokio::time::sleep(interval).await;
        }
    }
}
