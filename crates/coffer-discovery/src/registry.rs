//! Soft-state node registry
//!
//! Membership here is advisory only: entries appear when a node heartbeats
//! and evaporate when it stops. Correctness never depends on two observers
//! agreeing on the registry contents; the pipelines treat every shard
//! operation as possibly-failing regardless of what lookup returned.

use coffer_common::{NodeId, NodeType};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::debug;

/// Default time after which a silent node is dropped
pub const STALE_TTL: Duration = Duration::from_secs(120);

/// Default sweep cadence
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

fn epoch_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// One registered node
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeEntry {
    pub node_id: NodeId,
    pub node_type: NodeType,
    pub address: String,
    /// Epoch seconds of the last heartbeat
    pub last_seen: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub free_bytes: Option<u64>,
}

/// Heartbeat body posted to `/register`
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Registration {
    pub node_id: NodeId,
    pub node_type: NodeType,
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub free_space: Option<u64>,
}

/// In-memory registry of live nodes
#[derive(Default)]
pub struct NodeRegistry {
    nodes: RwLock<HashMap<NodeId, NodeEntry>>,
}

impl NodeRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a heartbeat, stamping `last_seen` with the current time
    pub fn register(&self, reg: Registration) {
        let entry = NodeEntry {
            node_id: reg.node_id.clone(),
            node_type: reg.node_type,
            address: reg.address,
            last_seen: epoch_secs(),
            free_bytes: reg.free_space,
        };
        self.insert(entry);
    }

    /// Insert a pre-built entry (last-writer-wins on `last_seen`)
    pub fn insert(&self, entry: NodeEntry) {
        self.nodes.write().insert(entry.node_id.clone(), entry);
    }

    /// All current entries, ordered by node id
    pub fn nodes(&self) -> Vec<NodeEntry> {
        let mut all: Vec<_> = self.nodes.read().values().cloned().collect();
        all.sort_by(|a, b| a.node_id.cmp(&b.node_id));
        all
    }

    /// Addresses of live storage nodes, ordered by node id
    ///
    /// The order is stable within one call; callers must not treat it as
    /// part of any object's identity.
    pub fn storage_nodes(&self) -> Vec<NodeEntry> {
        let mut storage: Vec<_> = self
            .nodes
            .read()
            .values()
            .filter(|n| n.node_type == NodeType::Storage)
            .cloned()
            .collect();
        storage.sort_by(|a, b| a.node_id.cmp(&b.node_id));
        storage
    }

    /// Number of registered nodes
    pub fn len(&self) -> usize {
        self.nodes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.read().is_empty()
    }

    /// Drop entries whose last heartbeat is older than `ttl`
    pub fn sweep(&self, ttl: Duration) -> usize {
        let cutoff = epoch_secs() - ttl.as_secs() as i64;
        let mut nodes = self.nodes.write();
        let before = nodes.len();
        nodes.retain(|_, n| n.last_seen > cutoff);
        let removed = before - nodes.len();
        if removed > 0 {
            debug!(removed, "swept stale node entries");
        }
        removed
    }

    /// Background sweeper loop
    pub async fn run_sweeper(self: Arc<Self>, ttl: Duration, interval: Duration) {
        loop {
            tokio::time::sleep(interval).await;
            self.sweep(ttl);
        }
    }
}
