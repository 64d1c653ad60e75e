//! Pull-based peer gossip
//!
//! Every participant keeps a bounded peer list. Periodically it picks one
//! random known peer, fetches that peer's list, and merges new entries up
//! to the cap. Entries are plain (id, address) pairs; no vector clocks.

use coffer_common::NodeId;
use parking_lot::RwLock;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Default bound on the peer list
pub const PEER_CAP: usize = 50;

/// Default gossip pull cadence
pub const GOSSIP_INTERVAL: Duration = Duration::from_secs(10);

/// One known peer
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Peer {
    pub node_id: NodeId,
    pub address: String,
}

/// Bounded list of known peers
pub struct PeerList {
    peers: RwLock<Vec<Peer>>,
    cap: usize,
}

impl Default for PeerList {
    fn default() -> Self {
        Self::new(PEER_CAP)
    }
}

impl PeerList {
    #[must_use]
    pub fn new(cap: usize) -> Self {
        Self {
            peers: RwLock::new(Vec::new()),
            cap,
        }
    }

    /// Add one peer if it is new and the cap allows
    pub fn register(&self, peer: Peer) -> bool {
        let mut peers = self.peers.write();
        if peers.len() >= self.cap || peers.iter().any(|p| p.node_id == peer.node_id) {
            return false;
        }
        peers.push(peer);
        true
    }

    /// Snapshot of the current list
    pub fn peers(&self) -> Vec<Peer> {
        self.peers.read().clone()
    }

    /// Merge a remote list, deduplicating by node id; returns added count
    pub fn merge(&self, remote: Vec<Peer>) -> usize {
        let mut peers = self.peers.write();
        let mut added = 0;
        for peer in remote {
            if peers.len() >= self.cap {
                break;
            }
            if !peers.iter().any(|p| p.node_id == peer.node_id) {
                peers.push(peer);
                added += 1;
            }
        }
        added
    }

    /// One random known peer
    pub fn pick_random(&self) -> Option<Peer> {
        self.peers.read().choose(&mut rand::thread_rng()).cloned()
    }

    pub fn len(&self) -> usize {
        self.peers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.read().is_empty()
    }
}

/// Gossip pull loop: fetch a random peer's list and merge it
pub async fn run_gossip(peers: Arc<PeerList>, http: reqwest::Client, interval: Duration) {
    loop {
        tokio::time::sleep(interval).await;
        let Some(target) = peers.pick_random() else {
            continue;
        };
        let url = format!("{}/gossip/peers", target.address.trim_end_matches('/'));
        match http.get(&url).send().await {
            Ok(resp) => match resp.json::<Vec<Peer>>().await {
                Ok(remote) => {
                    let added = peers.merge(remote);
                    if added > 0 {
                        debug!(from = %target.node_id, added, "gossip merged new peers");
                    }
                }
                Err(e) => warn!(from = %target.node_id, error = %e, "gossip body unreadable"),
            },
            Err(e) => warn!(from = %target.node_id, error = %e, "gossip pull failed"),
        }
    }
}
