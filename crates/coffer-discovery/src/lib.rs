//! Discovery and gossip fabric for Coffer
//!
//! A soft-state membership service: nodes heartbeat into a registry with a
//! TTL sweeper, and exchange peer lists through periodic pull gossip. The
//! registry only biases placement; nothing here is a consensus system.

pub mod client;
pub mod gossip;
pub mod registry;

pub use client::{DISCOVERY_TIMEOUT, DiscoveryClient};
pub use gossip::{GOSSIP_INTERVAL, PEER_CAP, Peer, PeerList, run_gossip};
pub use registry::{NodeEntry, NodeRegistry, Registration, STALE_TTL, SWEEP_INTERVAL};
