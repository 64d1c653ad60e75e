//! Inclusion proofs for Coffer shards
//!
//! One Merkle tree per version, one full-path proof per shard.

pub mod merkle;

pub use merkle::{Digest, InclusionProof, MerkleTree};
