//! Merkle tree over shard hashes
//!
//! Leaves are SHA-256 digests of shard bytes; interior nodes hash the
//! concatenation of their children. Odd-width levels duplicate their last
//! node. A stored proof is the full sibling path bottom-up, so the root can
//! be recomputed from any single shard.

use coffer_common::{Error, Result};
use sha2::{Digest as _, Sha256};

/// A SHA-256 digest
pub type Digest = [u8; 32];

fn hash_leaf(shard: &[u8]) -> Digest {
    Sha256::digest(shard).into()
}

fn hash_pair(left: &Digest, right: &Digest) -> Digest {
    let mut hasher = Sha256::new();
    hasher.update(left);
    hasher.update(right);
    hasher.finalize().into()
}

/// Sibling index within a level, duplicating the last node on odd widths
fn sibling_index(index: usize, width: usize) -> usize {
    if index % 2 == 0 {
        if index + 1 < width { index + 1 } else { index }
    } else {
        index - 1
    }
}

/// Binary Merkle tree built over a version's shards
pub struct MerkleTree {
    /// `levels[0]` is the leaf level; the last level holds only the root
    levels: Vec<Vec<Digest>>,
}

impl MerkleTree {
    /// Build a tree from shard bytes
    pub fn build<S: AsRef<[u8]>>(shards: &[S]) -> Result<Self> {
        if shards.is_empty() {
            return Err(Error::bad_request("cannot build a Merkle tree over no shards"));
        }

        let mut levels = vec![shards.iter().map(|s| hash_leaf(s.as_ref())).collect::<Vec<_>>()];
        while levels.last().expect("at least one level").len() > 1 {
            let prev = levels.last().expect("at least one level");
            let next: Vec<Digest> = prev
                .chunks(2)
                .map(|pair| match pair {
                    [left, right] => hash_pair(left, right),
                    [only] => hash_pair(only, only),
                    _ => unreachable!("chunks(2) yields 1 or 2 elements"),
                })
                .collect();
            levels.push(next);
        }
        Ok(Self { levels })
    }

    /// Number of leaves
    #[must_use]
    pub fn leaf_count(&self) -> usize {
        self.levels[0].len()
    }

    /// Root digest
    #[must_use]
    pub fn root(&self) -> Digest {
        self.levels.last().expect("at least one level")[0]
    }

    /// Inclusion proof for the shard at `index`
    pub fn proof(&self, index: usize) -> Result<InclusionProof> {
        if index >= self.leaf_count() {
            return Err(Error::bad_request(format!(
                "proof index {index} out of range for {} leaves",
                self.leaf_count()
            )));
        }
        let mut path = Vec::with_capacity(self.levels.len() - 1);
        let mut idx = index;
        for level in &self.levels[..self.levels.len() - 1] {
            path.push(level[sibling_index(idx, level.len())]);
            idx /= 2;
        }
        Ok(InclusionProof { index, path })
    }
}

/// Full sibling path proving one shard's inclusion under a root
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InclusionProof {
    /// Leaf index of the proven shard
    pub index: usize,
    /// Sibling digests, leaf level first
    pub path: Vec<Digest>,
}

impl InclusionProof {
    /// Hex encoding of the concatenated sibling path
    #[must_use]
    pub fn to_hex(&self) -> String {
        let mut out = String::with_capacity(self.path.len() * 64);
        for digest in &self.path {
            out.push_str(&hex::encode(digest));
        }
        out
    }

    /// Parse a hex-encoded path; the index comes from the placement key
    pub fn from_hex(index: usize, encoded: &str) -> Result<Self> {
        let bytes = hex::decode(encoded)
            .map_err(|e| Error::Serialization(format!("proof is not valid hex: {e}")))?;
        if bytes.len() % 32 != 0 {
            return Err(Error::Serialization(format!(
                "proof length {} is not a whole number of digests",
                bytes.len()
            )));
        }
        let path = bytes
            .chunks_exact(32)
            .map(|c| c.try_into().expect("chunk is 32 bytes"))
            .collect();
        Ok(Self { index, path })
    }

    /// Recompute the root implied by this proof over the given shard bytes
    #[must_use]
    pub fn compute_root(&self, shard: &[u8]) -> Digest {
        let mut current = hash_leaf(shard);
        let mut idx = self.index;
        for sibling in &self.path {
            current = if idx % 2 == 0 {
                hash_pair(&current, sibling)
            } else {
                hash_pair(sibling, &current)
            };
            idx /= 2;
        }
        current
    }

    /// Check the proof against an expected root
    #[must_use]
    pub fn verify(&self, shard: &[u8], root: &Digest) -> bool {
        self.compute_root(shard) == *root
    }
}
