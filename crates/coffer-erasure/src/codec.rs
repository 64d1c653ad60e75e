//! Reed-Solomon encoder/decoder
//!
//! Splits a byte payload into `k` data shards plus `m` parity shards; any
//! `k` of the `k + m` shards reconstruct the payload. The payload is
//! length-prefixed before padding so `decode` needs no out-of-band size.

use coffer_common::{Error as CommonError, ErasureParams, Result};
use reed_solomon_simd::{ReedSolomonDecoder, ReedSolomonEncoder};
use thiserror::Error;

/// Length prefix bytes prepended to the payload before splitting
const LEN_PREFIX: usize = 8;

/// Minimum shard size; keeps tiny payloads SIMD-friendly
const MIN_SHARD_SIZE: usize = 64;

/// Errors specific to erasure coding operations
#[derive(Debug, Error)]
pub enum ErasureError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("encoding failed: {0}")]
    EncodingFailed(String),

    #[error("decoding failed: {0}")]
    DecodingFailed(String),

    #[error("insufficient shards: missing {missing}, need {required}")]
    InsufficientShards { missing: usize, required: usize },

    #[error("shard size mismatch")]
    ShardSizeMismatch,
}

impl From<ErasureError> for CommonError {
    fn from(e: ErasureError) -> Self {
        match e {
            ErasureError::InsufficientShards { missing, required } => {
                Self::InsufficientShards { missing, required }
            }
            other => Self::ErasureCoding(other.to_string()),
        }
    }
}

/// `(k, m)` Reed-Solomon codec
///
/// Parameters are fixed per deployment; shards produced under one `(k, m)`
/// cannot be decoded under another.
pub struct ErasureCodec {
    data_shards: usize,
    parity_shards: usize,
}

impl ErasureCodec {
    /// Create a new codec with the given parameters
    pub fn new(params: ErasureParams) -> Result<Self> {
        if params.data_shards == 0 {
            return Err(ErasureError::InvalidConfig("data_shards must be > 0".into()).into());
        }
        if params.parity_shards == 0 {
            return Err(ErasureError::InvalidConfig("parity_shards must be > 0".into()).into());
        }
        if params.total_shards() > 255 {
            return Err(ErasureError::InvalidConfig("total shards must be <= 255".into()).into());
        }
        Ok(Self {
            data_shards: params.data_shards as usize,
            parity_shards: params.parity_shards as usize,
        })
    }

    /// Number of data shards (k)
    #[must_use]
    pub const fn data_shards(&self) -> usize {
        self.data_shards
    }

    /// Number of parity shards (m)
    #[must_use]
    pub const fn parity_shards(&self) -> usize {
        self.parity_shards
    }

    /// Total number of shards (k + m)
    #[must_use]
    pub const fn total_shards(&self) -> usize {
        self.data_shards + self.parity_shards
    }

    /// Encode a payload into `k + m` equal-length shards
    pub fn encode(&self, data: &[u8]) -> Result<Vec<Vec<u8>>> {
        let k = self.data_shards;
        let m = self.parity_shards;

        // Prefix the payload with its length, then pad to k equal shards.
        // Shard size must be even for the SIMD field arithmetic.
        let framed_len = LEN_PREFIX + data.len();
        let shard_size = framed_len.div_ceil(k).next_multiple_of(2).max(MIN_SHARD_SIZE);

        let mut padded = vec![0u8; shard_size * k];
        padded[..LEN_PREFIX].copy_from_slice(&(data.len() as u64).to_le_bytes());
        padded[LEN_PREFIX..framed_len].copy_from_slice(data);

        let data_refs: Vec<&[u8]> = padded.chunks(shard_size).collect();

        let mut encoder = ReedSolomonEncoder::new(k, m, shard_size)
            .map_err(|e| ErasureError::InvalidConfig(e.to_string()))?;
        for shard in &data_refs {
            encoder
                .add_original_shard(shard)
                .map_err(|e| ErasureError::EncodingFailed(e.to_string()))?;
        }
        let encoded = encoder
            .encode()
            .map_err(|e| ErasureError::EncodingFailed(e.to_string()))?;

        let mut shards: Vec<Vec<u8>> = Vec::with_capacity(k + m);
        for shard in &data_refs {
            shards.push(shard.to_vec());
        }
        for parity in encoded.recovery_iter() {
            shards.push(parity.to_vec());
        }
        Ok(shards)
    }

    /// Decode shards back to the original payload
    ///
    /// `None` entries are missing shards. At least `k` shards must be
    /// present; missing data shards are reconstructed from parity.
    pub fn decode(&self, shards: &[Option<Vec<u8>>]) -> Result<Vec<u8>> {
        let k = self.data_shards;
        let m = self.parity_shards;

        if shards.len() != k + m {
            return Err(ErasureError::InvalidConfig(format!(
                "expected {} shards, got {}",
                k + m,
                shards.len()
            ))
            .into());
        }

        let available = shards.iter().filter(|s| s.is_some()).count();
        if available < k {
            return Err(ErasureError::InsufficientShards {
                missing: k + m - available,
                required: k,
            }
            .into());
        }

        let shard_size = shards
            .iter()
            .find_map(|s| s.as_ref().map(Vec::len))
            .ok_or(ErasureError::InsufficientShards {
                missing: k + m,
                required: k,
            })?;
        if shards
            .iter()
            .flatten()
            .any(|s| s.len() != shard_size)
        {
            return Err(ErasureError::ShardSizeMismatch.into());
        }

        // Fast path: all data shards present, no reconstruction needed
        if shards[..k].iter().all(Option::is_some) {
            let mut framed = Vec::with_capacity(k * shard_size);
            for shard in shards.iter().take(k).flatten() {
                framed.extend_from_slice(shard);
            }
            return unframe(&framed);
        }

        let mut decoder = ReedSolomonDecoder::new(k, m, shard_size)
            .map_err(|e| ErasureError::InvalidConfig(e.to_string()))?;

        for (i, shard) in shards.iter().enumerate().take(k) {
            if let Some(data) = shard {
                decoder
                    .add_original_shard(i, data)
                    .map_err(|e| ErasureError::DecodingFailed(e.to_string()))?;
            }
        }
        for i in 0..m {
            if let Some(data) = &shards[k + i] {
                decoder
                    .add_recovery_shard(i, data)
                    .map_err(|e| ErasureError::DecodingFailed(e.to_string()))?;
            }
        }

        let restored = decoder
            .decode()
            .map_err(|e| ErasureError::DecodingFailed(e.to_string()))?;

        let mut framed = Vec::with_capacity(k * shard_size);
        for (i, shard) in shards.iter().enumerate().take(k) {
            if let Some(data) = shard {
                framed.extend_from_slice(data);
            } else if let Some(data) = restored.restored_original(i) {
                framed.extend_from_slice(data);
            } else {
                return Err(
                    ErasureError::DecodingFailed(format!("failed to restore data shard {i}"))
                        .into(),
                );
            }
        }
        unframe(&framed)
    }
}

/// Strip the length prefix and padding from joined data shards
fn unframe(framed: &[u8]) -> Result<Vec<u8>> {
    if framed.len() < LEN_PREFIX {
        return Err(ErasureError::DecodingFailed("framed payload too short".into()).into());
    }
    let len_bytes: [u8; LEN_PREFIX] = framed[..LEN_PREFIX].try_into().expect("prefix length");
    let len = u64::from_le_bytes(len_bytes) as usize;
    if len > framed.len() - LEN_PREFIX {
        return Err(ErasureError::DecodingFailed("corrupt length prefix".into()).into());
    }
    Ok(framed[LEN_PREFIX..LEN_PREFIX + len].to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> ErasureCodec {
        ErasureCodec::new(ErasureParams::new(4, 2)).unwrap()
    }

    #[test]
    fn test_encode_shape() {
        let shards = codec().encode(b"hello").unwrap();
        assert_eq!(shards.len(), 6);
        let size = shards[0].len();
        assert!(size >= 64);
        assert_eq!(size % 2, 0);
        assert!(shards.iter().all(|s| s.len() == size));
    }

    #[test]
    fn test_round_trip_all_present() {
        let data = b"Hello, World! This is a test of erasure coding.";
        let shards: Vec<_> = codec().encode(data).unwrap().into_iter().map(Some).collect();
        assert_eq!(codec().decode(&shards).unwrap(), data);
    }

    #[test]
    fn test_round_trip_with_losses() {
        let data: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        let encoded = codec().encode(&data).unwrap();

        // Any m losses are tolerated; try a data shard and a parity shard
        let mut shards: Vec<_> = encoded.clone().into_iter().map(Some).collect();
        shards[1] = None;
        shards[4] = None;
        assert_eq!(codec().decode(&shards).unwrap(), data);

        // Two data shards lost
        let mut shards: Vec<_> = encoded.into_iter().map(Some).collect();
        shards[0] = None;
        shards[3] = None;
        assert_eq!(codec().decode(&shards).unwrap(), data);
    }

    #[test]
    fn test_too_many_losses() {
        let encoded = codec().encode(b"payload").unwrap();
        let mut shards: Vec<_> = encoded.into_iter().map(Some).collect();
        shards[0] = None;
        shards[2] = None;
        shards[5] = None;
        let err = codec().decode(&shards).unwrap_err();
        assert!(matches!(
            err,
            CommonError::InsufficientShards {
                missing: 3,
                required: 4
            }
        ));
    }

    #[test]
    fn test_empty_payload_round_trips() {
        let shards: Vec<_> = codec().encode(b"").unwrap().into_iter().map(Some).collect();
        assert_eq!(codec().decode(&shards).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_length_not_multiple_of_k() {
        // 257 bytes over k=4 forces internal padding
        let data = vec![0xABu8; 257];
        let mut shards: Vec<_> = codec().encode(&data).unwrap().into_iter().map(Some).collect();
        shards[2] = None;
        assert_eq!(codec().decode(&shards).unwrap(), data);
    }

    #[test]
    fn test_invalid_params() {
        assert!(ErasureCodec::new(ErasureParams::new(0, 2)).is_err());
        assert!(ErasureCodec::new(ErasureParams::new(4, 0)).is_err());
        assert!(ErasureCodec::new(ErasureParams::new(200, 100)).is_err());
    }

    #[test]
    fn test_shard_size_mismatch() {
        let encoded = codec().encode(b"payload").unwrap();
        let mut shards: Vec<_> = encoded.into_iter().map(Some).collect();
        shards[1].as_mut().unwrap().push(0);
        assert!(codec().decode(&shards).is_err());
    }

    #[test]
    fn test_wrong_shard_count() {
        let mut shards: Vec<_> = codec().encode(b"x").unwrap().into_iter().map(Some).collect();
        shards.pop();
        assert!(codec().decode(&shards).is_err());
    }
}
