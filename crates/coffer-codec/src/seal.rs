//! Authenticated encryption for version payloads
//!
//! AES-GCM with the variant chosen by key length (16/24/32 bytes). The
//! fresh random nonce is prepended to the ciphertext, so sealed payloads are
//! self-contained: `nonce || ciphertext+tag`.

use aes::Aes192;
use aes_gcm::aead::consts::U12;
use aes_gcm::aead::{Aead, OsRng};
use aes_gcm::{AeadCore, Aes128Gcm, Aes256Gcm, AesGcm, KeyInit, Nonce};
use coffer_common::{Error, Result};

/// AES-192-GCM (aes-gcm only aliases the 128 and 256 variants)
type Aes192Gcm = AesGcm<Aes192, U12>;

/// GCM nonce length in bytes
pub const NONCE_LEN: usize = 12;

enum CipherKind {
    Aes128(Box<Aes128Gcm>),
    Aes192(Box<Aes192Gcm>),
    Aes256(Box<Aes256Gcm>),
}

/// Seals and opens version payloads with a deployment-wide key
pub struct Sealer {
    cipher: CipherKind,
}

impl Sealer {
    /// Create a sealer from a raw key
    ///
    /// Key length selects AES-128/192/256; anything else is a configuration
    /// error (callers validate at startup via `Config::encryption_key_bytes`).
    pub fn new(key: &[u8]) -> Result<Self> {
        let cipher = match key.len() {
            16 => CipherKind::Aes128(Box::new(
                Aes128Gcm::new_from_slice(key)
                    .map_err(|e| Error::configuration(e.to_string()))?,
            )),
            24 => CipherKind::Aes192(Box::new(
                Aes192Gcm::new_from_slice(key)
                    .map_err(|e| Error::configuration(e.to_string()))?,
            )),
            32 => CipherKind::Aes256(Box::new(
                Aes256Gcm::new_from_slice(key)
                    .map_err(|e| Error::configuration(e.to_string()))?,
            )),
            n => {
                return Err(Error::configuration(format!(
                    "AEAD key must be 16, 24, or 32 bytes, got {n}"
                )));
            }
        };
        Ok(Self { cipher })
    }

    /// Encrypt, returning `nonce || ciphertext`
    pub fn seal(&self, plain: &[u8]) -> Result<Vec<u8>> {
        let nonce = Aes128Gcm::generate_nonce(&mut OsRng);
        let sealed = match &self.cipher {
            CipherKind::Aes128(c) => c.encrypt(&nonce, plain),
            CipherKind::Aes192(c) => c.encrypt(&nonce, plain),
            CipherKind::Aes256(c) => c.encrypt(&nonce, plain),
        }
        .map_err(|_| Error::EncryptionFailed("AEAD seal failed".into()))?;

        let mut out = Vec::with_capacity(NONCE_LEN + sealed.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&sealed);
        Ok(out)
    }

    /// Verify and decrypt a sealed payload
    ///
    /// Truncated input or a tag mismatch is `IntegrityFailure`; there is no
    /// best-effort plaintext.
    pub fn open(&self, data: &[u8]) -> Result<Vec<u8>> {
        if data.len() < NONCE_LEN {
            return Err(Error::IntegrityFailure);
        }
        let (nonce, sealed) = data.split_at(NONCE_LEN);
        let nonce = Nonce::from_slice(nonce);
        match &self.cipher {
            CipherKind::Aes128(c) => c.decrypt(nonce, sealed),
            CipherKind::Aes192(c) => c.decrypt(nonce, sealed),
            CipherKind::Aes256(c) => c.decrypt(nonce, sealed),
        }
        .map_err(|_| Error::IntegrityFailure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seal_open_all_key_sizes() {
        for len in [16, 24, 32] {
            let key = vec![7u8; len];
            let sealer = Sealer::new(&key).unwrap();
            let sealed = sealer.seal(b"payload bytes").unwrap();
            assert_eq!(sealer.open(&sealed).unwrap(), b"payload bytes");
        }
    }

    #[test]
    fn test_nonce_is_fresh() {
        let sealer = Sealer::new(&[0u8; 32]).unwrap();
        let a = sealer.seal(b"same input").unwrap();
        let b = sealer.seal(b"same input").unwrap();
        assert_ne!(a, b);
        assert_ne!(a[..NONCE_LEN], b[..NONCE_LEN]);
    }

    #[test]
    fn test_invalid_key_length() {
        assert!(Sealer::new(&[0u8; 15]).is_err());
        assert!(Sealer::new(&[0u8; 33]).is_err());
        assert!(Sealer::new(&[]).is_err());
    }

    #[test]
    fn test_wrong_key_fails_closed() {
        let sealer = Sealer::new(&[1u8; 32]).unwrap();
        let other = Sealer::new(&[2u8; 32]).unwrap();
        let sealed = sealer.seal(b"secret").unwrap();
        assert!(matches!(
            other.open(&sealed),
            Err(Error::IntegrityFailure)
        ));
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let sealer = Sealer::new(&[1u8; 16]).unwrap();
        let mut sealed = sealer.seal(b"secret").unwrap();
        let last = sealed.len() - 1;
        sealed[last] ^= 0xFF;
        assert!(matches!(
            sealer.open(&sealed),
            Err(Error::IntegrityFailure)
        ));
    }

    #[test]
    fn test_truncated_input_fails() {
        let sealer = Sealer::new(&[1u8; 16]).unwrap();
        assert!(matches!(
            sealer.open(&[0u8; NONCE_LEN - 1]),
            Err(Error::IntegrityFailure)
        ));
    }

    #[test]
    fn test_empty_payload_round_trips() {
        let sealer = Sealer::new(&[9u8; 24]).unwrap();
        let sealed = sealer.seal(b"").unwrap();
        assert_eq!(sealer.open(&sealed).unwrap(), Vec::<u8>::new());
    }
}
