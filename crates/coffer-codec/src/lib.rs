//! Payload codec layer for Coffer
//!
//! Two concerns, applied in order on ingest and reversed on retrieval:
//! LZ4 frame compression and AES-GCM authenticated encryption with the
//! nonce prepended to the ciphertext.

pub mod compress;
pub mod seal;

pub use compress::{compress, decompress};
pub use seal::{NONCE_LEN, Sealer};
