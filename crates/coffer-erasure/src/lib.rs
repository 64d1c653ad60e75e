//! Erasure coding for Coffer
//!
//! Reed-Solomon `(k, m)` splitting and reconstruction over the
//! `reed-solomon-simd` backend.

pub mod codec;

pub use codec::{ErasureCodec, ErasureError};
