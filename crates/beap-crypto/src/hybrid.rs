//! Hybrid shared secret
//!
//! The KDF input for a private package is the post-quantum shared secret
//! followed by the X25519 shared secret. Peers reconstruct it in exactly
//! this order; swapping the halves yields unrelated keys.

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::device_key::X25519_KEY_SIZE;
use crate::error::{CryptoError, CryptoResult};
use crate::pq_kem::PQ_SHARED_SECRET_SIZE;

/// Size of the hybrid secret in bytes
pub const HYBRID_SECRET_SIZE: usize = PQ_SHARED_SECRET_SIZE + X25519_KEY_SIZE;

/// PQ shared secret ‖ classical shared secret
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct HybridSecret([u8; HYBRID_SECRET_SIZE]);

impl HybridSecret {
    /// Concatenate the two shared secrets, PQ first
    pub fn combine(pq_shared: &[u8], classical_shared: &[u8]) -> CryptoResult<Self> {
        if pq_shared.len() != PQ_SHARED_SECRET_SIZE {
            return Err(CryptoError::KeyExchangeFailed(format!(
                "PQ shared secret must be {} bytes, got {}",
                PQ_SHARED_SECRET_SIZE,
                pq_shared.len()
            )));
        }
        if classical_shared.len() != X25519_KEY_SIZE {
            return Err(CryptoError::KeyExchangeFailed(format!(
                "X25519 shared secret must be {} bytes, got {}",
                X25519_KEY_SIZE,
                classical_shared.len()
            )));
        }

        let mut bytes = [0u8; HYBRID_SECRET_SIZE];
        bytes[..PQ_SHARED_SECRET_SIZE].copy_from_slice(pq_shared);
        bytes[PQ_SHARED_SECRET_SIZE..].copy_from_slice(classical_shared);
        Ok(Self(bytes))
    }

    /// Raw secret bytes
    pub fn as_bytes(&self) -> &[u8; HYBRID_SECRET_SIZE] {
        &self.0
    }
}

impl std::fmt::Debug for HybridSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("HybridSecret(..)")
    }
}
