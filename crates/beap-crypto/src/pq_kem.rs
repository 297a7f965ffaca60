//! Post-quantum key encapsulation using round-3 Kyber768
//!
//! This is the pre-standard Kyber, not FIPS 203 ML-KEM; the two are not
//! byte-compatible, so headers name it `Kyber768`.
//!
//! Private packages always carry a KEM ciphertext; the shared secret it
//! encapsulates forms the first half of the hybrid secret. The [`PqKem`]
//! trait is the seam the builder depends on, so hosts without a working PQ
//! backend report themselves unavailable instead of silently degrading.
//!
//! ## Key Sizes (Kyber768)
//!
//! - Encapsulation key (public): 1,184 bytes
//! - Decapsulation key (private): 2,400 bytes
//! - Ciphertext: 1,088 bytes
//! - Shared secret: 32 bytes

use std::sync::OnceLock;

use pqcrypto_kyber::kyber768;
use pqcrypto_traits::kem::{Ciphertext as _, PublicKey as _, SecretKey as _, SharedSecret as _};
use tracing::{debug, warn};

use crate::error::{CryptoError, CryptoResult};
use crate::secure_bytes::SecureBytes;

/// Size of the Kyber768 encapsulation key (public) in bytes
pub const PQ_ENCAPSULATION_KEY_SIZE: usize = kyber768::public_key_bytes();

/// Size of the Kyber768 decapsulation key (private) in bytes
pub const PQ_DECAPSULATION_KEY_SIZE: usize = kyber768::secret_key_bytes();

/// Size of the Kyber768 ciphertext in bytes
pub const PQ_CIPHERTEXT_SIZE: usize = kyber768::ciphertext_bytes();

/// Size of the shared secret in bytes
pub const PQ_SHARED_SECRET_SIZE: usize = kyber768::shared_secret_bytes();

/// Wire name of the KEM recorded in package headers
pub const PQ_KEM_ALGORITHM: &str = "Kyber768";

/// Result of encapsulating to a peer
pub struct PqEncapsulation {
    /// Ciphertext to transmit so the peer can decapsulate
    pub ciphertext: Vec<u8>,
    /// Shared secret (zeroized on drop)
    pub shared_secret: SecureBytes,
}

impl std::fmt::Debug for PqEncapsulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PqEncapsulation")
            .field("ciphertext_len", &self.ciphertext.len())
            .finish_non_exhaustive()
    }
}

/// Post-quantum KEM backend
pub trait PqKem: Send + Sync {
    /// Algorithm name recorded in the header
    fn algorithm(&self) -> &'static str;

    /// Last known availability, if a probe has completed
    fn cached_availability(&self) -> Option<bool>;

    /// Authoritative availability check
    fn probe(&self) -> bool;

    /// Encapsulate a fresh shared secret to the peer's public key
    fn encapsulate(&self, peer_public_key: &[u8]) -> CryptoResult<PqEncapsulation>;
}

/// Kyber768 backend using pqcrypto
///
/// The first probe runs a full keygen/encapsulate/decapsulate self-test and
/// caches the outcome.
#[derive(Debug, Default)]
pub struct Kyber768Kem {
    available: OnceLock<bool>,
}

impl Kyber768Kem {
    /// Create a backend whose availability has not been probed yet
    pub fn new() -> Self {
        Self::default()
    }

    fn self_test() -> bool {
        let keypair = PQKemKeyPair::generate();
        let (ciphertext, sent) = keypair.encapsulation_key().encapsulate();
        match keypair.decapsulate(&ciphertext) {
            Ok(received) => received == sent,
            Err(e) => {
                warn!(error = %e, "Kyber768 self-test failed");
                false
            }
        }
    }
}

impl PqKem for Kyber768Kem {
    fn algorithm(&self) -> &'static str {
        PQ_KEM_ALGORITHM
    }

    fn cached_availability(&self) -> Option<bool> {
        self.available.get().copied()
    }

    fn probe(&self) -> bool {
        *self.available.get_or_init(|| {
            let ok = Self::self_test();
            debug!(available = ok, "Probed Kyber768 backend");
            ok
        })
    }

    fn encapsulate(&self, peer_public_key: &[u8]) -> CryptoResult<PqEncapsulation> {
        if !self.probe() {
            return Err(CryptoError::PQUnavailable(
                "Kyber768 self-test failed on this host".to_string(),
            ));
        }
        let key = PQEncapsulationKey::from_bytes(peer_public_key)?;
        let (ciphertext, shared_secret) = key.encapsulate();
        Ok(PqEncapsulation {
            ciphertext: ciphertext.into_bytes(),
            shared_secret: SecureBytes::new(shared_secret.to_vec()),
        })
    }
}

/// Backend that reports no post-quantum support
///
/// Stands in for hosts without a PQ implementation.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableKem;

impl PqKem for UnavailableKem {
    fn algorithm(&self) -> &'static str {
        PQ_KEM_ALGORITHM
    }

    fn cached_availability(&self) -> Option<bool> {
        Some(false)
    }

    fn probe(&self) -> bool {
        false
    }

    fn encapsulate(&self, _peer_public_key: &[u8]) -> CryptoResult<PqEncapsulation> {
        Err(CryptoError::PQUnavailable(
            "no post-quantum KEM backend on this host".to_string(),
        ))
    }
}

/// Post-quantum KEM key pair using Kyber768
///
/// Held by the receiving side to decapsulate package KEM ciphertexts.
#[derive(Clone)]
pub struct PQKemKeyPair {
    encapsulation_key: kyber768::PublicKey,
    decapsulation_key: kyber768::SecretKey,
}

impl PQKemKeyPair {
    /// Generate a new random KEM key pair
    pub fn generate() -> Self {
        let (encapsulation_key, decapsulation_key) = kyber768::keypair();
        Self {
            encapsulation_key,
            decapsulation_key,
        }
    }

    /// Create from decapsulation key bytes and encapsulation key bytes
    pub fn from_keypair_bytes(dk_bytes: &[u8], ek_bytes: &[u8]) -> CryptoResult<Self> {
        if dk_bytes.len() != PQ_DECAPSULATION_KEY_SIZE {
            return Err(CryptoError::InvalidKey(format!(
                "Invalid decapsulation key size: expected {}, got {}",
                PQ_DECAPSULATION_KEY_SIZE,
                dk_bytes.len()
            )));
        }

        let decapsulation_key = kyber768::SecretKey::from_bytes(dk_bytes).map_err(|e| {
            CryptoError::InvalidKey(format!("Invalid Kyber decapsulation key: {:?}", e))
        })?;
        let encapsulation_key = PQEncapsulationKey::from_bytes(ek_bytes)?.key;

        Ok(Self {
            encapsulation_key,
            decapsulation_key,
        })
    }

    /// Export full keypair bytes for storage
    ///
    /// Returns (decapsulation_key_bytes, encapsulation_key_bytes)
    pub fn to_keypair_bytes(&self) -> (SecureBytes, Vec<u8>) {
        (
            SecureBytes::new(self.decapsulation_key.as_bytes().to_vec()),
            self.encapsulation_key.as_bytes().to_vec(),
        )
    }

    /// Get the public encapsulation key
    pub fn encapsulation_key(&self) -> PQEncapsulationKey {
        PQEncapsulationKey {
            key: self.encapsulation_key.clone(),
        }
    }

    /// Get the raw encapsulation key bytes
    pub fn encapsulation_key_bytes(&self) -> Vec<u8> {
        self.encapsulation_key.as_bytes().to_vec()
    }

    /// Decapsulate a ciphertext to recover the shared secret
    pub fn decapsulate(&self, ciphertext: &PQCiphertext) -> CryptoResult<[u8; PQ_SHARED_SECRET_SIZE]> {
        let ct = kyber768::Ciphertext::from_bytes(&ciphertext.bytes).map_err(|e| {
            CryptoError::PQDecapsulationFailed(format!("Invalid ciphertext: {:?}", e))
        })?;

        let shared_secret = kyber768::decapsulate(&ct, &self.decapsulation_key);

        let mut result = [0u8; PQ_SHARED_SECRET_SIZE];
        result.copy_from_slice(shared_secret.as_bytes());
        Ok(result)
    }
}

impl std::fmt::Debug for PQKemKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PQKemKeyPair")
            .field("encapsulation_key", &hex::encode(&self.encapsulation_key_bytes()[..8]))
            .finish_non_exhaustive()
    }
}

/// Public encapsulation key for KEM
#[derive(Clone)]
pub struct PQEncapsulationKey {
    key: kyber768::PublicKey,
}

impl PQEncapsulationKey {
    /// Create from bytes
    pub fn from_bytes(bytes: &[u8]) -> CryptoResult<Self> {
        if bytes.len() != PQ_ENCAPSULATION_KEY_SIZE {
            return Err(CryptoError::InvalidKey(format!(
                "Invalid encapsulation key size: expected {}, got {}",
                PQ_ENCAPSULATION_KEY_SIZE,
                bytes.len()
            )));
        }

        let key = kyber768::PublicKey::from_bytes(bytes).map_err(|e| {
            CryptoError::InvalidKey(format!("Invalid Kyber encapsulation key: {:?}", e))
        })?;

        Ok(Self { key })
    }

    /// Export to bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        self.key.as_bytes().to_vec()
    }

    /// Encapsulate a random shared secret
    ///
    /// Send the ciphertext to the key owner; they can decapsulate to get the same secret.
    pub fn encapsulate(&self) -> (PQCiphertext, [u8; PQ_SHARED_SECRET_SIZE]) {
        let (shared_secret, ciphertext) = kyber768::encapsulate(&self.key);

        let ct = PQCiphertext {
            bytes: ciphertext.as_bytes().to_vec(),
        };

        let mut result = [0u8; PQ_SHARED_SECRET_SIZE];
        result.copy_from_slice(shared_secret.as_bytes());

        (ct, result)
    }
}

impl std::fmt::Debug for PQEncapsulationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PQEncapsulationKey")
            .field("id", &hex::encode(&self.to_bytes()[..8]))
            .finish()
    }
}

/// A KEM ciphertext
#[derive(Debug, Clone)]
pub struct PQCiphertext {
    bytes: Vec<u8>,
}

impl PQCiphertext {
    /// Create from raw bytes
    pub fn from_bytes(bytes: Vec<u8>) -> CryptoResult<Self> {
        if bytes.len() != PQ_CIPHERTEXT_SIZE {
            return Err(CryptoError::InvalidPQCiphertext(format!(
                "Invalid ciphertext size: expected {}, got {}",
                PQ_CIPHERTEXT_SIZE,
                bytes.len()
            )));
        }
        Ok(Self { bytes })
    }

    /// Export to bytes
    pub fn to_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Get owned bytes
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}
