//! Ed25519 package signatures
//!
//! One signature covers the whole package: header, payload commitment and
//! artefact manifest. Verification needs only the embedded public key.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::RngCore;

use beap_core::KeyId;

use crate::error::{CryptoError, CryptoResult};
use crate::hash::key_id_for;
use crate::secure_bytes::SecureBytes;

/// Ed25519 secret key size
pub const SIGNING_KEY_SIZE: usize = 32;

/// Ed25519 public key size
pub const VERIFYING_KEY_SIZE: usize = 32;

/// Ed25519 signature size
pub const SIGNATURE_SIZE: usize = 64;

/// Wire name of the signature algorithm
pub const SIGNATURE_ALGORITHM: &str = "Ed25519";

/// Ed25519 signing keypair of the device identity
#[derive(Clone)]
pub struct SigningKeyPair {
    signing_key: SigningKey,
}

impl SigningKeyPair {
    /// Generate a new random signing keypair
    pub fn generate() -> Self {
        let mut bytes = [0u8; SIGNING_KEY_SIZE];
        rand::rng().fill_bytes(&mut bytes);
        Self {
            signing_key: SigningKey::from_bytes(&bytes),
        }
    }

    /// Restore from stored secret key bytes
    pub fn from_secret_bytes(bytes: &[u8]) -> CryptoResult<Self> {
        let array: [u8; SIGNING_KEY_SIZE] = bytes.try_into().map_err(|_| {
            CryptoError::InvalidKey(format!(
                "Ed25519 secret key must be {} bytes, got {}",
                SIGNING_KEY_SIZE,
                bytes.len()
            ))
        })?;
        Ok(Self {
            signing_key: SigningKey::from_bytes(&array),
        })
    }

    /// Export the secret key for storage
    ///
    /// WARNING: Keep this secret! Anyone with these bytes can sign as you.
    pub fn secret_bytes(&self) -> SecureBytes {
        SecureBytes::new(self.signing_key.to_bytes().to_vec())
    }

    /// Raw public key bytes
    pub fn public_key_bytes(&self) -> [u8; VERIFYING_KEY_SIZE] {
        self.signing_key.verifying_key().to_bytes()
    }

    /// Public key, base64 encoded
    pub fn public_key_b64(&self) -> String {
        STANDARD.encode(self.public_key_bytes())
    }

    /// Key id derived from the public key
    pub fn key_id(&self) -> KeyId {
        key_id_for(&self.public_key_bytes())
    }

    /// Sign a message
    pub fn sign(&self, message: &[u8]) -> [u8; SIGNATURE_SIZE] {
        self.signing_key.sign(message).to_bytes()
    }
}

impl std::fmt::Debug for SigningKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKeyPair")
            .field("key_id", &self.key_id())
            .finish_non_exhaustive()
    }
}

/// Verify an Ed25519 signature
pub fn verify_signature(public_key: &[u8], message: &[u8], signature: &[u8]) -> CryptoResult<()> {
    let key_bytes: [u8; VERIFYING_KEY_SIZE] = public_key.try_into().map_err(|_| {
        CryptoError::InvalidKey(format!(
            "Ed25519 public key must be {} bytes, got {}",
            VERIFYING_KEY_SIZE,
            public_key.len()
        ))
    })?;
    let verifying_key = VerifyingKey::from_bytes(&key_bytes)
        .map_err(|e| CryptoError::InvalidKey(format!("Invalid Ed25519 public key: {}", e)))?;

    let sig_bytes: [u8; SIGNATURE_SIZE] = signature
        .try_into()
        .map_err(|_| CryptoError::SignatureVerificationFailed)?;
    let signature = Signature::from_bytes(&sig_bytes);

    verifying_key
        .verify(message, &signature)
        .map_err(|_| CryptoError::SignatureVerificationFailed)
}
