//! X25519 device keys and classical key agreement
//!
//! Every device holds one long-lived X25519 keypair. The secret half never
//! leaves this module except as [`SecureBytes`] for persistence by a key store.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::RngCore;
use x25519_dalek::{PublicKey, StaticSecret};

use beap_core::KeyId;

use crate::error::{CryptoError, CryptoResult};
use crate::hash::key_id_for;
use crate::secure_bytes::SecureBytes;

/// X25519 key size (private and public)
pub const X25519_KEY_SIZE: usize = 32;

/// Long-lived X25519 device keypair
#[derive(Clone)]
pub struct DeviceKeyPair {
    secret: StaticSecret,
    public: PublicKey,
}

impl DeviceKeyPair {
    /// Generate a new random device keypair
    pub fn generate() -> Self {
        // x25519-dalek pins an older rand_core; feed it raw bytes instead
        let mut bytes = [0u8; X25519_KEY_SIZE];
        rand::rng().fill_bytes(&mut bytes);
        Self::from_secret_array(bytes)
    }

    /// Restore from stored secret key bytes
    pub fn from_secret_bytes(bytes: &[u8]) -> CryptoResult<Self> {
        let array: [u8; X25519_KEY_SIZE] = bytes.try_into().map_err(|_| {
            CryptoError::InvalidKey(format!(
                "X25519 private key must be {} bytes, got {}",
                X25519_KEY_SIZE,
                bytes.len()
            ))
        })?;
        Ok(Self::from_secret_array(array))
    }

    fn from_secret_array(bytes: [u8; X25519_KEY_SIZE]) -> Self {
        let secret = StaticSecret::from(bytes);
        let public = PublicKey::from(&secret);
        Self { secret, public }
    }

    /// Export the secret key for storage
    ///
    /// WARNING: Keep this secret! The returned SecureBytes zeroizes on drop.
    pub fn secret_bytes(&self) -> SecureBytes {
        SecureBytes::new(self.secret.to_bytes().to_vec())
    }

    /// Raw public key bytes
    pub fn public_key_bytes(&self) -> [u8; X25519_KEY_SIZE] {
        self.public.to_bytes()
    }

    /// Public key, base64 encoded
    pub fn public_key_b64(&self) -> String {
        STANDARD.encode(self.public.as_bytes())
    }

    /// Key id derived from the public key
    pub fn key_id(&self) -> KeyId {
        key_id_for(self.public.as_bytes())
    }

    /// Perform X25519 with a peer public key
    pub fn diffie_hellman(&self, peer_public: &[u8]) -> CryptoResult<SecureBytes> {
        x25519_shared_secret(&self.secret.to_bytes(), peer_public)
    }
}

impl std::fmt::Debug for DeviceKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceKeyPair")
            .field("key_id", &self.key_id())
            .finish_non_exhaustive()
    }
}

/// Validate an X25519 public key: exactly 32 bytes, not the all-zero point
pub fn validate_x25519_public_key(bytes: &[u8]) -> CryptoResult<[u8; X25519_KEY_SIZE]> {
    let array: [u8; X25519_KEY_SIZE] = bytes.try_into().map_err(|_| {
        CryptoError::InvalidKey(format!(
            "X25519 public key must be {} bytes, got {}",
            X25519_KEY_SIZE,
            bytes.len()
        ))
    })?;
    if array.iter().all(|b| *b == 0) {
        return Err(CryptoError::InvalidKey(
            "X25519 public key is the all-zero point".to_string(),
        ));
    }
    Ok(array)
}

/// Decode and validate a base64 X25519 public key
pub fn decode_x25519_public_key(key_b64: &str) -> CryptoResult<[u8; X25519_KEY_SIZE]> {
    let bytes = STANDARD
        .decode(key_b64.trim())
        .map_err(|e| CryptoError::InvalidKey(format!("X25519 public key is not base64: {}", e)))?;
    validate_x25519_public_key(&bytes)
}

/// X25519 between a local private key and a peer public key
///
/// Both keys must be exactly 32 bytes. A non-contributory result (low-order
/// peer point) is rejected.
pub fn x25519_shared_secret(private_key: &[u8], peer_public: &[u8]) -> CryptoResult<SecureBytes> {
    let secret_bytes: [u8; X25519_KEY_SIZE] = private_key.try_into().map_err(|_| {
        CryptoError::InvalidKey(format!(
            "X25519 private key must be {} bytes, got {}",
            X25519_KEY_SIZE,
            private_key.len()
        ))
    })?;
    let peer = PublicKey::from(validate_x25519_public_key(peer_public)?);

    let secret = StaticSecret::from(secret_bytes);
    let shared = secret.diffie_hellman(&peer);
    if !shared.was_contributory() {
        return Err(CryptoError::KeyExchangeFailed(
            "peer public key produced a non-contributory shared secret".to_string(),
        ));
    }

    Ok(SecureBytes::new(shared.as_bytes().to_vec()))
}
