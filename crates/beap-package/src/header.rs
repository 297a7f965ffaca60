//! Envelope header: the non-secret metadata block of a package

use beap_core::{Encoding, Fingerprint, HandshakeId, KeyId, RecipientRecord};
use serde::{Deserialize, Serialize};

use crate::config::SizeLimits;

/// Envelope format version
pub const BEAP_VERSION: &str = "1.0";

/// Identifier of the hybrid private-mode crypto suite
pub const CRYPTO_SUITE_ID: &str = "BEAP-HYBRID-X25519-KYBER768-CHACHA20POLY1305-v1";

/// Key-derivation method declared by private packages
pub const KEY_DERIVATION_METHOD: &str = "HKDF-SHA256(salt, Kyber768 || X25519)";

/// Whether content is encrypted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EncryptionMode {
    #[serde(rename = "NONE")]
    None,
    #[serde(rename = "HYBRID_AEAD")]
    HybridAead,
}

impl EncryptionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            EncryptionMode::None => "NONE",
            EncryptionMode::HybridAead => "HYBRID_AEAD",
        }
    }
}

/// Who a private package is bound to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiverBinding {
    pub handshake_id: HandshakeId,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
}

impl From<&RecipientRecord> for ReceiverBinding {
    fn from(record: &RecipientRecord) -> Self {
        Self {
            handshake_id: record.handshake_id.clone(),
            display_name: record.display_name.clone(),
            organization: record.organization.clone(),
        }
    }
}

/// Post-quantum half of the key agreement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PqMetadata {
    pub active: bool,
    pub kem: String,
    /// KEM ciphertext, base64
    pub ciphertext: String,
}

/// Crypto suite description carried by private packages only
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CryptoMetadata {
    pub suite_id: String,
    pub aead: String,
    pub kdf: String,
    pub hash: String,
    pub key_derivation: String,
    /// HKDF salt, base64
    pub salt: String,
    pub handshake_id: HandshakeId,
    /// Sender's X25519 device public key, base64
    pub sender_x25519_public_key: String,
    pub pq: PqMetadata,
}

/// Signature algorithm and the key that produced it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningMetadata {
    pub algorithm: String,
    pub key_id: KeyId,
    /// Ed25519 verifying key, base64
    pub public_key: String,
}

/// Envelope header
///
/// Fully populated before AAD derivation and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeHeader {
    pub version: String,
    pub encoding: Encoding,
    pub encryption_mode: EncryptionMode,
    /// Creation time, milliseconds since the Unix epoch
    pub timestamp: i64,
    pub sender_fingerprint: Fingerprint,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver_fingerprint: Option<Fingerprint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver_binding: Option<ReceiverBinding>,
    pub template_hash: String,
    pub policy_hash: String,
    pub content_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crypto: Option<CryptoMetadata>,
    pub signing: SigningMetadata,
    pub size_limits: SizeLimits,
    pub compliance: String,
}

impl EnvelopeHeader {
    pub fn is_private(&self) -> bool {
        self.encoding.is_private()
    }

    /// Declared key-derivation method, if any
    pub fn key_derivation(&self) -> Option<&str> {
        self.crypto.as_ref().map(|c| c.key_derivation.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beap_crypto::PQ_KEM_ALGORITHM;

    #[test]
    fn test_suite_names_the_kem_in_use() {
        assert!(KEY_DERIVATION_METHOD.contains(PQ_KEM_ALGORITHM));
        assert!(CRYPTO_SUITE_ID.contains(&PQ_KEM_ALGORITHM.to_uppercase()));
    }
}
