//! Fixtures shared by unit tests

use beap_core::{Encoding, Fingerprint, HandshakeId, KeyId};

use crate::config::SizeLimits;
use crate::header::{
    CryptoMetadata, EncryptionMode, EnvelopeHeader, PqMetadata, ReceiverBinding, SigningMetadata,
    BEAP_VERSION, CRYPTO_SUITE_ID, KEY_DERIVATION_METHOD,
};

pub(crate) fn sample_private_header() -> EnvelopeHeader {
    let handshake = HandshakeId::new("hs-0001").unwrap();
    EnvelopeHeader {
        version: BEAP_VERSION.to_string(),
        encoding: Encoding::Private,
        encryption_mode: EncryptionMode::HybridAead,
        timestamp: 1_767_225_600_000,
        sender_fingerprint: Fingerprint::new("5e9d3c1a0b7f2e44").unwrap(),
        receiver_fingerprint: Some(Fingerprint::new("a1b2c3d4e5f60718").unwrap()),
        receiver_binding: Some(ReceiverBinding {
            handshake_id: handshake.clone(),
            display_name: "Ada".to_string(),
            organization: None,
        }),
        template_hash: "11".repeat(32),
        policy_hash: "22".repeat(32),
        content_hash: "33".repeat(32),
        crypto: Some(CryptoMetadata {
            suite_id: CRYPTO_SUITE_ID.to_string(),
            aead: "ChaCha20-Poly1305".to_string(),
            kdf: "HKDF-SHA256".to_string(),
            hash: "SHA-256".to_string(),
            key_derivation: KEY_DERIVATION_METHOD.to_string(),
            salt: "AAECAwQFBgcICQoLDA0ODw==".to_string(),
            handshake_id: handshake,
            sender_x25519_public_key: "c2VuZGVy".to_string(),
            pq: PqMetadata {
                active: true,
                kem: "Kyber768".to_string(),
                ciphertext: "Y3Q=".to_string(),
            },
        }),
        signing: SigningMetadata {
            algorithm: "Ed25519".to_string(),
            key_id: KeyId::from_digest(&[1, 2, 3, 4, 5, 6, 7, 8]),
            public_key: "cHVi".to_string(),
        },
        size_limits: SizeLimits::default(),
        compliance: "standard".to_string(),
    }
}
