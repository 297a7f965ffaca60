//! # BEAP Crypto
//!
//! Cryptographic primitives for BEAP packages.
//!
//! ## Features
//!
//! - X25519 device keys and classical key agreement
//! - Kyber768 key encapsulation behind the [`PqKem`] trait
//! - Hybrid secret (PQ ‖ classical) and HKDF-SHA256 package key split
//! - ChaCha20-Poly1305 sealing bound to associated data
//! - SHA-256 field hashing and Merkle roots over chunk ciphertexts
//! - Ed25519 package signatures
//!
//! ## Example
//!
//! ```rust,ignore
//! use beap_crypto::{
//!     derive_package_keys, generate_salt, seal, open, DeviceKeyPair, HybridSecret,
//!     Kyber768Kem, PQKemKeyPair, PqKem,
//! };
//!
//! let sender = DeviceKeyPair::generate();
//! let receiver = DeviceKeyPair::generate();
//! let receiver_kem = PQKemKeyPair::generate();
//!
//! let kem = Kyber768Kem::new();
//! let encap = kem.encapsulate(&receiver_kem.encapsulation_key_bytes())?;
//! let classical = sender.diffie_hellman(&receiver.public_key_bytes())?;
//! let secret = HybridSecret::combine(encap.shared_secret.as_slice(), classical.as_slice())?;
//!
//! let keys = derive_package_keys(&secret, &generate_salt())?;
//! let sealed = seal(keys.capsule_key(), b"hello", b"aad")?;
//! assert_eq!(open(keys.capsule_key(), &sealed, b"aad")?, b"hello");
//! ```

pub mod aead;
pub mod device_key;
pub mod error;
pub mod hash;
pub mod hybrid;
pub mod kdf;
pub mod merkle;
pub mod pq_kem;
pub mod secure_bytes;
pub mod signing;

// Re-exports
pub use aead::{
    generate_nonce, nonce_from_slice, open, seal, seal_with_nonce, SealedBox, AEAD_ALGORITHM,
    AEAD_KEY_SIZE, NONCE_SIZE, TAG_SIZE,
};
pub use device_key::{
    decode_x25519_public_key, validate_x25519_public_key, x25519_shared_secret, DeviceKeyPair,
    X25519_KEY_SIZE,
};
pub use error::{CryptoError, CryptoResult};
pub use hash::{key_id_for, sha256, sha256_hex, FieldHasher, HASH_SIZE};
pub use hybrid::{HybridSecret, HYBRID_SECRET_SIZE};
pub use kdf::{derive_package_keys, generate_salt, PackageKeys, KDF_ALGORITHM, SALT_SIZE};
pub use merkle::{leaf_hash, MerkleHash, MerkleTree};
pub use pq_kem::{
    Kyber768Kem, PQCiphertext, PQEncapsulationKey, PQKemKeyPair, PqEncapsulation, PqKem,
    UnavailableKem, PQ_CIPHERTEXT_SIZE, PQ_ENCAPSULATION_KEY_SIZE, PQ_KEM_ALGORITHM,
    PQ_SHARED_SECRET_SIZE,
};
pub use secure_bytes::SecureBytes;
pub use signing::{
    verify_signature, SigningKeyPair, SIGNATURE_ALGORITHM, SIGNATURE_SIZE, VERIFYING_KEY_SIZE,
};

/// Wire name of the hash algorithm
pub const HASH_ALGORITHM: &str = "SHA-256";
