//! Error types for beap-crypto

use thiserror::Error;

/// Errors that can occur during cryptographic operations
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Key exchange failed: {0}")]
    KeyExchangeFailed(String),

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    #[error("Signing failed: {0}")]
    SigningFailed(String),

    #[error("Signature verification failed")]
    SignatureVerificationFailed,

    #[error("Invalid nonce")]
    InvalidNonce,

    #[error("Data too short: expected at least {expected} bytes, got {actual}")]
    DataTooShort { expected: usize, actual: usize },

    #[error("Post-quantum KEM unavailable: {0}")]
    PQUnavailable(String),

    #[error("PQ encapsulation failed: {0}")]
    PQEncapsulationFailed(String),

    #[error("PQ decapsulation failed: {0}")]
    PQDecapsulationFailed(String),

    #[error("Invalid PQ ciphertext: {0}")]
    InvalidPQCiphertext(String),

    #[error("Merkle tree requires at least one leaf")]
    EmptyMerkleTree,
}

/// Result type for crypto operations
pub type CryptoResult<T> = Result<T, CryptoError>;
