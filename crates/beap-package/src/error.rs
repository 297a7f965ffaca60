//! Error types for package building, verification and key storage

use std::fmt;

use beap_core::CoreError;
use beap_crypto::CryptoError;
use thiserror::Error;

use crate::config::PolicyFlag;

/// Which declared size limit was exceeded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeLimitKind {
    Envelope,
    CapsulePlaintext,
    Artefact,
    TotalPackage,
    Chunk,
}

impl fmt::Display for SizeLimitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SizeLimitKind::Envelope => "envelope_max_bytes",
            SizeLimitKind::CapsulePlaintext => "capsule_plaintext_max_bytes",
            SizeLimitKind::Artefact => "artefact_max_bytes",
            SizeLimitKind::TotalPackage => "package_total_max_bytes",
            SizeLimitKind::Chunk => "chunk_max_bytes",
        };
        f.write_str(name)
    }
}

/// A plaintext, transport-visible surface checked for leaked secret content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeakSurface {
    TransportBody,
    EmailSubject,
    EmailBody,
    ClipboardText,
    AttachmentFilename,
}

impl fmt::Display for LeakSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LeakSurface::TransportBody => "transport body",
            LeakSurface::EmailSubject => "email subject",
            LeakSurface::EmailBody => "email body",
            LeakSurface::ClipboardText => "clipboard text",
            LeakSurface::AttachmentFilename => "attachment filename",
        };
        f.write_str(name)
    }
}

/// Flat taxonomy of build failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildErrorKind {
    Validation,
    MissingKeyMaterial,
    InvalidKeyMaterial,
    MissingPeerKey,
    PqUnavailable,
    PolicyViolation,
    SecurityLeakDetected,
    SizeLimitExceeded,
    EmptyAad,
    AadIntegrity,
    EncryptionFailure,
    SigningFailure,
    KeyStore,
    Serialization,
}

/// Errors that abort a package build
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Missing key material: {0}")]
    MissingKeyMaterial(String),

    #[error("Invalid key material: {0}")]
    InvalidKeyMaterial(String),

    #[error("Missing peer key: {0}")]
    MissingPeerKey(String),

    #[error("Post-quantum KEM unavailable: {0}")]
    PqUnavailable(String),

    #[error("Policy violation ({flag}): {reason}")]
    PolicyViolation { flag: PolicyFlag, reason: String },

    #[error("Security leak detected: encrypted content found in {surface}")]
    SecurityLeakDetected { surface: LeakSurface },

    #[error("Size limit exceeded: {limit} is {max} bytes, got {actual}")]
    SizeLimitExceeded {
        limit: SizeLimitKind,
        max: usize,
        actual: usize,
    },

    #[error("Canonical AAD is empty")]
    EmptyAad,

    #[error("AAD integrity error: {0}")]
    AadIntegrity(String),

    #[error("Encryption failure: {0}")]
    EncryptionFailure(String),

    #[error("Signing failure: {0}")]
    SigningFailure(String),

    #[error("Key store error: {0}")]
    KeyStore(#[source] KeyStoreError),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl BuildError {
    /// The taxonomy entry for this error
    pub fn kind(&self) -> BuildErrorKind {
        match self {
            BuildError::Validation(_) => BuildErrorKind::Validation,
            BuildError::MissingKeyMaterial(_) => BuildErrorKind::MissingKeyMaterial,
            BuildError::InvalidKeyMaterial(_) => BuildErrorKind::InvalidKeyMaterial,
            BuildError::MissingPeerKey(_) => BuildErrorKind::MissingPeerKey,
            BuildError::PqUnavailable(_) => BuildErrorKind::PqUnavailable,
            BuildError::PolicyViolation { .. } => BuildErrorKind::PolicyViolation,
            BuildError::SecurityLeakDetected { .. } => BuildErrorKind::SecurityLeakDetected,
            BuildError::SizeLimitExceeded { .. } => BuildErrorKind::SizeLimitExceeded,
            BuildError::EmptyAad => BuildErrorKind::EmptyAad,
            BuildError::AadIntegrity(_) => BuildErrorKind::AadIntegrity,
            BuildError::EncryptionFailure(_) => BuildErrorKind::EncryptionFailure,
            BuildError::SigningFailure(_) => BuildErrorKind::SigningFailure,
            BuildError::KeyStore(_) => BuildErrorKind::KeyStore,
            BuildError::Serialization(_) => BuildErrorKind::Serialization,
        }
    }

    /// Whether the failure is a security guard rather than bad input
    pub fn is_security_violation(&self) -> bool {
        matches!(
            self.kind(),
            BuildErrorKind::SecurityLeakDetected
                | BuildErrorKind::PqUnavailable
                | BuildErrorKind::AadIntegrity
                | BuildErrorKind::PolicyViolation
        )
    }
}

impl From<CryptoError> for BuildError {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::InvalidKey(msg) => BuildError::InvalidKeyMaterial(msg),
            CryptoError::KeyExchangeFailed(msg) => BuildError::InvalidKeyMaterial(msg),
            CryptoError::PQUnavailable(msg) => BuildError::PqUnavailable(msg),
            CryptoError::PQEncapsulationFailed(msg) => BuildError::EncryptionFailure(msg),
            CryptoError::SigningFailed(msg) => BuildError::SigningFailure(msg),
            CryptoError::EmptyMerkleTree => {
                BuildError::EncryptionFailure("no chunks to commit".to_string())
            }
            other => BuildError::EncryptionFailure(other.to_string()),
        }
    }
}

impl From<CoreError> for BuildError {
    fn from(e: CoreError) -> Self {
        BuildError::Validation(e.to_string())
    }
}

impl From<serde_json::Error> for BuildError {
    fn from(e: serde_json::Error) -> Self {
        BuildError::Serialization(e.to_string())
    }
}

/// Result type alias for package builds
pub type BuildResult<T> = Result<T, BuildError>;

/// Errors raised while verifying or opening a package
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("Malformed package: {0}")]
    Malformed(String),

    #[error("Signature verification failed")]
    BadSignature,

    #[error("Signing data mismatch")]
    SigningDataMismatch,

    #[error("AAD mismatch: header no longer matches the sealed content")]
    AadMismatch,

    #[error("Content hash mismatch")]
    ContentHashMismatch,

    #[error("Merkle root mismatch")]
    MerkleRootMismatch,

    #[error("Artefact hash mismatch for {0}")]
    ArtefactHashMismatch(String),

    #[error("Not a private package")]
    NotPrivate,

    #[error("Decryption failed: {0}")]
    Decryption(String),

    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),
}

impl From<serde_json::Error> for VerifyError {
    fn from(e: serde_json::Error) -> Self {
        VerifyError::Malformed(e.to_string())
    }
}

impl From<base64::DecodeError> for VerifyError {
    fn from(e: base64::DecodeError) -> Self {
        VerifyError::Malformed(format!("invalid base64: {}", e))
    }
}

/// Result type alias for verification
pub type VerifyResult<T> = Result<T, VerifyError>;

/// Errors raised by device and signing key stores
#[derive(Debug, Error)]
pub enum KeyStoreError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Corrupt key file {path}: {reason}")]
    Corrupt { path: String, reason: String },

    #[error("Key not provisioned: {0}")]
    NotProvisioned(String),
}

impl From<KeyStoreError> for BuildError {
    fn from(e: KeyStoreError) -> Self {
        match e {
            KeyStoreError::NotProvisioned(reason) => BuildError::MissingKeyMaterial(reason),
            other => BuildError::KeyStore(other),
        }
    }
}

/// Result type alias for key stores
pub type KeyStoreResult<T> = Result<T, KeyStoreError>;
