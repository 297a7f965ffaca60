//! # BEAP Package
//!
//! Builds portable, verifiable BEAP packages from a message and its
//! attachments.
//!
//! - **qBEAP** (private): hybrid Kyber768 + X25519 key agreement, HKDF key
//!   split, chunked ChaCha20-Poly1305 capsule and artefacts bound to a
//!   canonical AAD, Ed25519 signature
//! - **pBEAP** (public): plaintext capsule, base64 transport encoding, Ed25519
//!   signature
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use beap_core::InMemoryDirectory;
//! use beap_package::{BuildRequest, BuilderSettings, MemoryKeyStore, PackageBuilder};
//!
//! let keys = Arc::new(MemoryKeyStore::new());
//! let directory = Arc::new(InMemoryDirectory::new());
//! let builder = PackageBuilder::new(BuilderSettings::default(), keys.clone(), keys, directory);
//!
//! let package = builder.build(&BuildRequest::public("5E9D3C1A").with_body("hello"))?;
//! std::fs::write(package.filename(), package.to_json()?)?;
//! ```

pub mod aad;
pub mod artefact;
pub mod assembler;
pub mod b64;
pub mod capsule;
pub mod chunking;
pub mod config;
pub mod delivery;
pub mod error;
pub mod hashing;
pub mod header;
pub mod keystore;
pub mod leak;
pub mod limits;
pub mod package;
pub mod policy;
pub mod signing;
pub mod verify;

#[cfg(test)]
mod test_support;

pub use aad::CanonicalAad;
pub use artefact::{ArtefactKind, EncryptedArtefact, ManifestEntry, PublicArtefact};
pub use assembler::PackageBuilder;
pub use capsule::{AttachmentMeta, CapsulePayload};
pub use chunking::{ChunkingInfo, EncryptedChunk, PayloadCommitment, PayloadEnc};
pub use config::{Attachment, BuildRequest, BuilderSettings, PolicyFlag, SizeLimits};
pub use delivery::{prepare_delivery, DeliveryPlan, EmailDraft};
pub use error::{
    BuildError, BuildErrorKind, BuildResult, KeyStoreError, KeyStoreResult, LeakSurface,
    SizeLimitKind, VerifyError, VerifyResult,
};
pub use header::{CryptoMetadata, EncryptionMode, EnvelopeHeader, PqMetadata, SigningMetadata};
pub use keystore::{DeviceKeyProvider, FileKeyStore, MemoryKeyStore, SigningKeyProvider};
pub use package::{BeapPackage, DeliveryMetadata, PackageBody};
pub use policy::{extract_tags, AutomationMetadata, TagSource};
pub use signing::PackageSignature;
pub use verify::{open_private_package, verify_package, OpenedPackage, VerificationReport};
