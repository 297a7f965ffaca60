//! SHA-256 helpers
//!
//! All package hashes (content, template, policy, artefact and chunk
//! commitments) are SHA-256. [`FieldHasher`] length-prefixes every field so
//! that concatenation boundaries can never be shifted between fields.

use beap_core::KeyId;
use sha2::{Digest, Sha256};

/// SHA-256 digest size in bytes
pub const HASH_SIZE: usize = 32;

/// Number of digest bytes used for key ids
const KEY_ID_BYTES: usize = 8;

/// Calculate the SHA-256 hash of data
pub fn sha256(data: &[u8]) -> [u8; HASH_SIZE] {
    Sha256::digest(data).into()
}

/// Calculate the SHA-256 hash of data, hex encoded
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}

/// Derive a key id from a public key (first 8 digest bytes, hex)
pub fn key_id_for(public_key: &[u8]) -> KeyId {
    let digest = sha256(public_key);
    KeyId::from_digest(&digest[..KEY_ID_BYTES])
}

/// Domain-separated hasher over length-prefixed fields
pub struct FieldHasher {
    inner: Sha256,
}

impl FieldHasher {
    /// Start a hash under the given domain label
    pub fn new(domain: &[u8]) -> Self {
        let mut inner = Sha256::new();
        inner.update((domain.len() as u32).to_be_bytes());
        inner.update(domain);
        Self { inner }
    }

    /// Absorb a byte field
    pub fn field(mut self, bytes: &[u8]) -> Self {
        self.inner.update((bytes.len() as u64).to_be_bytes());
        self.inner.update(bytes);
        self
    }

    /// Absorb a string field
    pub fn str_field(self, value: &str) -> Self {
        self.field(value.as_bytes())
    }

    /// Absorb an integer field
    pub fn u64_field(mut self, value: u64) -> Self {
        self.inner.update(value.to_be_bytes());
        self
    }

    /// Finish and return the hex digest
    pub fn finish_hex(self) -> String {
        hex::encode(self.inner.finalize())
    }
}
