//! Recipient directory
//!
//! The directory supplies, per established handshake, the recipient's
//! display information and public key material. Keys are carried exactly as
//! the directory stores them (base64 strings); decoding and validation happen
//! in the key agreement stage so malformed material fails the build there.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::identity::{Fingerprint, HandshakeId};

/// Recipient record supplied by the handshake directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientRecord {
    /// Handshake this record belongs to
    pub handshake_id: HandshakeId,
    /// Recipient display name
    pub display_name: String,
    /// Recipient organization, if known
    pub organization: Option<String>,
    /// Email addresses on record
    pub emails: Vec<String>,
    /// Recipient identity fingerprint
    pub fingerprint: Fingerprint,
    /// Peer X25519 public key (base64)
    pub x25519_public_key: Option<String>,
    /// Peer Kyber768 encapsulation key (base64)
    pub pq_public_key: Option<String>,
}

impl RecipientRecord {
    /// Create a record with no key material
    pub fn new(
        handshake_id: HandshakeId,
        display_name: impl Into<String>,
        fingerprint: Fingerprint,
    ) -> Self {
        Self {
            handshake_id,
            display_name: display_name.into(),
            organization: None,
            emails: Vec::new(),
            fingerprint,
            x25519_public_key: None,
            pq_public_key: None,
        }
    }

    /// Set the organization
    pub fn with_organization(mut self, organization: impl Into<String>) -> Self {
        self.organization = Some(organization.into());
        self
    }

    /// Add an email address
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.emails.push(email.into());
        self
    }

    /// Set the peer's X25519 public key (base64)
    pub fn with_x25519_public_key(mut self, key_b64: impl Into<String>) -> Self {
        self.x25519_public_key = Some(key_b64.into());
        self
    }

    /// Set the peer's post-quantum encapsulation key (base64)
    pub fn with_pq_public_key(mut self, key_b64: impl Into<String>) -> Self {
        self.pq_public_key = Some(key_b64.into());
        self
    }
}

/// Lookup of recipient records by handshake
pub trait RecipientDirectory: Send + Sync {
    /// Find the record for a handshake
    fn lookup(&self, handshake_id: &HandshakeId) -> Option<RecipientRecord>;
}

/// In-memory directory, used by tests and embedders without a handshake store
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    records: RwLock<HashMap<HandshakeId, RecipientRecord>>,
}

impl InMemoryDirectory {
    /// Create an empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a record
    pub fn insert(&self, record: RecipientRecord) {
        self.records
            .write()
            .insert(record.handshake_id.clone(), record);
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Whether the directory is empty
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl RecipientDirectory for InMemoryDirectory {
    fn lookup(&self, handshake_id: &HandshakeId) -> Option<RecipientRecord> {
        self.records.read().get(handshake_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str) -> RecipientRecord {
        RecipientRecord::new(
            HandshakeId::new(id).unwrap(),
            "Dana",
            Fingerprint::new("f00dfeed").unwrap(),
        )
        .with_organization("Acme")
        .with_email("dana@example.com")
    }

    #[test]
    fn test_directory_lookup() {
        let dir = InMemoryDirectory::new();
        assert!(dir.is_empty());

        dir.insert(record("hs-1"));
        assert_eq!(dir.len(), 1);

        let found = dir.lookup(&HandshakeId::new("hs-1").unwrap()).unwrap();
        assert_eq!(found.display_name, "Dana");
        assert_eq!(found.emails, vec!["dana@example.com".to_string()]);
        assert!(dir.lookup(&HandshakeId::new("hs-2").unwrap()).is_none());
    }

    #[test]
    fn test_insert_replaces() {
        let dir = InMemoryDirectory::new();
        dir.insert(record("hs-1"));
        dir.insert(record("hs-1").with_pq_public_key("AAAA"));

        assert_eq!(dir.len(), 1);
        let found = dir.lookup(&HandshakeId::new("hs-1").unwrap()).unwrap();
        assert_eq!(found.pq_public_key.as_deref(), Some("AAAA"));
    }
}
