//! Identity newtypes
//!
//! Fingerprints identify senders and receivers, handshake ids reference an
//! established recipient relationship, and key ids name device or signing keys.

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Number of characters used for the short display form of a fingerprint
pub const SHORT_FINGERPRINT_LEN: usize = 8;

/// Identity fingerprint of a sender or receiver
///
/// Fingerprints are non-empty ASCII alphanumeric strings. They are
/// non-secret, appear in the envelope header and the AAD, and their short
/// form is embedded in package filenames.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Create a fingerprint, rejecting empty or non-alphanumeric values
    pub fn new(value: impl Into<String>) -> CoreResult<Self> {
        let value = value.into();
        if value.is_empty() {
            return Err(CoreError::InvalidFormat("fingerprint is empty".to_string()));
        }
        if !value.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(CoreError::InvalidFormat(format!(
                "fingerprint must be ASCII alphanumeric: {:?}",
                value
            )));
        }
        Ok(Self(value))
    }

    /// Get the fingerprint as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short form used in filenames and logs (first 8 characters, uppercased)
    pub fn short(&self) -> String {
        self.0
            .chars()
            .take(SHORT_FINGERPRINT_LEN)
            .collect::<String>()
            .to_uppercase()
    }
}

impl TryFrom<String> for Fingerprint {
    type Error = CoreError;

    fn try_from(value: String) -> CoreResult<Self> {
        Self::new(value)
    }
}

impl From<Fingerprint> for String {
    fn from(fingerprint: Fingerprint) -> Self {
        fingerprint.0
    }
}

impl Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Reference to an established handshake with a recipient
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HandshakeId(String);

impl HandshakeId {
    /// Create a handshake id
    pub fn new(value: impl Into<String>) -> CoreResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(CoreError::InvalidFormat("handshake id is empty".to_string()));
        }
        Ok(Self(value))
    }

    /// Get the handshake id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for HandshakeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a device or signing key
///
/// Derived from the public key by the crypto layer; stored here as hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyId(String);

impl KeyId {
    /// Build a key id from raw digest bytes (hex encoded)
    pub fn from_digest(digest: &[u8]) -> Self {
        Self(hex::encode(digest))
    }

    /// Get the key id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_validation() {
        assert!(Fingerprint::new("a1b2c3d4e5").is_ok());
        assert!(Fingerprint::new("").is_err());
        assert!(Fingerprint::new("ab cd").is_err());
        for bad in ["../etc", "a/b", "a\\b", "ab:cd", "..", "ab.cd"] {
            assert!(Fingerprint::new(bad).is_err(), "{}", bad);
        }
    }

    #[test]
    fn test_fingerprint_deserialization_is_validated() {
        let fp: Fingerprint = serde_json::from_str("\"a1b2c3d4\"").unwrap();
        assert_eq!(fp.as_str(), "a1b2c3d4");
        assert_eq!(serde_json::to_string(&fp).unwrap(), "\"a1b2c3d4\"");
        assert!(serde_json::from_str::<Fingerprint>("\"../../x\"").is_err());
    }

    #[test]
    fn test_fingerprint_short_form() {
        let fp = Fingerprint::new("a1b2c3d4e5f6").unwrap();
        assert_eq!(fp.short(), "A1B2C3D4");

        let tiny = Fingerprint::new("ab").unwrap();
        assert_eq!(tiny.short(), "AB");
    }

    #[test]
    fn test_handshake_id_rejects_blank() {
        assert!(HandshakeId::new("   ").is_err());
        assert_eq!(HandshakeId::new("hs-42").unwrap().as_str(), "hs-42");
    }

    #[test]
    fn test_key_id_from_digest() {
        let id = KeyId::from_digest(&[0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(id.as_str(), "deadbeef");
    }
}
