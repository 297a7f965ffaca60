//! Canonical associated data
//!
//! A fixed allow-list of non-secret header fields is serialized in a fixed
//! order as tagged, length-prefixed records:
//!
//! ```text
//! "BEAP-AAD-v1" || { field_id: u8 | type_tag: u8 | len: u32 BE | value }*
//! ```
//!
//! Text values are UTF-8, integers are 8-byte big-endian. Absent optional
//! fields are omitted entirely. The same bytes are passed as AAD to every
//! chunk and artefact seal of a package.

use beap_crypto::sha256_hex;

use crate::error::{BuildError, BuildResult};
use crate::header::EnvelopeHeader;

const AAD_DOMAIN: &[u8] = b"BEAP-AAD-v1";

const TAG_TEXT: u8 = 0x01;
const TAG_INT: u8 = 0x02;

/// Allow-listed fields, in canonical order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum AadFieldId {
    Version = 1,
    Encoding = 2,
    Timestamp = 3,
    SenderFingerprint = 4,
    ReceiverFingerprint = 5,
    TemplateHash = 6,
    PolicyHash = 7,
    ContentHash = 8,
    CryptoSuite = 9,
    AeadAlgorithm = 10,
    KdfAlgorithm = 11,
    HashAlgorithm = 12,
    HandshakeId = 13,
    EnvelopeMaxBytes = 14,
    CapsulePlaintextMaxBytes = 15,
    ArtefactMaxBytes = 16,
    PackageTotalMaxBytes = 17,
    ChunkMaxBytes = 18,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AadValue {
    Text(String),
    Int(i64),
}

/// One field of the associated data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AadField {
    pub id: AadFieldId,
    pub value: AadValue,
}

impl AadField {
    fn text(id: AadFieldId, value: impl Into<String>) -> Self {
        Self {
            id,
            value: AadValue::Text(value.into()),
        }
    }

    fn int(id: AadFieldId, value: i64) -> Self {
        Self {
            id,
            value: AadValue::Int(value),
        }
    }
}

/// Collect the allow-listed fields of a header in canonical order
pub fn aad_fields(header: &EnvelopeHeader) -> Vec<AadField> {
    use AadFieldId::*;

    let mut fields = vec![
        AadField::text(Version, header.version.as_str()),
        AadField::text(Encoding, header.encoding.as_str()),
        AadField::int(Timestamp, header.timestamp),
        AadField::text(SenderFingerprint, header.sender_fingerprint.as_str()),
    ];
    if let Some(receiver) = &header.receiver_fingerprint {
        fields.push(AadField::text(ReceiverFingerprint, receiver.as_str()));
    }
    fields.push(AadField::text(TemplateHash, header.template_hash.as_str()));
    fields.push(AadField::text(PolicyHash, header.policy_hash.as_str()));
    fields.push(AadField::text(ContentHash, header.content_hash.as_str()));

    if let Some(crypto) = &header.crypto {
        fields.push(AadField::text(CryptoSuite, crypto.suite_id.as_str()));
        fields.push(AadField::text(AeadAlgorithm, crypto.aead.as_str()));
        fields.push(AadField::text(KdfAlgorithm, crypto.kdf.as_str()));
        fields.push(AadField::text(HashAlgorithm, crypto.hash.as_str()));
        fields.push(AadField::text(HandshakeId, crypto.handshake_id.as_str()));
    }

    let limits = &header.size_limits;
    for (id, value) in [
        (EnvelopeMaxBytes, limits.envelope_max_bytes),
        (CapsulePlaintextMaxBytes, limits.capsule_plaintext_max_bytes),
        (ArtefactMaxBytes, limits.artefact_max_bytes),
        (PackageTotalMaxBytes, limits.package_total_max_bytes),
        (ChunkMaxBytes, limits.chunk_max_bytes),
    ] {
        fields.push(AadField::int(id, value as i64));
    }
    fields
}

/// Serialize fields into canonical AAD bytes
pub fn encode_aad(fields: &[AadField]) -> BuildResult<Vec<u8>> {
    if fields.is_empty() {
        return Err(BuildError::EmptyAad);
    }
    if fields.windows(2).any(|w| w[0].id >= w[1].id) {
        return Err(BuildError::AadIntegrity(
            "AAD fields out of canonical order".to_string(),
        ));
    }

    let mut out = Vec::with_capacity(AAD_DOMAIN.len() + fields.len() * 48);
    out.extend_from_slice(AAD_DOMAIN);
    for field in fields {
        out.push(field.id as u8);
        match &field.value {
            AadValue::Text(text) => {
                out.push(TAG_TEXT);
                out.extend_from_slice(&(text.len() as u32).to_be_bytes());
                out.extend_from_slice(text.as_bytes());
            }
            AadValue::Int(value) => {
                out.push(TAG_INT);
                out.extend_from_slice(&8u32.to_be_bytes());
                out.extend_from_slice(&value.to_be_bytes());
            }
        }
    }
    Ok(out)
}

/// Canonical AAD derived from a header
#[derive(Clone, PartialEq, Eq)]
pub struct CanonicalAad(Vec<u8>);

impl CanonicalAad {
    pub fn from_header(header: &EnvelopeHeader) -> BuildResult<Self> {
        encode_aad(&aad_fields(header)).map(Self)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// SHA-256 of the AAD bytes, hex
    pub fn digest_hex(&self) -> String {
        sha256_hex(&self.0)
    }

    /// Re-derive from the finalized header and fail if anything drifted
    pub fn ensure_matches(&self, header: &EnvelopeHeader) -> BuildResult<()> {
        let current = Self::from_header(header)?;
        if current != *self {
            return Err(BuildError::AadIntegrity(format!(
                "header drifted after AAD derivation (expected {}, got {})",
                self.digest_hex(),
                current.digest_hex()
            )));
        }
        Ok(())
    }
}

impl std::fmt::Debug for CanonicalAad {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CanonicalAad({} bytes, {})", self.0.len(), &self.digest_hex()[..16])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BuildErrorKind;
    use crate::test_support::sample_private_header;

    #[test]
    fn test_aad_is_deterministic() {
        let header = sample_private_header();
        let a = CanonicalAad::from_header(&header).unwrap();
        let b = CanonicalAad::from_header(&header.clone()).unwrap();
        assert_eq!(a, b);
        assert!(a.as_bytes().starts_with(AAD_DOMAIN));
    }

    #[test]
    fn test_empty_field_set_rejected() {
        let err = encode_aad(&[]).unwrap_err();
        assert_eq!(err.kind(), BuildErrorKind::EmptyAad);
    }

    #[test]
    fn test_out_of_order_fields_rejected() {
        let fields = vec![
            AadField::text(AadFieldId::Encoding, "qBEAP"),
            AadField::text(AadFieldId::Version, "1.0"),
        ];
        let err = encode_aad(&fields).unwrap_err();
        assert_eq!(err.kind(), BuildErrorKind::AadIntegrity);
    }

    #[test]
    fn test_drift_detected() {
        let mut header = sample_private_header();
        let aad = CanonicalAad::from_header(&header).unwrap();
        assert!(aad.ensure_matches(&header).is_ok());

        header.content_hash = "00".repeat(32);
        let err = aad.ensure_matches(&header).unwrap_err();
        assert_eq!(err.kind(), BuildErrorKind::AadIntegrity);
    }

    #[test]
    fn test_non_allow_listed_fields_do_not_affect_aad() {
        let mut header = sample_private_header();
        let aad = CanonicalAad::from_header(&header).unwrap();

        header.compliance = "something else".to_string();
        if let Some(crypto) = header.crypto.as_mut() {
            crypto.salt = "AAAA".to_string();
        }
        assert!(aad.ensure_matches(&header).is_ok());
    }

    #[test]
    fn test_length_prefix_prevents_field_confusion() {
        let mut a = sample_private_header();
        let mut b = sample_private_header();
        a.template_hash = "ab".into();
        a.policy_hash = "c".into();
        b.template_hash = "a".into();
        b.policy_hash = "bc".into();
        assert_ne!(
            CanonicalAad::from_header(&a).unwrap(),
            CanonicalAad::from_header(&b).unwrap()
        );
    }
}
