//! Template, policy and content hashes
//!
//! Each hash is a domain-separated, length-prefixed SHA-256 so that no two
//! distinct field sequences can collide by concatenation.

use std::collections::BTreeSet;

use beap_core::Encoding;
use beap_crypto::FieldHasher;

use crate::capsule::AttachmentMeta;
use crate::config::PolicyFlag;

const TEMPLATE_DOMAIN: &[u8] = b"BEAP-TEMPLATE-v1";
const POLICY_DOMAIN: &[u8] = b"BEAP-POLICY-v1";
const CONTENT_DOMAIN: &[u8] = b"BEAP-CONTENT-v1";

/// Hash of the message template and envelope version
pub fn template_hash(template_id: &str, version: &str) -> String {
    FieldHasher::new(TEMPLATE_DOMAIN)
        .str_field(template_id)
        .str_field(version)
        .finish_hex()
}

/// Hash of the build policy: encoding, sorted policy flags and compliance
pub fn policy_hash(encoding: Encoding, flags: &BTreeSet<PolicyFlag>, compliance: &str) -> String {
    let mut hasher = FieldHasher::new(POLICY_DOMAIN)
        .str_field(encoding.as_str())
        .u64_field(flags.len() as u64);
    for flag in flags {
        hasher = hasher.str_field(flag.as_str());
    }
    hasher.str_field(compliance).finish_hex()
}

/// Hash of the authoritative body plus attachment name and size metadata
///
/// Callers pass the encrypted message when one exists and the transport
/// body otherwise, never both.
pub fn content_hash(authoritative_body: &str, attachments: &[AttachmentMeta]) -> String {
    let mut hasher = FieldHasher::new(CONTENT_DOMAIN)
        .str_field(authoritative_body)
        .u64_field(attachments.len() as u64);
    for meta in attachments {
        hasher = hasher.str_field(&meta.name).u64_field(meta.size as u64);
    }
    hasher.finish_hex()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(name: &str, size: usize) -> AttachmentMeta {
        AttachmentMeta {
            id: name.to_string(),
            name: name.to_string(),
            mime_type: "application/octet-stream".to_string(),
            size,
        }
    }

    #[test]
    fn test_content_hash_covers_attachment_metadata() {
        let base = content_hash("hello", &[]);
        assert_eq!(base, content_hash("hello", &[]));
        assert_ne!(base, content_hash("hello", &[meta("a.pdf", 10)]));
        assert_ne!(
            content_hash("hello", &[meta("a.pdf", 10)]),
            content_hash("hello", &[meta("a.pdf", 11)])
        );
    }

    #[test]
    fn test_content_hash_distinguishes_body() {
        assert_ne!(content_hash("hello", &[]), content_hash("hello!", &[]));
    }

    #[test]
    fn test_policy_hash_depends_on_flags() {
        let none = BTreeSet::new();
        let mut strict = BTreeSet::new();
        strict.insert(PolicyFlag::RequireEncryptedContent);

        assert_ne!(
            policy_hash(Encoding::Private, &none, "standard"),
            policy_hash(Encoding::Private, &strict, "standard")
        );
        assert_ne!(
            policy_hash(Encoding::Private, &none, "standard"),
            policy_hash(Encoding::Public, &none, "standard")
        );
    }

    #[test]
    fn test_template_hash_is_hex_sha256() {
        let hash = template_hash("beap.message.v1", "1.0");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
