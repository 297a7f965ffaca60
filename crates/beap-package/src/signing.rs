//! Canonical signing data and package signatures

use beap_core::KeyId;
use beap_crypto::{sha256_hex, verify_signature, CryptoResult, SigningKeyPair, SIGNATURE_ALGORITHM};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::artefact::ManifestEntry;
use crate::b64;
use crate::chunking::PayloadCommitment;
use crate::error::BuildResult;
use crate::header::EnvelopeHeader;

const SIGNING_DOMAIN: &[u8] = b"BEAP-SIGN-v1\n";

/// Commitment for a plaintext (public) capsule
pub fn plaintext_commitment(capsule_bytes: &[u8]) -> PayloadCommitment {
    let hash = sha256_hex(capsule_bytes);
    PayloadCommitment {
        chunked: false,
        root: hash.clone(),
        plaintext_hash: hash,
        plaintext_length: capsule_bytes.len(),
    }
}

/// Canonical bytes covered by the package signature
///
/// The header, payload commitment and manifest are rendered as JSON with
/// object keys in sorted order and prefixed with a domain label. The
/// manifest is re-sorted by artefact reference here as well.
pub fn signing_data(
    header: &EnvelopeHeader,
    commitment: &PayloadCommitment,
    manifest: &[ManifestEntry],
) -> BuildResult<Vec<u8>> {
    let mut manifest = manifest.to_vec();
    manifest.sort();

    // serde_json::Map is ordered by key, so re-rendering through Value sorts
    // every nested object
    let document = json!({
        "header": serde_json::to_value(header)?,
        "payload": serde_json::to_value(commitment)?,
        "manifest": serde_json::to_value(&manifest)?,
    });

    let mut data = SIGNING_DOMAIN.to_vec();
    data.extend_from_slice(&serde_json::to_vec(&document)?);
    Ok(data)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageSignature {
    pub algorithm: String,
    pub key_id: KeyId,
    /// Ed25519 verifying key, base64
    pub public_key: String,
    /// Signature bytes, base64
    pub value: String,
    /// SHA-256 of the signing data, hex
    pub signed_data_hash: String,
}

pub fn sign_package(keypair: &SigningKeyPair, data: &[u8]) -> PackageSignature {
    let signature = keypair.sign(data);
    PackageSignature {
        algorithm: SIGNATURE_ALGORITHM.to_string(),
        key_id: keypair.key_id(),
        public_key: keypair.public_key_b64(),
        value: b64::encode(&signature),
        signed_data_hash: sha256_hex(data),
    }
}

/// Verify a signature against its embedded public key
pub fn verify_package_signature(signature: &PackageSignature, data: &[u8]) -> CryptoResult<()> {
    let public_key = b64::decode(&signature.public_key)
        .map_err(|e| beap_crypto::CryptoError::InvalidKey(e.to_string()))?;
    let value = b64::decode(&signature.value)
        .map_err(|_| beap_crypto::CryptoError::SignatureVerificationFailed)?;
    verify_signature(&public_key, data, &value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_private_header;

    fn commitment() -> PayloadCommitment {
        plaintext_commitment(b"{\"body\":\"hello\"}")
    }

    #[test]
    fn test_signing_data_is_order_independent_for_manifest() {
        let header = sample_private_header();
        let a = ManifestEntry {
            artefact_ref: "a".into(),
            plaintext_hash: "1".into(),
        };
        let b = ManifestEntry {
            artefact_ref: "b".into(),
            plaintext_hash: "2".into(),
        };

        let forward = signing_data(&header, &commitment(), &[a.clone(), b.clone()]).unwrap();
        let reverse = signing_data(&header, &commitment(), &[b, a]).unwrap();
        assert_eq!(forward, reverse);
        assert!(forward.starts_with(SIGNING_DOMAIN));
    }

    #[test]
    fn test_signing_data_keys_sorted() {
        let data = signing_data(&sample_private_header(), &commitment(), &[]).unwrap();
        let text = String::from_utf8(data[SIGNING_DOMAIN.len()..].to_vec()).unwrap();
        let header_pos = text.find("\"header\"").unwrap();
        let manifest_pos = text.find("\"manifest\"").unwrap();
        let payload_pos = text.find("\"payload\"").unwrap();
        assert!(header_pos < manifest_pos && manifest_pos < payload_pos);
    }

    #[test]
    fn test_sign_and_verify() {
        let keypair = SigningKeyPair::generate();
        let data = signing_data(&sample_private_header(), &commitment(), &[]).unwrap();
        let signature = sign_package(&keypair, &data);

        assert_eq!(signature.algorithm, "Ed25519");
        assert_eq!(signature.key_id, keypair.key_id());
        assert!(verify_package_signature(&signature, &data).is_ok());

        let mut tampered = data.clone();
        let last = tampered.len() - 1;
        tampered[last] ^= 1;
        assert!(verify_package_signature(&signature, &tampered).is_err());
    }
}
