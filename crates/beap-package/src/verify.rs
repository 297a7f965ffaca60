//! Package verification and opening
//!
//! [`verify_package`] needs nothing but the package: it checks structure,
//! the signature against the embedded key, the signing data, the canonical
//! AAD and whatever commitments are checkable without keys. Receivers holding
//! the device and KEM private keys can go further with
//! [`open_private_package`].

use beap_crypto::{
    derive_package_keys, sha256_hex, DeviceKeyPair, HybridSecret, PQCiphertext, PQKemKeyPair,
    SALT_SIZE, SIGNATURE_ALGORITHM,
};
use tracing::{debug, instrument};

use crate::aad::CanonicalAad;
use crate::artefact::open_artefact;
use crate::b64;
use crate::capsule::CapsulePayload;
use crate::chunking::open_capsule;
use crate::error::{VerifyError, VerifyResult};
use crate::hashing::content_hash;
use crate::header::EncryptionMode;
use crate::package::{BeapPackage, PackageBody};
use crate::signing::{signing_data, verify_package_signature};

/// Summary of a successful verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationReport {
    pub signed_data_hash: String,
    /// SHA-256 of the canonical AAD, private packages only
    pub aad_digest: Option<String>,
    pub chunk_count: usize,
    pub artefact_count: usize,
}

/// Decrypted content of a private package
#[derive(Debug, Clone)]
pub struct OpenedPackage {
    pub capsule: CapsulePayload,
    /// `(artefact_ref, plaintext)` in manifest order
    pub artefacts: Vec<(String, Vec<u8>)>,
}

fn check_structure(package: &BeapPackage) -> VerifyResult<()> {
    let header = &package.header;
    match (&package.body, header.encoding.is_private()) {
        (PackageBody::Private { .. }, true) => {
            let crypto = header
                .crypto
                .as_ref()
                .ok_or_else(|| VerifyError::Malformed("private package without crypto metadata".into()))?;
            if !crypto.pq.active {
                return Err(VerifyError::Malformed("private package without active PQ".into()));
            }
            if header.encryption_mode != EncryptionMode::HybridAead {
                return Err(VerifyError::Malformed("private package not encrypted".into()));
            }
        }
        (PackageBody::Public { .. }, false) => {
            if header.crypto.is_some() || header.key_derivation().is_some() {
                return Err(VerifyError::Malformed("public package declares crypto metadata".into()));
            }
            if header.encryption_mode != EncryptionMode::None || header.receiver_binding.is_some() {
                return Err(VerifyError::Malformed("public package bound to a receiver".into()));
            }
        }
        _ => {
            return Err(VerifyError::Malformed(
                "content section does not match encoding".into(),
            ));
        }
    }

    let signing = &header.signing;
    let signature = &package.signature;
    if signature.algorithm != SIGNATURE_ALGORITHM
        || signature.public_key != signing.public_key
        || signature.key_id != signing.key_id
    {
        return Err(VerifyError::Malformed(
            "signature does not match signing metadata".into(),
        ));
    }
    Ok(())
}

/// Verify a package without any private keys
#[instrument(skip(package), fields(encoding = %package.header.encoding))]
pub fn verify_package(package: &BeapPackage) -> VerifyResult<VerificationReport> {
    check_structure(package)?;

    let commitment = package.payload_commitment()?;
    let data = signing_data(&package.header, &commitment, &package.manifest())
        .map_err(|e| VerifyError::Malformed(e.to_string()))?;
    let signed_data_hash = sha256_hex(&data);
    if signed_data_hash != package.signature.signed_data_hash {
        return Err(VerifyError::SigningDataMismatch);
    }
    verify_package_signature(&package.signature, &data).map_err(|_| VerifyError::BadSignature)?;

    let report = match &package.body {
        PackageBody::Private {
            payload_enc,
            artefacts_enc,
        } => {
            let aad = CanonicalAad::from_header(&package.header)
                .map_err(|_| VerifyError::AadMismatch)?;
            VerificationReport {
                signed_data_hash,
                aad_digest: Some(aad.digest_hex()),
                chunk_count: payload_enc.chunking.as_ref().map_or(1, |c| c.count),
                artefact_count: artefacts_enc.len(),
            }
        }
        PackageBody::Public { payload, artefacts } => {
            let capsule = CapsulePayload::from_bytes(&b64::decode(payload)?)?;
            if content_hash(&capsule.body, &capsule.attachments) != package.header.content_hash {
                return Err(VerifyError::ContentHashMismatch);
            }
            for artefact in artefacts {
                if sha256_hex(&b64::decode(&artefact.data)?) != artefact.plaintext_hash {
                    return Err(VerifyError::ArtefactHashMismatch(artefact.artefact_ref.clone()));
                }
            }
            VerificationReport {
                signed_data_hash,
                aad_digest: None,
                chunk_count: 0,
                artefact_count: artefacts.len(),
            }
        }
    };

    debug!(artefacts = report.artefact_count, "Package verified");
    Ok(report)
}

/// Verify and decrypt a private package addressed to this device
#[instrument(skip_all)]
pub fn open_private_package(
    package: &BeapPackage,
    device: &DeviceKeyPair,
    kem_keys: &PQKemKeyPair,
) -> VerifyResult<OpenedPackage> {
    verify_package(package)?;

    let PackageBody::Private {
        payload_enc,
        artefacts_enc,
    } = &package.body
    else {
        return Err(VerifyError::NotPrivate);
    };
    let crypto = package.header.crypto.as_ref().ok_or(VerifyError::NotPrivate)?;

    let kem_ciphertext = PQCiphertext::from_bytes(b64::decode(&crypto.pq.ciphertext)?)?;
    let pq_shared = kem_keys.decapsulate(&kem_ciphertext)?;
    let sender_public = b64::decode(&crypto.sender_x25519_public_key)?;
    let classical = device.diffie_hellman(&sender_public)?;
    let secret = HybridSecret::combine(&pq_shared, classical.as_slice())?;

    let salt: [u8; SALT_SIZE] = b64::decode(&crypto.salt)?
        .try_into()
        .map_err(|_| VerifyError::Malformed("salt has the wrong length".into()))?;
    let keys = derive_package_keys(&secret, &salt)?;

    let aad = CanonicalAad::from_header(&package.header).map_err(|_| VerifyError::AadMismatch)?;

    let plaintext = open_capsule(payload_enc, keys.capsule_key(), aad.as_bytes())?;
    let capsule = CapsulePayload::from_bytes(&plaintext)?;
    if content_hash(&capsule.body, &capsule.attachments) != package.header.content_hash {
        return Err(VerifyError::ContentHashMismatch);
    }

    let mut artefacts = Vec::with_capacity(artefacts_enc.len());
    for artefact in artefacts_enc {
        let bytes = open_artefact(artefact, keys.artefact_key(), aad.as_bytes())?;
        artefacts.push((artefact.artefact_ref.clone(), bytes));
    }

    debug!(artefacts = artefacts.len(), "Opened private package");
    Ok(OpenedPackage { capsule, artefacts })
}
