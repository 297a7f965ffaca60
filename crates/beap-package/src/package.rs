//! The assembled package and its JSON form

use beap_core::{DeliveryMethod, Encoding, Fingerprint};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::artefact::{manifest, EncryptedArtefact, ManifestEntry, PublicArtefact};
use crate::b64;
use crate::chunking::{PayloadCommitment, PayloadEnc};
use crate::error::{BuildResult, VerifyError, VerifyResult};
use crate::header::EnvelopeHeader;
use crate::signing::{plaintext_commitment, PackageSignature};

/// Short fingerprint placeholder for packages with no receiver
pub const PUBLIC_FILENAME_TAG: &str = "PUBLIC";

/// `beap_<YYYYMMDD>_<shortFingerprintOrPUBLIC>.beap`
pub fn package_filename(created_at: DateTime<Utc>, receiver: Option<&Fingerprint>) -> String {
    let tag = receiver
        .map(Fingerprint::short)
        .unwrap_or_else(|| PUBLIC_FILENAME_TAG.to_string());
    format!("beap_{}_{}.beap", created_at.format("%Y%m%d"), tag)
}

/// Content section: encrypted for private packages, plaintext for public ones
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PackageBody {
    Private {
        #[serde(rename = "payloadEnc")]
        payload_enc: PayloadEnc,
        #[serde(rename = "artefactsEnc")]
        artefacts_enc: Vec<EncryptedArtefact>,
    },
    Public {
        /// base64 of the capsule JSON
        payload: String,
        artefacts: Vec<PublicArtefact>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryMetadata {
    pub filename: String,
    pub created_at: DateTime<Utc>,
    pub delivery_hint: DeliveryMethod,
}

/// An assembled BEAP package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeapPackage {
    pub header: EnvelopeHeader,
    #[serde(flatten)]
    pub body: PackageBody,
    pub signature: PackageSignature,
    pub delivery: DeliveryMetadata,
}

impl BeapPackage {
    pub fn encoding(&self) -> Encoding {
        self.header.encoding
    }

    pub fn is_private(&self) -> bool {
        matches!(self.body, PackageBody::Private { .. })
    }

    pub fn filename(&self) -> &str {
        &self.delivery.filename
    }

    /// Commitment to the capsule as covered by the signature
    pub fn payload_commitment(&self) -> VerifyResult<PayloadCommitment> {
        match &self.body {
            PackageBody::Private { payload_enc, .. } => Ok(payload_enc.commitment()),
            PackageBody::Public { payload, .. } => Ok(plaintext_commitment(&b64::decode(payload)?)),
        }
    }

    /// Sorted manifest of artefact references and plaintext hashes
    pub fn manifest(&self) -> Vec<ManifestEntry> {
        match &self.body {
            PackageBody::Private { artefacts_enc, .. } => manifest(
                artefacts_enc
                    .iter()
                    .map(|a| (a.artefact_ref.as_str(), a.plaintext_hash.as_str())),
            ),
            PackageBody::Public { artefacts, .. } => manifest(
                artefacts
                    .iter()
                    .map(|a| (a.artefact_ref.as_str(), a.plaintext_hash.as_str())),
            ),
        }
    }

    pub fn to_json(&self) -> BuildResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn to_json_bytes(&self) -> BuildResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Parse a package and check that its body matches its declared encoding
    pub fn from_json(json: &str) -> VerifyResult<Self> {
        let package: Self = serde_json::from_str(json)?;
        if package.header.encoding.is_private() != package.is_private() {
            return Err(VerifyError::Malformed(format!(
                "{} header with mismatched content section",
                package.header.encoding
            )));
        }
        Ok(package)
    }
}
