//! Artefacts: independently sealed binary content units
//!
//! Every attachment yields one `original` artefact (the source file) and one
//! `raster` artefact per rendered page. Artefacts share the artefact key and
//! the package AAD but each carries its own nonce.

use beap_crypto::{open, sha256_hex, AEAD_KEY_SIZE};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::b64;
use crate::chunking::seal_in_order;
use crate::config::Attachment;
use crate::error::{BuildResult, VerifyError, VerifyResult};

/// Artefact class
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "class", rename_all = "lowercase")]
pub enum ArtefactKind {
    /// Rendered reconstruction image of one page
    Raster { page: usize },
    /// The source file itself
    Original { filename: String },
}

/// Plaintext artefact content prior to sealing
#[derive(Debug, Clone)]
pub struct ArtefactSource<'a> {
    pub artefact_ref: String,
    pub attachment_id: String,
    pub kind: ArtefactKind,
    pub mime_type: String,
    pub bytes: &'a [u8],
}

/// Expand attachments into artefact sources, sorted by reference
pub fn collect_artefacts(attachments: &[Attachment]) -> Vec<ArtefactSource<'_>> {
    let mut sources = Vec::new();
    for attachment in attachments {
        sources.push(ArtefactSource {
            artefact_ref: format!("{}/original", attachment.id),
            attachment_id: attachment.id.clone(),
            kind: ArtefactKind::Original {
                filename: attachment.name.clone(),
            },
            mime_type: attachment.mime_type.clone(),
            bytes: &attachment.bytes,
        });
        for (page, image) in attachment.raster_pages.iter().enumerate() {
            sources.push(ArtefactSource {
                artefact_ref: format!("{}/raster/{:04}", attachment.id, page),
                attachment_id: attachment.id.clone(),
                kind: ArtefactKind::Raster { page },
                mime_type: "image/png".to_string(),
                bytes: image,
            });
        }
    }
    sources.sort_by(|a, b| a.artefact_ref.cmp(&b.artefact_ref));
    sources
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedArtefact {
    pub artefact_ref: String,
    pub attachment_id: String,
    #[serde(flatten)]
    pub kind: ArtefactKind,
    pub mime_type: String,
    pub nonce: String,
    pub ciphertext: String,
    pub plaintext_hash: String,
    pub ciphertext_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicArtefact {
    pub artefact_ref: String,
    pub attachment_id: String,
    #[serde(flatten)]
    pub kind: ArtefactKind,
    pub mime_type: String,
    /// base64 content
    pub data: String,
    pub plaintext_hash: String,
}

/// Signed manifest entry
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    pub artefact_ref: String,
    pub plaintext_hash: String,
}

/// Build the manifest from `(ref, plaintext hash)` pairs, sorted by ref
pub fn manifest<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> Vec<ManifestEntry> {
    let mut manifest: Vec<ManifestEntry> = entries
        .into_iter()
        .map(|(artefact_ref, plaintext_hash)| ManifestEntry {
            artefact_ref: artefact_ref.to_string(),
            plaintext_hash: plaintext_hash.to_string(),
        })
        .collect();
    manifest.sort();
    manifest
}

/// Seal artefacts under the artefact key
pub fn seal_artefacts(
    sources: &[ArtefactSource<'_>],
    key: &[u8; AEAD_KEY_SIZE],
    aad: &[u8],
    parallel: bool,
) -> BuildResult<Vec<EncryptedArtefact>> {
    let plaintexts: Vec<&[u8]> = sources.iter().map(|s| s.bytes).collect();
    let sealed = seal_in_order(key, &plaintexts, aad, parallel)?;

    let artefacts: Vec<EncryptedArtefact> = sources
        .iter()
        .zip(sealed)
        .map(|(source, sealed_box)| EncryptedArtefact {
            artefact_ref: source.artefact_ref.clone(),
            attachment_id: source.attachment_id.clone(),
            kind: source.kind.clone(),
            mime_type: source.mime_type.clone(),
            nonce: b64::encode(&sealed_box.nonce),
            ciphertext: b64::encode(&sealed_box.ciphertext),
            plaintext_hash: sha256_hex(source.bytes),
            ciphertext_hash: sha256_hex(&sealed_box.ciphertext),
        })
        .collect();

    debug!(artefacts = artefacts.len(), "Sealed artefacts");
    Ok(artefacts)
}

/// Plaintext artefacts for public packages
pub fn public_artefacts(sources: &[ArtefactSource<'_>]) -> Vec<PublicArtefact> {
    sources
        .iter()
        .map(|source| PublicArtefact {
            artefact_ref: source.artefact_ref.clone(),
            attachment_id: source.attachment_id.clone(),
            kind: source.kind.clone(),
            mime_type: source.mime_type.clone(),
            data: b64::encode(source.bytes),
            plaintext_hash: sha256_hex(source.bytes),
        })
        .collect()
}

/// Decrypt one artefact and check both of its hashes
pub fn open_artefact(
    artefact: &EncryptedArtefact,
    key: &[u8; AEAD_KEY_SIZE],
    aad: &[u8],
) -> VerifyResult<Vec<u8>> {
    let ciphertext = b64::decode(&artefact.ciphertext)?;
    if sha256_hex(&ciphertext) != artefact.ciphertext_hash {
        return Err(VerifyError::ArtefactHashMismatch(artefact.artefact_ref.clone()));
    }
    let sealed_box = beap_crypto::SealedBox {
        nonce: beap_crypto::nonce_from_slice(&b64::decode(&artefact.nonce)?)?,
        ciphertext,
    };
    let plaintext =
        open(key, &sealed_box, aad).map_err(|e| VerifyError::Decryption(e.to_string()))?;
    if sha256_hex(&plaintext) != artefact.plaintext_hash {
        return Err(VerifyError::ArtefactHashMismatch(artefact.artefact_ref.clone()));
    }
    Ok(plaintext)
}
