//! Chunked capsule encryption
//!
//! The serialized capsule is split into fixed-size chunks. Each chunk is
//! sealed independently under the capsule key with its own nonce and the
//! package AAD, and a Merkle root over the ordered chunk ciphertexts commits
//! to the whole payload.
//!
//! Packages written before chunking carried the capsule as one sealed blob.
//! Those still open through [`open_capsule`]; they are never produced.

use std::thread;

use beap_crypto::{
    generate_nonce, nonce_from_slice, open, seal_with_nonce, sha256_hex, CryptoError,
    CryptoResult, MerkleTree, SealedBox, AEAD_KEY_SIZE, NONCE_SIZE,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::b64;
use crate::error::{BuildError, BuildResult, VerifyError, VerifyResult};

/// One sealed chunk of the capsule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedChunk {
    pub index: usize,
    /// base64
    pub nonce: String,
    /// base64, includes the AEAD tag
    pub ciphertext: String,
    pub ciphertext_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkingInfo {
    pub chunk_size: usize,
    pub count: usize,
    pub merkle_root: String,
    pub chunks: Vec<EncryptedChunk>,
}

/// Encrypted capsule as carried by a private package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayloadEnc {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunking: Option<ChunkingInfo>,
    /// Legacy single-blob nonce, base64
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    /// Legacy single-blob ciphertext, base64
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ciphertext: Option<String>,
    /// Legacy single-blob ciphertext hash
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ciphertext_hash: Option<String>,
    pub plaintext_hash: String,
    pub plaintext_length: usize,
}

/// What the signature commits to for the capsule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayloadCommitment {
    pub chunked: bool,
    /// Merkle root for chunked payloads, legacy ciphertext hash otherwise
    pub root: String,
    pub plaintext_hash: String,
    pub plaintext_length: usize,
}

impl PayloadEnc {
    pub fn is_chunked(&self) -> bool {
        self.chunking.is_some()
    }

    pub fn commitment(&self) -> PayloadCommitment {
        let root = match (&self.chunking, &self.ciphertext_hash) {
            (Some(info), _) => info.merkle_root.clone(),
            (None, Some(hash)) => hash.clone(),
            (None, None) => String::new(),
        };
        PayloadCommitment {
            chunked: self.is_chunked(),
            root,
            plaintext_hash: self.plaintext_hash.clone(),
            plaintext_length: self.plaintext_length,
        }
    }
}

/// Split `data` into `chunk_size` pieces; empty input yields one empty chunk
pub fn split_chunks(data: &[u8], chunk_size: usize) -> Vec<&[u8]> {
    if data.is_empty() || chunk_size == 0 {
        return vec![data];
    }
    data.chunks(chunk_size).collect()
}

/// Seal every item under `key` with a fresh random nonce, in input order
pub(crate) fn seal_in_order(
    key: &[u8; AEAD_KEY_SIZE],
    items: &[&[u8]],
    aad: &[u8],
    parallel: bool,
) -> CryptoResult<Vec<SealedBox>> {
    let nonces: Vec<_> = items.iter().map(|_| generate_nonce()).collect();
    seal_with_nonces(key, items, &nonces, aad, parallel)
}

/// Seal `items[i]` under `nonces[i]`, returning results in input order
///
/// With `parallel` set the items are split into contiguous groups and
/// sealed on scoped threads.
fn seal_with_nonces(
    key: &[u8; AEAD_KEY_SIZE],
    items: &[&[u8]],
    nonces: &[[u8; NONCE_SIZE]],
    aad: &[u8],
    parallel: bool,
) -> CryptoResult<Vec<SealedBox>> {
    if items.len() != nonces.len() {
        return Err(CryptoError::EncryptionFailed(format!(
            "{} items but {} nonces",
            items.len(),
            nonces.len()
        )));
    }

    let workers = if parallel {
        thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
            .min(items.len())
    } else {
        1
    };

    if workers <= 1 {
        return items
            .iter()
            .zip(nonces)
            .map(|(item, nonce)| seal_with_nonce(key, *nonce, item, aad))
            .collect();
    }

    let per_worker = items.len().div_ceil(workers);
    thread::scope(|scope| {
        let handles: Vec<_> = items
            .chunks(per_worker)
            .zip(nonces.chunks(per_worker))
            .map(|(group, group_nonces)| {
                scope.spawn(move || {
                    group
                        .iter()
                        .zip(group_nonces)
                        .map(|(item, nonce)| seal_with_nonce(key, *nonce, item, aad))
                        .collect::<CryptoResult<Vec<_>>>()
                })
            })
            .collect();

        let mut sealed = Vec::with_capacity(items.len());
        for handle in handles {
            let group = handle
                .join()
                .map_err(|_| CryptoError::EncryptionFailed("seal worker panicked".to_string()))??;
            sealed.extend(group);
        }
        Ok(sealed)
    })
}

/// Encrypt a serialized capsule into chunks
pub fn seal_capsule(
    plaintext: &[u8],
    key: &[u8; AEAD_KEY_SIZE],
    aad: &[u8],
    chunk_size: usize,
    parallel: bool,
) -> BuildResult<PayloadEnc> {
    seal_capsule_with(plaintext, key, aad, chunk_size, parallel, |_| generate_nonce())
}

/// Encrypt a serialized capsule, taking chunk `i`'s nonce from `nonce_for(i)`
///
/// Nonces must never repeat under one key.
pub(crate) fn seal_capsule_with(
    plaintext: &[u8],
    key: &[u8; AEAD_KEY_SIZE],
    aad: &[u8],
    chunk_size: usize,
    parallel: bool,
    nonce_for: impl FnMut(usize) -> [u8; NONCE_SIZE],
) -> BuildResult<PayloadEnc> {
    if chunk_size == 0 {
        return Err(BuildError::Validation("chunk size must be non-zero".to_string()));
    }

    let pieces = split_chunks(plaintext, chunk_size);
    let nonces: Vec<_> = (0..pieces.len()).map(nonce_for).collect();
    let sealed = seal_with_nonces(key, &pieces, &nonces, aad, parallel)?;
    let tree = MerkleTree::from_data(
        &sealed.iter().map(|s| s.ciphertext.as_slice()).collect::<Vec<_>>(),
    )?;

    let chunks: Vec<EncryptedChunk> = sealed
        .iter()
        .enumerate()
        .map(|(index, s)| EncryptedChunk {
            index,
            nonce: b64::encode(&s.nonce),
            ciphertext: b64::encode(&s.ciphertext),
            ciphertext_hash: sha256_hex(&s.ciphertext),
        })
        .collect();

    debug!(
        chunks = chunks.len(),
        chunk_size,
        plaintext_len = plaintext.len(),
        "Sealed capsule"
    );

    Ok(PayloadEnc {
        chunking: Some(ChunkingInfo {
            chunk_size,
            count: chunks.len(),
            merkle_root: tree.root_hex(),
            chunks,
        }),
        nonce: None,
        ciphertext: None,
        ciphertext_hash: None,
        plaintext_hash: sha256_hex(plaintext),
        plaintext_length: plaintext.len(),
    })
}

fn decode_sealed(nonce: &str, ciphertext: &str) -> VerifyResult<SealedBox> {
    Ok(SealedBox {
        nonce: nonce_from_slice(&b64::decode(nonce)?)?,
        ciphertext: b64::decode(ciphertext)?,
    })
}

/// Decrypt a capsule, checking every commitment on the way
pub fn open_capsule(
    payload: &PayloadEnc,
    key: &[u8; AEAD_KEY_SIZE],
    aad: &[u8],
) -> VerifyResult<Vec<u8>> {
    let plaintext = match &payload.chunking {
        Some(info) => open_chunked(info, key, aad)?,
        None => open_legacy(payload, key, aad)?,
    };

    if plaintext.len() != payload.plaintext_length || sha256_hex(&plaintext) != payload.plaintext_hash
    {
        return Err(VerifyError::ContentHashMismatch);
    }
    Ok(plaintext)
}

fn open_chunked(
    info: &ChunkingInfo,
    key: &[u8; AEAD_KEY_SIZE],
    aad: &[u8],
) -> VerifyResult<Vec<u8>> {
    if info.count != info.chunks.len() {
        return Err(VerifyError::Malformed(format!(
            "chunk count {} does not match {} chunks",
            info.count,
            info.chunks.len()
        )));
    }

    let mut sealed = Vec::with_capacity(info.chunks.len());
    for (position, chunk) in info.chunks.iter().enumerate() {
        if chunk.index != position {
            return Err(VerifyError::Malformed(format!(
                "chunk {} out of order at position {}",
                chunk.index, position
            )));
        }
        let sealed_box = decode_sealed(&chunk.nonce, &chunk.ciphertext)?;
        if sha256_hex(&sealed_box.ciphertext) != chunk.ciphertext_hash {
            return Err(VerifyError::MerkleRootMismatch);
        }
        sealed.push(sealed_box);
    }

    let tree = MerkleTree::from_data(
        &sealed.iter().map(|s| s.ciphertext.as_slice()).collect::<Vec<_>>(),
    )?;
    if tree.root_hex() != info.merkle_root {
        return Err(VerifyError::MerkleRootMismatch);
    }

    let mut plaintext = Vec::new();
    for sealed_box in &sealed {
        let piece = open(key, sealed_box, aad).map_err(|e| VerifyError::Decryption(e.to_string()))?;
        plaintext.extend_from_slice(&piece);
    }
    Ok(plaintext)
}

fn open_legacy(payload: &PayloadEnc, key: &[u8; AEAD_KEY_SIZE], aad: &[u8]) -> VerifyResult<Vec<u8>> {
    let (Some(nonce), Some(ciphertext)) = (&payload.nonce, &payload.ciphertext) else {
        return Err(VerifyError::Malformed(
            "payload has neither chunks nor a legacy blob".to_string(),
        ));
    };
    let sealed_box = decode_sealed(nonce, ciphertext)?;
    if let Some(expected) = &payload.ciphertext_hash
        && sha256_hex(&sealed_box.ciphertext) != *expected
    {
        return Err(VerifyError::ContentHashMismatch);
    }
    debug!("Opening legacy single-blob capsule");
    open(key, &sealed_box, aad).map_err(|e| VerifyError::Decryption(e.to_string()))
}
