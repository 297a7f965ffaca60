//! ChaCha20-Poly1305 sealing with associated data
//!
//! Every package ciphertext (capsule chunk or artefact) is sealed under a
//! per-package key, a random 96-bit nonce, and the envelope's canonical AAD.
//! Opening with any other AAD fails authentication.

use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    ChaCha20Poly1305, Nonce,
};
use rand::RngCore;

use crate::error::{CryptoError, CryptoResult};

/// Key size (32 bytes)
pub const AEAD_KEY_SIZE: usize = 32;

/// Nonce size for ChaCha20-Poly1305 (12 bytes)
pub const NONCE_SIZE: usize = 12;

/// Poly1305 tag size (16 bytes)
pub const TAG_SIZE: usize = 16;

/// Wire name of the AEAD
pub const AEAD_ALGORITHM: &str = "ChaCha20-Poly1305";

/// Sealed data with its nonce
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedBox {
    /// Nonce used for encryption (12 bytes)
    pub nonce: [u8; NONCE_SIZE],
    /// Ciphertext with authentication tag
    pub ciphertext: Vec<u8>,
}

impl SealedBox {
    /// Total size on the wire (nonce + ciphertext)
    pub fn size(&self) -> usize {
        NONCE_SIZE + self.ciphertext.len()
    }
}

/// Generate a random nonce
pub fn generate_nonce() -> [u8; NONCE_SIZE] {
    let mut nonce = [0u8; NONCE_SIZE];
    rand::rng().fill_bytes(&mut nonce);
    nonce
}

/// Seal plaintext under a fresh random nonce
pub fn seal(key: &[u8; AEAD_KEY_SIZE], plaintext: &[u8], aad: &[u8]) -> CryptoResult<SealedBox> {
    seal_with_nonce(key, generate_nonce(), plaintext, aad)
}

/// Seal plaintext under a caller-chosen nonce
///
/// The nonce must never repeat under the same key.
pub fn seal_with_nonce(
    key: &[u8; AEAD_KEY_SIZE],
    nonce: [u8; NONCE_SIZE],
    plaintext: &[u8],
    aad: &[u8],
) -> CryptoResult<SealedBox> {
    let cipher = ChaCha20Poly1305::new_from_slice(key)
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), Payload { msg: plaintext, aad })
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

    Ok(SealedBox { nonce, ciphertext })
}

/// Open sealed data
///
/// # Errors
///
/// Returns an error if:
/// - The key is incorrect
/// - The ciphertext or AAD has been tampered with
pub fn open(key: &[u8; AEAD_KEY_SIZE], sealed: &SealedBox, aad: &[u8]) -> CryptoResult<Vec<u8>> {
    if sealed.ciphertext.len() < TAG_SIZE {
        return Err(CryptoError::DataTooShort {
            expected: TAG_SIZE,
            actual: sealed.ciphertext.len(),
        });
    }

    let cipher = ChaCha20Poly1305::new_from_slice(key)
        .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))?;

    cipher
        .decrypt(
            Nonce::from_slice(&sealed.nonce),
            Payload {
                msg: sealed.ciphertext.as_slice(),
                aad,
            },
        )
        .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))
}

/// Parse a nonce from bytes
pub fn nonce_from_slice(bytes: &[u8]) -> CryptoResult<[u8; NONCE_SIZE]> {
    bytes.try_into().map_err(|_| CryptoError::InvalidNonce)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(fill: u8) -> [u8; AEAD_KEY_SIZE] {
        [fill; AEAD_KEY_SIZE]
    }

    #[test]
    fn test_seal_open() {
        let sealed = seal(&key(1), b"Hello, capsule!", b"aad").unwrap();
        assert_eq!(sealed.ciphertext.len(), 15 + TAG_SIZE);
        let opened = open(&key(1), &sealed, b"aad").unwrap();
        assert_eq!(opened, b"Hello, capsule!");
    }

    #[test]
    fn test_empty_plaintext() {
        let sealed = seal(&key(1), b"", b"aad").unwrap();
        assert_eq!(open(&key(1), &sealed, b"aad").unwrap(), b"");
    }

    #[test]
    fn test_wrong_aad_fails() {
        let sealed = seal(&key(1), b"payload", b"header-v1").unwrap();
        let result = open(&key(1), &sealed, b"header-v2");
        assert!(matches!(result, Err(CryptoError::DecryptionFailed(_))));
    }

    #[test]
    fn test_wrong_key_fails() {
        let sealed = seal(&key(1), b"payload", b"aad").unwrap();
        assert!(open(&key(2), &sealed, b"aad").is_err());
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let mut sealed = seal(&key(1), b"payload", b"aad").unwrap();
        sealed.ciphertext[0] ^= 0xFF;
        assert!(open(&key(1), &sealed, b"aad").is_err());
    }

    #[test]
    fn test_truncated_ciphertext_rejected() {
        let sealed = SealedBox {
            nonce: [0u8; NONCE_SIZE],
            ciphertext: vec![0u8; 4],
        };
        let result = open(&key(1), &sealed, b"aad");
        assert!(matches!(result, Err(CryptoError::DataTooShort { .. })));
    }

    #[test]
    fn test_random_nonces_differ() {
        let a = seal(&key(1), b"same", b"aad").unwrap();
        let b = seal(&key(1), b"same", b"aad").unwrap();
        assert_ne!(a.nonce, b.nonce);
        assert_ne!(a.ciphertext, b.ciphertext);
    }

    #[test]
    fn test_fixed_nonce_is_deterministic() {
        let nonce = [3u8; NONCE_SIZE];
        let a = seal_with_nonce(&key(1), nonce, b"same", b"aad").unwrap();
        let b = seal_with_nonce(&key(1), nonce, b"same", b"aad").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_nonce_from_slice() {
        assert!(nonce_from_slice(&[0u8; NONCE_SIZE]).is_ok());
        assert!(matches!(nonce_from_slice(&[0u8; 8]), Err(CryptoError::InvalidNonce)));
    }
}
