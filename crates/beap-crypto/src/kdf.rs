//! Package key derivation using HKDF-SHA256
//!
//! One hybrid secret and a fresh 16-byte salt yield two keys: the capsule key
//! (message payload chunks) and the artefact key (raster pages and original
//! files). Distinct info labels keep the two keys independent.

use hkdf::Hkdf;
use rand::RngCore;
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::aead::AEAD_KEY_SIZE;
use crate::error::{CryptoError, CryptoResult};
use crate::hybrid::HybridSecret;

/// Salt size in bytes
pub const SALT_SIZE: usize = 16;

/// Wire name of the KDF
pub const KDF_ALGORITHM: &str = "HKDF-SHA256";

/// Info label for the capsule key
const CAPSULE_KEY_LABEL: &[u8] = b"BEAP v1 capsule key";

/// Info label for the artefact key
const ARTEFACT_KEY_LABEL: &[u8] = b"BEAP v1 artefact key";

/// Symmetric keys for one package
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct PackageKeys {
    capsule_key: [u8; AEAD_KEY_SIZE],
    artefact_key: [u8; AEAD_KEY_SIZE],
}

impl PackageKeys {
    /// Key sealing the capsule payload chunks
    pub fn capsule_key(&self) -> &[u8; AEAD_KEY_SIZE] {
        &self.capsule_key
    }

    /// Key sealing artefacts
    pub fn artefact_key(&self) -> &[u8; AEAD_KEY_SIZE] {
        &self.artefact_key
    }
}

impl std::fmt::Debug for PackageKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PackageKeys(..)")
    }
}

/// Draw a fresh salt from the OS CSPRNG
pub fn generate_salt() -> [u8; SALT_SIZE] {
    let mut salt = [0u8; SALT_SIZE];
    rand::rng().fill_bytes(&mut salt);
    salt
}

/// Derive the capsule and artefact keys
///
/// Deterministic: identical secret and salt always give identical keys.
pub fn derive_package_keys(secret: &HybridSecret, salt: &[u8; SALT_SIZE]) -> CryptoResult<PackageKeys> {
    let hkdf = Hkdf::<Sha256>::new(Some(salt), secret.as_bytes());

    let mut capsule_key = [0u8; AEAD_KEY_SIZE];
    hkdf.expand(CAPSULE_KEY_LABEL, &mut capsule_key)
        .map_err(|e| CryptoError::KeyDerivationFailed(e.to_string()))?;

    let mut artefact_key = [0u8; AEAD_KEY_SIZE];
    hkdf.expand(ARTEFACT_KEY_LABEL, &mut artefact_key)
        .map_err(|e| CryptoError::KeyDerivationFailed(e.to_string()))?;

    Ok(PackageKeys {
        capsule_key,
        artefact_key,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret(fill: u8) -> HybridSecret {
        HybridSecret::combine(&[fill; 32], &[fill.wrapping_add(1); 32]).unwrap()
    }

    #[test]
    fn test_derive_is_deterministic() {
        let salt = [9u8; SALT_SIZE];
        let a = derive_package_keys(&secret(1), &salt).unwrap();
        let b = derive_package_keys(&secret(1), &salt).unwrap();
        assert_eq!(a.capsule_key(), b.capsule_key());
        assert_eq!(a.artefact_key(), b.artefact_key());
    }

    #[test]
    fn test_capsule_and_artefact_keys_differ() {
        let keys = derive_package_keys(&secret(1), &[0u8; SALT_SIZE]).unwrap();
        assert_ne!(keys.capsule_key(), keys.artefact_key());
    }

    #[test]
    fn test_salt_changes_keys() {
        let a = derive_package_keys(&secret(1), &[0u8; SALT_SIZE]).unwrap();
        let b = derive_package_keys(&secret(1), &[1u8; SALT_SIZE]).unwrap();
        assert_ne!(a.capsule_key(), b.capsule_key());
    }

    #[test]
    fn test_secret_changes_keys() {
        let salt = [0u8; SALT_SIZE];
        let a = derive_package_keys(&secret(1), &salt).unwrap();
        let b = derive_package_keys(&secret(2), &salt).unwrap();
        assert_ne!(a.artefact_key(), b.artefact_key());
    }

    #[test]
    fn test_salts_are_fresh() {
        assert_ne!(generate_salt(), generate_salt());
    }
}
