//! Device and signing key providers
//!
//! The builder never owns key persistence. It reaches the local device
//! keypair and the package signing key through [`DeviceKeyProvider`] and
//! [`SigningKeyProvider`]. Two stores implement both:
//!
//! - [`MemoryKeyStore`] keeps keys for the lifetime of the process
//! - [`FileKeyStore`] persists keys under a directory and reuses them across
//!   restarts
//!
//! Creation is create-if-absent under a lock. The file store additionally
//! publishes key files with an atomic create-new, so two processes racing on
//! first use converge on whichever key reached the disk first.

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use beap_crypto::{DeviceKeyPair, SigningKeyPair};
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::error::{KeyStoreError, KeyStoreResult};

/// Filename for the X25519 device key (private)
const DEVICE_KEY_FILENAME: &str = "device.x25519";

/// Filename for the Ed25519 signing key (private)
const SIGNING_KEY_FILENAME: &str = "signing.ed25519";

/// Source of the long-lived X25519 device keypair
pub trait DeviceKeyProvider: Send + Sync {
    /// Return the device keypair, creating and persisting it on first use
    fn get_or_create_device_keypair(&self) -> KeyStoreResult<Arc<DeviceKeyPair>>;

    /// Base64 public key of the device keypair
    fn public_key_b64(&self) -> KeyStoreResult<String> {
        Ok(self.get_or_create_device_keypair()?.public_key_b64())
    }
}

/// Source of the Ed25519 package signing key
pub trait SigningKeyProvider: Send + Sync {
    fn get_signing_keypair(&self) -> KeyStoreResult<Arc<SigningKeyPair>>;
}

/// In-process key store
#[derive(Default)]
pub struct MemoryKeyStore {
    device: Mutex<Option<Arc<DeviceKeyPair>>>,
    signing: Mutex<Option<Arc<SigningKeyPair>>>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with existing keys
    pub fn with_keys(device: DeviceKeyPair, signing: SigningKeyPair) -> Self {
        Self {
            device: Mutex::new(Some(Arc::new(device))),
            signing: Mutex::new(Some(Arc::new(signing))),
        }
    }
}

impl DeviceKeyProvider for MemoryKeyStore {
    fn get_or_create_device_keypair(&self) -> KeyStoreResult<Arc<DeviceKeyPair>> {
        let mut slot = self.device.lock();
        let keypair = slot.get_or_insert_with(|| {
            debug!("Generating in-memory device key");
            Arc::new(DeviceKeyPair::generate())
        });
        Ok(Arc::clone(keypair))
    }
}

impl SigningKeyProvider for MemoryKeyStore {
    fn get_signing_keypair(&self) -> KeyStoreResult<Arc<SigningKeyPair>> {
        let mut slot = self.signing.lock();
        let keypair = slot.get_or_insert_with(|| {
            debug!("Generating in-memory signing key");
            Arc::new(SigningKeyPair::generate())
        });
        Ok(Arc::clone(keypair))
    }
}

/// Directory-backed key store
pub struct FileKeyStore {
    /// Path to the keystore directory
    path: PathBuf,
    device: Mutex<Option<Arc<DeviceKeyPair>>>,
    signing: Mutex<Option<Arc<SigningKeyPair>>>,
    /// Generate the signing key on first use instead of requiring it on disk
    create_signing_key: bool,
}

impl FileKeyStore {
    /// Create a key store rooted at `data_dir`; nothing is touched until first use
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.to_path_buf(),
            device: Mutex::new(None),
            signing: Mutex::new(None),
            create_signing_key: true,
        }
    }

    /// Key store whose signing key is provisioned out of band
    ///
    /// A missing `signing.ed25519` is reported as
    /// [`KeyStoreError::NotProvisioned`]. The device key is still created on
    /// first use.
    pub fn provisioned(data_dir: &Path) -> Self {
        Self {
            create_signing_key: false,
            ..Self::new(data_dir)
        }
    }

    fn device_key_path(&self) -> PathBuf {
        self.path.join(DEVICE_KEY_FILENAME)
    }

    fn signing_key_path(&self) -> PathBuf {
        self.path.join(SIGNING_KEY_FILENAME)
    }

    /// Check if a device key file exists
    pub fn device_key_exists(&self) -> bool {
        self.device_key_path().exists()
    }

    /// Check if a signing key file exists
    pub fn signing_key_exists(&self) -> bool {
        self.signing_key_path().exists()
    }

    /// Write `secret` to `path` unless the file already exists.
    ///
    /// The key is written to a private temporary file and hard-linked into
    /// place, so readers never observe a partially written key. Returns
    /// `false` when another writer got there first.
    fn create_key_file(&self, path: &Path, secret: &[u8]) -> KeyStoreResult<bool> {
        std::fs::create_dir_all(&self.path)
            .map_err(|e| KeyStoreError::Io(format!("Failed to create keystore dir: {}", e)))?;

        let tmp_path = path.with_extension(format!("tmp-{:016x}", rand::random::<u64>()));
        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let written = options
            .open(&tmp_path)
            .and_then(|mut file| file.write_all(secret).and_then(|_| file.sync_all()));
        if let Err(e) = written {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(KeyStoreError::Io(format!("Failed to write key file: {}", e)));
        }

        let linked = std::fs::hard_link(&tmp_path, path);
        let _ = std::fs::remove_file(&tmp_path);
        match linked {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(KeyStoreError::Io(format!(
                "Failed to create key file {}: {}",
                path.display(),
                e
            ))),
        }
    }

    fn read_key_file(path: &Path) -> KeyStoreResult<Vec<u8>> {
        std::fs::read(path).map_err(|e| {
            KeyStoreError::Io(format!("Failed to read key file {}: {}", path.display(), e))
        })
    }

    fn corrupt(path: &Path, reason: impl ToString) -> KeyStoreError {
        KeyStoreError::Corrupt {
            path: path.display().to_string(),
            reason: reason.to_string(),
        }
    }

    fn load_or_create_device(&self) -> KeyStoreResult<DeviceKeyPair> {
        let path = self.device_key_path();
        if !path.exists() {
            let keypair = DeviceKeyPair::generate();
            if self.create_key_file(&path, keypair.secret_bytes().as_slice())? {
                info!(
                    key_id = %keypair.key_id(),
                    path = %path.display(),
                    "Saved new device key to keystore"
                );
                return Ok(keypair);
            }
            debug!("Device key created concurrently, loading persisted key");
        }

        let bytes = Self::read_key_file(&path)?;
        let keypair =
            DeviceKeyPair::from_secret_bytes(&bytes).map_err(|e| Self::corrupt(&path, e))?;
        debug!(key_id = %keypair.key_id(), "Loaded device key from keystore");
        Ok(keypair)
    }

    fn load_or_create_signing(&self) -> KeyStoreResult<SigningKeyPair> {
        let path = self.signing_key_path();
        if !path.exists() {
            if !self.create_signing_key {
                return Err(KeyStoreError::NotProvisioned(format!(
                    "no signing key at {}",
                    path.display()
                )));
            }
            let keypair = SigningKeyPair::generate();
            if self.create_key_file(&path, keypair.secret_bytes().as_slice())? {
                info!(
                    key_id = %keypair.key_id(),
                    path = %path.display(),
                    "Saved new signing key to keystore"
                );
                return Ok(keypair);
            }
            debug!("Signing key created concurrently, loading persisted key");
        }

        let bytes = Self::read_key_file(&path)?;
        let keypair =
            SigningKeyPair::from_secret_bytes(&bytes).map_err(|e| Self::corrupt(&path, e))?;
        debug!(key_id = %keypair.key_id(), "Loaded signing key from keystore");
        Ok(keypair)
    }
}

impl DeviceKeyProvider for FileKeyStore {
    fn get_or_create_device_keypair(&self) -> KeyStoreResult<Arc<DeviceKeyPair>> {
        let mut slot = self.device.lock();
        if let Some(keypair) = slot.as_ref() {
            return Ok(Arc::clone(keypair));
        }
        let keypair = Arc::new(self.load_or_create_device()?);
        *slot = Some(Arc::clone(&keypair));
        Ok(keypair)
    }
}

impl SigningKeyProvider for FileKeyStore {
    fn get_signing_keypair(&self) -> KeyStoreResult<Arc<SigningKeyPair>> {
        let mut slot = self.signing.lock();
        if let Some(keypair) = slot.as_ref() {
            return Ok(Arc::clone(keypair));
        }
        let keypair = Arc::new(self.load_or_create_signing()?);
        *slot = Some(Arc::clone(&keypair));
        Ok(keypair)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_memory_store_reuses_keys() {
        let store = MemoryKeyStore::new();
        let a = store.get_or_create_device_keypair().unwrap();
        let b = store.get_or_create_device_keypair().unwrap();
        assert_eq!(a.public_key_bytes(), b.public_key_bytes());
        assert_eq!(store.public_key_b64().unwrap(), a.public_key_b64());

        let s1 = store.get_signing_keypair().unwrap();
        let s2 = store.get_signing_keypair().unwrap();
        assert_eq!(s1.public_key_bytes(), s2.public_key_bytes());
    }

    #[test]
    fn test_file_store_generate_and_reload() {
        let temp_dir = TempDir::new().unwrap();

        let store = FileKeyStore::new(temp_dir.path());
        assert!(!store.device_key_exists());
        let device = store.get_or_create_device_keypair().unwrap();
        let signing = store.get_signing_keypair().unwrap();
        assert!(store.device_key_exists());
        assert!(store.signing_key_exists());

        // A fresh store over the same directory sees the same identity
        let reopened = FileKeyStore::new(temp_dir.path());
        let device2 = reopened.get_or_create_device_keypair().unwrap();
        let signing2 = reopened.get_signing_keypair().unwrap();
        assert_eq!(device.public_key_bytes(), device2.public_key_bytes());
        assert_eq!(signing.public_key_bytes(), signing2.public_key_bytes());
    }

    #[test]
    fn test_concurrent_first_use_converges() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().to_path_buf();

        let keys: Vec<[u8; 32]> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let path = path.clone();
                    scope.spawn(move || {
                        FileKeyStore::new(&path)
                            .get_or_create_device_keypair()
                            .unwrap()
                            .public_key_bytes()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert!(keys.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn test_provisioned_store_never_generates_signing_key() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileKeyStore::provisioned(temp_dir.path());
        assert!(matches!(
            store.get_signing_keypair(),
            Err(KeyStoreError::NotProvisioned(_))
        ));
        assert!(!store.signing_key_exists());

        let provisioned = SigningKeyPair::generate();
        std::fs::write(
            temp_dir.path().join(SIGNING_KEY_FILENAME),
            provisioned.secret_bytes().as_slice(),
        )
        .unwrap();
        let loaded = FileKeyStore::provisioned(temp_dir.path())
            .get_signing_keypair()
            .unwrap();
        assert_eq!(loaded.key_id(), provisioned.key_id());
    }

    #[test]
    fn test_corrupt_key_file_is_reported() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join(DEVICE_KEY_FILENAME), b"short").unwrap();

        let store = FileKeyStore::new(temp_dir.path());
        let err = store.get_or_create_device_keypair().unwrap_err();
        assert!(matches!(err, KeyStoreError::Corrupt { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_key_files_are_private() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let store = FileKeyStore::new(temp_dir.path());
        store.get_signing_keypair().unwrap();

        let mode = std::fs::metadata(temp_dir.path().join(SIGNING_KEY_FILENAME))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
