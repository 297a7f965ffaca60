//! Package assembler: the build pipeline
//!
//! ```text
//! validate -> policy -> leak check -> PQ gate -> peer lookup -> size limits
//!          -> key agreement -> KDF -> header -> AAD -> seal capsule + artefacts
//!          -> drift check -> sign -> package
//! ```
//!
//! Size limits are measured on a draft header whose key fields are zeroed
//! but have their final encoded lengths, so an oversized request fails before
//! a key store is asked for anything. Public builds skip the PQ gate and key
//! agreement and sign over the plaintext capsule.
//!
//! Every stage returns a `Result` and the first failure is returned as is;
//! no partial package ever leaves the builder.

use std::sync::Arc;

use beap_core::{
    Clock, Encoding, HandshakeId, RecipientDirectory, RecipientRecord, SystemClock,
};
use beap_crypto::{
    decode_x25519_public_key, derive_package_keys, generate_salt, key_id_for, HybridSecret,
    Kyber768Kem, PackageKeys, PqKem, SigningKeyPair, AEAD_ALGORITHM, HASH_ALGORITHM,
    KDF_ALGORITHM, PQ_CIPHERTEXT_SIZE, SALT_SIZE, SIGNATURE_ALGORITHM, VERIFYING_KEY_SIZE,
    X25519_KEY_SIZE,
};
use beap_logging::BuildContextGuard;
use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::aad::CanonicalAad;
use crate::artefact::{
    collect_artefacts, manifest, public_artefacts, seal_artefacts, ArtefactSource,
};
use crate::b64;
use crate::capsule::CapsulePayload;
use crate::chunking::seal_capsule;
use crate::config::{BuildRequest, BuilderSettings, ValidatedRequest};
use crate::error::{BuildError, BuildResult};
use crate::hashing::{content_hash, policy_hash, template_hash};
use crate::header::{
    CryptoMetadata, EncryptionMode, EnvelopeHeader, PqMetadata, ReceiverBinding, SigningMetadata,
    BEAP_VERSION, CRYPTO_SUITE_ID, KEY_DERIVATION_METHOD,
};
use crate::keystore::{DeviceKeyProvider, SigningKeyProvider};
use crate::leak::assert_request_clean;
use crate::limits::SizeReport;
use crate::package::{package_filename, BeapPackage, DeliveryMetadata, PackageBody};
use crate::policy::enforce_policy;
use crate::signing::{plaintext_commitment, sign_package, signing_data};

/// Peer key material resolved from the recipient directory
struct PeerKeys {
    record: RecipientRecord,
    x25519: [u8; 32],
    pq: Vec<u8>,
}

/// Output of the hybrid key agreement
struct KeyAgreement {
    keys: PackageKeys,
    salt: [u8; SALT_SIZE],
    kem_ciphertext: Vec<u8>,
    sender_public_b64: String,
}

/// Per-build values every header is assembled from
struct HeaderInputs<'a> {
    request: &'a BuildRequest,
    validated: &'a ValidatedRequest,
    capsule: &'a CapsulePayload,
    created_at: DateTime<Utc>,
}

/// Header fields that depend on key material, base64 encoded
struct KeyFields {
    salt: String,
    sender_x25519_public_key: String,
    kem_ciphertext: String,
    signing: SigningMetadata,
}

impl KeyFields {
    /// Zeroed values with the encoded lengths of real key material
    fn placeholder() -> Self {
        let signing_public = [0u8; VERIFYING_KEY_SIZE];
        Self {
            salt: b64::encode(&[0u8; SALT_SIZE]),
            sender_x25519_public_key: b64::encode(&[0u8; X25519_KEY_SIZE]),
            kem_ciphertext: b64::encode(&[0u8; PQ_CIPHERTEXT_SIZE]),
            signing: SigningMetadata {
                algorithm: SIGNATURE_ALGORITHM.to_string(),
                key_id: key_id_for(&signing_public),
                public_key: b64::encode(&signing_public),
            },
        }
    }

    fn from_agreement(agreement: &KeyAgreement, signing_key: &SigningKeyPair) -> Self {
        Self {
            salt: b64::encode(&agreement.salt),
            sender_x25519_public_key: agreement.sender_public_b64.clone(),
            kem_ciphertext: b64::encode(&agreement.kem_ciphertext),
            signing: signing_metadata(signing_key),
        }
    }
}

fn signing_metadata(signing_key: &SigningKeyPair) -> SigningMetadata {
    SigningMetadata {
        algorithm: SIGNATURE_ALGORITHM.to_string(),
        key_id: signing_key.key_id(),
        public_key: signing_key.public_key_b64(),
    }
}

/// Builds private (qBEAP) and public (pBEAP) packages
pub struct PackageBuilder {
    settings: BuilderSettings,
    device_keys: Arc<dyn DeviceKeyProvider>,
    signing_keys: Arc<dyn SigningKeyProvider>,
    directory: Arc<dyn RecipientDirectory>,
    kem: Arc<dyn PqKem>,
    clock: Arc<dyn Clock>,
}

impl PackageBuilder {
    /// Create a builder using Kyber768 and the system clock
    pub fn new(
        settings: BuilderSettings,
        device_keys: Arc<dyn DeviceKeyProvider>,
        signing_keys: Arc<dyn SigningKeyProvider>,
        directory: Arc<dyn RecipientDirectory>,
    ) -> Self {
        Self {
            settings,
            device_keys,
            signing_keys,
            directory,
            kem: Arc::new(Kyber768Kem::new()),
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the post-quantum KEM
    pub fn with_kem(mut self, kem: Arc<dyn PqKem>) -> Self {
        self.kem = kem;
        self
    }

    /// Replace the clock
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn settings(&self) -> &BuilderSettings {
        &self.settings
    }

    /// Build a package from a request
    pub fn build(&self, request: &BuildRequest) -> BuildResult<BeapPackage> {
        let encoding = request.mode.map_or("unknown", |mode| mode.as_str());
        let sender: String = request.sender_fingerprint.chars().take(8).collect();
        let context = BuildContextGuard::new(encoding, sender.to_uppercase());

        let result = self.run(request, context.build_id());
        match &result {
            Ok(package) => info!(
                build_id = %context.build_id(),
                encoding = %package.encoding(),
                filename = %package.filename(),
                "Package built"
            ),
            Err(e) => warn!(
                build_id = %context.build_id(),
                kind = ?e.kind(),
                error = %e,
                "Package build failed"
            ),
        }
        result
    }

    #[instrument(name = "beap_build", skip(self, request, build_id), fields(build_id = %build_id))]
    fn run(&self, request: &BuildRequest, build_id: Uuid) -> BuildResult<BeapPackage> {
        self.settings.validate()?;
        let validated = request.validate()?;
        enforce_policy(request)?;
        assert_request_clean(request)?;

        match validated.encoding {
            Encoding::Private => self.build_private(request, &validated),
            Encoding::Public => self.build_public(request, &validated),
        }
    }

    fn build_private(
        &self,
        request: &BuildRequest,
        validated: &ValidatedRequest,
    ) -> BuildResult<BeapPackage> {
        // Fail closed before any key material is touched
        self.ensure_pq_available()?;

        let handshake = validated.handshake.as_ref().ok_or_else(|| {
            BuildError::Validation("private builds require a handshake id".to_string())
        })?;
        let peer = self.resolve_peer(handshake)?;

        let capsule = CapsulePayload::from_request(request);
        let capsule_bytes = capsule.to_bytes()?;
        let sources = collect_artefacts(&request.attachments);
        let inputs = HeaderInputs {
            request,
            validated,
            capsule: &capsule,
            created_at: self.clock.now_utc(),
        };

        // Key stores may persist keys on first use, so limits are enforced first
        let draft = self.header(&inputs, &KeyFields::placeholder(), Some((handshake, &peer)))?;
        self.size_report(&draft, &capsule_bytes, &sources)?
            .enforce(&self.settings.limits)?;

        let signing_key = self.signing_keys.get_signing_keypair()?;
        let agreement = self.agree_keys(&peer)?;
        let header = self.header(
            &inputs,
            &KeyFields::from_agreement(&agreement, &signing_key),
            Some((handshake, &peer)),
        )?;
        self.size_report(&header, &capsule_bytes, &sources)?
            .enforce(&self.settings.limits)?;

        let aad = CanonicalAad::from_header(&header)?;
        debug!(aad = ?aad, "Derived canonical AAD");

        let parallel = self.settings.parallel_encryption;
        let payload_enc = seal_capsule(
            &capsule_bytes,
            agreement.keys.capsule_key(),
            aad.as_bytes(),
            self.settings.chunk_size,
            parallel,
        )?;
        let artefacts_enc = seal_artefacts(
            &sources,
            agreement.keys.artefact_key(),
            aad.as_bytes(),
            parallel,
        )?;

        aad.ensure_matches(&header)?;

        let manifest = manifest(
            artefacts_enc
                .iter()
                .map(|a| (a.artefact_ref.as_str(), a.plaintext_hash.as_str())),
        );
        let data = signing_data(&header, &payload_enc.commitment(), &manifest)?;
        let signature = sign_package(&signing_key, &data);

        Ok(BeapPackage {
            delivery: DeliveryMetadata {
                filename: package_filename(inputs.created_at, header.receiver_fingerprint.as_ref()),
                created_at: inputs.created_at,
                delivery_hint: request.delivery_hint,
            },
            header,
            body: PackageBody::Private {
                payload_enc,
                artefacts_enc,
            },
            signature,
        })
    }

    fn build_public(
        &self,
        request: &BuildRequest,
        validated: &ValidatedRequest,
    ) -> BuildResult<BeapPackage> {
        let capsule = CapsulePayload::from_request(request);
        let capsule_bytes = capsule.to_bytes()?;
        let sources = collect_artefacts(&request.attachments);
        let inputs = HeaderInputs {
            request,
            validated,
            capsule: &capsule,
            created_at: self.clock.now_utc(),
        };

        let draft = self.header(&inputs, &KeyFields::placeholder(), None)?;
        self.size_report(&draft, &capsule_bytes, &sources)?
            .enforce(&self.settings.limits)?;

        let signing_key = self.signing_keys.get_signing_keypair()?;
        let mut keys = KeyFields::placeholder();
        keys.signing = signing_metadata(&signing_key);
        let header = self.header(&inputs, &keys, None)?;
        self.size_report(&header, &capsule_bytes, &sources)?
            .enforce(&self.settings.limits)?;

        let artefacts = public_artefacts(&sources);
        let manifest = manifest(
            artefacts
                .iter()
                .map(|a| (a.artefact_ref.as_str(), a.plaintext_hash.as_str())),
        );
        let data = signing_data(&header, &plaintext_commitment(&capsule_bytes), &manifest)?;
        let signature = sign_package(&signing_key, &data);

        Ok(BeapPackage {
            delivery: DeliveryMetadata {
                filename: package_filename(inputs.created_at, None),
                created_at: inputs.created_at,
                delivery_hint: request.delivery_hint,
            },
            header,
            body: PackageBody::Public {
                payload: b64::encode(&capsule_bytes),
                artefacts,
            },
            signature,
        })
    }

    /// Assemble the envelope header; `receiver` is present for private builds only
    fn header(
        &self,
        inputs: &HeaderInputs<'_>,
        keys: &KeyFields,
        receiver: Option<(&HandshakeId, &PeerKeys)>,
    ) -> BuildResult<EnvelopeHeader> {
        let encoding = inputs.validated.encoding;
        let (encryption_mode, receiver_fingerprint, receiver_binding, crypto) = match receiver {
            Some((handshake, peer)) => (
                EncryptionMode::HybridAead,
                Some(peer.record.fingerprint.clone()),
                Some(ReceiverBinding::from(&peer.record)),
                Some(CryptoMetadata {
                    suite_id: CRYPTO_SUITE_ID.to_string(),
                    aead: AEAD_ALGORITHM.to_string(),
                    kdf: KDF_ALGORITHM.to_string(),
                    hash: HASH_ALGORITHM.to_string(),
                    key_derivation: KEY_DERIVATION_METHOD.to_string(),
                    salt: keys.salt.clone(),
                    handshake_id: handshake.clone(),
                    sender_x25519_public_key: keys.sender_x25519_public_key.clone(),
                    pq: PqMetadata {
                        active: true,
                        kem: self.kem.algorithm().to_string(),
                        ciphertext: keys.kem_ciphertext.clone(),
                    },
                }),
            ),
            None if encoding.is_private() => {
                return Err(BuildError::Validation(
                    "private header requires a bound receiver".to_string(),
                ));
            }
            None => (EncryptionMode::None, None, None, None),
        };

        Ok(EnvelopeHeader {
            version: BEAP_VERSION.to_string(),
            encoding,
            encryption_mode,
            timestamp: inputs.created_at.timestamp_millis(),
            sender_fingerprint: inputs.validated.sender.clone(),
            receiver_fingerprint,
            receiver_binding,
            template_hash: template_hash(&self.settings.template_id, BEAP_VERSION),
            policy_hash: policy_hash(
                encoding,
                &inputs.request.policy_flags,
                &self.settings.compliance,
            ),
            content_hash: content_hash(
                inputs.request.authoritative_body(),
                &inputs.capsule.attachments,
            ),
            crypto,
            signing: keys.signing.clone(),
            size_limits: self.settings.limits,
            compliance: self.settings.compliance.clone(),
        })
    }

    fn ensure_pq_available(&self) -> BuildResult<()> {
        let available = match self.kem.cached_availability() {
            Some(cached) => cached,
            None => self.kem.probe(),
        };
        if !available {
            return Err(BuildError::PqUnavailable(format!(
                "{} is not available; private builds never fall back to classical-only",
                self.kem.algorithm()
            )));
        }
        Ok(())
    }

    fn resolve_peer(&self, handshake: &HandshakeId) -> BuildResult<PeerKeys> {
        let record = self.directory.lookup(handshake).ok_or_else(|| {
            BuildError::MissingPeerKey(format!("no handshake record for {}", handshake))
        })?;

        let x25519_b64 = record.x25519_public_key.as_deref().ok_or_else(|| {
            BuildError::MissingPeerKey(format!("handshake {} has no X25519 key", handshake))
        })?;
        let pq_b64 = record.pq_public_key.as_deref().ok_or_else(|| {
            BuildError::MissingPeerKey(format!("handshake {} has no PQ KEM key", handshake))
        })?;

        let x25519 = decode_x25519_public_key(x25519_b64)?;
        let pq = b64::decode(pq_b64).map_err(|e| {
            BuildError::InvalidKeyMaterial(format!("peer PQ key is not base64: {}", e))
        })?;

        debug!(
            handshake = %handshake,
            receiver = %record.fingerprint.short(),
            "Resolved peer keys"
        );
        Ok(PeerKeys { record, x25519, pq })
    }

    fn agree_keys(&self, peer: &PeerKeys) -> BuildResult<KeyAgreement> {
        let device = self.device_keys.get_or_create_device_keypair()?;

        let encapsulation = self.kem.encapsulate(&peer.pq)?;
        let classical = device.diffie_hellman(&peer.x25519)?;
        let secret = HybridSecret::combine(
            encapsulation.shared_secret.as_slice(),
            classical.as_slice(),
        )?;

        let salt = generate_salt();
        let keys = derive_package_keys(&secret, &salt)?;
        debug!(kem = self.kem.algorithm(), "Derived package keys");

        Ok(KeyAgreement {
            keys,
            salt,
            kem_ciphertext: encapsulation.ciphertext,
            sender_public_b64: device.public_key_b64(),
        })
    }

    fn size_report(
        &self,
        header: &EnvelopeHeader,
        capsule_bytes: &[u8],
        sources: &[ArtefactSource<'_>],
    ) -> BuildResult<SizeReport> {
        Ok(SizeReport {
            envelope: serde_json::to_vec(header)?.len(),
            capsule: capsule_bytes.len(),
            artefacts: sources.iter().map(|s| s.bytes.len()).collect(),
            chunk_size: self.settings.chunk_size,
        })
    }
}
