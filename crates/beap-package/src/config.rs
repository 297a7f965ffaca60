//! Build request and builder settings

use std::collections::BTreeSet;
use std::fmt;

use beap_core::{DeliveryMethod, Encoding, Fingerprint, HandshakeId};
use serde::{Deserialize, Serialize};

use crate::error::{BuildError, BuildResult};

/// Default chunk size for capsule encryption (256 KiB)
pub const DEFAULT_CHUNK_SIZE: usize = 256 * 1024;

/// Default template identifier hashed into the template hash
pub const DEFAULT_TEMPLATE_ID: &str = "beap.message.v1";

/// Default compliance annotation
pub const DEFAULT_COMPLIANCE: &str = "standard";

/// Build-time policy switches
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyFlag {
    /// The build must carry an encrypted message body
    RequireEncryptedContent,
    /// Automation tags must not appear in transport plaintext when an
    /// encrypted body exists
    PrivateTriggersEncryptedOnly,
}

impl PolicyFlag {
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyFlag::RequireEncryptedContent => "require_encrypted_content",
            PolicyFlag::PrivateTriggersEncryptedOnly => "private_triggers_encrypted_only",
        }
    }
}

impl fmt::Display for PolicyFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file attached to the message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Stable identifier, unique within a build
    pub id: String,
    /// Original filename
    pub name: String,
    pub mime_type: String,
    #[serde(with = "crate::b64")]
    pub bytes: Vec<u8>,
    /// Rendered reconstruction pages, one image per page
    #[serde(default, with = "crate::b64::vec")]
    pub raster_pages: Vec<Vec<u8>>,
}

impl Attachment {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            mime_type: mime_type.into(),
            bytes,
            raster_pages: Vec::new(),
        }
    }

    /// Add a rendered page image
    pub fn with_raster_page(mut self, image: Vec<u8>) -> Self {
        self.raster_pages.push(image);
        self
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// Per-send inputs to the builder
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildRequest {
    pub mode: Option<Encoding>,
    pub sender_fingerprint: String,
    pub handshake_id: Option<String>,
    /// Transport-visible body
    pub message_body: String,
    /// Confidential body, only ever carried inside the encrypted capsule
    pub encrypted_message: Option<String>,
    pub subject: Option<String>,
    pub attachments: Vec<Attachment>,
    pub policy_flags: BTreeSet<PolicyFlag>,
    pub delivery_hint: DeliveryMethod,
}

/// A request that passed entry validation
#[derive(Debug, Clone)]
pub struct ValidatedRequest {
    pub encoding: Encoding,
    pub sender: Fingerprint,
    pub handshake: Option<HandshakeId>,
}

impl BuildRequest {
    /// Start a private (qBEAP) request bound to a handshake
    pub fn private(sender_fingerprint: impl Into<String>, handshake_id: impl Into<String>) -> Self {
        Self {
            mode: Some(Encoding::Private),
            sender_fingerprint: sender_fingerprint.into(),
            handshake_id: Some(handshake_id.into()),
            ..Default::default()
        }
    }

    /// Start a public (pBEAP) request
    pub fn public(sender_fingerprint: impl Into<String>) -> Self {
        Self {
            mode: Some(Encoding::Public),
            sender_fingerprint: sender_fingerprint.into(),
            ..Default::default()
        }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.message_body = body.into();
        self
    }

    pub fn with_encrypted_message(mut self, message: impl Into<String>) -> Self {
        self.encrypted_message = Some(message.into());
        self
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    pub fn with_policy_flag(mut self, flag: PolicyFlag) -> Self {
        self.policy_flags.insert(flag);
        self
    }

    pub fn with_delivery_hint(mut self, hint: DeliveryMethod) -> Self {
        self.delivery_hint = hint;
        self
    }

    /// The confidential body, if one was supplied and is non-empty
    pub fn encrypted_body(&self) -> Option<&str> {
        self.encrypted_message.as_deref().filter(|m| !m.is_empty())
    }

    /// The body that the content hash covers
    pub fn authoritative_body(&self) -> &str {
        self.encrypted_body().unwrap_or(&self.message_body)
    }

    pub fn has_flag(&self, flag: PolicyFlag) -> bool {
        self.policy_flags.contains(&flag)
    }

    /// Entry validation run before any key material is touched
    pub fn validate(&self) -> BuildResult<ValidatedRequest> {
        let encoding = self
            .mode
            .ok_or_else(|| BuildError::Validation("encoding mode is required".to_string()))?;

        let sender = Fingerprint::new(self.sender_fingerprint.clone())?;

        let handshake = match (&self.handshake_id, encoding) {
            (Some(id), _) => Some(HandshakeId::new(id.clone())?),
            (None, Encoding::Private) => {
                return Err(BuildError::Validation(
                    "private builds require a handshake id".to_string(),
                ));
            }
            (None, Encoding::Public) => None,
        };

        if encoding == Encoding::Public && self.encrypted_body().is_some() {
            return Err(BuildError::Validation(
                "public builds cannot carry an encrypted message".to_string(),
            ));
        }

        let mut seen = BTreeSet::new();
        for attachment in &self.attachments {
            if attachment.id.trim().is_empty() {
                return Err(BuildError::Validation(format!(
                    "attachment '{}' has an empty id",
                    attachment.name
                )));
            }
            if !seen.insert(attachment.id.as_str()) {
                return Err(BuildError::Validation(format!(
                    "duplicate attachment id '{}'",
                    attachment.id
                )));
            }
        }

        Ok(ValidatedRequest {
            encoding,
            sender,
            handshake,
        })
    }
}

/// Declared size limits, bound into the header and AAD
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizeLimits {
    pub envelope_max_bytes: usize,
    pub capsule_plaintext_max_bytes: usize,
    pub artefact_max_bytes: usize,
    pub package_total_max_bytes: usize,
    pub chunk_max_bytes: usize,
}

impl Default for SizeLimits {
    fn default() -> Self {
        Self {
            envelope_max_bytes: 64 * 1024,
            capsule_plaintext_max_bytes: 16 * 1024 * 1024,
            artefact_max_bytes: 64 * 1024 * 1024,
            package_total_max_bytes: 128 * 1024 * 1024,
            chunk_max_bytes: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl SizeLimits {
    fn validate(&self) -> BuildResult<()> {
        let all = [
            ("envelope_max_bytes", self.envelope_max_bytes),
            ("capsule_plaintext_max_bytes", self.capsule_plaintext_max_bytes),
            ("artefact_max_bytes", self.artefact_max_bytes),
            ("package_total_max_bytes", self.package_total_max_bytes),
            ("chunk_max_bytes", self.chunk_max_bytes),
        ];
        for (name, value) in all {
            if value == 0 {
                return Err(BuildError::Validation(format!("{} must be non-zero", name)));
            }
        }
        Ok(())
    }
}

/// Long-lived builder configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderSettings {
    pub limits: SizeLimits,
    /// Capsule chunk size, at most `limits.chunk_max_bytes`
    pub chunk_size: usize,
    pub template_id: String,
    pub compliance: String,
    /// Seal chunks and artefacts on scoped worker threads
    pub parallel_encryption: bool,
}

impl Default for BuilderSettings {
    fn default() -> Self {
        Self {
            limits: SizeLimits::default(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            template_id: DEFAULT_TEMPLATE_ID.to_string(),
            compliance: DEFAULT_COMPLIANCE.to_string(),
            parallel_encryption: true,
        }
    }
}

impl BuilderSettings {
    /// Parse settings from JSON; missing fields take their defaults
    pub fn from_json_str(json: &str) -> BuildResult<Self> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn with_limits(mut self, limits: SizeLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_template_id(mut self, template_id: impl Into<String>) -> Self {
        self.template_id = template_id.into();
        self
    }

    pub fn with_compliance(mut self, compliance: impl Into<String>) -> Self {
        self.compliance = compliance.into();
        self
    }

    pub fn with_parallel_encryption(mut self, enabled: bool) -> Self {
        self.parallel_encryption = enabled;
        self
    }

    pub fn validate(&self) -> BuildResult<()> {
        self.limits.validate()?;
        if self.chunk_size == 0 || self.chunk_size > self.limits.chunk_max_bytes {
            return Err(BuildError::Validation(format!(
                "chunk_size must be in 1..={}, got {}",
                self.limits.chunk_max_bytes, self.chunk_size
            )));
        }
        if self.template_id.trim().is_empty() {
            return Err(BuildError::Validation("template_id is empty".to_string()));
        }
        Ok(())
    }
}
