//! Capsule payload: the authoritative message content

use serde::{Deserialize, Serialize};

use crate::config::{Attachment, BuildRequest};
use crate::error::BuildResult;
use crate::policy::{automation_metadata, AutomationMetadata};

/// Attachment metadata carried inside the capsule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentMeta {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    pub size: usize,
}

impl From<&Attachment> for AttachmentMeta {
    fn from(attachment: &Attachment) -> Self {
        Self {
            id: attachment.id.clone(),
            name: attachment.name.clone(),
            mime_type: attachment.mime_type.clone(),
            size: attachment.size(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapsulePayload {
    /// Authoritative body: the encrypted message if present, else the transport body
    pub body: String,
    pub attachments: Vec<AttachmentMeta>,
    pub automation: AutomationMetadata,
}

impl CapsulePayload {
    pub fn from_request(request: &BuildRequest) -> Self {
        Self {
            body: request.authoritative_body().to_string(),
            attachments: request.attachments.iter().map(AttachmentMeta::from).collect(),
            automation: automation_metadata(&request.message_body, request.encrypted_body()),
        }
    }

    /// Serialized capsule plaintext
    pub fn to_bytes(&self) -> BuildResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}
