//! Automation tags and build-time policy gates

use serde::{Deserialize, Serialize};

use crate::config::{BuildRequest, PolicyFlag};
use crate::error::{BuildError, BuildResult};

fn is_tag_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | ':' | '.')
}

/// Extract `#tag` tokens in first-seen order, without duplicates
///
/// A tag is `#` followed by one or more of `[A-Za-z0-9_\-:.]`. Case is
/// preserved, so `#Urgent` and `#urgent` are distinct.
pub fn extract_tags(text: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    let mut rest = text;
    while let Some(pos) = rest.find('#') {
        let after = &rest[pos + 1..];
        let end = after.find(|c: char| !is_tag_char(c)).unwrap_or(after.len());
        if end > 0 {
            let tag = format!("#{}", &after[..end]);
            if !tags.contains(&tag) {
                tags.push(tag);
            }
        }
        rest = &after[end..];
    }
    tags
}

/// Where the automation tags of a capsule came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagSource {
    Encrypted,
    Plaintext,
    Both,
    None,
}

/// Automation metadata embedded in the capsule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomationMetadata {
    pub tags: Vec<String>,
    pub tag_source: TagSource,
    /// The receiver decides whether any automation actually runs
    pub receiver_has_final_authority: bool,
}

/// Build automation metadata; tags from the encrypted body come first
pub fn automation_metadata(transport_body: &str, encrypted_body: Option<&str>) -> AutomationMetadata {
    let encrypted_tags = encrypted_body.map(extract_tags).unwrap_or_default();
    let plaintext_tags = extract_tags(transport_body);

    let tag_source = match (encrypted_tags.is_empty(), plaintext_tags.is_empty()) {
        (false, false) => TagSource::Both,
        (false, true) => TagSource::Encrypted,
        (true, false) => TagSource::Plaintext,
        (true, true) => TagSource::None,
    };

    let mut tags = encrypted_tags;
    for tag in plaintext_tags {
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }

    AutomationMetadata {
        tags,
        tag_source,
        receiver_has_final_authority: true,
    }
}

/// Apply the request's policy flags
pub fn enforce_policy(request: &BuildRequest) -> BuildResult<()> {
    let encrypted = request.encrypted_body();

    if request.has_flag(PolicyFlag::RequireEncryptedContent) && encrypted.is_none() {
        return Err(BuildError::PolicyViolation {
            flag: PolicyFlag::RequireEncryptedContent,
            reason: "no encrypted message body supplied".to_string(),
        });
    }

    if request.has_flag(PolicyFlag::PrivateTriggersEncryptedOnly) && encrypted.is_some() {
        let exposed = extract_tags(&request.message_body);
        if !exposed.is_empty() {
            return Err(BuildError::PolicyViolation {
                flag: PolicyFlag::PrivateTriggersEncryptedOnly,
                reason: format!("{} automation tag(s) in transport plaintext", exposed.len()),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BuildErrorKind;

    #[test]
    fn test_extract_tags_dedups_in_order() {
        assert_eq!(extract_tags("#a #b #a"), vec!["#a", "#b"]);
    }

    #[test]
    fn test_extract_tags_empty_inputs() {
        assert!(extract_tags("").is_empty());
        assert!(extract_tags("no tags here").is_empty());
        assert!(extract_tags("# lonely hash").is_empty());
    }

    #[test]
    fn test_extract_tags_charset_and_case() {
        assert_eq!(
            extract_tags("see #Invoice:2024.Q1, then #fwd-to_ops!"),
            vec!["#Invoice:2024.Q1", "#fwd-to_ops"]
        );
        assert_eq!(extract_tags("#Urgent #urgent"), vec!["#Urgent", "#urgent"]);
        assert_eq!(extract_tags("##double"), vec!["#double"]);
    }

    #[test]
    fn test_automation_metadata_sources() {
        let meta = automation_metadata("#plain", Some("#secret"));
        assert_eq!(meta.tag_source, TagSource::Both);
        assert_eq!(meta.tags, vec!["#secret", "#plain"]);

        assert_eq!(automation_metadata("#plain", None).tag_source, TagSource::Plaintext);
        assert_eq!(automation_metadata("", Some("#x")).tag_source, TagSource::Encrypted);
        assert_eq!(automation_metadata("", None).tag_source, TagSource::None);
        assert!(automation_metadata("", None).receiver_has_final_authority);
    }

    #[test]
    fn test_automation_metadata_wire_names() {
        let json = serde_json::to_value(automation_metadata("#a", None)).unwrap();
        assert_eq!(json["tagSource"], "plaintext");
    }

    #[test]
    fn test_require_encrypted_content() {
        let request = BuildRequest::private("F", "hs")
            .with_body("hello")
            .with_policy_flag(PolicyFlag::RequireEncryptedContent);
        let err = enforce_policy(&request).unwrap_err();
        assert_eq!(err.kind(), BuildErrorKind::PolicyViolation);

        let request = request.with_encrypted_message("secret");
        assert!(enforce_policy(&request).is_ok());
    }

    #[test]
    fn test_private_triggers_encrypted_only() {
        let request = BuildRequest::private("F", "hs")
            .with_body("please #archive")
            .with_encrypted_message("secret")
            .with_policy_flag(PolicyFlag::PrivateTriggersEncryptedOnly);
        assert!(matches!(
            enforce_policy(&request),
            Err(BuildError::PolicyViolation {
                flag: PolicyFlag::PrivateTriggersEncryptedOnly,
                ..
            })
        ));

        // Tags in plaintext are fine when nothing is encrypted
        let request = BuildRequest::private("F", "hs")
            .with_body("please #archive")
            .with_policy_flag(PolicyFlag::PrivateTriggersEncryptedOnly);
        assert!(enforce_policy(&request).is_ok());
    }
}
