//! Leak prevention: secret content must never reach a plaintext surface

use crate::config::BuildRequest;
use crate::error::{BuildError, BuildResult, LeakSurface};

/// Fail if `secret` occurs anywhere in `text`
pub fn assert_no_leak(secret: Option<&str>, surface: LeakSurface, text: &str) -> BuildResult<()> {
    match secret {
        Some(secret) if !secret.is_empty() && text.contains(secret) => {
            tracing::warn!(%surface, "Encrypted content found on a plaintext surface");
            Err(BuildError::SecurityLeakDetected { surface })
        }
        _ => Ok(()),
    }
}

/// Check every transport-visible field of a request before encryption
pub fn assert_request_clean(request: &BuildRequest) -> BuildResult<()> {
    let secret = request.encrypted_body();
    assert_no_leak(secret, LeakSurface::TransportBody, &request.message_body)?;
    if let Some(subject) = &request.subject {
        assert_no_leak(secret, LeakSurface::EmailSubject, subject)?;
    }
    for attachment in &request.attachments {
        assert_no_leak(secret, LeakSurface::AttachmentFilename, &attachment.name)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Attachment;

    #[test]
    fn test_secret_in_transport_body_detected() {
        let request = BuildRequest::private("F", "hs")
            .with_body("fyi: launch code 1234")
            .with_encrypted_message("launch code 1234");
        assert!(matches!(
            assert_request_clean(&request),
            Err(BuildError::SecurityLeakDetected {
                surface: LeakSurface::TransportBody
            })
        ));
    }

    #[test]
    fn test_secret_in_subject_and_filename_detected() {
        let request = BuildRequest::private("F", "hs")
            .with_encrypted_message("q3-numbers")
            .with_subject("Re: q3-numbers");
        assert!(matches!(
            assert_request_clean(&request),
            Err(BuildError::SecurityLeakDetected {
                surface: LeakSurface::EmailSubject
            })
        ));

        let request = BuildRequest::private("F", "hs")
            .with_encrypted_message("q3-numbers")
            .with_attachment(Attachment::new("a", "q3-numbers.xlsx", "application/x", vec![]));
        assert!(matches!(
            assert_request_clean(&request),
            Err(BuildError::SecurityLeakDetected {
                surface: LeakSurface::AttachmentFilename
            })
        ));
    }

    #[test]
    fn test_clean_request_passes() {
        let request = BuildRequest::private("F", "hs")
            .with_body("You have a secure message")
            .with_subject("Secure message")
            .with_encrypted_message("the secret");
        assert!(assert_request_clean(&request).is_ok());

        assert!(assert_no_leak(None, LeakSurface::ClipboardText, "anything").is_ok());
        assert!(assert_no_leak(Some(""), LeakSurface::ClipboardText, "anything").is_ok());
    }
}
