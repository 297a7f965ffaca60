//! Delivery preparation
//!
//! Renders the transport-visible artifacts for a built package (email
//! subject and body, clipboard text, download filename) and re-asserts leak
//! prevention on each of them. Nothing here sends, copies or writes; the
//! surrounding application executes the returned plan.

use beap_core::{DeliveryMethod, RecipientRecord};
use tracing::debug;

use crate::config::BuildRequest;
use crate::error::{BuildResult, LeakSurface};
use crate::leak::assert_no_leak;
use crate::package::BeapPackage;

const DEFAULT_PRIVATE_SUBJECT: &str = "BEAP secure message";
const DEFAULT_PUBLIC_SUBJECT: &str = "BEAP message";
const CLIPBOARD_BEGIN: &str = "-----BEGIN BEAP PACKAGE-----";
const CLIPBOARD_END: &str = "-----END BEAP PACKAGE-----";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailDraft {
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
    pub attachment_filename: String,
}

/// Everything a delivery channel needs, already leak-checked
#[derive(Debug, Clone)]
pub struct DeliveryPlan {
    pub method: DeliveryMethod,
    pub filename: String,
    pub email: EmailDraft,
    /// Header lines plus the package JSON, for pasting into a messenger
    ///
    /// Only the header lines are leak-checked; the JSON is ciphertext and
    /// public metadata.
    pub clipboard_text: String,
    /// Serialized package, the attachment or download content
    pub package_json: Vec<u8>,
}

fn email_body(request: &BuildRequest, package: &BeapPackage) -> String {
    let mut body = String::new();
    if !request.message_body.is_empty() {
        body.push_str(&request.message_body);
        body.push_str("\n\n");
    }
    body.push_str(&format!(
        "This message carries a {} package: {}\n",
        package.encoding(),
        package.filename()
    ));
    if package.is_private() {
        body.push_str("Open it with a BEAP client holding the matching handshake.\n");
    }
    body
}

fn clipboard_header(request: &BuildRequest, package: &BeapPackage) -> String {
    let mut text = format!(
        "{}\nEncoding: {}\nFile: {}\nSender: {}\n",
        CLIPBOARD_BEGIN,
        package.encoding(),
        package.filename(),
        package.header.sender_fingerprint.short()
    );
    if !request.message_body.is_empty() {
        text.push_str(&format!("Note: {}\n", request.message_body));
    }
    text
}

/// Prepare transport artifacts for `package`
///
/// `recipient` supplies the email addresses of a private package's receiver.
pub fn prepare_delivery(
    package: &BeapPackage,
    request: &BuildRequest,
    recipient: Option<&RecipientRecord>,
) -> BuildResult<DeliveryPlan> {
    let secret = request.encrypted_body();

    let subject = request.subject.clone().unwrap_or_else(|| {
        if package.is_private() {
            DEFAULT_PRIVATE_SUBJECT.to_string()
        } else {
            DEFAULT_PUBLIC_SUBJECT.to_string()
        }
    });
    assert_no_leak(secret, LeakSurface::EmailSubject, &subject)?;

    let body = email_body(request, package);
    assert_no_leak(secret, LeakSurface::EmailBody, &body)?;

    let filename = package.filename().to_string();
    assert_no_leak(secret, LeakSurface::AttachmentFilename, &filename)?;

    let header = clipboard_header(request, package);
    assert_no_leak(secret, LeakSurface::ClipboardText, &header)?;

    let package_json = package.to_json_bytes()?;
    let clipboard_text = format!(
        "{}\n{}\n{}\n",
        header,
        String::from_utf8_lossy(&package_json),
        CLIPBOARD_END
    );

    debug!(
        method = %request.delivery_hint,
        filename = %filename,
        bytes = package_json.len(),
        "Prepared delivery plan"
    );

    Ok(DeliveryPlan {
        method: request.delivery_hint,
        email: EmailDraft {
            to: recipient.map(|r| r.emails.clone()).unwrap_or_default(),
            subject,
            body,
            attachment_filename: filename.clone(),
        },
        filename,
        clipboard_text,
        package_json,
    })
}
