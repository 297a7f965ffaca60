//! Package encoding and delivery hints

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

/// Encoding of a BEAP package
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Encoding {
    /// Private, encrypted, receiver-bound package
    #[serde(rename = "qBEAP")]
    Private,
    /// Public, unencrypted, auditable package
    #[serde(rename = "pBEAP")]
    Public,
}

impl Encoding {
    /// Wire name of the encoding
    pub fn as_str(&self) -> &'static str {
        match self {
            Encoding::Private => "qBEAP",
            Encoding::Public => "pBEAP",
        }
    }

    /// Whether this encoding carries encrypted content
    pub fn is_private(&self) -> bool {
        matches!(self, Encoding::Private)
    }
}

impl Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the surrounding application intends to deliver the package
///
/// Only a hint recorded in delivery metadata; the builder never performs delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMethod {
    /// Sent as an email attachment
    #[default]
    Email,
    /// Copied to the clipboard for pasting into a messenger
    Messenger,
    /// Saved as a file download
    Download,
}

impl DeliveryMethod {
    /// Wire name of the delivery method
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryMethod::Email => "email",
            DeliveryMethod::Messenger => "messenger",
            DeliveryMethod::Download => "download",
        }
    }
}

impl Display for DeliveryMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoding_wire_names() {
        assert_eq!(Encoding::Private.as_str(), "qBEAP");
        assert_eq!(Encoding::Public.as_str(), "pBEAP");
        assert!(Encoding::Private.is_private());
        assert!(!Encoding::Public.is_private());
    }

    #[test]
    fn test_delivery_method_default() {
        assert_eq!(DeliveryMethod::default(), DeliveryMethod::Email);
        assert_eq!(DeliveryMethod::Messenger.to_string(), "messenger");
    }
}
