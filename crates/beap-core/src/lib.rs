//! # BEAP Core
//!
//! Core traits, types, and errors shared by the BEAP package builder crates.
//!
//! ## Key Traits
//!
//! - [`RecipientDirectory`]: Lookup of handshake records (recipient key material)
//! - [`Clock`]: Time abstraction for testability
//!
//! ## Key Types
//!
//! - [`Fingerprint`]: Sender/receiver identity fingerprint
//! - [`HandshakeId`]: Reference to an established recipient handshake
//! - [`KeyId`]: Identifier for a device or signing key
//! - [`Encoding`]: Package encoding (`qBEAP` or `pBEAP`)
//! - [`RecipientRecord`]: Peer key material supplied by the directory

pub mod clock;
pub mod encoding;
pub mod error;
pub mod identity;
pub mod recipient;

// Re-export main types
pub use clock::*;
pub use encoding::*;
pub use error::*;
pub use identity::*;
pub use recipient::*;
