//! Error types for BEAP core types

use thiserror::Error;

/// Errors related to identity and recipient records
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid identity format: {0}")]
    InvalidFormat(String),
}

/// Result type for core operations
pub type CoreResult<T> = Result<T, CoreError>;
