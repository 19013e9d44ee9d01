//! Error types for PrivShare core
//!
//! Provides a unified error type for the pure codec, crypto and share-code
//! operations.

use thiserror::Error;

/// Result type alias for PrivShare core operations
pub type Result<T> = std::result::Result<T, PrivShareError>;

/// Unified error type for PrivShare core
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PrivShareError {
    // ===== Validation Errors =====
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid key length: expected {min}-{max} characters, got {actual}")]
    InvalidKeyLength {
        min: usize,
        max: usize,
        actual: usize,
    },

    // ===== Codec Errors =====
    #[error("Decode error: {0}")]
    Decode(String),

    // ===== Cryptography Errors =====
    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("File decryption failed, please check if the key is correct ({0})")]
    Decryption(String),

    #[error("Invalid IV: {0}")]
    InvalidIv(String),
}

impl From<base64::DecodeError> for PrivShareError {
    fn from(err: base64::DecodeError) -> Self {
        PrivShareError::Decode(err.to_string())
    }
}

impl From<hex::FromHexError> for PrivShareError {
    fn from(err: hex::FromHexError) -> Self {
        PrivShareError::Decode(err.to_string())
    }
}
