//! PrivShare Core Library
//!
//! Pure building blocks shared by the PrivShare upload and download paths.
//! This crate provides:
//! - Chunked base64 transport encoding and key normalization ([`codec`])
//! - AES-256-CBC file encryption with a per-upload IV ([`crypto`])
//! - Share-code generation, validation and lookup-key extraction ([`share_code`])
//! - Common error handling
//!
//! Nothing in here performs I/O.

pub mod codec;
pub mod crypto;
pub mod error;
pub mod share_code;

pub use codec::{chunked_decode, chunked_encode, normalize_key_to_hex};
pub use crypto::{
    decrypt, decrypt_bytes, encrypt, encrypt_bytes, EncryptedPayload, EncryptionKey, Iv,
};
pub use error::{PrivShareError, Result};
pub use share_code::{ShareCode, SHARE_CODE_SCHEME};

/// Shortest user-facing encryption key accepted
pub const MIN_KEY_CHARS: usize = 4;
/// Longest user-facing encryption key accepted
pub const MAX_KEY_CHARS: usize = 12;

/// AES-256 key size (32 bytes)
pub const KEY_SIZE: usize = 32;
/// CBC initialization vector size (16 bytes / 128 bits)
pub const IV_SIZE: usize = 16;
