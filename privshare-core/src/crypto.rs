//! Cryptographic primitives for PrivShare
//!
//! Provides:
//! - Short, human-shareable encryption keys expanded to 256 bits
//! - Random 128-bit IVs carried as hex in the published metadata
//! - AES-256-CBC with PKCS#7 padding over whole file payloads
//!
//! There is no authentication tag. Tampering or a wrong key is only detected
//! when the final block fails padding validation.

use crate::codec::{chunked_decode, chunked_encode, normalize_key_to_hex};
use crate::error::{PrivShareError, Result};
use crate::{IV_SIZE, KEY_SIZE, MAX_KEY_CHARS, MIN_KEY_CHARS};
use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::rngs::OsRng;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use std::fmt;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// Alphabet used for generated keys
const KEY_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// User-facing encryption key
///
/// Holds the short string exactly as the user sees it. That string is what
/// gets echoed in share text and metadata; the 256-bit form is derived on
/// demand.
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptionKey(String);

impl EncryptionKey {
    /// Generate a random 4-12 character lowercase alphanumeric key
    pub fn generate() -> Self {
        let mut rng = OsRng;
        let len = rng.gen_range(MIN_KEY_CHARS..=MAX_KEY_CHARS);
        let key = (0..len)
            .map(|_| KEY_ALPHABET[rng.gen_range(0..KEY_ALPHABET.len())] as char)
            .collect();
        Self(key)
    }

    /// Accept a user-chosen key of 4-12 printable characters.
    ///
    /// Leading or trailing whitespace is rejected: share text and key prompts
    /// are trimmed, so such a key could never be entered again.
    pub fn parse(raw: &str) -> Result<Self> {
        let len = raw.chars().count();
        if !(MIN_KEY_CHARS..=MAX_KEY_CHARS).contains(&len) {
            return Err(PrivShareError::InvalidKeyLength {
                min: MIN_KEY_CHARS,
                max: MAX_KEY_CHARS,
                actual: len,
            });
        }
        if raw.chars().any(char::is_control) {
            return Err(PrivShareError::Validation(
                "encryption key must only contain printable characters".to_string(),
            ));
        }
        if raw.trim() != raw {
            return Err(PrivShareError::Validation(
                "encryption key must not start or end with whitespace".to_string(),
            ));
        }
        Ok(Self(raw.to_string()))
    }

    /// The key exactly as entered or generated
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 64-digit hex expansion
    pub fn normalized_hex(&self) -> Result<String> {
        normalize_key_to_hex(&self.0)
    }

    /// 32-byte AES-256 key
    pub fn to_key_bytes(&self) -> Result<[u8; KEY_SIZE]> {
        let hex_key = self.normalized_hex()?;
        let mut key = [0u8; KEY_SIZE];
        hex::decode_to_slice(hex_key, &mut key)?;
        Ok(key)
    }
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EncryptionKey([REDACTED])")
    }
}

impl std::str::FromStr for EncryptionKey {
    type Err = PrivShareError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// CBC initialization vector
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Iv([u8; IV_SIZE]);

impl Iv {
    /// Generate a fresh random IV
    pub fn generate() -> Self {
        let mut iv = [0u8; IV_SIZE];
        OsRng.fill_bytes(&mut iv);
        Self(iv)
    }

    /// Create from raw bytes
    pub fn from_bytes(bytes: [u8; IV_SIZE]) -> Self {
        Self(bytes)
    }

    /// Parse the 32-character hex form stored in metadata
    pub fn from_hex(hex_iv: &str) -> Result<Self> {
        if hex_iv.len() != IV_SIZE * 2 {
            return Err(PrivShareError::InvalidIv(format!(
                "expected {} hex characters, got {}",
                IV_SIZE * 2,
                hex_iv.len()
            )));
        }
        let mut iv = [0u8; IV_SIZE];
        hex::decode_to_slice(hex_iv, &mut iv)
            .map_err(|e| PrivShareError::InvalidIv(e.to_string()))?;
        Ok(Self(iv))
    }

    /// Lowercase hex form
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Get the raw IV bytes
    pub fn as_bytes(&self) -> &[u8; IV_SIZE] {
        &self.0
    }
}

impl fmt::Debug for Iv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Iv({})", self.to_hex())
    }
}

impl fmt::Display for Iv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Transport-encoded encryption output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedPayload {
    /// Base64 ciphertext
    pub cipher_text: String,
    /// Hex IV
    pub iv: String,
}

/// Encrypt raw bytes, returning ciphertext bytes and the IV used
pub fn encrypt_bytes(plaintext: &[u8], key: &EncryptionKey) -> Result<(Vec<u8>, Iv)> {
    let key_bytes = key
        .to_key_bytes()
        .map_err(|e| PrivShareError::Encryption(e.to_string()))?;
    let iv = Iv::generate();

    let ciphertext = Aes256CbcEnc::new(&key_bytes.into(), &(*iv.as_bytes()).into())
        .encrypt_padded_vec_mut::<Pkcs7>(plaintext);

    Ok((ciphertext, iv))
}

/// Decrypt raw ciphertext bytes
///
/// Any failure (bad key material, bad IV, padding mismatch) surfaces as
/// [`PrivShareError::Decryption`].
pub fn decrypt_bytes(ciphertext: &[u8], key: &EncryptionKey, iv: &Iv) -> Result<Vec<u8>> {
    let key_bytes = key
        .to_key_bytes()
        .map_err(|e| PrivShareError::Decryption(e.to_string()))?;

    if ciphertext.is_empty() || ciphertext.len() % 16 != 0 {
        return Err(PrivShareError::Decryption(
            "ciphertext is not a whole number of blocks".to_string(),
        ));
    }

    Aes256CbcDec::new(&key_bytes.into(), &(*iv.as_bytes()).into())
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| PrivShareError::Decryption("key/IV mismatch or corrupted data".to_string()))
}

/// Encrypt and transport-encode
pub fn encrypt(plaintext: &[u8], key: &EncryptionKey) -> Result<EncryptedPayload> {
    let (ciphertext, iv) = encrypt_bytes(plaintext, key)?;
    Ok(EncryptedPayload {
        cipher_text: chunked_encode(&ciphertext),
        iv: iv.to_hex(),
    })
}

/// Decrypt transport-encoded ciphertext, returning transport-encoded plaintext
pub fn decrypt(cipher_text: &str, key: &EncryptionKey, iv_hex: &str) -> Result<String> {
    let iv = Iv::from_hex(iv_hex).map_err(|e| PrivShareError::Decryption(e.to_string()))?;
    let ciphertext =
        chunked_decode(cipher_text).map_err(|e| PrivShareError::Decryption(e.to_string()))?;
    let plaintext = decrypt_bytes(&ciphertext, key, &iv)?;
    Ok(chunked_encode(&plaintext))
}
