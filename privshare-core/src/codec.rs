//! Transport codec and key normalization
//!
//! Binary payloads travel as standard (padded) base64. Encoding and decoding
//! walk the input in fixed-size chunks so large files never need a second
//! full-size scratch buffer per step; the chunk size is a whole number of
//! base64 quanta, so the concatenated chunk output is byte-for-byte the
//! single-shot encoding.
//!
//! Key normalization turns a short user key into the 64 hex digits (32 bytes)
//! fed to AES-256. Encrypt and decrypt both call [`normalize_key_to_hex`].

use crate::error::{PrivShareError, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Bytes consumed per encode step: 8 KiB rounded down to a multiple of 3
pub const ENCODE_CHUNK_SIZE: usize = 8190;

/// Characters consumed per decode step (exactly one encode step's output)
pub const DECODE_CHUNK_SIZE: usize = ENCODE_CHUNK_SIZE / 3 * 4;

/// Length of a normalized key in hex digits
pub const NORMALIZED_KEY_HEX_LEN: usize = 64;

/// Encode bytes into padded base64, one chunk at a time
pub fn chunked_encode(bytes: &[u8]) -> String {
    let capacity = base64::encoded_len(bytes.len(), true).unwrap_or(0);
    let mut out = String::with_capacity(capacity);

    for chunk in bytes.chunks(ENCODE_CHUNK_SIZE) {
        STANDARD.encode_string(chunk, &mut out);
    }

    out
}

/// Decode padded base64 produced by [`chunked_encode`] (or any canonical encoder)
pub fn chunked_decode(text: &str) -> Result<Vec<u8>> {
    if text.len() % 4 != 0 {
        return Err(PrivShareError::Decode(format!(
            "input length {} is not a multiple of 4",
            text.len()
        )));
    }

    // Padding may only terminate the final quantum
    let unpadded = text.trim_end_matches('=');
    if unpadded.contains('=') || text.len() - unpadded.len() > 2 {
        return Err(PrivShareError::Decode("misplaced padding".to_string()));
    }

    let mut out = Vec::with_capacity(text.len() / 4 * 3);
    for chunk in text.as_bytes().chunks(DECODE_CHUNK_SIZE) {
        STANDARD.decode_vec(chunk, &mut out)?;
    }

    Ok(out)
}

/// Normalize a user key to exactly 64 hex digits
///
/// A key made only of hex digits is taken verbatim; any other key is replaced
/// by the concatenated (at least two-digit) hex codes of its characters. A
/// character outside the Basic Multilingual Plane contributes its leading
/// UTF-16 code unit only, so keys match those written by existing clients.
/// The result is repeated cyclically and cut to 64 digits.
pub fn normalize_key_to_hex(key: &str) -> Result<String> {
    if key.is_empty() {
        return Err(PrivShareError::Validation(
            "encryption key must not be empty".to_string(),
        ));
    }

    let expanded = if key.chars().all(|c| c.is_ascii_hexdigit()) {
        key.to_string()
    } else {
        key.chars()
            .map(|c| format!("{:02x}", c.encode_utf16(&mut [0u16; 2])[0]))
            .collect()
    };

    Ok(expanded.chars().cycle().take(NORMALIZED_KEY_HEX_LEN).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_encode_matches_single_shot() {
        for size in [0, 1, 2, 3, ENCODE_CHUNK_SIZE - 1, ENCODE_CHUNK_SIZE, ENCODE_CHUNK_SIZE + 1, 50_000] {
            let data: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
            assert_eq!(chunked_encode(&data), STANDARD.encode(&data), "size {}", size);
        }
    }

    #[test]
    fn test_empty_roundtrip() {
        assert_eq!(chunked_encode(&[]), "");
        assert_eq!(chunked_decode("").unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_large_roundtrip() {
        let data: Vec<u8> = (0..12 * 1024 * 1024).map(|i| (i * 7 % 256) as u8).collect();
        let encoded = chunked_encode(&data);
        assert_eq!(chunked_decode(&encoded).unwrap(), data);
    }

    #[test]
    fn test_decode_rejects_malformed() {
        assert!(matches!(chunked_decode("abc"), Err(PrivShareError::Decode(_))));
        assert!(matches!(chunked_decode("ab=c"), Err(PrivShareError::Decode(_))));
        assert!(matches!(chunked_decode("a==="), Err(PrivShareError::Decode(_))));
        assert!(matches!(chunked_decode("ab$d"), Err(PrivShareError::Decode(_))));
        assert!(matches!(chunked_decode("QQ==QQ=="), Err(PrivShareError::Decode(_))));
    }

    #[test]
    fn test_normalize_hex_key_used_verbatim() {
        let hex = normalize_key_to_hex("ab12").unwrap();
        assert_eq!(hex.len(), 64);
        assert_eq!(hex, "ab12".repeat(16));
    }

    #[test]
    fn test_normalize_text_key_is_hex_encoded() {
        // "key!" -> 6b 65 79 21
        let hex = normalize_key_to_hex("key!").unwrap();
        assert_eq!(hex, "6b657921".repeat(8));
    }

    #[test]
    fn test_normalize_astral_chars_use_leading_code_unit() {
        // U+1F600 is d83d de00 in UTF-16
        let hex = normalize_key_to_hex("ab\u{1F600}c").unwrap();
        assert!(hex.starts_with("6162d83d63"), "{}", hex);
        assert!(!hex.contains("1f600"));

        // BMP characters above 0xff keep their full code
        let hex = normalize_key_to_hex("\u{4e2d}key").unwrap();
        assert!(hex.starts_with("4e2d6b6579"), "{}", hex);
    }

    #[test]
    fn test_normalize_truncates_odd_cycles() {
        let hex = normalize_key_to_hex("abc").unwrap();
        assert_eq!(hex.len(), 64);
        assert!(hex.starts_with("abcabcabc"));
        assert!(hex.ends_with("abca"));
    }

    #[test]
    fn test_normalize_rejects_empty() {
        assert!(matches!(
            normalize_key_to_hex(""),
            Err(PrivShareError::Validation(_))
        ));
    }

    proptest! {
        #[test]
        fn prop_codec_roundtrip(data in proptest::collection::vec(any::<u8>(), 0..40_000)) {
            let encoded = chunked_encode(&data);
            prop_assert_eq!(chunked_decode(&encoded).unwrap(), data);
        }

        #[test]
        fn prop_normalize_is_deterministic(key in "\\PC{4,12}") {
            let first = normalize_key_to_hex(&key).unwrap();
            let second = normalize_key_to_hex(&key).unwrap();
            prop_assert_eq!(first.len(), NORMALIZED_KEY_HEX_LEN);
            prop_assert!(first.chars().all(|c| c.is_ascii_hexdigit()));
            prop_assert_eq!(first, second);
        }
    }
}
