//! Share codes
//!
//! A share code is `privshare://` followed by dash-separated groups of
//! lowercase ASCII letters and digits, e.g. `privshare://k3x9-a0bz-77qm-pw2e`.
//! Everything after the scheme is the lookup key into the record store.

use crate::error::{PrivShareError, Result};
use rand::rngs::OsRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Fixed scheme prefix
pub const SHARE_CODE_SCHEME: &str = "privshare://";

/// Random characters drawn per generated code
pub const SHARE_CODE_CHARS: usize = 16;

/// Characters per dash-separated group in generated codes
pub const SHARE_CODE_GROUP: usize = 4;

const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// A validated share code
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ShareCode(String);

impl ShareCode {
    /// Mint a fresh random share code
    pub fn generate() -> Self {
        let mut rng = OsRng;
        let mut code =
            String::with_capacity(SHARE_CODE_SCHEME.len() + SHARE_CODE_CHARS * 5 / 4);
        code.push_str(SHARE_CODE_SCHEME);

        for i in 0..SHARE_CODE_CHARS {
            if i > 0 && i % SHARE_CODE_GROUP == 0 {
                code.push('-');
            }
            code.push(ALPHABET[rng.gen_range(0..ALPHABET.len())] as char);
        }

        Self(code)
    }

    /// Parse and validate a candidate string
    pub fn parse(candidate: &str) -> Result<Self> {
        let candidate = candidate.trim();
        if !Self::validate(candidate) {
            return Err(PrivShareError::Validation(format!(
                "invalid share code format: {:?}",
                candidate
            )));
        }
        Ok(Self(candidate.to_string()))
    }

    /// Check the share code grammar without allocating
    pub fn validate(candidate: &str) -> bool {
        let Some(rest) = candidate.strip_prefix(SHARE_CODE_SCHEME) else {
            return false;
        };
        !rest.is_empty()
            && rest.split('-').all(|group| {
                !group.is_empty()
                    && group
                        .bytes()
                        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
            })
    }

    /// Strip the scheme prefix; the caller is expected to have validated
    pub fn extract_key(candidate: &str) -> &str {
        candidate
            .strip_prefix(SHARE_CODE_SCHEME)
            .unwrap_or(candidate)
    }

    /// Lookup key (the code without its scheme)
    pub fn lookup_key(&self) -> &str {
        Self::extract_key(&self.0)
    }

    /// Full code including the scheme
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ShareCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ShareCode {
    type Err = PrivShareError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ShareCode {
    type Error = PrivShareError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<ShareCode> for String {
    fn from(code: ShareCode) -> Self {
        code.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_codes_validate() {
        for _ in 0..500 {
            let code = ShareCode::generate();
            assert!(ShareCode::validate(code.as_str()), "{}", code);
            assert_eq!(code.lookup_key().len(), SHARE_CODE_CHARS + 3);
            assert_eq!(code.lookup_key().split('-').count(), 4);
        }
    }

    #[test]
    fn test_validate_accepts_legacy_and_long_forms() {
        assert!(ShareCode::validate("privshare://abcd-ef12-3456-7890"));
        assert!(ShareCode::validate("privshare://abcde-fghij-klmno-pqrst"));
        assert!(ShareCode::validate("privshare://abc"));
        assert!(ShareCode::validate("privshare://a-b-c-d-e-f"));
    }

    #[test]
    fn test_validate_rejects_bad_codes() {
        assert!(!ShareCode::validate("foo://abcd-efgh"));
        assert!(!ShareCode::validate("privshare://AB-cd"));
        assert!(!ShareCode::validate("privshare://"));
        assert!(!ShareCode::validate("privshare://abcd--efgh"));
        assert!(!ShareCode::validate("privshare://abcd-"));
        assert!(!ShareCode::validate("privshare://-abcd"));
        assert!(!ShareCode::validate("abcd-efgh"));
        assert!(!ShareCode::validate("privshare://ab cd"));
    }

    #[test]
    fn test_extract_key_roundtrips() {
        let code = ShareCode::generate();
        let key = ShareCode::extract_key(code.as_str());
        assert!(!key.contains(SHARE_CODE_SCHEME));
        assert_eq!(format!("{}{}", SHARE_CODE_SCHEME, key), code.as_str());
        assert_eq!(key, code.lookup_key());
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let code = ShareCode::parse("  privshare://abcd-efgh \n").unwrap();
        assert_eq!(code.as_str(), "privshare://abcd-efgh");
        assert!(ShareCode::parse("privshare://ABCD").is_err());
    }

    #[test]
    fn test_try_from_rejects_invalid() {
        let code = ShareCode::try_from("privshare://abcd-efgh".to_string()).unwrap();
        assert_eq!(code.lookup_key(), "abcd-efgh");
        assert!(ShareCode::try_from("nope".to_string()).is_err());
    }
}
