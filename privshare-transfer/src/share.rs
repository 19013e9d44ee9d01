//! Share text handed to the recipient

use privshare_core::{ShareCode, SHARE_CODE_SCHEME};

const SHARE_SENTENCE: &str = "I shared a file with you via PrivShare";
const KEY_MARKER: &str = ", key: ";

/// `"<sentence>, share code: <code>[, key: <key>]"`
pub fn share_text(code: &ShareCode, key: Option<&str>) -> String {
    let mut text = format!("{}, share code: {}", SHARE_SENTENCE, code);
    if let Some(key) = key {
        text.push_str(KEY_MARKER);
        text.push_str(key);
    }
    text
}

/// Pull the share code and optional key back out of pasted share text.
///
/// Bare share codes are accepted as well.
pub fn parse_share_text(text: &str) -> Option<(ShareCode, Option<String>)> {
    let start = text.find(SHARE_CODE_SCHEME)?;
    let rest = &text[start..];
    let end = SHARE_CODE_SCHEME.len()
        + rest[SHARE_CODE_SCHEME.len()..]
            .find(|c: char| !(c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'))
            .unwrap_or(rest.len() - SHARE_CODE_SCHEME.len());

    let code = ShareCode::parse(rest[..end].trim_end_matches('-')).ok()?;
    let key = rest[end..]
        .find(KEY_MARKER)
        .map(|i| rest[end + i + KEY_MARKER.len()..].trim().to_string())
        .filter(|k| !k.is_empty());

    Some((code, key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_share_text_without_key() {
        let code = ShareCode::parse("privshare://abcd-efgh").unwrap();
        assert_eq!(
            share_text(&code, None),
            "I shared a file with you via PrivShare, share code: privshare://abcd-efgh"
        );
    }

    #[test]
    fn test_share_text_with_key() {
        let code = ShareCode::parse("privshare://abcd-efgh").unwrap();
        let text = share_text(&code, Some("ab12"));
        assert!(text.ends_with(", share code: privshare://abcd-efgh, key: ab12"));
    }

    #[test]
    fn test_parse_share_text_roundtrip() {
        let code = ShareCode::generate();
        let (parsed, key) = parse_share_text(&share_text(&code, Some("k3y!9"))).unwrap();
        assert_eq!(parsed, code);
        assert_eq!(key.as_deref(), Some("k3y!9"));

        let (parsed, key) = parse_share_text(&share_text(&code, None)).unwrap();
        assert_eq!(parsed, code);
        assert!(key.is_none());
    }

    #[test]
    fn test_parse_bare_code_and_garbage() {
        let (code, key) = parse_share_text("  privshare://abcd-1234\n").unwrap();
        assert_eq!(code.as_str(), "privshare://abcd-1234");
        assert!(key.is_none());

        assert!(parse_share_text("no code here").is_none());
        assert!(parse_share_text("privshare://").is_none());
    }

    #[test]
    fn test_pasted_key_parses_strictly() {
        let text = "I shared a file with you via PrivShare, share code: privshare://abcd-efgh, key: ab12 \r\n";
        let (_, key) = parse_share_text(text).unwrap();
        let key = key.unwrap();
        assert_eq!(key, "ab12");
        assert!(privshare_core::EncryptionKey::parse(&key).is_ok());
        assert!(privshare_core::EncryptionKey::parse("ab12 \r\n").is_err());
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn share_text_always_parses_back(key in "[a-zA-Z0-9!@#$%^&*]{4,12}") {
                let code = ShareCode::generate();
                let (parsed, parsed_key) = parse_share_text(&share_text(&code, Some(&key))).unwrap();
                prop_assert_eq!(parsed, code);
                prop_assert_eq!(parsed_key, Some(key));
            }
        }
    }
}
