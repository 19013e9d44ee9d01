//! CLI Commands

pub mod download;
pub mod keygen;
pub mod preview;
pub mod validate;

use privshare_transfer::parse_share_text;

/// Accept either a bare share code or pasted share text.
///
/// Returns the share code (or the raw input, left for the library to reject)
/// and the key carried in the share text, if any.
pub fn split_share_input(input: &str) -> (String, Option<String>) {
    match parse_share_text(input) {
        Some((code, key)) => (code.to_string(), key),
        None => (input.trim().to_string(), None),
    }
}

/// Format bytes as human-readable string
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(100), "100 bytes");
        assert_eq!(format_bytes(1536), "1.50 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.00 MB");
        assert_eq!(format_bytes(3 * 1024 * 1024 * 1024), "3.00 GB");
    }

    #[test]
    fn test_split_share_input() {
        let (code, key) = split_share_input(
            "I shared a file with you via PrivShare, share code: privshare://ab12-cd34, key: k3y9",
        );
        assert_eq!(code, "privshare://ab12-cd34");
        assert_eq!(key.as_deref(), Some("k3y9"));

        let (code, key) = split_share_input(" privshare://ab12-cd34 ");
        assert_eq!(code, "privshare://ab12-cd34");
        assert!(key.is_none());

        let (code, key) = split_share_input(" not-a-code ");
        assert_eq!(code, "not-a-code");
        assert!(key.is_none());
    }
}
