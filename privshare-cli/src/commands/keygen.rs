//! Keygen Command

use crate::symbols;
use anyhow::{Context, Result};
use console::style;
use privshare_core::EncryptionKey;

/// Print `count` fresh short keys, optionally with their AES key material
pub fn run(count: usize, show_hex: bool) -> Result<()> {
    for _ in 0..count.max(1) {
        let key = EncryptionKey::generate();
        if show_hex {
            let hex = key.normalized_hex().context("Failed to derive key material")?;
            println!("{}  {}", style(key.as_str()).bold(), style(hex).dim());
        } else {
            println!("{}", key.as_str());
        }
    }

    if show_hex {
        eprintln!(
            "{} {}",
            style(symbols::WARN).yellow(),
            style("Share only the short key; the hex form is derived from it").dim()
        );
    }
    Ok(())
}
