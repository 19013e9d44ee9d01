//! Validate Command
//!
//! Offline share-code grammar check.

use super::split_share_input;
use crate::symbols;
use anyhow::Result;
use console::style;
use privshare_core::ShareCode;

pub fn run(input: &str) -> Result<()> {
    let (candidate, key) = split_share_input(input);

    match ShareCode::parse(&candidate) {
        Ok(code) => {
            println!("{} {}", style(symbols::CHECK).green(), code);
            println!("  Lookup key: {}", code.lookup_key());
            if key.is_some() {
                println!("  {} Share text carries a key", symbols::KEY);
            }
            Ok(())
        }
        Err(e) => {
            println!("{} {}", style(symbols::CROSS).red(), e);
            anyhow::bail!("Invalid share code: {:?}", candidate)
        }
    }
}
