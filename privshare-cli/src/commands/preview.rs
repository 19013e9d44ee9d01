//! Preview Command
//!
//! Shows what a share code points at without transferring any content.

use super::{format_bytes, split_share_input};
use crate::symbols;
use anyhow::{Context, Result};
use console::style;
use privshare_metadata::FileRecord;
use privshare_transfer::Downloader;
use serde_json::json;

/// Preview configuration
pub struct PreviewConfig {
    pub share_code: String,
    pub json: bool,
}

/// Run preview command
pub async fn run(downloader: &Downloader, config: PreviewConfig) -> Result<()> {
    let (code, _) = split_share_input(&config.share_code);
    let record = downloader
        .preview(&code)
        .await
        .context("Failed to look up share code")?;

    if config.json {
        let summary = summary_json(&record);
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    let metadata = &record.metadata;
    println!();
    println!("{}", style(&metadata.file_name).bold());
    println!("{}", symbols::HLINE);
    println!("  Size:       {}", format_bytes(metadata.file_size));
    println!(
        "  Type:       {}",
        if metadata.mime_type.is_empty() {
            "unknown"
        } else {
            &metadata.mime_type
        }
    );
    if let Some(uploaded) = metadata.uploaded_at() {
        println!("  Uploaded:   {}", uploaded.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    if !metadata.uploader.is_empty() {
        println!("  Uploader:   {}", metadata.uploader);
    }
    println!("  Content ID: {}", style(&record.content_id).dim());
    if record.requires_key() {
        println!(
            "  {} {}",
            symbols::LOCK,
            style("Encrypted: a key is needed to download").yellow()
        );
    }
    println!();

    Ok(())
}

/// Machine-readable summary; never includes the key
fn summary_json(record: &FileRecord) -> serde_json::Value {
    let metadata = &record.metadata;
    json!({
        "shareCode": record.share_code.as_str(),
        "contentId": record.content_id,
        "fileName": metadata.file_name,
        "fileSize": metadata.file_size,
        "mimeType": metadata.mime_type,
        "isEncrypted": metadata.is_encrypted,
        "uploader": metadata.uploader,
        "uploadTime": metadata.upload_time,
        "providerServiceUrl": record.provider_hint.as_ref().and_then(|h| h.service_url()),
    })
}
