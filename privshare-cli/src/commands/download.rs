//! Download Command
//!
//! Resolves a share code, fetches the content and decrypts it if needed.

use super::{format_bytes, split_share_input};
use crate::symbols;
use anyhow::{Context, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use privshare_core::EncryptionKey;
use privshare_metadata::RecordStore;
use privshare_transfer::{Downloader, RetrievalCascade};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;

/// Download configuration
pub struct DownloadConfig {
    /// Share code or pasted share text
    pub share_code: String,
    pub key: Option<String>,
    /// Output file or directory; defaults to the current directory
    pub output: Option<PathBuf>,
}

/// Run download command
pub async fn run(
    store: Arc<dyn RecordStore>,
    cascade: RetrievalCascade,
    config: DownloadConfig,
) -> Result<()> {
    let (code, pasted_key) = split_share_input(&config.share_code);
    let (downloader, mut progress) = Downloader::with_progress(store, cascade);

    let record = downloader
        .preview(&code)
        .await
        .context("Failed to look up share code")?;

    let key = if record.requires_key() {
        let raw = match config.key.or(pasted_key) {
            Some(key) => key,
            None => rpassword::prompt_password(format!("{} Decryption key: ", symbols::LOCK))
                .context("Failed to read decryption key")?,
        };
        Some(EncryptionKey::parse(raw.trim()).context("Invalid decryption key")?)
    } else {
        None
    };

    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>3}% {msg}")
            .context("Invalid progress template")?
            .progress_chars("#>-"),
    );

    let bar = pb.clone();
    let reporter = tokio::spawn(async move {
        while let Some(update) = progress.recv().await {
            bar.set_position(u64::from(update.percent));
            bar.set_message(update.message);
        }
    });

    let result = downloader.download_record(record, key.as_ref()).await;
    drop(downloader);
    let _ = reporter.await;

    let file = match result {
        Ok(file) => file,
        Err(e) => {
            pb.abandon_with_message(format!("{} Download failed", style(symbols::CROSS).red()));
            return Err(e).context("Failed to download file");
        }
    };

    let path = output_path(config.output.as_deref(), &file.file_name);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }
    fs::write(&path, &file.data)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;

    pb.finish_with_message(format!(
        "{} Downloaded {}",
        style(symbols::CHECK).green(),
        file.file_name
    ));

    println!(
        "\n{} {}\n  Size: {}\n  Saved to: {}",
        style("Successfully downloaded:").green().bold(),
        file.file_name,
        format_bytes(file.data.len() as u64),
        path.display()
    );
    if key.is_some() {
        println!("  {} {}", symbols::KEY, style("Decrypted locally").dim());
    }

    Ok(())
}

/// Where to write the file.
///
/// The recorded name is reduced to its final component so a record cannot
/// direct the write outside the chosen directory.
fn output_path(output: Option<&Path>, recorded_name: &str) -> PathBuf {
    let name = Path::new(recorded_name)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "download".to_string());

    match output {
        Some(path) if path.is_dir() => path.join(name),
        Some(path) => path.to_path_buf(),
        None => PathBuf::from(name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_path_defaults_to_recorded_name() {
        assert_eq!(output_path(None, "report.pdf"), PathBuf::from("report.pdf"));
        assert_eq!(output_path(None, "../../etc/passwd"), PathBuf::from("passwd"));
        assert_eq!(output_path(None, ".."), PathBuf::from("download"));
        assert_eq!(output_path(None, ""), PathBuf::from("download"));
    }

    #[test]
    fn test_output_path_directory_and_file() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            output_path(Some(dir.path()), "a/b.txt"),
            dir.path().join("b.txt")
        );

        let target = dir.path().join("renamed.bin");
        assert_eq!(output_path(Some(&target), "b.txt"), target);
    }
}
