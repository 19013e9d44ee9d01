//! Configuration management
//!
//! Config directory: ~/.privshare/ (cross-platform)
//!
//! Config file format (~/.privshare/config.toml):
//! ```toml
//! [record_store]
//! api_url = "https://api.pinata.cloud"
//! gateway_url = "https://gateway.pinata.cloud"
//!
//! [retrieval]
//! gateways = ["https://ipfs.io", "https://dweb.link"]
//! timeout_secs = 60
//! ```
//!
//! Record-store credentials never live in this file; they come from
//! `PINATA_JWT` or `PINATA_API_KEY` + `PINATA_API_SECRET`.

use anyhow::{Context, Result};
use privshare_metadata::{PinataConfig, DEFAULT_PINATA_API_URL, DEFAULT_PINATA_GATEWAY_URL};
use privshare_transfer::{RetrievalConfig, DEFAULT_GATEWAYS};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Keys accepted by `privshare config set`
pub const SETTABLE_KEYS: [&str; 4] = [
    "record_store.api_url",
    "record_store.gateway_url",
    "retrieval.gateways",
    "retrieval.timeout_secs",
];

/// Structure of ~/.privshare/config.toml
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct PrivShareConfig {
    #[serde(default)]
    pub record_store: RecordStoreSettings,

    #[serde(default)]
    pub retrieval: RetrievalSettings,
}

/// Pinning API and its gateway
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecordStoreSettings {
    #[serde(default = "default_api_url")]
    pub api_url: String,

    #[serde(default = "default_gateway_url")]
    pub gateway_url: String,
}

impl Default for RecordStoreSettings {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            gateway_url: default_gateway_url(),
        }
    }
}

fn default_api_url() -> String {
    std::env::var("PRIVSHARE_PINATA_API_URL")
        .unwrap_or_else(|_| DEFAULT_PINATA_API_URL.to_string())
}

fn default_gateway_url() -> String {
    std::env::var("PRIVSHARE_PINATA_GATEWAY_URL")
        .unwrap_or_else(|_| DEFAULT_PINATA_GATEWAY_URL.to_string())
}

/// Content retrieval
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievalSettings {
    /// Public gateways, tried in order
    #[serde(default = "default_gateways")]
    pub gateways: Vec<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            gateways: default_gateways(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_gateways() -> Vec<String> {
    DEFAULT_GATEWAYS.iter().map(|g| g.to_string()).collect()
}

fn default_timeout_secs() -> u64 {
    60
}

impl PrivShareConfig {
    /// Record-store client config; credentials come from the environment
    pub fn pinata_config(&self) -> PinataConfig {
        PinataConfig::with_urls(&self.record_store.api_url, &self.record_store.gateway_url)
    }

    pub fn retrieval_config(&self) -> RetrievalConfig {
        RetrievalConfig {
            gateways: self.retrieval.gateways.clone(),
            timeout: Duration::from_secs(self.retrieval.timeout_secs),
        }
    }

    /// Apply `privshare config set <key> <value>`
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "record_store.api_url" => self.record_store.api_url = value.to_string(),
            "record_store.gateway_url" => self.record_store.gateway_url = value.to_string(),
            "retrieval.gateways" => {
                self.retrieval.gateways = value
                    .split(',')
                    .map(|g| g.trim().to_string())
                    .filter(|g| !g.is_empty())
                    .collect()
            }
            "retrieval.timeout_secs" => self.retrieval.timeout_secs = parse_number(key, value)?,
            _ => anyhow::bail!(
                "Unknown config key: {}. Valid keys: {}",
                key,
                SETTABLE_KEYS.join(", ")
            ),
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("{} expects a non-negative integer, got {:?}", key, value))
}

/// Get the config directory path (~/.privshare/)
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".privshare"))
}

/// Get the config file path
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

/// Load configuration, falling back to defaults if the file doesn't exist
pub fn load_config() -> PrivShareConfig {
    match config_file_path() {
        Ok(path) => load_config_from(&path),
        Err(_) => PrivShareConfig::default(),
    }
}

/// Load configuration from a specific file
pub fn load_config_from(path: &Path) -> PrivShareConfig {
    if !path.exists() {
        return PrivShareConfig::default();
    }
    match fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Warning: Failed to parse config file: {}", e);
                PrivShareConfig::default()
            }
        },
        Err(e) => {
            eprintln!("Warning: Failed to read config file: {}", e);
            PrivShareConfig::default()
        }
    }
}

/// Save configuration to ~/.privshare/config.toml
pub fn save_config(config: &PrivShareConfig) -> Result<()> {
    save_config_to(&config_file_path()?, config)
}

/// Save configuration to a specific file, creating its directory
pub fn save_config_to(path: &Path, config: &PrivShareConfig) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create config directory {}", dir.display()))?;
    }
    let content = toml::to_string_pretty(config).context("Failed to serialize config")?;
    fs::write(path, content).context("Failed to write config file")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PrivShareConfig::default();
        assert_eq!(config.retrieval.gateways.len(), 8);
        assert_eq!(config.retrieval.gateways[0], "https://ipfs.io");
        assert_eq!(config.retrieval.timeout_secs, 60);
    }

    #[test]
    fn test_config_serialization() {
        let toml_str = toml::to_string_pretty(&PrivShareConfig::default()).unwrap();

        assert!(toml_str.contains("[record_store]"));
        assert!(toml_str.contains("[retrieval]"));
        assert!(toml_str.contains("timeout_secs = 60"));
        assert!(!toml_str.contains("[upload]"));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: PrivShareConfig = toml::from_str(
            r#"
            [retrieval]
            gateways = ["https://my.gateway"]
            "#,
        )
        .unwrap();

        assert_eq!(config.retrieval.gateways, vec!["https://my.gateway"]);
        assert_eq!(config.retrieval.timeout_secs, 60);
        assert_eq!(config.record_store, RecordStoreSettings::default());
    }

    #[test]
    fn test_stale_upload_section_is_ignored() {
        let config: PrivShareConfig = toml::from_str(
            r#"
            [retrieval]
            timeout_secs = 5

            [upload]
            max_retries = 9
            "#,
        )
        .unwrap();

        assert_eq!(config.retrieval.timeout_secs, 5);
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(!toml_str.contains("max_retries"));
    }

    #[test]
    fn test_set_known_and_unknown_keys() {
        let mut config = PrivShareConfig::default();

        config
            .set("retrieval.gateways", "https://a, https://b,")
            .unwrap();
        assert_eq!(config.retrieval.gateways, vec!["https://a", "https://b"]);

        config.set("retrieval.timeout_secs", "30").unwrap();
        assert_eq!(config.retrieval.timeout_secs, 30);

        assert!(config.set("retrieval.timeout_secs", "-1").is_err());
        let err = config.set("upload.max_retries", "5").unwrap_err();
        assert!(err.to_string().contains("Unknown config key"));
        let err = config.set("gateway.http_url", "x").unwrap_err();
        assert!(err.to_string().contains("record_store.api_url"));
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = PrivShareConfig::default();
        config.set("record_store.api_url", "http://localhost:9999").unwrap();
        config.set("retrieval.timeout_secs", "5").unwrap();
        save_config_to(&path, &config).unwrap();

        let loaded = load_config_from(&path);
        assert_eq!(loaded, config);
        assert_eq!(loaded.retrieval_config().timeout, Duration::from_secs(5));
        assert_eq!(loaded.pinata_config().api_url, "http://localhost:9999");
    }

    #[test]
    fn test_missing_or_broken_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        assert_eq!(load_config_from(&path), PrivShareConfig::default());

        fs::write(&path, "this is [not toml").unwrap();
        assert_eq!(load_config_from(&path), PrivShareConfig::default());
    }
}
