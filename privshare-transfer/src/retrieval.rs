//! Retrieval Cascade
//!
//! Fetches content by trying endpoints one after another:
//!
//! 1. the provider recorded at upload time (`<serviceURL>/piece/<cid>`), once
//! 2. every known public gateway, each with every endpoint convention
//!
//! The first success wins. Attempts are never raced.

use crate::error::{Result, TransferError};
use async_trait::async_trait;
use privshare_metadata::ProviderHint;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

/// Public gateways, in the order they are tried
pub const DEFAULT_GATEWAYS: [&str; 8] = [
    "https://ipfs.io",
    "https://cloudflare-ipfs.com",
    "https://dweb.link",
    "https://gateway.pinata.cloud",
    "https://api.web3.storage",
    "https://ipfs.filebase.io",
    "https://ipfs.eth.aragon.network",
    "https://ipfs.fleek.co",
];

/// Endpoint path conventions, in the order they are tried per gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointStyle {
    /// `/ipfs/<cid>`
    Direct,
    /// `/ipfs/<cid>?format=raw`
    RawFormat,
    /// `/api/v0/cat?arg=<cid>`
    ApiCat,
    /// `/piece/<cid>`
    Piece,
}

impl EndpointStyle {
    pub const ALL: [EndpointStyle; 4] = [Self::Direct, Self::RawFormat, Self::ApiCat, Self::Piece];

    pub fn url(&self, base: &str, content_id: &str) -> String {
        let base = base.trim_end_matches('/');
        match self {
            Self::Direct => format!("{}/ipfs/{}", base, content_id),
            Self::RawFormat => format!("{}/ipfs/{}?format=raw", base, content_id),
            Self::ApiCat => format!("{}/api/v0/cat?arg={}", base, content_id),
            Self::Piece => format!("{}/piece/{}", base, content_id),
        }
    }
}

/// Retrieval configuration
#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    /// Gateway base URLs, tried in order
    pub gateways: Vec<String>,
    /// Per-request timeout for the HTTP fetcher
    pub timeout: Duration,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            gateways: DEFAULT_GATEWAYS.iter().map(|g| g.to_string()).collect(),
            timeout: Duration::from_secs(60),
        }
    }
}

/// Reject content ids that cannot be placed in a URL path segment
pub fn validate_content_id(content_id: &str) -> Result<()> {
    if content_id.is_empty() {
        return Err(TransferError::Validation(
            "content id must not be empty".to_string(),
        ));
    }
    if content_id
        .chars()
        .any(|c| c.is_whitespace() || c.is_control() || matches!(c, '/' | '?' | '#'))
    {
        return Err(TransferError::Validation(format!(
            "invalid content id: {:?}",
            content_id
        )));
    }
    Ok(())
}

/// Every URL the cascade would try, in order
pub fn attempt_plan(
    content_id: &str,
    hint: Option<&ProviderHint>,
    gateways: &[String],
) -> Vec<String> {
    let hinted = hint
        .and_then(ProviderHint::service_url)
        .map(|url| EndpointStyle::Piece.url(url, content_id));

    hinted
        .into_iter()
        .chain(gateways.iter().flat_map(|gateway| {
            EndpointStyle::ALL
                .into_iter()
                .map(move |style| style.url(gateway, content_id))
        }))
        .collect()
}

/// Failure of a single fetch attempt
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("{url} returned {status}")]
    Status { url: String, status: u16 },

    #[error("{url}: {message}")]
    Transport { url: String, message: String },
}

/// Fetches raw bytes from one URL
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> std::result::Result<Vec<u8>, FetchError>;
}

/// reqwest-backed fetcher; any non-2xx status is a failed attempt
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransferError::Configuration(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ContentFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> std::result::Result<Vec<u8>, FetchError> {
        let transport = |e: reqwest::Error| FetchError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        };

        let response = self.client.get(url).send().await.map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await.map_err(transport)?;
        Ok(bytes.to_vec())
    }
}

/// Sequential multi-endpoint fetch
pub struct RetrievalCascade {
    fetcher: Box<dyn ContentFetcher>,
    gateways: Vec<String>,
}

impl RetrievalCascade {
    pub fn new(fetcher: Box<dyn ContentFetcher>, gateways: Vec<String>) -> Self {
        Self { fetcher, gateways }
    }

    /// Cascade over HTTP with the configured gateways
    pub fn http(config: &RetrievalConfig) -> Result<Self> {
        Ok(Self::new(
            Box::new(HttpFetcher::new(config.timeout)?),
            config.gateways.clone(),
        ))
    }

    pub fn gateways(&self) -> &[String] {
        &self.gateways
    }

    /// Fetch content, trying the hinted provider first
    #[instrument(skip(self, hint))]
    pub async fn fetch(&self, content_id: &str, hint: Option<&ProviderHint>) -> Result<Vec<u8>> {
        validate_content_id(content_id)?;

        let plan = attempt_plan(content_id, hint, &self.gateways);
        let mut last_error = None;

        for (attempt, url) in plan.iter().enumerate() {
            match self.fetcher.fetch(url).await {
                Ok(data) => {
                    info!(endpoint = %url, attempt = attempt + 1, bytes = data.len(), "Content retrieved");
                    return Ok(data);
                }
                Err(e) => {
                    debug!(endpoint = %url, attempt = attempt + 1, error = %e, "Endpoint failed");
                    last_error = Some(e);
                }
            }
        }

        warn!(attempts = plan.len(), "All retrieval endpoints failed");
        Err(TransferError::AllProvidersExhausted {
            attempts: plan.len(),
            last_error: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no retrieval endpoints configured".to_string()),
        })
    }
}
