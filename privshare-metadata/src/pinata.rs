//! Pinata-backed record store
//!
//! Records are pinned as JSON to IPFS through the Pinata pinning API and
//! indexed by a `shareCode` keyvalue. Lookups query the pin list by that
//! keyvalue and fetch the record body from an IPFS gateway.

use crate::models::{MappingEnvelope, RecordId};
use crate::{RecordStore, Result, StoreError};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::json;
use std::fmt;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Default pinning API base URL
pub const DEFAULT_PINATA_API_URL: &str = "https://api.pinata.cloud";

/// Default IPFS gateway used to read record bodies
pub const DEFAULT_PINATA_GATEWAY_URL: &str = "https://gateway.pinata.cloud";

/// Pin name prefix for published records
const PIN_NAME_PREFIX: &str = "privshare-mapping-";

/// Pinata credentials, bearer token preferred
#[derive(Clone, PartialEq, Eq)]
pub enum PinataCredentials {
    Jwt(String),
    KeyPair { api_key: String, api_secret: String },
}

impl PinataCredentials {
    /// Read `PINATA_JWT`, else `PINATA_API_KEY` + `PINATA_API_SECRET`
    pub fn from_env() -> Option<Self> {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());

        if let Some(jwt) = var("PINATA_JWT") {
            return Some(Self::Jwt(jwt));
        }

        match (var("PINATA_API_KEY"), var("PINATA_API_SECRET")) {
            (Some(api_key), Some(api_secret)) => Some(Self::KeyPair {
                api_key,
                api_secret,
            }),
            _ => None,
        }
    }

    fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            Self::Jwt(token) => request.bearer_auth(token),
            Self::KeyPair {
                api_key,
                api_secret,
            } => request
                .header("pinata_api_key", api_key)
                .header("pinata_secret_api_key", api_secret),
        }
    }
}

impl fmt::Debug for PinataCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Jwt(_) => f.write_str("Jwt(<redacted>)"),
            Self::KeyPair { api_key, .. } => f
                .debug_struct("KeyPair")
                .field("api_key", api_key)
                .field("api_secret", &"<redacted>")
                .finish(),
        }
    }
}

/// Pinata store configuration
#[derive(Debug, Clone)]
pub struct PinataConfig {
    /// Pinning API base URL
    pub api_url: String,
    /// Gateway base URL for reading pinned JSON
    pub gateway_url: String,
    /// Credentials; required for both publish and lookup
    pub credentials: Option<PinataCredentials>,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for PinataConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_PINATA_API_URL.to_string(),
            gateway_url: DEFAULT_PINATA_GATEWAY_URL.to_string(),
            credentials: PinataCredentials::from_env(),
            timeout: Duration::from_secs(60),
        }
    }
}

impl PinataConfig {
    /// Point at a different API and gateway (e.g. a local mock)
    pub fn with_urls(api_url: impl Into<String>, gateway_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            gateway_url: gateway_url.into(),
            ..Default::default()
        }
    }

    pub fn with_credentials(mut self, credentials: PinataCredentials) -> Self {
        self.credentials = Some(credentials);
        self
    }
}

#[derive(Debug, Deserialize)]
struct PinResponse {
    #[serde(rename = "IpfsHash")]
    ipfs_hash: String,
}

#[derive(Debug, Deserialize)]
struct PinList {
    #[serde(default)]
    rows: Vec<PinRow>,
}

#[derive(Debug, Deserialize)]
struct PinRow {
    ipfs_pin_hash: String,
}

/// Record store over the Pinata pinning API
pub struct PinataStore {
    client: Client,
    api_url: String,
    gateway_url: String,
    credentials: Option<PinataCredentials>,
}

impl PinataStore {
    pub fn new(config: PinataConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            gateway_url: config.gateway_url.trim_end_matches('/').to_string(),
            credentials: config.credentials,
        })
    }

    fn credentials(&self) -> Result<&PinataCredentials> {
        self.credentials.as_ref().ok_or_else(|| {
            StoreError::Configuration(
                "Pinata credentials missing: set PINATA_JWT or PINATA_API_KEY and PINATA_API_SECRET"
                    .to_string(),
            )
        })
    }

    async fn fetch_envelope(&self, ipfs_hash: &str) -> Result<MappingEnvelope> {
        let url = format!("{}/ipfs/{}", self.gateway_url, ipfs_hash);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| StoreError::Lookup(format!("gateway unreachable: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Lookup(format!(
                "unable to read record {} from gateway: {}",
                ipfs_hash, status
            )));
        }

        response
            .json::<MappingEnvelope>()
            .await
            .map_err(|e| StoreError::Lookup(format!("malformed record {}: {}", ipfs_hash, e)))
    }
}

#[async_trait]
impl RecordStore for PinataStore {
    #[instrument(skip(self, envelope), fields(key = %envelope.key()))]
    async fn publish_envelope(&self, envelope: &MappingEnvelope) -> Result<RecordId> {
        let credentials = self.credentials()?;
        let key = envelope.key();

        let body = json!({
            "pinataContent": envelope.to_publishable_json()?,
            "pinataMetadata": {
                "name": format!("{}{}", PIN_NAME_PREFIX, key),
                "keyvalues": {
                    "shareCode": key,
                    "pieceCid": envelope.content_id().unwrap_or_default(),
                },
            },
        });

        let url = format!("{}/pinning/pinJSONToIPFS", self.api_url);
        let response = credentials
            .apply(self.client.post(&url))
            .json(&body)
            .send()
            .await
            .map_err(|e| StoreError::Publish(format!("Pinata unreachable: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Pinata rejected record");
            return Err(StoreError::Publish(format!(
                "Pinata API error: {} {}",
                status.as_u16(),
                message
            )));
        }

        let pinned: PinResponse = response
            .json()
            .await
            .map_err(|e| StoreError::Publish(format!("unexpected Pinata response: {}", e)))?;

        debug!(ipfs_hash = %pinned.ipfs_hash, "Record pinned");
        Ok(RecordId::new(pinned.ipfs_hash))
    }

    #[instrument(skip(self))]
    async fn lookup(&self, key: &str) -> Result<Option<MappingEnvelope>> {
        let credentials = self.credentials()?;

        let filter = json!({ "shareCode": { "value": key, "op": "eq" } }).to_string();
        let url = format!("{}/data/pinList", self.api_url);
        let response = credentials
            .apply(self.client.get(&url))
            .query(&[("metadata[keyvalues]", filter.as_str())])
            .send()
            .await
            .map_err(|e| StoreError::Lookup(format!("Pinata unreachable: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(StoreError::Lookup(format!(
                "Pinata API error: {} {}",
                status.as_u16(),
                message
            )));
        }

        let list: PinList = response
            .json()
            .await
            .map_err(|e| StoreError::Lookup(format!("unexpected Pinata response: {}", e)))?;

        let Some(row) = list.rows.into_iter().next() else {
            debug!("No pin indexed under key");
            return Ok(None);
        };

        debug!(ipfs_hash = %row.ipfs_pin_hash, "Found pinned record");
        self.fetch_envelope(&row.ipfs_pin_hash).await.map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_debug_is_redacted() {
        let jwt = PinataCredentials::Jwt("secret-token".into());
        assert!(!format!("{:?}", jwt).contains("secret-token"));

        let pair = PinataCredentials::KeyPair {
            api_key: "public".into(),
            api_secret: "hidden".into(),
        };
        let debug = format!("{:?}", pair);
        assert!(debug.contains("public"));
        assert!(!debug.contains("hidden"));
    }

    #[test]
    fn test_new_trims_trailing_slashes() {
        let store = PinataStore::new(PinataConfig {
            api_url: "http://localhost:1/".into(),
            gateway_url: "http://localhost:2//".into(),
            credentials: None,
            timeout: Duration::from_secs(1),
        })
        .unwrap();
        assert_eq!(store.api_url, "http://localhost:1");
        assert_eq!(store.gateway_url, "http://localhost:2");
    }

    #[tokio::test]
    async fn test_missing_credentials_is_configuration_error() {
        let store = PinataStore::new(PinataConfig {
            api_url: "http://127.0.0.1:9".into(),
            gateway_url: "http://127.0.0.1:9".into(),
            credentials: None,
            timeout: Duration::from_secs(1),
        })
        .unwrap();

        let err = store.lookup("abcd").await.unwrap_err();
        assert!(matches!(err, StoreError::Configuration(_)));
    }
}
