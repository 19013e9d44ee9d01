//! Storage-network collaborators
//!
//! The orchestrator never talks to a chain or a storage provider directly.
//! Hosts plug in an [`Identity`] and a [`StorageNetwork`] client; the
//! orchestrator drives them and listens on [`StorageCallbacks`].

use async_trait::async_trait;
use privshare_metadata::ProviderHint;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by storage-network collaborators
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Transaction failed: {0}")]
    Transaction(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("{0}")]
    Other(String),
}

/// Authenticated identity able to submit storage transactions
pub trait Identity: Send + Sync {
    /// Account address, if connected
    fn address(&self) -> Option<String>;

    fn has_identity(&self) -> bool {
        self.address().is_some()
    }
}

/// A fixed address, for hosts that resolve the identity up front
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticIdentity(pub Option<String>);

impl Identity for StaticIdentity {
    fn address(&self) -> Option<String> {
        self.0.clone()
    }
}

/// Storage provider chosen for an upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderInfo {
    pub id: u64,
    pub name: String,
    /// Base URL serving `/piece/<cid>` retrievals
    pub service_url: Option<String>,
}

impl ProviderInfo {
    /// Hint recorded with the share record for faster retrieval
    pub fn to_hint(&self) -> ProviderHint {
        let mut value = json!({ "id": self.id, "name": self.name });
        if let Some(url) = &self.service_url {
            value["products"] = json!({ "PDP": { "data": { "serviceURL": url } } });
        }
        ProviderHint::new(value)
    }
}

/// Existing logical dataset owned by the identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSetInfo {
    pub id: u64,
    pub provider_id: u64,
    pub is_live: bool,
}

/// Partial status reported while a dataset is being created
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataSetCreationStatus {
    pub transaction_success: bool,
    pub server_confirmed: bool,
    pub elapsed: Duration,
}

/// Options for [`StorageNetwork::create_storage`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorageOptions {
    /// Force a specific provider; `None` lets the network choose
    pub provider_id: Option<u64>,
}

impl StorageOptions {
    pub fn with_provider(provider_id: u64) -> Self {
        Self {
            provider_id: Some(provider_id),
        }
    }
}

/// Result of a completed byte upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    pub content_id: String,
}

/// Checkpoints reported by the storage network.
///
/// Every method is optional. Each fires at most once per call, except
/// `on_data_set_creation_progress`.
pub trait StorageCallbacks: Send + Sync {
    fn on_provider_selected(&self, _provider: &ProviderInfo) {}

    fn on_data_set_resolved(&self, _data_set: &DataSetInfo) {}

    fn on_data_set_creation_started(&self, _tx_hash: Option<&str>) {}

    fn on_data_set_creation_progress(&self, _status: &DataSetCreationStatus) {}

    /// Bytes accepted by the provider
    fn on_upload_complete(&self, _content_id: &str) {}

    /// Piece addition submitted on chain
    fn on_piece_added(&self, _tx_hash: Option<&str>) {}

    /// Piece addition confirmed on chain
    fn on_piece_confirmed(&self) {}
}

/// Callbacks that ignore every checkpoint
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCallbacks;

impl StorageCallbacks for NoopCallbacks {}

/// Storage-network client
#[async_trait]
pub trait StorageNetwork: Send + Sync {
    /// Datasets already owned by `owner`
    async fn find_datasets(&self, owner: &str) -> Result<Vec<DataSetInfo>, NetworkError>;

    /// Select a provider and resolve or create a dataset on it
    async fn create_storage(
        &self,
        options: &StorageOptions,
        callbacks: &dyn StorageCallbacks,
    ) -> Result<Box<dyn StorageService>, NetworkError>;
}

/// Storage context bound to one provider and dataset
#[async_trait]
pub trait StorageService: Send + Sync {
    async fn upload(
        &self,
        data: &[u8],
        callbacks: &dyn StorageCallbacks,
    ) -> Result<UploadReceipt, NetworkError>;
}
