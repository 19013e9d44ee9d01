//! PrivShare Record Store
//!
//! Binds a share code to the content identifier and file metadata produced by
//! an upload. Records are published once to a public content-addressed store
//! and looked up later by the bare share-code key.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                    RecordStore (trait)                    │
//! │   publish(code, cid, metadata, hint) -> RecordId          │
//! │   resolve(code) -> FileRecord | NotFound                  │
//! │                                                           │
//! │  ┌──────────────────────┐    ┌─────────────────────────┐  │
//! │  │     PinataStore      │    │   MemoryRecordStore     │  │
//! │  │ pinJSONToIPFS/pinList│    │  blake3-addressed map   │  │
//! │  └──────────────────────┘    └─────────────────────────┘  │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Backends only implement [`RecordStore::publish_envelope`] and
//! [`RecordStore::lookup`]; share-code validation, envelope construction and
//! record conversion are shared by the provided `publish` / `resolve` methods.
//!
//! The store gives no read-after-write guarantee: a record that was just
//! published may not be visible to `resolve` yet.
//!
//! # Usage
//!
//! ```ignore
//! use privshare_metadata::{PinataConfig, PinataStore, RecordStore};
//!
//! let store = PinataStore::new(PinataConfig::default())?;
//! let record = store.resolve("privshare://abcd-efgh-ijkl-mnop").await?;
//! println!("{} ({} bytes)", record.metadata.file_name, record.metadata.file_size);
//! ```

pub mod memory;
pub mod models;
pub mod pinata;

pub use memory::{MemoryRecordStore, MemoryStoreStats};
pub use models::{
    to_json_safe, FileMetadata, FileRecord, MappingEnvelope, ProviderHint, RecordId,
    MAX_SAFE_INTEGER, RECORD_SCHEMA_VERSION,
};
pub use pinata::{
    PinataConfig, PinataCredentials, PinataStore, DEFAULT_PINATA_API_URL,
    DEFAULT_PINATA_GATEWAY_URL,
};

use async_trait::async_trait;
use privshare_core::ShareCode;
use thiserror::Error;
use tracing::{debug, instrument};

/// Record store error types
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Invalid share code: {0}")]
    Validation(String),

    #[error("Failed to publish record: {0}")]
    Publish(String),

    #[error("Failed to look up record: {0}")]
    Lookup(String),

    #[error("File not found or share code has expired: {0}")]
    NotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Share-code record store
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Write a fully built envelope, tagged with its bare share-code key
    async fn publish_envelope(&self, envelope: &MappingEnvelope) -> Result<RecordId>;

    /// Find the envelope indexed under a bare share-code key
    async fn lookup(&self, key: &str) -> Result<Option<MappingEnvelope>>;

    /// Publish the binding between a share code and uploaded content
    #[instrument(skip(self, metadata, provider_hint), fields(share_code = %share_code))]
    async fn publish(
        &self,
        share_code: &ShareCode,
        content_id: &str,
        metadata: &FileMetadata,
        provider_hint: Option<&ProviderHint>,
    ) -> Result<RecordId> {
        if content_id.is_empty() {
            return Err(StoreError::Validation(
                "content id must not be empty".to_string(),
            ));
        }

        let envelope =
            MappingEnvelope::new(share_code, content_id, metadata.clone(), provider_hint.cloned());
        let id = self.publish_envelope(&envelope).await?;
        debug!(record_id = %id, "Record published");
        Ok(id)
    }

    /// Resolve a share code to its file record
    #[instrument(skip(self))]
    async fn resolve(&self, share_code: &str) -> Result<FileRecord> {
        let code =
            ShareCode::parse(share_code).map_err(|e| StoreError::Validation(e.to_string()))?;

        let envelope = self
            .lookup(code.lookup_key())
            .await?
            .ok_or_else(|| StoreError::NotFound(code.to_string()))?;

        FileRecord::from_envelope(code, envelope)
    }
}
