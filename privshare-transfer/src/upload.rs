//! Upload Orchestrator
//!
//! Drives one upload through:
//!
//! ```text
//! Init -> [Encrypting] -> PreflightChecked -> ProviderNegotiating -> Uploading
//!      -> PieceConfirmed -> DatasetConfirming -> MetadataPublishing -> Done
//! ```
//!
//! with `Failed` reachable from every non-terminal stage. Provider
//! negotiation gets a bounded retry and then one fallback provider; the byte
//! upload is never retried. The share record is published only after the
//! piece addition is confirmed.

use crate::error::{ProviderFailure, Result, TransferError};
use crate::network::{
    DataSetCreationStatus, DataSetInfo, Identity, NetworkError, ProviderInfo, StorageCallbacks,
    StorageNetwork, StorageOptions, StorageService,
};
use crate::progress::{ProgressUpdate, UploadSession, UploadStage};
use crate::retry::{RetryOutcome, RetryPolicy};
use crate::share::share_text;
use parking_lot::Mutex;
use privshare_core::{encrypt_bytes, EncryptionKey, ShareCode};
use privshare_metadata::{FileMetadata, RecordId, RecordStore};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument, warn};

/// Provider forced when automatic selection fails
pub const DEFAULT_FALLBACK_PROVIDER_ID: u64 = 3;

/// Orchestrator configuration
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Provider id tried once automatic selection has failed
    pub fallback_provider_id: u64,
    /// Retry policy for storage creation (negotiation only)
    pub retry: RetryPolicy,
    /// Poll `resolve` after publishing until the record is visible
    pub confirm_publication: Option<RetryPolicy>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            fallback_provider_id: DEFAULT_FALLBACK_PROVIDER_ID,
            retry: RetryPolicy::default(),
            confirm_publication: None,
        }
    }
}

/// Client-side encryption choice
#[derive(Debug, Clone, Default)]
pub enum Encryption {
    #[default]
    None,
    /// Generate a random key
    Generate,
    WithKey(EncryptionKey),
}

/// A file to upload
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub file_name: String,
    pub mime_type: String,
    pub data: Vec<u8>,
    pub encryption: Encryption,
}

impl UploadRequest {
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            data,
            encryption: Encryption::None,
        }
    }

    pub fn encrypted(mut self, encryption: Encryption) -> Self {
        self.encryption = encryption;
        self
    }
}

/// Result of a completed upload
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    pub share_code: ShareCode,
    pub content_id: String,
    pub file_name: String,
    /// Plaintext size in bytes
    pub file_size: u64,
    pub is_encrypted: bool,
    /// Short key to hand to the recipient
    pub encryption_key: Option<EncryptionKey>,
    pub record_id: RecordId,
    pub provider: Option<ProviderInfo>,
    pub tx_hash: Option<String>,
}

impl UploadOutcome {
    /// Text to send to the recipient
    pub fn share_text(&self) -> String {
        share_text(
            &self.share_code,
            self.encryption_key.as_ref().map(EncryptionKey::as_str),
        )
    }
}

/// Session shared with the storage callbacks
struct SessionHandle {
    session: Mutex<UploadSession>,
    progress_tx: Option<mpsc::UnboundedSender<ProgressUpdate>>,
}

impl SessionHandle {
    fn new(progress_tx: Option<mpsc::UnboundedSender<ProgressUpdate>>) -> Self {
        Self {
            session: Mutex::new(UploadSession::new()),
            progress_tx,
        }
    }

    fn advance(&self, stage: UploadStage, percent: u8, message: impl Into<String>) {
        let update = self.session.lock().advance(stage, percent, message);
        self.report(update);
    }

    fn note(&self, message: impl Into<String>) {
        let update = self.session.lock().note(message);
        self.report(update);
    }

    fn fail(&self, message: impl Into<String>) {
        let update = self.session.lock().fail(message);
        self.report(update);
    }

    fn with<T>(&self, f: impl FnOnce(&mut UploadSession) -> T) -> T {
        f(&mut self.session.lock())
    }

    fn report(&self, update: ProgressUpdate) {
        debug!(stage = %update.stage, percent = update.percent, "{}", update.message);
        if let Some(tx) = &self.progress_tx {
            let _ = tx.send(update);
        }
    }
}

/// Maps storage-network checkpoints onto the session
struct SessionCallbacks<'a> {
    session: &'a SessionHandle,
    fallback: bool,
}

impl SessionCallbacks<'_> {
    fn label(&self, message: &str) -> String {
        if self.fallback {
            format!("Fallback: {}", message)
        } else {
            message.to_string()
        }
    }
}

impl StorageCallbacks for SessionCallbacks<'_> {
    fn on_provider_selected(&self, provider: &ProviderInfo) {
        info!(provider_id = provider.id, name = %provider.name, "Storage provider selected");
        self.session
            .with(|s| s.selected_provider = Some(provider.clone()));
        self.session.note(self.label(&format!(
            "Storage provider selected (ID: {})",
            provider.id
        )));
    }

    fn on_data_set_resolved(&self, data_set: &DataSetInfo) {
        debug!(data_set = data_set.id, "Data set resolved");
        self.session.with(|s| s.data_set = Some(data_set.clone()));
        self.session.advance(
            UploadStage::ProviderNegotiating,
            30,
            self.label("Existing data set found and resolved"),
        );
    }

    fn on_data_set_creation_started(&self, tx_hash: Option<&str>) {
        debug!(?tx_hash, "Data set creation started");
        self.session.advance(
            UploadStage::ProviderNegotiating,
            35,
            self.label("Creating new data set on chain..."),
        );
    }

    fn on_data_set_creation_progress(&self, status: &DataSetCreationStatus) {
        if status.transaction_success {
            self.session.advance(
                UploadStage::ProviderNegotiating,
                45,
                self.label("Data set transaction confirmed on chain"),
            );
        }
        if status.server_confirmed {
            self.session.advance(
                UploadStage::ProviderNegotiating,
                50,
                self.label(&format!(
                    "Data set ready ({}s)",
                    status.elapsed.as_secs_f64().round()
                )),
            );
        }
    }

    fn on_upload_complete(&self, content_id: &str) {
        self.session
            .with(|s| s.content_id = Some(content_id.to_string()));
        self.session.advance(
            UploadStage::PieceConfirmed,
            80,
            "File uploaded, adding piece to the data set",
        );
    }

    fn on_piece_added(&self, tx_hash: Option<&str>) {
        if let Some(hash) = tx_hash {
            self.session.with(|s| s.tx_hash = Some(hash.to_string()));
        }
        let message = match tx_hash {
            Some(hash) => format!("Waiting for transaction to be confirmed on chain (txHash: {})", hash),
            None => "Waiting for transaction to be confirmed on chain".to_string(),
        };
        self.session
            .advance(UploadStage::DatasetConfirming, 85, message);
    }

    fn on_piece_confirmed(&self) {
        self.session.advance(
            UploadStage::DatasetConfirming,
            90,
            "Data pieces added to data set successfully",
        );
    }
}

/// Upload orchestrator
pub struct UploadOrchestrator {
    network: Arc<dyn StorageNetwork>,
    identity: Arc<dyn Identity>,
    store: Arc<dyn RecordStore>,
    config: UploadConfig,
    progress_tx: Option<mpsc::UnboundedSender<ProgressUpdate>>,
}

impl UploadOrchestrator {
    pub fn new(
        network: Arc<dyn StorageNetwork>,
        identity: Arc<dyn Identity>,
        store: Arc<dyn RecordStore>,
        config: UploadConfig,
    ) -> Self {
        Self {
            network,
            identity,
            store,
            config,
            progress_tx: None,
        }
    }

    /// Create an orchestrator that reports progress on a channel
    pub fn with_progress(
        network: Arc<dyn StorageNetwork>,
        identity: Arc<dyn Identity>,
        store: Arc<dyn RecordStore>,
        config: UploadConfig,
    ) -> (Self, mpsc::UnboundedReceiver<ProgressUpdate>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut orchestrator = Self::new(network, identity, store, config);
        orchestrator.progress_tx = Some(tx);
        (orchestrator, rx)
    }

    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    /// Upload a file and publish its share record
    #[instrument(skip(self, request), fields(file = %request.file_name, size = request.data.len()))]
    pub async fn upload(&self, request: UploadRequest) -> Result<UploadOutcome> {
        let session = SessionHandle::new(self.progress_tx.clone());

        match self.run(request, &session).await {
            Ok(outcome) => {
                session.advance(
                    UploadStage::Done,
                    100,
                    "File successfully stored on the storage network",
                );
                info!(share_code = %outcome.share_code, content_id = %outcome.content_id, "Upload complete");
                Ok(outcome)
            }
            Err(e) => {
                error!(error = %e, "Upload failed");
                session.fail(format!("Upload failed: {}", e));
                Err(e)
            }
        }
    }

    async fn run(&self, request: UploadRequest, session: &SessionHandle) -> Result<UploadOutcome> {
        let owner = self.identity.address().ok_or(TransferError::NoIdentity)?;

        if request.file_name.trim().is_empty() {
            return Err(TransferError::Validation(
                "file name must not be empty".to_string(),
            ));
        }

        let UploadRequest {
            file_name,
            mime_type,
            data,
            encryption,
        } = request;
        let file_size = data.len() as u64;

        // Encrypting
        let key = match encryption {
            Encryption::None => None,
            Encryption::Generate => Some(EncryptionKey::generate()),
            Encryption::WithKey(key) => Some(key),
        };
        let (payload, iv) = match &key {
            Some(key) => {
                session.advance(UploadStage::Encrypting, 5, "Encrypting file...");
                let (cipher_text, iv) = encrypt_bytes(&data, key)
                    .map_err(|e| TransferError::Encryption(e.to_string()))?;
                (cipher_text, Some(iv))
            }
            None => (data, None),
        };

        // Preflight
        session.advance(
            UploadStage::PreflightChecked,
            10,
            "Initializing file upload...",
        );
        let data_sets = self
            .network
            .find_datasets(&owner)
            .await
            .map_err(|e| TransferError::Upload(format!("Failed to query data sets: {}", e)))?;
        debug!(count = data_sets.len(), "Existing data sets");
        session.advance(UploadStage::PreflightChecked, 20, "Preflight checks complete");

        // Negotiation
        let service = self.negotiate(session).await?;

        // Upload
        session.advance(
            UploadStage::Uploading,
            55,
            "Uploading file to storage provider...",
        );
        let callbacks = SessionCallbacks {
            session,
            fallback: false,
        };
        let receipt = service
            .upload(&payload, &callbacks)
            .await
            .map_err(|e| TransferError::Upload(e.to_string()))?;
        if receipt.content_id.is_empty() {
            return Err(TransferError::Upload(
                "storage provider returned an empty content id".to_string(),
            ));
        }
        let content_id = receipt.content_id;
        session.with(|s| s.content_id = Some(content_id.clone()));

        // Publish
        session.advance(
            UploadStage::MetadataPublishing,
            90,
            "Publishing share code...",
        );
        let share_code = ShareCode::generate();
        let mut metadata = FileMetadata::new(file_name.clone(), file_size, mime_type, owner);
        if let (Some(key), Some(iv)) = (&key, &iv) {
            metadata = metadata.encrypted_with(key.as_str(), iv.to_hex());
        }
        let (provider, tx_hash) =
            session.with(|s| (s.selected_provider.clone(), s.tx_hash.clone()));
        let hint = provider.as_ref().map(ProviderInfo::to_hint);

        let record_id = self
            .store
            .publish(&share_code, &content_id, &metadata, hint.as_ref())
            .await?;
        session.advance(UploadStage::MetadataPublishing, 95, "Share code published");

        if let Some(policy) = self.config.confirm_publication {
            self.confirm_publication(&share_code, policy).await;
        }

        Ok(UploadOutcome {
            share_code,
            content_id,
            file_name,
            file_size,
            is_encrypted: key.is_some(),
            encryption_key: key,
            record_id,
            provider,
            tx_hash,
        })
    }

    /// Automatic provider selection, then the fallback provider once
    async fn negotiate(&self, session: &SessionHandle) -> Result<Box<dyn StorageService>> {
        session.advance(
            UploadStage::ProviderNegotiating,
            20,
            "Selecting storage provider...",
        );

        let auto_error = match self
            .create_storage(&StorageOptions::default(), session, false)
            .await
        {
            Ok(service) => return Ok(service),
            Err(e) => e,
        };

        let fallback_id = self.config.fallback_provider_id;
        warn!(error = %auto_error, fallback_id, "Automatic provider selection failed, trying fallback");
        session.advance(
            UploadStage::ProviderNegotiating,
            30,
            format!("Provider failed, trying fallback provider (ID: {})...", fallback_id),
        );

        match self
            .create_storage(&StorageOptions::with_provider(fallback_id), session, true)
            .await
        {
            Ok(service) => Ok(service),
            Err(fallback_error) => Err(TransferError::ProviderSelection {
                reason: ProviderFailure::classify(&fallback_error),
                auto_error: auto_error.to_string(),
                fallback_error: fallback_error.to_string(),
            }),
        }
    }

    async fn create_storage(
        &self,
        options: &StorageOptions,
        session: &SessionHandle,
        fallback: bool,
    ) -> std::result::Result<Box<dyn StorageService>, NetworkError> {
        let callbacks = SessionCallbacks { session, fallback };
        let callbacks = &callbacks;
        let network = &self.network;
        let attempts = self.config.retry.attempts();

        self.config
            .retry
            .run(
                move |_| network.create_storage(options, callbacks),
                |attempt, err| {
                    warn!(attempt, error = %err, "Storage creation failed, retrying");
                    session.note(format!(
                        "Retrying storage creation... (attempt {}/{})",
                        attempt + 1,
                        attempts
                    ));
                },
            )
            .await
            .into_result()
    }

    async fn confirm_publication(&self, share_code: &ShareCode, policy: RetryPolicy) {
        let store = &self.store;
        let outcome = policy
            .run(
                move |_| store.resolve(share_code.as_str()),
                |attempt, err| debug!(attempt, error = %err, "Share record not visible yet"),
            )
            .await;

        match outcome {
            RetryOutcome::Succeeded { attempts, .. } => {
                debug!(attempts, "Share record visible")
            }
            RetryOutcome::Exhausted {
                last_error,
                attempts,
            } => warn!(
                attempts,
                error = %last_error,
                "Share record not visible yet; it may take a while to propagate"
            ),
        }
    }
}
