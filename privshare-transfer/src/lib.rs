//! PrivShare Transfer Library
//!
//! Async orchestration on top of the core crypto and the record store:
//! - Upload orchestration: encryption, provider negotiation with retry and
//!   fallback, byte upload with on-chain checkpoints, share-record publication
//! - Retrieval cascade: recorded provider first, then public gateways
//! - Preview and download by share code, with decryption
//!
//! The storage network and the signing identity are external collaborators
//! plugged in through the traits in [`network`].

pub mod download;
pub mod error;
pub mod network;
pub mod progress;
pub mod retrieval;
pub mod retry;
pub mod share;
pub mod upload;

// Re-export main types
pub use download::{DownloadedFile, Downloader};
pub use error::{ProviderFailure, Result, TransferError};
pub use network::{
    DataSetCreationStatus, DataSetInfo, Identity, NetworkError, NoopCallbacks, ProviderInfo,
    StaticIdentity, StorageCallbacks, StorageNetwork, StorageOptions, StorageService,
    UploadReceipt,
};
pub use progress::{DownloadStage, ProgressUpdate, UploadSession, UploadStage};
pub use retrieval::{
    attempt_plan, validate_content_id, ContentFetcher, EndpointStyle, FetchError, HttpFetcher,
    RetrievalCascade, RetrievalConfig, DEFAULT_GATEWAYS,
};
pub use retry::{RetryOutcome, RetryPolicy};
pub use share::{parse_share_text, share_text};
pub use upload::{
    Encryption, UploadConfig, UploadOrchestrator, UploadOutcome, UploadRequest,
    DEFAULT_FALLBACK_PROVIDER_ID,
};
