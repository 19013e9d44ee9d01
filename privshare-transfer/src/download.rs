//! Preview and download by share code

use crate::error::{Result, TransferError};
use crate::progress::{DownloadStage, ProgressUpdate};
use crate::retrieval::{RetrievalCascade, RetrievalConfig};
use privshare_core::{decrypt_bytes, EncryptionKey, Iv, ShareCode};
use privshare_metadata::{FileRecord, RecordStore};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, instrument};

/// A retrieved (and, if needed, decrypted) file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedFile {
    pub file_name: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// Share-code preview and download
pub struct Downloader {
    store: Arc<dyn RecordStore>,
    cascade: RetrievalCascade,
    progress_tx: Option<mpsc::UnboundedSender<ProgressUpdate<DownloadStage>>>,
}

impl Downloader {
    pub fn new(store: Arc<dyn RecordStore>, cascade: RetrievalCascade) -> Self {
        Self {
            store,
            cascade,
            progress_tx: None,
        }
    }

    /// Downloader over HTTP gateways
    pub fn http(store: Arc<dyn RecordStore>, config: &RetrievalConfig) -> Result<Self> {
        Ok(Self::new(store, RetrievalCascade::http(config)?))
    }

    /// Create a downloader that reports progress on a channel
    pub fn with_progress(
        store: Arc<dyn RecordStore>,
        cascade: RetrievalCascade,
    ) -> (Self, mpsc::UnboundedReceiver<ProgressUpdate<DownloadStage>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut downloader = Self::new(store, cascade);
        downloader.progress_tx = Some(tx);
        (downloader, rx)
    }

    /// Resolve metadata only; no content is transferred
    #[instrument(skip(self))]
    pub async fn preview(&self, share_code: &str) -> Result<FileRecord> {
        let code = parse_code(share_code)?;
        Ok(self.store.resolve(code.as_str()).await?)
    }

    /// Resolve, fetch and decrypt if the record says so.
    ///
    /// An encrypted record without a key fails before any content is fetched.
    #[instrument(skip(self, key))]
    pub async fn download(
        &self,
        share_code: &str,
        key: Option<&EncryptionKey>,
    ) -> Result<DownloadedFile> {
        let result = self.run(share_code, key).await;
        self.finish(result)
    }

    /// Fetch and decrypt a record already obtained from [`Downloader::preview`].
    ///
    /// The record store is not consulted again.
    #[instrument(skip_all, fields(share_code = %record.share_code))]
    pub async fn download_record(
        &self,
        record: FileRecord,
        key: Option<&EncryptionKey>,
    ) -> Result<DownloadedFile> {
        let result = self.fetch_record(record, key).await;
        self.finish(result)
    }

    fn finish(&self, result: Result<DownloadedFile>) -> Result<DownloadedFile> {
        match result {
            Ok(file) => {
                self.report(DownloadStage::Done, "File downloaded successfully");
                info!(file = %file.file_name, bytes = file.data.len(), "Download complete");
                Ok(file)
            }
            Err(e) => {
                error!(error = %e, "Download failed");
                self.report(DownloadStage::Failed, format!("Download failed: {}", e));
                Err(e)
            }
        }
    }

    async fn run(&self, share_code: &str, key: Option<&EncryptionKey>) -> Result<DownloadedFile> {
        self.report(DownloadStage::Validating, "Validating share code...");
        let code = parse_code(share_code)?;

        self.report(DownloadStage::Resolving, "Looking up file...");
        let record = self.store.resolve(code.as_str()).await?;

        self.fetch_record(record, key).await
    }

    async fn fetch_record(
        &self,
        record: FileRecord,
        key: Option<&EncryptionKey>,
    ) -> Result<DownloadedFile> {
        let key = match (record.requires_key(), key) {
            (true, None) => return Err(TransferError::MissingKey),
            (true, Some(key)) => Some(key),
            (false, _) => None,
        };

        self.report(DownloadStage::Fetching, "Downloading file...");
        let data = self
            .cascade
            .fetch(&record.content_id, record.provider_hint.as_ref())
            .await?;

        let data = match key {
            Some(key) => {
                self.report(DownloadStage::Decrypting, "Decrypting file...");
                let iv = Iv::from_hex(record.metadata.iv.as_deref().unwrap_or_default())?;
                decrypt_bytes(&data, key, &iv)?
            }
            None => data,
        };

        Ok(DownloadedFile {
            file_name: record.metadata.file_name,
            mime_type: record.metadata.mime_type,
            data,
        })
    }

    fn report(&self, stage: DownloadStage, message: impl Into<String>) {
        if let Some(tx) = &self.progress_tx {
            let _ = tx.send(ProgressUpdate {
                stage,
                percent: stage.percent(),
                message: message.into(),
            });
        }
    }
}

fn parse_code(share_code: &str) -> Result<ShareCode> {
    ShareCode::parse(share_code).map_err(|_| {
        TransferError::Validation(format!("Invalid share code format: {:?}", share_code.trim()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieval::{ContentFetcher, FetchError};
    use async_trait::async_trait;
    use privshare_core::encrypt_bytes;
    use privshare_metadata::{FileMetadata, MemoryRecordStore, ProviderHint};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct MapFetcher {
        content: HashMap<String, Vec<u8>>,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ContentFetcher for MapFetcher {
        async fn fetch(&self, url: &str) -> std::result::Result<Vec<u8>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.content.get(url).cloned().ok_or(FetchError::Status {
                url: url.to_string(),
                status: 404,
            })
        }
    }

    async fn setup(
        data: &[u8],
        metadata: FileMetadata,
    ) -> (Downloader, ShareCode, Arc<AtomicUsize>) {
        let store = Arc::new(MemoryRecordStore::new());
        let code = ShareCode::generate();
        let hint = ProviderHint::from_service_url("https://sp");
        store
            .publish(&code, "bafkcid", &metadata, Some(&hint))
            .await
            .unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let mut content = HashMap::new();
        content.insert("https://sp/piece/bafkcid".to_string(), data.to_vec());
        let fetcher = MapFetcher {
            content,
            calls: calls.clone(),
        };
        let cascade = RetrievalCascade::new(Box::new(fetcher), vec!["https://gw".into()]);
        (Downloader::new(store, cascade), code, calls)
    }

    #[tokio::test]
    async fn test_download_plain_file() {
        let data = b"hello world".to_vec();
        let (downloader, code, _) =
            setup(&data, FileMetadata::new("hello.txt", 11, "text/plain", "0x1")).await;

        let file = downloader.download(code.as_str(), None).await.unwrap();
        assert_eq!(file.data, data);
        assert_eq!(file.file_name, "hello.txt");
        assert_eq!(file.mime_type, "text/plain");
    }

    #[tokio::test]
    async fn test_encrypted_without_key_fails_before_fetch() {
        let key = EncryptionKey::parse("ab12").unwrap();
        let (cipher, iv) = encrypt_bytes(b"secret", &key).unwrap();
        let metadata =
            FileMetadata::new("s.bin", 6, "", "0x1").encrypted_with(key.as_str(), iv.to_hex());
        let (downloader, code, calls) = setup(&cipher, metadata).await;

        let err = downloader.download(code.as_str(), None).await.unwrap_err();
        assert!(matches!(err, TransferError::MissingKey));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let file = downloader.download(code.as_str(), Some(&key)).await.unwrap();
        assert_eq!(file.data, b"secret");
    }

    #[tokio::test]
    async fn test_wrong_key_is_decryption_error() {
        let key = EncryptionKey::parse("right-key").unwrap();
        let (cipher, iv) = encrypt_bytes(&[7u8; 100], &key).unwrap();
        let metadata =
            FileMetadata::new("s.bin", 100, "", "0x1").encrypted_with(key.as_str(), iv.to_hex());
        let (downloader, code, _) = setup(&cipher, metadata).await;

        let wrong = EncryptionKey::parse("wrong-key").unwrap();
        match downloader.download(code.as_str(), Some(&wrong)).await {
            Err(TransferError::Decryption(_)) => {}
            Ok(file) => assert_ne!(file.data, vec![7u8; 100]),
            Err(other) => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invalid_code_is_validation_error() {
        let (downloader, _, calls) =
            setup(b"x", FileMetadata::new("x", 1, "", "")).await;

        let err = downloader.download("foo://abcd", None).await.unwrap_err();
        assert!(matches!(err, TransferError::Validation(_)));
        let err = downloader.preview("privshare://AB-cd").await.unwrap_err();
        assert!(matches!(err, TransferError::Validation(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_preview_transfers_no_content() {
        let (downloader, code, calls) =
            setup(b"x", FileMetadata::new("x.txt", 1, "text/plain", "")).await;

        let record = downloader.preview(code.as_str()).await.unwrap();
        assert_eq!(record.metadata.file_name, "x.txt");
        assert_eq!(record.content_id, "bafkcid");
        assert!(!record.requires_key());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_download_record_skips_second_lookup() {
        let store = Arc::new(MemoryRecordStore::new());
        let code = ShareCode::generate();
        store
            .publish(&code, "cid", &FileMetadata::new("a.txt", 1, "", ""), None)
            .await
            .unwrap();
        let mut content = HashMap::new();
        content.insert("https://gw/ipfs/cid".to_string(), vec![9u8]);
        let cascade = RetrievalCascade::new(
            Box::new(MapFetcher {
                content,
                ..Default::default()
            }),
            vec!["https://gw".into()],
        );
        let downloader = Downloader::new(store.clone(), cascade);

        let record = downloader.preview(code.as_str()).await.unwrap();
        let lookups = store.stats().lookups;

        // Record vanishes from the store between preview and download
        store.clear();
        let file = downloader.download_record(record, None).await.unwrap();
        assert_eq!(file.data, vec![9u8]);
        assert_eq!(file.file_name, "a.txt");
        assert_eq!(store.stats().lookups, lookups);
    }

    #[tokio::test]
    async fn test_download_record_still_requires_key() {
        let key = EncryptionKey::parse("ab12").unwrap();
        let (cipher, iv) = encrypt_bytes(b"secret", &key).unwrap();
        let metadata =
            FileMetadata::new("s.bin", 6, "", "0x1").encrypted_with(key.as_str(), iv.to_hex());
        let (downloader, code, calls) = setup(&cipher, metadata).await;

        let record = downloader.preview(code.as_str()).await.unwrap();
        let err = downloader
            .download_record(record.clone(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::MissingKey));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let file = downloader.download_record(record, Some(&key)).await.unwrap();
        assert_eq!(file.data, b"secret");
    }

    #[tokio::test]
    async fn test_download_progress_ends_at_100() {
        let store = Arc::new(MemoryRecordStore::new());
        let code = ShareCode::generate();
        store
            .publish(&code, "cid", &FileMetadata::new("a", 1, "", ""), None)
            .await
            .unwrap();
        let mut content = HashMap::new();
        content.insert("https://gw/ipfs/cid".to_string(), vec![1u8]);
        let cascade = RetrievalCascade::new(
            Box::new(MapFetcher {
                content,
                ..Default::default()
            }),
            vec!["https://gw".into()],
        );
        let (downloader, mut rx) = Downloader::with_progress(store, cascade);

        downloader.download(code.as_str(), None).await.unwrap();
        drop(downloader);

        let mut percents = Vec::new();
        while let Some(update) = rx.recv().await {
            percents.push(update.percent);
        }
        assert_eq!(percents, vec![0, 20, 40, 100]);
    }

    #[tokio::test]
    async fn test_failed_download_resets_progress() {
        let store = Arc::new(MemoryRecordStore::new());
        let cascade = RetrievalCascade::new(Box::<MapFetcher>::default(), vec![]);
        let (downloader, mut rx) = Downloader::with_progress(store, cascade);

        let err = downloader
            .download("privshare://none-none", None)
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::Store(_)));
        drop(downloader);

        let mut last = None;
        while let Some(update) = rx.recv().await {
            last = Some(update);
        }
        let last = last.unwrap();
        assert_eq!(last.stage, DownloadStage::Failed);
        assert_eq!(last.percent, 0);
    }
}
