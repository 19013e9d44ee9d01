//! In-memory record store
//!
//! Used for testing and offline use. Not persistent. Records are addressed by
//! the base58 blake3 digest of their published JSON, like a content-addressed
//! store would address them.

use crate::models::{MappingEnvelope, RecordId};
use crate::{RecordStore, Result, StoreError};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::debug;

#[derive(Default)]
struct IndexEntry {
    records: Vec<RecordId>,
    /// Lookups that still miss before the entry becomes visible
    hidden_for: u64,
}

/// Operation counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryStoreStats {
    pub records: usize,
    pub publishes: u64,
    pub lookups: u64,
}

/// In-memory record store
pub struct MemoryRecordStore {
    /// Published JSON bodies by record id
    objects: RwLock<HashMap<RecordId, Vec<u8>>>,

    /// Bare share-code key to record ids, in publication order
    index: RwLock<HashMap<String, IndexEntry>>,

    /// Lookups a fresh record stays invisible for
    propagation_delay: AtomicU64,

    available: AtomicBool,

    publishes: AtomicU64,
    lookups: AtomicU64,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            index: RwLock::new(HashMap::new()),
            propagation_delay: AtomicU64::new(0),
            available: AtomicBool::new(true),
            publishes: AtomicU64::new(0),
            lookups: AtomicU64::new(0),
        }
    }

    /// Make newly published records miss the next `lookups` lookups
    pub fn with_propagation_delay(self, lookups: u64) -> Self {
        self.propagation_delay.store(lookups, Ordering::SeqCst);
        self
    }

    /// Simulate the backing service going down or coming back
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn stats(&self) -> MemoryStoreStats {
        MemoryStoreStats {
            records: self.objects.read().len(),
            publishes: self.publishes.load(Ordering::SeqCst),
            lookups: self.lookups.load(Ordering::SeqCst),
        }
    }

    /// Raw published JSON for a record
    pub fn raw_record(&self, id: &RecordId) -> Option<serde_json::Value> {
        let objects = self.objects.read();
        objects
            .get(id)
            .and_then(|bytes| serde_json::from_slice(bytes).ok())
    }

    /// Remove everything
    pub fn clear(&self) {
        self.objects.write().clear();
        self.index.write().clear();
    }
}

impl Default for MemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn publish_envelope(&self, envelope: &MappingEnvelope) -> Result<RecordId> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(StoreError::Publish("record store unavailable".to_string()));
        }

        let body = serde_json::to_vec(&envelope.to_publishable_json()?)?;
        let id = RecordId::new(bs58::encode(blake3::hash(&body).as_bytes()).into_string());

        self.objects.write().insert(id.clone(), body);
        {
            let mut index = self.index.write();
            let entry = index.entry(envelope.key().to_string()).or_default();
            if entry.records.is_empty() {
                entry.hidden_for = self.propagation_delay.load(Ordering::SeqCst);
            }
            entry.records.push(id.clone());
        }
        self.publishes.fetch_add(1, Ordering::SeqCst);

        debug!(record_id = %id, key = envelope.key(), "Stored record");
        Ok(id)
    }

    async fn lookup(&self, key: &str) -> Result<Option<MappingEnvelope>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);

        if !self.available.load(Ordering::SeqCst) {
            return Err(StoreError::Lookup("record store unavailable".to_string()));
        }

        let id = {
            let mut index = self.index.write();
            let Some(entry) = index.get_mut(key) else {
                return Ok(None);
            };
            if entry.hidden_for > 0 {
                entry.hidden_for -= 1;
                return Ok(None);
            }
            match entry.records.first() {
                Some(id) => id.clone(),
                None => return Ok(None),
            }
        };

        let objects = self.objects.read();
        let Some(body) = objects.get(&id) else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_slice(body)?))
    }
}
