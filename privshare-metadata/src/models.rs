//! Record models
//!
//! The envelope layout is camelCase JSON so that records written by earlier
//! clients remain readable.

use crate::{Result, StoreError};
use privshare_core::ShareCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Envelope schema version written on publish
pub const RECORD_SCHEMA_VERSION: &str = "1.0";

/// Largest integer that survives a round trip through an IEEE-754 double
pub const MAX_SAFE_INTEGER: u64 = 9_007_199_254_740_991;

// ============================================================================
// File metadata
// ============================================================================

/// Descriptive metadata published alongside the content id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    pub file_name: String,
    pub file_size: u64,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub is_encrypted: bool,
    /// The short user-facing key, echoed verbatim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryption_key: Option<String>,
    /// Hex-encoded IV
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iv: Option<String>,
    #[serde(default)]
    pub uploader: String,
    /// Milliseconds since the Unix epoch
    #[serde(default)]
    pub upload_time: i64,
    /// Reserved; never enforced
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
}

impl FileMetadata {
    /// Metadata for an unencrypted file uploaded now
    pub fn new(
        file_name: impl Into<String>,
        file_size: u64,
        mime_type: impl Into<String>,
        uploader: impl Into<String>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            file_size,
            mime_type: mime_type.into(),
            is_encrypted: false,
            encryption_key: None,
            iv: None,
            uploader: uploader.into(),
            upload_time: chrono::Utc::now().timestamp_millis(),
            expires_at: None,
        }
    }

    /// Mark as encrypted, recording the key echo and IV
    pub fn encrypted_with(mut self, key: impl Into<String>, iv_hex: impl Into<String>) -> Self {
        self.is_encrypted = true;
        self.encryption_key = Some(key.into());
        self.iv = Some(iv_hex.into());
        self
    }

    /// Upload time as a UTC timestamp, if representable
    pub fn uploaded_at(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        chrono::DateTime::from_timestamp_millis(self.upload_time)
    }
}

// ============================================================================
// Provider hint
// ============================================================================

/// Storage provider observed at upload time, stored as an opaque object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderHint(Value);

impl ProviderHint {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Hint carrying only a retrieval service URL
    pub fn from_service_url(url: impl Into<String>) -> Self {
        Self(serde_json::json!({
            "products": { "PDP": { "data": { "serviceURL": url.into() } } }
        }))
    }

    /// Retrieval base URL recorded in the hint
    pub fn service_url(&self) -> Option<&str> {
        self.0
            .pointer("/products/PDP/data/serviceURL")
            .and_then(Value::as_str)
            .or_else(|| self.0.get("serviceURL").and_then(Value::as_str))
            .filter(|url| !url.is_empty())
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

// ============================================================================
// Envelope
// ============================================================================

/// Published record body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingEnvelope {
    /// Bare lookup key (no scheme)
    pub share_code: String,
    #[serde(default)]
    pub piece_cid: Option<String>,
    pub metadata: FileMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_info: Option<ProviderHint>,
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub version: String,
}

impl MappingEnvelope {
    pub fn new(
        share_code: &ShareCode,
        content_id: &str,
        metadata: FileMetadata,
        provider_hint: Option<ProviderHint>,
    ) -> Self {
        Self {
            share_code: share_code.lookup_key().to_string(),
            piece_cid: Some(content_id.to_string()),
            metadata,
            provider_info: provider_hint,
            timestamp: chrono::Utc::now().timestamp_millis(),
            version: RECORD_SCHEMA_VERSION.to_string(),
        }
    }

    /// Bare lookup key this envelope is indexed under
    pub fn key(&self) -> &str {
        &self.share_code
    }

    /// Content id, if the envelope carries a usable one
    pub fn content_id(&self) -> Option<&str> {
        self.piece_cid.as_deref().filter(|cid| !cid.is_empty())
    }

    /// JSON body ready for publication, with unsafe integers stringified
    pub fn to_publishable_json(&self) -> Result<Value> {
        Ok(to_json_safe(serde_json::to_value(self)?))
    }
}

/// Replace integers outside the double-safe range with their decimal text
pub fn to_json_safe(value: Value) -> Value {
    match value {
        Value::Number(n) => {
            let unsafe_int = match (n.as_u64(), n.as_i64()) {
                (Some(u), _) => u > MAX_SAFE_INTEGER,
                (None, Some(i)) => i.unsigned_abs() > MAX_SAFE_INTEGER,
                _ => false,
            };
            if unsafe_int {
                Value::String(n.to_string())
            } else {
                Value::Number(n)
            }
        }
        Value::Array(items) => Value::Array(items.into_iter().map(to_json_safe).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, to_json_safe(v)))
                .collect(),
        ),
        other => other,
    }
}

// ============================================================================
// Resolved record
// ============================================================================

/// A resolved share-code record
#[derive(Debug, Clone, PartialEq)]
pub struct FileRecord {
    pub share_code: ShareCode,
    pub content_id: String,
    pub metadata: FileMetadata,
    pub provider_hint: Option<ProviderHint>,
    /// Publication time, milliseconds since the Unix epoch
    pub published_at: i64,
}

impl FileRecord {
    /// Build from a looked-up envelope; envelopes without a content id do not count
    pub fn from_envelope(share_code: ShareCode, envelope: MappingEnvelope) -> Result<Self> {
        let content_id = envelope
            .content_id()
            .ok_or_else(|| StoreError::NotFound(share_code.to_string()))?
            .to_string();

        Ok(Self {
            share_code,
            content_id,
            metadata: envelope.metadata,
            provider_hint: envelope.provider_info,
            published_at: envelope.timestamp,
        })
    }

    /// Whether a key is needed to read the content
    pub fn requires_key(&self) -> bool {
        self.metadata.is_encrypted
    }
}

// ============================================================================
// Record id
// ============================================================================

/// Identifier the backing store assigned to a published record
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
