//! Progress reporting
//!
//! Percentages only move forward within a run. A failure resets them to zero.

use crate::network::{DataSetInfo, ProviderInfo};
use std::fmt;

/// Upload state machine stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UploadStage {
    Init,
    Encrypting,
    PreflightChecked,
    ProviderNegotiating,
    Uploading,
    PieceConfirmed,
    DatasetConfirming,
    MetadataPublishing,
    Done,
    Failed,
}

impl UploadStage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

impl fmt::Display for UploadStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::Encrypting => "encrypting",
            Self::PreflightChecked => "preflight",
            Self::ProviderNegotiating => "negotiating",
            Self::Uploading => "uploading",
            Self::PieceConfirmed => "piece-confirmed",
            Self::DatasetConfirming => "dataset-confirming",
            Self::MetadataPublishing => "publishing",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Download stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DownloadStage {
    Validating,
    Resolving,
    Fetching,
    Decrypting,
    Done,
    Failed,
}

impl DownloadStage {
    /// Fixed percentage reported on entering the stage
    pub fn percent(&self) -> u8 {
        match self {
            Self::Validating | Self::Failed => 0,
            Self::Resolving => 20,
            Self::Fetching => 40,
            Self::Decrypting => 70,
            Self::Done => 100,
        }
    }
}

/// Progress update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressUpdate<S = UploadStage> {
    pub stage: S,
    pub percent: u8,
    pub message: String,
}

/// Transient state of one upload run
#[derive(Debug, Clone)]
pub struct UploadSession {
    stage: UploadStage,
    percent: u8,
    status: String,
    /// Set by the provider-selected checkpoint
    pub selected_provider: Option<ProviderInfo>,
    pub data_set: Option<DataSetInfo>,
    pub content_id: Option<String>,
    pub tx_hash: Option<String>,
}

impl UploadSession {
    pub fn new() -> Self {
        Self {
            stage: UploadStage::Init,
            percent: 0,
            status: String::new(),
            selected_provider: None,
            data_set: None,
            content_id: None,
            tx_hash: None,
        }
    }

    /// Enter `stage`; the percentage never drops below what was already reported
    pub fn advance(
        &mut self,
        stage: UploadStage,
        percent: u8,
        message: impl Into<String>,
    ) -> ProgressUpdate {
        self.stage = stage;
        self.percent = self.percent.max(percent.min(100));
        self.status = message.into();
        self.snapshot()
    }

    /// Replace the status text without moving stage or percentage
    pub fn note(&mut self, message: impl Into<String>) -> ProgressUpdate {
        self.status = message.into();
        self.snapshot()
    }

    /// Terminal failure: progress resets to zero and partial results are dropped
    pub fn fail(&mut self, message: impl Into<String>) -> ProgressUpdate {
        self.stage = UploadStage::Failed;
        self.percent = 0;
        self.status = message.into();
        self.selected_provider = None;
        self.data_set = None;
        self.content_id = None;
        self.tx_hash = None;
        self.snapshot()
    }

    /// Back to a fresh session
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn stage(&self) -> UploadStage {
        self.stage
    }

    pub fn percent(&self) -> u8 {
        self.percent
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    fn snapshot(&self) -> ProgressUpdate {
        ProgressUpdate {
            stage: self.stage,
            percent: self.percent,
            message: self.status.clone(),
        }
    }
}

impl Default for UploadSession {
    fn default() -> Self {
        Self::new()
    }
}
