//! Narrow interface to the resumable-transfer layer.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{ProgressCallback, UploadError, UploadSource};

/// Persisted record of an upload that was created but may not have finished.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviousUpload {
    pub fingerprint: String,
    pub upload_url: String,
    pub size: u64,
    pub created_at: DateTime<Utc>,
}

/// Everything the protocol needs for one transfer. Headers and metadata are
/// already signed and final.
#[derive(Debug, Clone)]
pub struct TransferSession {
    pub video_id: String,
    pub headers: Vec<(String, String)>,
    pub metadata: Vec<(String, String)>,
    pub source: UploadSource,
    pub retry_delays: Vec<Duration>,
    pub previous: Option<PreviousUpload>,
}

impl TransferSession {
    pub fn resume_from(mut self, previous: PreviousUpload) -> Self {
        self.previous = Some(previous);
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Forwards chunk-boundary progress to the job callback, if any.
#[derive(Clone, Default)]
pub struct ProgressReporter {
    callback: Option<ProgressCallback>,
}

impl ProgressReporter {
    pub fn new(callback: Option<ProgressCallback>) -> Self {
        Self { callback }
    }

    pub fn report(&self, bytes_uploaded: u64, bytes_total: u64) {
        if let Some(callback) = &self.callback {
            callback(bytes_uploaded, bytes_total);
        }
    }
}

#[async_trait]
pub trait ResumableProtocol: Send + Sync {
    /// Uploads of the same content that were started and not completed.
    async fn find_previous_uploads(
        &self,
        session: &TransferSession,
    ) -> Result<Vec<PreviousUpload>, UploadError>;

    /// Run the transfer to completion, resuming from `session.previous` when set.
    /// Transient failures are retried along `session.retry_delays`.
    async fn start(
        &self,
        session: TransferSession,
        progress: &ProgressReporter,
    ) -> Result<(), UploadError>;
}
