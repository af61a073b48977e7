//! Signed resumable uploads.
//!
//! An [`UploadJob`] is validated and signed by the [`UploadCoordinator`], then
//! handed to a [`ResumableProtocol`] (tus by default) on a background task.
//! Outcomes are reported through the job callbacks and the [`UploadHandle`].
//!
//! Lifecycle: `Idle -> LookupPrevious -> (Resuming | Starting) -> Transferring
//! -> (Succeeded | Failed)`.

pub mod coordinator;
pub mod protocol;
pub mod store;
pub mod tus;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use bunny_stream_core::ConfigError;
use bytes::Bytes;
use sha2::{Digest, Sha256};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub use coordinator::UploadCoordinator;
pub use protocol::{PreviousUpload, ProgressReporter, ResumableProtocol, TransferSession};
pub use store::{JsonFileRecordStore, MemoryRecordStore, UploadRecordStore};
pub use tus::TusProtocol;

/// Signature validity window when the job does not set one.
pub const DEFAULT_EXPIRE_TIME: Duration = Duration::from_secs(24 * 60 * 60);

/// Backoff applied between attempts after a transient failure.
pub fn default_retry_delays() -> Vec<Duration> {
    [0, 3_000, 5_000, 10_000, 20_000, 60_000, 60_000]
        .into_iter()
        .map(Duration::from_millis)
        .collect()
}

pub type ErrorCallback = Arc<dyn Fn(&UploadError) + Send + Sync>;
pub type ProgressCallback = Arc<dyn Fn(u64, u64) + Send + Sync>;
pub type SuccessCallback = Arc<dyn Fn() + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Invalid upload job: {0}")]
    InvalidJob(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to look up previous uploads: {0}")]
    Lookup(String),

    #[error("Failed to read upload source: {0}")]
    Source(#[from] std::io::Error),

    #[error("Upload rejected with status {status}")]
    Rejected { status: u16 },

    #[error("Unexpected upload server response: {0}")]
    Protocol(String),

    #[error("Upload record store failed: {0}")]
    Store(String),

    #[error("Upload failed after {attempts} attempts: {reason}")]
    RetriesExhausted { attempts: usize, reason: String },
}

/// Bytes to upload.
#[derive(Clone)]
pub enum UploadSource {
    Path(PathBuf),
    Bytes(Bytes),
}

impl fmt::Debug for UploadSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadSource::Path(path) => f.debug_tuple("Path").field(path).finish(),
            UploadSource::Bytes(data) => write!(f, "Bytes({} bytes)", data.len()),
        }
    }
}

impl UploadSource {
    pub async fn len(&self) -> Result<u64, UploadError> {
        match self {
            UploadSource::Path(path) => Ok(tokio::fs::metadata(path).await?.len()),
            UploadSource::Bytes(data) => Ok(data.len() as u64),
        }
    }

    /// Read `[start, end)`.
    pub async fn read_range(&self, start: u64, end: u64) -> Result<Bytes, UploadError> {
        match self {
            UploadSource::Path(path) => {
                let mut file = tokio::fs::File::open(path).await?;
                file.seek(std::io::SeekFrom::Start(start)).await?;
                let mut buffer = vec![0u8; (end - start) as usize];
                file.read_exact(&mut buffer).await?;
                Ok(Bytes::from(buffer))
            }
            UploadSource::Bytes(data) => Ok(data.slice(start as usize..end as usize)),
        }
    }

    /// Stable identity of the content, used to find interrupted uploads.
    pub async fn identity(&self) -> Result<String, UploadError> {
        match self {
            UploadSource::Path(path) => {
                let metadata = tokio::fs::metadata(path).await?;
                let modified = metadata
                    .modified()
                    .ok()
                    .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
                    .map(|d| d.as_millis())
                    .unwrap_or_default();
                let canonical = tokio::fs::canonicalize(path)
                    .await
                    .unwrap_or_else(|_| path.clone());
                Ok(format!(
                    "file-{}-{}-{}",
                    canonical.display(),
                    metadata.len(),
                    modified
                ))
            }
            UploadSource::Bytes(data) => Ok(format!(
                "bytes-{}-{}",
                data.len(),
                hex::encode(Sha256::digest(data))
            )),
        }
    }
}

/// Descriptive metadata sent with the upload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadMetadata {
    pub filetype: String,
    pub title: String,
    pub collection: Option<String>,
    pub thumbnail_time: Option<u64>,
}

impl UploadMetadata {
    pub fn new(filetype: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            filetype: filetype.into(),
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = Some(collection.into());
        self
    }

    pub fn thumbnail_time(mut self, seconds: u64) -> Self {
        self.thumbnail_time = Some(seconds);
        self
    }

    /// Wire pairs; optional fields are sent as empty strings.
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        vec![
            ("filetype".to_string(), self.filetype.clone()),
            ("title".to_string(), self.title.clone()),
            (
                "collection".to_string(),
                self.collection.clone().unwrap_or_default(),
            ),
            (
                "thumbnailTime".to_string(),
                self.thumbnail_time
                    .map(|t| t.to_string())
                    .unwrap_or_default(),
            ),
        ]
    }
}

/// A single upload request. Consumed by the coordinator.
pub struct UploadJob {
    pub source: UploadSource,
    pub video_id: String,
    pub library_id: Option<u64>,
    pub metadata: UploadMetadata,
    pub expire_time: Option<Duration>,
    pub retry_delays: Option<Vec<Duration>>,
    pub on_error: Option<ErrorCallback>,
    pub on_progress: Option<ProgressCallback>,
    pub on_success: Option<SuccessCallback>,
}

impl fmt::Debug for UploadJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadJob")
            .field("source", &self.source)
            .field("video_id", &self.video_id)
            .field("library_id", &self.library_id)
            .field("metadata", &self.metadata)
            .field("expire_time", &self.expire_time)
            .field("retry_delays", &self.retry_delays)
            .finish_non_exhaustive()
    }
}

impl UploadJob {
    pub fn new(video_id: impl Into<String>, source: UploadSource, metadata: UploadMetadata) -> Self {
        Self {
            source,
            video_id: video_id.into(),
            library_id: None,
            metadata,
            expire_time: None,
            retry_delays: None,
            on_error: None,
            on_progress: None,
            on_success: None,
        }
    }

    pub fn library_id(mut self, library_id: u64) -> Self {
        self.library_id = Some(library_id);
        self
    }

    pub fn expire_time(mut self, expire_time: Duration) -> Self {
        self.expire_time = Some(expire_time);
        self
    }

    pub fn retry_delays(mut self, delays: Vec<Duration>) -> Self {
        self.retry_delays = Some(delays);
        self
    }

    pub fn on_error(mut self, callback: impl Fn(&UploadError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(callback));
        self
    }

    pub fn on_progress(mut self, callback: impl Fn(u64, u64) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Arc::new(callback));
        self
    }

    pub fn on_success(mut self, callback: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_success = Some(Arc::new(callback));
        self
    }

    /// Checks required fields without touching the network.
    pub fn validate(&self) -> Result<u64, UploadError> {
        if self.video_id.trim().is_empty() {
            return Err(UploadError::InvalidJob("video_id is required".to_string()));
        }
        if self.metadata.filetype.trim().is_empty() {
            return Err(UploadError::InvalidJob(
                "metadata.filetype is required".to_string(),
            ));
        }
        if self.metadata.title.trim().is_empty() {
            return Err(UploadError::InvalidJob(
                "metadata.title is required".to_string(),
            ));
        }
        self.library_id
            .ok_or(UploadError::Config(ConfigError::MissingLibraryId))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadState {
    Idle,
    LookupPrevious,
    Resuming,
    Starting,
    Transferring,
    Succeeded,
    Failed,
}

impl UploadState {
    pub fn is_terminal(self) -> bool {
        matches!(self, UploadState::Succeeded | UploadState::Failed)
    }
}

/// Handle to an in-flight upload.
///
/// Dropping the handle detaches the upload; [`UploadHandle::abort`] stops it
/// and no callback fires afterwards.
#[derive(Debug)]
pub struct UploadHandle {
    state: watch::Receiver<UploadState>,
    task: JoinHandle<()>,
}

impl UploadHandle {
    pub(crate) fn new(state: watch::Receiver<UploadState>, task: JoinHandle<()>) -> Self {
        Self { state, task }
    }

    pub fn state(&self) -> UploadState {
        *self.state.borrow()
    }

    /// Wait for a terminal state. An aborted upload reports `Failed`.
    pub async fn wait(mut self) -> UploadState {
        let outcome = self
            .state
            .wait_for(|state| state.is_terminal())
            .await
            .map(|state| *state);

        match outcome {
            Ok(state) => state,
            Err(_) => {
                // Sender dropped without a terminal state: the task was aborted.
                let last = *self.state.borrow();
                if last.is_terminal() {
                    last
                } else {
                    UploadState::Failed
                }
            }
        }
    }

    pub fn abort(&self) {
        self.task.abort();
    }
}
