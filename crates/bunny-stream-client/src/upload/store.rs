//! Storage for upload records so interrupted transfers can be resumed.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{PreviousUpload, UploadError};

#[async_trait]
pub trait UploadRecordStore: Send + Sync {
    async fn find(&self, fingerprint: &str) -> Result<Vec<PreviousUpload>, UploadError>;

    /// Replaces any record with the same fingerprint.
    async fn save(&self, record: PreviousUpload) -> Result<(), UploadError>;

    async fn remove(&self, fingerprint: &str) -> Result<(), UploadError>;
}

/// Process-local store. Records are lost on exit.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: Mutex<HashMap<String, PreviousUpload>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UploadRecordStore for MemoryRecordStore {
    async fn find(&self, fingerprint: &str) -> Result<Vec<PreviousUpload>, UploadError> {
        let records = self.records.lock().await;
        Ok(records.get(fingerprint).cloned().into_iter().collect())
    }

    async fn save(&self, record: PreviousUpload) -> Result<(), UploadError> {
        let mut records = self.records.lock().await;
        records.insert(record.fingerprint.clone(), record);
        Ok(())
    }

    async fn remove(&self, fingerprint: &str) -> Result<(), UploadError> {
        let mut records = self.records.lock().await;
        records.remove(fingerprint);
        Ok(())
    }
}

/// Store backed by a JSON array on disk, so uploads can resume across runs.
#[derive(Debug)]
pub struct JsonFileRecordStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileRecordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Vec<PreviousUpload>, UploadError> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(UploadError::Store(err.to_string())),
        };
        if raw.is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_slice(&raw).map_err(|err| {
            UploadError::Store(format!("{}: {}", self.path.display(), err))
        })
    }

    async fn persist(&self, records: &[PreviousUpload]) -> Result<(), UploadError> {
        let raw = serde_json::to_vec_pretty(records)
            .map_err(|err| UploadError::Store(err.to_string()))?;
        tokio::fs::write(&self.path, raw)
            .await
            .map_err(|err| UploadError::Store(format!("{}: {}", self.path.display(), err)))
    }
}

#[async_trait]
impl UploadRecordStore for JsonFileRecordStore {
    async fn find(&self, fingerprint: &str) -> Result<Vec<PreviousUpload>, UploadError> {
        let _guard = self.lock.lock().await;
        let records = self.load().await?;
        Ok(records
            .into_iter()
            .filter(|record| record.fingerprint == fingerprint)
            .collect())
    }

    async fn save(&self, record: PreviousUpload) -> Result<(), UploadError> {
        let _guard = self.lock.lock().await;
        let mut records = self.load().await?;
        records.retain(|existing| existing.fingerprint != record.fingerprint);
        records.push(record);
        self.persist(&records).await
    }

    async fn remove(&self, fingerprint: &str) -> Result<(), UploadError> {
        let _guard = self.lock.lock().await;
        let mut records = self.load().await?;
        let before = records.len();
        records.retain(|existing| existing.fingerprint != fingerprint);
        if records.len() == before {
            return Ok(());
        }
        self.persist(&records).await
    }
}
