//! Upload authorization signature.
//!
//! The remote API recomputes the same digest to validate a signed upload, so
//! the expiry used here must be the exact value sent in `AuthorizationExpire`.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureParams {
    pub library_id: u64,
    pub video_id: String,
    pub expire_at: DateTime<Utc>,
}

impl SignatureParams {
    pub fn new(library_id: u64, video_id: impl Into<String>, expire_at: DateTime<Utc>) -> Self {
        Self {
            library_id,
            video_id: video_id.into(),
            expire_at,
        }
    }

    /// Expiry as epoch milliseconds, the form used in both digest and header.
    pub fn expire_millis(&self) -> i64 {
        self.expire_at.timestamp_millis()
    }
}

/// SHA-256 of `library_id + access_key + expire_millis + video_id`, lowercase hex.
pub fn create_signature(access_key: &str, params: &SignatureParams) -> String {
    let mut hasher = Sha256::new();
    hasher.update(params.library_id.to_string().as_bytes());
    hasher.update(access_key.as_bytes());
    hasher.update(params.expire_millis().to_string().as_bytes());
    hasher.update(params.video_id.as_bytes());
    hex::encode(hasher.finalize())
}
