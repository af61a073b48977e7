//! Error types module
//!
//! Construction-time problems are reported as [`ConfigError`]. Per-request
//! problems never surface as errors from the client; they are carried inside a
//! [`crate::ResponseEnvelope`]. [`RequestFailed`] exists for callers that want
//! to turn a failure envelope back into a `Result` with `?`.

use crate::envelope::ErrorOrigin;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing base URL. Pass it explicitly or set BUNNY_STREAM_BASE_URL")]
    MissingBaseUrl,

    #[error("Missing access key. Pass it explicitly or set BUNNY_STREAM_ACCESS_KEY")]
    MissingAccessKey,

    #[error("Library ID is required. Pass it per call or configure a client default (BUNNY_STREAM_LIBRARY_ID)")]
    MissingLibraryId,

    #[error("Invalid library ID {value:?}: expected an unsigned integer")]
    InvalidLibraryId { value: String },
}

/// A failure envelope converted into an error value.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Request failed with status {status_code}: {message}")]
pub struct RequestFailed {
    pub status_code: u16,
    pub message: String,
    pub origin: ErrorOrigin,
}
