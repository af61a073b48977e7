//! One narrow trait per HTTP verb, plus upload and default-library access.
//!
//! Resource facades depend only on the capabilities they use, so tests can
//! substitute a recording client.

use async_trait::async_trait;
use bunny_stream_core::ResponseEnvelope;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::upload::{UploadError, UploadHandle, UploadJob};

pub const ACCEPT: &str = "accept";
pub const CONTENT_TYPE: &str = "content-type";
pub const JSON: &str = "application/json";
pub const ANY_JSON: &str = "application/*+json";

/// Per-call headers and data. `data` becomes query parameters for GET and
/// DELETE, and the JSON body for POST and PUT.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOptions {
    pub headers: Vec<(String, String)>,
    pub data: Option<Value>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// `accept: application/json`
    pub fn read() -> Self {
        Self::new().header(ACCEPT, JSON)
    }

    /// `accept: application/json`, `content-type: application/*+json`
    pub fn write() -> Self {
        Self::read().header(CONTENT_TYPE, ANY_JSON)
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

#[async_trait]
pub trait GetClient: Send + Sync {
    async fn get<T: DeserializeOwned + Send>(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> ResponseEnvelope<T>;
}

#[async_trait]
pub trait PostClient: Send + Sync {
    async fn post<T: DeserializeOwned + Send>(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> ResponseEnvelope<T>;
}

#[async_trait]
pub trait PutClient: Send + Sync {
    async fn put<T: DeserializeOwned + Send>(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> ResponseEnvelope<T>;
}

#[async_trait]
pub trait DeleteClient: Send + Sync {
    async fn delete<T: DeserializeOwned + Send>(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> ResponseEnvelope<T>;
}

#[async_trait]
pub trait UploadClient: Send + Sync {
    /// Fails only for malformed jobs; transfer outcomes go to the job callbacks.
    async fn upload(&self, job: UploadJob) -> Result<UploadHandle, UploadError>;
}

/// Access to the client-wide default library, if one is configured.
pub trait LibraryIdClient {
    fn default_library_id(&self) -> Option<u64>;
}
