//! HTTP client for the Bunny Stream API.
//!
//! [`ApiClient`] dispatches requests with the `AccessKey` header, routes
//! `data` to the query string or body depending on the verb, and returns a
//! [`ResponseEnvelope`] for every outcome. Uploads are signed and handed to a
//! resumable protocol (tus). The [`stream`] module exposes the per-resource
//! facades built on top.

pub mod capability;
pub mod error;
pub mod normalize;
pub mod signature;
pub mod stream;
pub mod transport;
pub mod upload;

#[cfg(test)]
pub(crate) mod test_helpers;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bunny_stream_core::config::HTTP_TIMEOUT_SECS;
use bunny_stream_core::{ClientConfig, ClientOptions, StreamSettings};
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::normalize::normalize;
use crate::transport::{PreparedRequest, ReqwestTransport, Transport};
use crate::upload::{
    MemoryRecordStore, ResumableProtocol, TusProtocol, UploadCoordinator, UploadError,
    UploadHandle, UploadJob, UploadRecordStore,
};

pub use capability::{
    DeleteClient, GetClient, LibraryIdClient, PostClient, PutClient, RequestOptions, UploadClient,
};
pub use error::ClientError;
pub use signature::{create_signature, SignatureParams};
pub use stream::{BunnyStreamClient, Collections, Videos};
pub use transport::Method;

pub use bunny_stream_core::models;
pub use bunny_stream_core::{
    ConfigError, ErrorDetails, ErrorOrigin, ErrorPayload, RequestFailed, ResponseEnvelope,
};

/// Header carrying the library access key on every request.
pub const ACCESS_KEY_HEADER: &str = "AccessKey";

/// Request dispatcher for the remote API.
#[derive(Clone)]
pub struct ApiClient {
    config: Arc<ClientConfig>,
    transport: Arc<dyn Transport>,
    uploads: UploadCoordinator,
    default_library_id: Option<u64>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("config", &self.config)
            .field("default_library_id", &self.default_library_id)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        Self::from_settings(StreamSettings {
            config,
            default_library_id: None,
            timeout: Duration::from_secs(HTTP_TIMEOUT_SECS),
        })
    }

    /// Create client from environment: BUNNY_STREAM_BASE_URL,
    /// BUNNY_STREAM_ACCESS_KEY, BUNNY_STREAM_LIBRARY_ID.
    pub fn from_env() -> Result<Self, ClientError> {
        Self::from_settings(ClientOptions::new().resolve()?)
    }

    /// Uploads resume only within this process.
    pub fn from_settings(settings: StreamSettings) -> Result<Self, ClientError> {
        Self::from_settings_with_store(settings, Arc::new(MemoryRecordStore::new()))
    }

    /// Uploads are recorded in `store` so they can resume after a restart.
    pub fn from_settings_with_store(
        settings: StreamSettings,
        store: Arc<dyn UploadRecordStore>,
    ) -> Result<Self, ClientError> {
        let transport = ReqwestTransport::new(settings.timeout).map_err(ClientError::HttpClient)?;

        // Chunk transfers can outlast the request timeout; only bound connecting.
        let upload_http = Client::builder()
            .connect_timeout(settings.timeout)
            .build()
            .map_err(ClientError::HttpClient)?;

        let client = Self::with_parts(
            settings.config,
            Arc::new(transport),
            Arc::new(TusProtocol::new(upload_http, store)),
        );
        Ok(client.with_default_library_id(settings.default_library_id))
    }

    /// Assemble a client from explicit transport and upload protocol.
    pub fn with_parts(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
        protocol: Arc<dyn ResumableProtocol>,
    ) -> Self {
        let config = Arc::new(config);
        Self {
            uploads: UploadCoordinator::new(config.clone(), protocol),
            config,
            transport,
            default_library_id: None,
        }
    }

    pub fn with_default_library_id(mut self, library_id: Option<u64>) -> Self {
        self.default_library_id = library_id;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn base_url(&self) -> &str {
        self.config.base_url()
    }

    pub fn build_url(&self, endpoint: &str) -> String {
        self.config.build_url(endpoint)
    }

    /// Signature for an upload of `video_id` expiring at `expire_at`.
    pub fn create_signature(
        &self,
        library_id: u64,
        video_id: &str,
        expire_at: DateTime<Utc>,
    ) -> String {
        create_signature(
            self.config.access_key(),
            &SignatureParams::new(library_id, video_id, expire_at),
        )
    }

    /// Build the wire request without sending it.
    pub fn prepare(
        &self,
        endpoint: &str,
        method: Method,
        options: RequestOptions,
    ) -> PreparedRequest {
        let mut headers: Vec<(String, String)> = options
            .headers
            .into_iter()
            .filter(|(name, _)| !name.eq_ignore_ascii_case(ACCESS_KEY_HEADER))
            .collect();
        headers.push((
            ACCESS_KEY_HEADER.to_string(),
            self.config.access_key().to_string(),
        ));

        let (query, body) = match options.data {
            Some(data) if method.carries_body() => (Vec::new(), Some(data)),
            Some(data) => (query_pairs(&data), None),
            None => (Vec::new(), None),
        };

        PreparedRequest {
            method,
            url: self.build_url(endpoint),
            headers,
            query,
            body,
        }
    }

    /// Send one request and normalize the outcome. Never retries.
    pub async fn request<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        method: Method,
        options: RequestOptions,
    ) -> ResponseEnvelope<T> {
        let request = self.prepare(endpoint, method, options);
        tracing::debug!(
            method = method.as_str(),
            endpoint = %endpoint,
            query_params = request.query.len(),
            has_body = request.body.is_some(),
            "Dispatching request"
        );

        let envelope = normalize(self.transport.send(request).await);
        tracing::debug!(
            method = method.as_str(),
            endpoint = %endpoint,
            status = envelope.status_code(),
            success = envelope.is_success(),
            "Request finished"
        );
        envelope
    }
}

/// Flatten an object into query pairs. Nulls are skipped; strings are sent
/// verbatim and other values as their JSON text.
fn query_pairs(data: &Value) -> Vec<(String, String)> {
    let Some(object) = data.as_object() else {
        tracing::warn!("Ignoring non-object query data");
        return Vec::new();
    };

    object
        .iter()
        .filter(|(_, value)| !value.is_null())
        .map(|(key, value)| {
            let value = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (key.clone(), value)
        })
        .collect()
}

#[async_trait]
impl GetClient for ApiClient {
    async fn get<T: DeserializeOwned + Send>(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> ResponseEnvelope<T> {
        self.request(endpoint, Method::Get, options).await
    }
}

#[async_trait]
impl PostClient for ApiClient {
    async fn post<T: DeserializeOwned + Send>(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> ResponseEnvelope<T> {
        self.request(endpoint, Method::Post, options).await
    }
}

#[async_trait]
impl PutClient for ApiClient {
    async fn put<T: DeserializeOwned + Send>(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> ResponseEnvelope<T> {
        self.request(endpoint, Method::Put, options).await
    }
}

#[async_trait]
impl DeleteClient for ApiClient {
    async fn delete<T: DeserializeOwned + Send>(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> ResponseEnvelope<T> {
        self.request(endpoint, Method::Delete, options).await
    }
}

#[async_trait]
impl UploadClient for ApiClient {
    async fn upload(&self, job: UploadJob) -> Result<UploadHandle, UploadError> {
        self.uploads.upload(job)
    }
}

impl LibraryIdClient for ApiClient {
    fn default_library_id(&self) -> Option<u64> {
        self.default_library_id
    }
}
