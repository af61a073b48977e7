//! Test doubles for the transport, the upload protocol and the capability traits.

use std::sync::Mutex;

use async_trait::async_trait;
use bunny_stream_core::ResponseEnvelope;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::watch;

use crate::capability::{
    DeleteClient, GetClient, LibraryIdClient, PostClient, PutClient, RequestOptions, UploadClient,
};
use crate::normalize::normalize;
use crate::transport::{Method, PreparedRequest, RawResponse, Transport, TransportError};
use crate::upload::{
    PreviousUpload, ProgressReporter, ResumableProtocol, TransferSession, UploadError,
    UploadHandle, UploadJob, UploadMetadata, UploadState,
};

/// Canned transport outcome.
#[derive(Debug, Clone)]
pub enum Scripted {
    Respond { status: u16, body: String },
    Fail(String),
}

impl Scripted {
    pub fn status(status: u16, body: &str) -> Self {
        Self::Respond {
            status,
            body: body.to_string(),
        }
    }
}

/// Transport that records every request and answers with a script.
pub struct RecordingTransport {
    script: Scripted,
    requests: Mutex<Vec<PreparedRequest>>,
}

impl RecordingTransport {
    pub fn new(script: Scripted) -> Self {
        Self {
            script,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn last_request(&self) -> PreparedRequest {
        self.requests
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no request was sent")
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(&self, request: PreparedRequest) -> Result<RawResponse, TransportError> {
        self.requests.lock().unwrap().push(request);
        match &self.script {
            Scripted::Respond { status, body } => Ok(RawResponse::new(*status, body.clone())),
            Scripted::Fail(reason) => Err(TransportError::Unavailable(reason.clone())),
        }
    }
}

/// Protocol that finds nothing and completes immediately.
pub struct NoopProtocol;

#[async_trait]
impl ResumableProtocol for NoopProtocol {
    async fn find_previous_uploads(
        &self,
        _session: &TransferSession,
    ) -> Result<Vec<PreviousUpload>, UploadError> {
        Ok(Vec::new())
    }

    async fn start(
        &self,
        _session: TransferSession,
        _progress: &ProgressReporter,
    ) -> Result<(), UploadError> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub method: Method,
    pub endpoint: String,
    pub options: RequestOptions,
}

impl RecordedCall {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.options
            .headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedUpload {
    pub video_id: String,
    pub library_id: Option<u64>,
    pub metadata: UploadMetadata,
}

/// Capability client that records calls and answers every one with the same
/// status and JSON body.
pub struct RecordingClient {
    status: u16,
    body: Value,
    default_library_id: Option<u64>,
    calls: Mutex<Vec<RecordedCall>>,
    uploads: Mutex<Vec<RecordedUpload>>,
}

impl RecordingClient {
    pub fn new(default_library_id: Option<u64>) -> Self {
        Self::responding(default_library_id, 200, serde_json::json!({}))
    }

    pub fn responding(default_library_id: Option<u64>, status: u16, body: Value) -> Self {
        Self {
            status,
            body,
            default_library_id,
            calls: Mutex::new(Vec::new()),
            uploads: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn last_call(&self) -> RecordedCall {
        self.calls().pop().expect("no call was made")
    }

    pub fn uploads(&self) -> Vec<RecordedUpload> {
        self.uploads.lock().unwrap().clone()
    }

    fn answer<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        options: RequestOptions,
    ) -> ResponseEnvelope<T> {
        self.calls.lock().unwrap().push(RecordedCall {
            method,
            endpoint: endpoint.to_string(),
            options,
        });
        normalize(Ok(RawResponse::json(self.status, &self.body)))
    }
}

#[async_trait]
impl GetClient for RecordingClient {
    async fn get<T: DeserializeOwned + Send>(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> ResponseEnvelope<T> {
        self.answer(Method::Get, endpoint, options)
    }
}

#[async_trait]
impl PostClient for RecordingClient {
    async fn post<T: DeserializeOwned + Send>(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> ResponseEnvelope<T> {
        self.answer(Method::Post, endpoint, options)
    }
}

#[async_trait]
impl PutClient for RecordingClient {
    async fn put<T: DeserializeOwned + Send>(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> ResponseEnvelope<T> {
        self.answer(Method::Put, endpoint, options)
    }
}

#[async_trait]
impl DeleteClient for RecordingClient {
    async fn delete<T: DeserializeOwned + Send>(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> ResponseEnvelope<T> {
        self.answer(Method::Delete, endpoint, options)
    }
}

#[async_trait]
impl UploadClient for RecordingClient {
    async fn upload(&self, job: UploadJob) -> Result<UploadHandle, UploadError> {
        job.validate()?;
        self.uploads.lock().unwrap().push(RecordedUpload {
            video_id: job.video_id.clone(),
            library_id: job.library_id,
            metadata: job.metadata.clone(),
        });

        let (state, receiver) = watch::channel(UploadState::Idle);
        let task = tokio::spawn(async move {
            let _ = state.send(UploadState::Succeeded);
        });
        Ok(UploadHandle::new(receiver, task))
    }
}

impl LibraryIdClient for RecordingClient {
    fn default_library_id(&self) -> Option<u64> {
        self.default_library_id
    }
}
