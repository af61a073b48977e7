//! tus 1.0.0 resumable upload protocol over reqwest.
//!
//! Creation (POST), offset discovery (HEAD) and chunked PATCH. Transient
//! failures (transport errors, 5xx, 409, 423) are retried along the session's
//! delay sequence; the offset is re-synchronized with HEAD before continuing.

use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use chrono::Utc;
use reqwest::header::{HeaderMap, CONTENT_TYPE, LOCATION};
use reqwest::{Client, RequestBuilder, StatusCode, Url};

use super::protocol::{PreviousUpload, ProgressReporter, ResumableProtocol, TransferSession};
use super::store::UploadRecordStore;
use super::UploadError;

pub const TUS_ENDPOINT: &str = "https://video.bunnycdn.com/tusupload";
pub const TUS_VERSION: &str = "1.0.0";
pub const DEFAULT_CHUNK_SIZE: u64 = 50 * 1024 * 1024;

const TUS_RESUMABLE: &str = "Tus-Resumable";
const UPLOAD_LENGTH: &str = "Upload-Length";
const UPLOAD_METADATA: &str = "Upload-Metadata";
const UPLOAD_OFFSET: &str = "Upload-Offset";
const OFFSET_CONTENT_TYPE: &str = "application/offset+octet-stream";

pub struct TusProtocol {
    client: Client,
    endpoint: String,
    store: Arc<dyn UploadRecordStore>,
    chunk_size: u64,
}

impl std::fmt::Debug for TusProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TusProtocol")
            .field("endpoint", &self.endpoint)
            .field("chunk_size", &self.chunk_size)
            .finish()
    }
}

/// Outcome of a single attempt.
enum Attempt {
    Transient(String),
    Fatal(UploadError),
}

impl From<UploadError> for Attempt {
    fn from(err: UploadError) -> Self {
        Attempt::Fatal(err)
    }
}

impl From<reqwest::Error> for Attempt {
    fn from(err: reqwest::Error) -> Self {
        Attempt::Transient(err.to_string())
    }
}

/// Where the transfer stands between attempts.
struct Cursor {
    upload_url: Option<String>,
    offset: u64,
}

impl TusProtocol {
    pub fn new(client: Client, store: Arc<dyn UploadRecordStore>) -> Self {
        Self {
            client,
            endpoint: TUS_ENDPOINT.to_string(),
            store,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: u64) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Key under which an upload of this content to this endpoint is recorded.
    pub async fn fingerprint(&self, session: &TransferSession) -> Result<String, UploadError> {
        Ok(format!(
            "tus::{}::{}::{}",
            self.endpoint,
            session.video_id,
            session.source.identity().await?
        ))
    }

    async fn transfer(
        &self,
        session: &TransferSession,
        fingerprint: &str,
        total: u64,
        cursor: &mut Cursor,
        progress: &ProgressReporter,
    ) -> Result<(), Attempt> {
        let upload_url = match cursor.upload_url.clone() {
            Some(url) => match self.fetch_offset(&url, session).await? {
                Some(offset) if offset > total => {
                    return Err(Attempt::Fatal(UploadError::Protocol(format!(
                        "server reported offset {} beyond upload length {}",
                        offset, total
                    ))));
                }
                Some(offset) => {
                    cursor.offset = offset;
                    url
                }
                None => {
                    tracing::info!(
                        video_id = %session.video_id,
                        upload_url = %url,
                        "Previous upload is no longer available, starting over"
                    );
                    self.store.remove(fingerprint).await?;
                    cursor.upload_url = None;
                    self.create(session, fingerprint, total, cursor).await?
                }
            },
            None => self.create(session, fingerprint, total, cursor).await?,
        };

        if cursor.offset >= total {
            progress.report(total, total);
            return Ok(());
        }

        while cursor.offset < total {
            let end = (cursor.offset + self.chunk_size).min(total);
            let chunk = session.source.read_range(cursor.offset, end).await?;
            let new_offset = self
                .patch(&upload_url, session, cursor.offset, chunk)
                .await?;

            if new_offset <= cursor.offset || new_offset > total {
                return Err(Attempt::Fatal(UploadError::Protocol(format!(
                    "server reported offset {} after sending bytes {}..{}",
                    new_offset, cursor.offset, end
                ))));
            }

            cursor.offset = new_offset;
            progress.report(new_offset, total);
        }

        Ok(())
    }

    async fn create(
        &self,
        session: &TransferSession,
        fingerprint: &str,
        total: u64,
        cursor: &mut Cursor,
    ) -> Result<String, Attempt> {
        let request = self
            .client
            .post(&self.endpoint)
            .header(TUS_RESUMABLE, TUS_VERSION)
            .header(UPLOAD_LENGTH, total.to_string())
            .header(UPLOAD_METADATA, encode_metadata(&session.metadata));

        let response = apply_headers(request, &session.headers).send().await?;
        check_status(response.status(), "creation")?;

        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| {
                Attempt::Fatal(UploadError::Protocol(
                    "creation response has no Location header".to_string(),
                ))
            })?;
        let upload_url = resolve_location(&self.endpoint, location)?;

        self.store
            .save(PreviousUpload {
                fingerprint: fingerprint.to_string(),
                upload_url: upload_url.clone(),
                size: total,
                created_at: Utc::now(),
            })
            .await?;

        tracing::info!(
            video_id = %session.video_id,
            upload_url = %upload_url,
            size = total,
            "Created resumable upload"
        );

        cursor.upload_url = Some(upload_url.clone());
        cursor.offset = 0;
        Ok(upload_url)
    }

    /// `None` when the server no longer knows the upload.
    async fn fetch_offset(
        &self,
        upload_url: &str,
        session: &TransferSession,
    ) -> Result<Option<u64>, Attempt> {
        let request = self
            .client
            .head(upload_url)
            .header(TUS_RESUMABLE, TUS_VERSION);
        let response = apply_headers(request, &session.headers).send().await?;
        let status = response.status();

        if status.is_success() {
            return parse_offset(response.headers()).map(Some);
        }
        if is_transient(status) {
            return Err(Attempt::Transient(format!(
                "offset lookup returned {}",
                status
            )));
        }
        Ok(None)
    }

    async fn patch(
        &self,
        upload_url: &str,
        session: &TransferSession,
        offset: u64,
        chunk: Bytes,
    ) -> Result<u64, Attempt> {
        let request = self
            .client
            .patch(upload_url)
            .header(TUS_RESUMABLE, TUS_VERSION)
            .header(UPLOAD_OFFSET, offset.to_string())
            .header(CONTENT_TYPE, OFFSET_CONTENT_TYPE);

        let response = apply_headers(request, &session.headers)
            .body(chunk)
            .send()
            .await?;
        check_status(response.status(), "chunk upload")?;
        parse_offset(response.headers())
    }
}

#[async_trait]
impl ResumableProtocol for TusProtocol {
    async fn find_previous_uploads(
        &self,
        session: &TransferSession,
    ) -> Result<Vec<PreviousUpload>, UploadError> {
        let fingerprint = self
            .fingerprint(session)
            .await
            .map_err(|err| UploadError::Lookup(err.to_string()))?;
        self.store
            .find(&fingerprint)
            .await
            .map_err(|err| UploadError::Lookup(err.to_string()))
    }

    async fn start(
        &self,
        session: TransferSession,
        progress: &ProgressReporter,
    ) -> Result<(), UploadError> {
        let total = session.source.len().await?;
        let fingerprint = self.fingerprint(&session).await?;
        let mut cursor = Cursor {
            upload_url: session
                .previous
                .as_ref()
                .map(|previous| previous.upload_url.clone()),
            offset: 0,
        };
        let mut attempt = 0usize;

        loop {
            let offset_before = cursor.offset;
            match self
                .transfer(&session, &fingerprint, total, &mut cursor, progress)
                .await
            {
                Ok(()) => break,
                Err(Attempt::Fatal(err)) => return Err(err),
                Err(Attempt::Transient(reason)) => {
                    // Progress since the last failure earns a fresh delay sequence.
                    if cursor.offset > offset_before {
                        attempt = 0;
                    }
                    let Some(delay) = session.retry_delays.get(attempt).copied() else {
                        return Err(UploadError::RetriesExhausted {
                            attempts: attempt + 1,
                            reason,
                        });
                    };
                    attempt += 1;
                    tracing::warn!(
                        video_id = %session.video_id,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        reason = %reason,
                        "Upload attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }

        if let Err(err) = self.store.remove(&fingerprint).await {
            tracing::warn!(
                video_id = %session.video_id,
                error = %err,
                "Failed to remove completed upload record"
            );
        }

        Ok(())
    }
}

fn apply_headers(mut request: RequestBuilder, headers: &[(String, String)]) -> RequestBuilder {
    for (name, value) in headers {
        request = request.header(name.as_str(), value.as_str());
    }
    request
}

/// Retry unless the server rejected the request itself (4xx other than 409/423).
fn is_transient(status: StatusCode) -> bool {
    !status.is_client_error()
        || status == StatusCode::CONFLICT
        || status == StatusCode::LOCKED
}

fn check_status(status: StatusCode, stage: &str) -> Result<(), Attempt> {
    if status.is_success() {
        Ok(())
    } else if is_transient(status) {
        Err(Attempt::Transient(format!("{} returned {}", stage, status)))
    } else {
        Err(Attempt::Fatal(UploadError::Rejected {
            status: status.as_u16(),
        }))
    }
}

fn parse_offset(headers: &HeaderMap) -> Result<u64, Attempt> {
    headers
        .get(UPLOAD_OFFSET)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse().ok())
        .ok_or_else(|| {
            Attempt::Fatal(UploadError::Protocol(
                "response has no valid Upload-Offset header".to_string(),
            ))
        })
}

fn resolve_location(endpoint: &str, location: &str) -> Result<String, Attempt> {
    Url::parse(endpoint)
        .and_then(|base| base.join(location))
        .map(|url| url.to_string())
        .map_err(|err| {
            Attempt::Fatal(UploadError::Protocol(format!(
                "invalid upload location {:?}: {}",
                location, err
            )))
        })
}

/// `key base64(value)` pairs joined by commas; empty values send the key alone.
fn encode_metadata(pairs: &[(String, String)]) -> String {
    pairs
        .iter()
        .map(|(key, value)| {
            if value.is_empty() {
                key.clone()
            } else {
                format!("{} {}", key, STANDARD.encode(value))
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload::store::MemoryRecordStore;
    use crate::upload::UploadSource;
    use mockito::Matcher;
    use std::sync::Mutex;
    use std::time::Duration;

    fn session(data: &'static [u8], retry_delays: Vec<Duration>) -> TransferSession {
        TransferSession {
            video_id: "456".to_string(),
            headers: vec![
                ("AuthorizationSignature".to_string(), "sig".to_string()),
                ("AuthorizationExpire".to_string(), "1700000000000".to_string()),
                ("VideoId".to_string(), "456".to_string()),
                ("LibraryId".to_string(), "123".to_string()),
            ],
            metadata: vec![
                ("filetype".to_string(), "video/mp4".to_string()),
                ("title".to_string(), "Example".to_string()),
                ("collection".to_string(), String::new()),
                ("thumbnailTime".to_string(), String::new()),
            ],
            source: UploadSource::Bytes(Bytes::from_static(data)),
            retry_delays,
            previous: None,
        }
    }

    fn recorder() -> (ProgressReporter, Arc<Mutex<Vec<(u64, u64)>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let reporter = ProgressReporter::new(Some(Arc::new(move |sent, total| {
            sink.lock().unwrap().push((sent, total));
        })));
        (reporter, seen)
    }

    #[test]
    fn metadata_encoding() {
        let pairs = vec![
            ("filetype".to_string(), "video/mp4".to_string()),
            ("title".to_string(), "Example".to_string()),
            ("collection".to_string(), String::new()),
        ];
        assert_eq!(
            encode_metadata(&pairs),
            "filetype dmlkZW8vbXA0,title RXhhbXBsZQ==,collection"
        );
    }

    #[test]
    fn transient_statuses() {
        assert!(is_transient(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(is_transient(StatusCode::CONFLICT));
        assert!(is_transient(StatusCode::LOCKED));
        assert!(!is_transient(StatusCode::UNAUTHORIZED));
        assert!(!is_transient(StatusCode::NOT_FOUND));
    }

    #[test]
    fn relative_locations_resolve_against_endpoint() {
        let url = resolve_location("https://video.bunnycdn.com/tusupload", "/tusupload/abc")
            .ok()
            .unwrap();
        assert_eq!(url, "https://video.bunnycdn.com/tusupload/abc");

        let url = resolve_location("https://video.bunnycdn.com/tusupload", "https://other.example/x")
            .ok()
            .unwrap();
        assert_eq!(url, "https://other.example/x");
    }

    #[tokio::test]
    async fn fresh_upload_creates_then_patches() {
        let mut server = mockito::Server::new_async().await;
        let create = server
            .mock("POST", "/tusupload")
            .match_header("Tus-Resumable", "1.0.0")
            .match_header("Upload-Length", "11")
            .match_header("AuthorizationSignature", "sig")
            .match_header("LibraryId", "123")
            .match_header(
                "Upload-Metadata",
                Matcher::Regex("filetype dmlkZW8vbXA0".to_string()),
            )
            .with_status(201)
            .with_header("Location", "/tusupload/abc")
            .create_async()
            .await;
        let patch = server
            .mock("PATCH", "/tusupload/abc")
            .match_header("Upload-Offset", "0")
            .match_header("Content-Type", "application/offset+octet-stream")
            .match_header("VideoId", "456")
            .match_body("hello world")
            .with_status(204)
            .with_header("Upload-Offset", "11")
            .create_async()
            .await;

        let store = Arc::new(MemoryRecordStore::new());
        let protocol = TusProtocol::new(Client::new(), store.clone())
            .with_endpoint(format!("{}/tusupload", server.url()));
        let session = session(b"hello world", vec![]);
        let fingerprint = protocol.fingerprint(&session).await.unwrap();
        let (reporter, seen) = recorder();

        protocol.start(session, &reporter).await.unwrap();

        create.assert_async().await;
        patch.assert_async().await;
        assert_eq!(*seen.lock().unwrap(), vec![(11, 11)]);
        assert!(store.find(&fingerprint).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn chunks_report_progress_at_each_boundary() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/tusupload")
            .with_status(201)
            .with_header("Location", "/tusupload/abc")
            .create_async()
            .await;
        let first = server
            .mock("PATCH", "/tusupload/abc")
            .match_header("Upload-Offset", "0")
            .match_body("hello ")
            .with_status(204)
            .with_header("Upload-Offset", "6")
            .create_async()
            .await;
        let second = server
            .mock("PATCH", "/tusupload/abc")
            .match_header("Upload-Offset", "6")
            .match_body("world")
            .with_status(204)
            .with_header("Upload-Offset", "11")
            .create_async()
            .await;

        let protocol = TusProtocol::new(Client::new(), Arc::new(MemoryRecordStore::new()))
            .with_endpoint(format!("{}/tusupload", server.url()))
            .with_chunk_size(6);
        let (reporter, seen) = recorder();

        protocol
            .start(session(b"hello world", vec![]), &reporter)
            .await
            .unwrap();

        first.assert_async().await;
        second.assert_async().await;
        assert_eq!(*seen.lock().unwrap(), vec![(6, 11), (11, 11)]);
    }

    #[tokio::test]
    async fn previous_upload_resumes_from_server_offset() {
        let mut server = mockito::Server::new_async().await;
        let create = server
            .mock("POST", "/tusupload")
            .expect(0)
            .create_async()
            .await;
        let head = server
            .mock("HEAD", "/tusupload/abc")
            .match_header("Tus-Resumable", "1.0.0")
            .with_status(200)
            .with_header("Upload-Offset", "6")
            .create_async()
            .await;
        let patch = server
            .mock("PATCH", "/tusupload/abc")
            .match_header("Upload-Offset", "6")
            .match_body("world")
            .with_status(204)
            .with_header("Upload-Offset", "11")
            .create_async()
            .await;

        let store = Arc::new(MemoryRecordStore::new());
        let protocol = TusProtocol::new(Client::new(), store.clone())
            .with_endpoint(format!("{}/tusupload", server.url()));
        let session = session(b"hello world", vec![]);
        let fingerprint = protocol.fingerprint(&session).await.unwrap();
        let previous = PreviousUpload {
            fingerprint: fingerprint.clone(),
            upload_url: format!("{}/tusupload/abc", server.url()),
            size: 11,
            created_at: Utc::now(),
        };
        store.save(previous.clone()).await.unwrap();

        assert_eq!(
            protocol.find_previous_uploads(&session).await.unwrap(),
            vec![previous.clone()]
        );

        let (reporter, seen) = recorder();
        protocol
            .start(session.resume_from(previous), &reporter)
            .await
            .unwrap();

        create.assert_async().await;
        head.assert_async().await;
        patch.assert_async().await;
        assert_eq!(*seen.lock().unwrap(), vec![(11, 11)]);
        assert!(store.find(&fingerprint).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn expired_previous_upload_starts_over() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("HEAD", "/tusupload/gone")
            .with_status(404)
            .create_async()
            .await;
        let create = server
            .mock("POST", "/tusupload")
            .with_status(201)
            .with_header("Location", "/tusupload/fresh")
            .create_async()
            .await;
        let patch = server
            .mock("PATCH", "/tusupload/fresh")
            .match_header("Upload-Offset", "0")
            .with_status(204)
            .with_header("Upload-Offset", "5")
            .create_async()
            .await;

        let protocol = TusProtocol::new(Client::new(), Arc::new(MemoryRecordStore::new()))
            .with_endpoint(format!("{}/tusupload", server.url()));
        let session = session(b"hello", vec![]);
        let fingerprint = protocol.fingerprint(&session).await.unwrap();
        let previous = PreviousUpload {
            fingerprint,
            upload_url: format!("{}/tusupload/gone", server.url()),
            size: 5,
            created_at: Utc::now(),
        };

        protocol
            .start(session.resume_from(previous), &ProgressReporter::default())
            .await
            .unwrap();

        create.assert_async().await;
        patch.assert_async().await;
    }

    #[tokio::test]
    async fn transient_failures_exhaust_retry_delays() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/tusupload")
            .with_status(201)
            .with_header("Location", "/tusupload/abc")
            .create_async()
            .await;
        let head = server
            .mock("HEAD", "/tusupload/abc")
            .with_status(200)
            .with_header("Upload-Offset", "0")
            .expect(2)
            .create_async()
            .await;
        let patch = server
            .mock("PATCH", "/tusupload/abc")
            .with_status(500)
            .expect(3)
            .create_async()
            .await;

        let store = Arc::new(MemoryRecordStore::new());
        let protocol = TusProtocol::new(Client::new(), store.clone())
            .with_endpoint(format!("{}/tusupload", server.url()));
        let session = session(b"hello", vec![Duration::ZERO, Duration::ZERO]);
        let fingerprint = protocol.fingerprint(&session).await.unwrap();

        let err = protocol
            .start(session, &ProgressReporter::default())
            .await
            .unwrap_err();

        match err {
            UploadError::RetriesExhausted { attempts, .. } => assert_eq!(attempts, 3),
            other => panic!("expected retries exhausted, got {:?}", other),
        }
        head.assert_async().await;
        patch.assert_async().await;
        // The record stays so a later run can resume.
        assert_eq!(store.find(&fingerprint).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn rejected_creation_is_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let create = server
            .mock("POST", "/tusupload")
            .with_status(401)
            .expect(1)
            .create_async()
            .await;

        let protocol = TusProtocol::new(Client::new(), Arc::new(MemoryRecordStore::new()))
            .with_endpoint(format!("{}/tusupload", server.url()));

        let err = protocol
            .start(
                session(b"hello", vec![Duration::ZERO; 3]),
                &ProgressReporter::default(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, UploadError::Rejected { status: 401 }));
        create.assert_async().await;
    }

    #[tokio::test]
    async fn resumed_offset_beyond_length_is_a_protocol_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("HEAD", "/tusupload/abc")
            .with_status(200)
            .with_header("Upload-Offset", "99")
            .create_async()
            .await;
        let patch = server
            .mock("PATCH", "/tusupload/abc")
            .expect(0)
            .create_async()
            .await;

        let protocol = TusProtocol::new(Client::new(), Arc::new(MemoryRecordStore::new()))
            .with_endpoint(format!("{}/tusupload", server.url()));
        let session = session(b"hello", vec![Duration::ZERO; 3]);
        let previous = PreviousUpload {
            fingerprint: protocol.fingerprint(&session).await.unwrap(),
            upload_url: format!("{}/tusupload/abc", server.url()),
            size: 5,
            created_at: Utc::now(),
        };
        let (reporter, seen) = recorder();

        let err = protocol
            .start(session.resume_from(previous), &reporter)
            .await
            .unwrap_err();

        assert!(matches!(err, UploadError::Protocol(_)));
        assert!(seen.lock().unwrap().is_empty());
        patch.assert_async().await;
    }

    #[test]
    fn endpoint_defaults_to_bunny_tus_host() {
        let protocol = TusProtocol::new(Client::new(), Arc::new(MemoryRecordStore::new()));
        assert_eq!(protocol.endpoint(), TUS_ENDPOINT);

        let protocol = protocol.with_endpoint("http://localhost:1234/tusupload");
        assert_eq!(protocol.endpoint(), "http://localhost:1234/tusupload");
    }
}
