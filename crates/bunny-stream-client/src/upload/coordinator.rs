//! Signs upload jobs and drives them through the resumable protocol.

use std::sync::Arc;

use bunny_stream_core::ClientConfig;
use chrono::Utc;
use tokio::sync::watch;

use super::protocol::{ProgressReporter, ResumableProtocol, TransferSession};
use super::{
    default_retry_delays, ErrorCallback, SuccessCallback, UploadError, UploadHandle, UploadJob,
    UploadState, DEFAULT_EXPIRE_TIME,
};
use crate::signature::{create_signature, SignatureParams};

pub const SIGNATURE_HEADER: &str = "AuthorizationSignature";
pub const EXPIRE_HEADER: &str = "AuthorizationExpire";
pub const VIDEO_ID_HEADER: &str = "VideoId";
pub const LIBRARY_ID_HEADER: &str = "LibraryId";

#[derive(Clone)]
pub struct UploadCoordinator {
    config: Arc<ClientConfig>,
    protocol: Arc<dyn ResumableProtocol>,
}

impl std::fmt::Debug for UploadCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadCoordinator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl UploadCoordinator {
    pub fn new(config: Arc<ClientConfig>, protocol: Arc<dyn ResumableProtocol>) -> Self {
        Self { config, protocol }
    }

    /// Validate and sign the job, then run the transfer on a background task.
    ///
    /// A malformed job fails here, before any network activity. Later failures
    /// reach the caller only through `on_error` and the handle state.
    pub fn upload(&self, job: UploadJob) -> Result<UploadHandle, UploadError> {
        let library_id = job.validate()?;

        let window = job.expire_time.unwrap_or(DEFAULT_EXPIRE_TIME);
        // Computed once: the same instant feeds the digest and the expiry header.
        let expire_at = chrono::Duration::from_std(window)
            .ok()
            .and_then(|window| Utc::now().checked_add_signed(window))
            .ok_or_else(|| UploadError::InvalidJob("expire_time is out of range".to_string()))?;
        let params = SignatureParams::new(library_id, job.video_id.clone(), expire_at);
        let signature = create_signature(self.config.access_key(), &params);

        let session = TransferSession {
            video_id: job.video_id.clone(),
            headers: signed_headers(&params, signature),
            metadata: job.metadata.to_pairs(),
            source: job.source,
            retry_delays: job.retry_delays.unwrap_or_else(default_retry_delays),
            previous: None,
        };

        let (state_tx, state_rx) = watch::channel(UploadState::Idle);
        let task = tokio::spawn(run(
            self.protocol.clone(),
            session,
            Callbacks {
                progress: ProgressReporter::new(job.on_progress),
                on_error: job.on_error,
                on_success: job.on_success,
            },
            state_tx,
        ));

        Ok(UploadHandle::new(state_rx, task))
    }
}

struct Callbacks {
    progress: ProgressReporter,
    on_error: Option<ErrorCallback>,
    on_success: Option<SuccessCallback>,
}

pub(crate) fn signed_headers(params: &SignatureParams, signature: String) -> Vec<(String, String)> {
    vec![
        (SIGNATURE_HEADER.to_string(), signature),
        (EXPIRE_HEADER.to_string(), params.expire_millis().to_string()),
        (VIDEO_ID_HEADER.to_string(), params.video_id.clone()),
        (LIBRARY_ID_HEADER.to_string(), params.library_id.to_string()),
    ]
}

async fn run(
    protocol: Arc<dyn ResumableProtocol>,
    session: TransferSession,
    callbacks: Callbacks,
    state: watch::Sender<UploadState>,
) {
    let video_id = session.video_id.clone();

    state.send_replace(UploadState::LookupPrevious);
    let previous = match protocol.find_previous_uploads(&session).await {
        Ok(previous) => previous,
        Err(err) => {
            fail(&video_id, err, &callbacks, &state);
            return;
        }
    };

    let session = match previous.into_iter().next() {
        Some(previous) => {
            tracing::info!(
                video_id = %video_id,
                upload_url = %previous.upload_url,
                "Resuming previous upload"
            );
            state.send_replace(UploadState::Resuming);
            session.resume_from(previous)
        }
        None => {
            tracing::info!(video_id = %video_id, "Starting new upload");
            state.send_replace(UploadState::Starting);
            session
        }
    };

    state.send_replace(UploadState::Transferring);
    match protocol.start(session, &callbacks.progress).await {
        Ok(()) => {
            tracing::info!(video_id = %video_id, "Upload completed");
            state.send_replace(UploadState::Succeeded);
            if let Some(on_success) = &callbacks.on_success {
                on_success();
            }
        }
        Err(err) => fail(&video_id, err, &callbacks, &state),
    }
}

fn fail(
    video_id: &str,
    err: UploadError,
    callbacks: &Callbacks,
    state: &watch::Sender<UploadState>,
) {
    tracing::warn!(video_id = %video_id, error = %err, "Upload failed");
    state.send_replace(UploadState::Failed);
    if let Some(on_error) = &callbacks.on_error {
        on_error(&err);
    }
}
